//! Hand keypoints as delivered by a landmark detector.
//!
//! Coordinates are normalized to the camera frame: `(0, 0)` is the top left corner, `(1, 1)` the
//! bottom right. Joint indices follow the usual 21-point hand model.

use crate::math::{vec2, Vec2f};

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Bones drawn by the hand preview.
#[rustfmt::skip]
pub const HAND_SKELETON: [(usize, usize); 21] = [
    (WRIST, THUMB_CMC), (THUMB_CMC, THUMB_MCP), (THUMB_MCP, THUMB_IP), (THUMB_IP, THUMB_TIP),
    (WRIST, INDEX_MCP), (INDEX_MCP, INDEX_PIP), (INDEX_PIP, INDEX_DIP), (INDEX_DIP, INDEX_TIP),
    (WRIST, MIDDLE_MCP), (MIDDLE_MCP, MIDDLE_PIP), (MIDDLE_PIP, MIDDLE_DIP), (MIDDLE_DIP, MIDDLE_TIP),
    (WRIST, RING_MCP), (RING_MCP, RING_PIP), (RING_PIP, RING_DIP), (RING_DIP, RING_TIP),
    (WRIST, PINKY_MCP), (PINKY_MCP, PINKY_PIP), (PINKY_PIP, PINKY_DIP), (PINKY_DIP, PINKY_TIP),
    (INDEX_MCP, MIDDLE_MCP),
];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn pos(self) -> Vec2f {
        vec2(self.x, self.y)
    }
}

/// One detected hand, valid for a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    landmarks: [Landmark; LANDMARK_COUNT],
}

impl Hand {
    pub fn new(landmarks: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { landmarks }
    }

    pub fn landmarks(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.landmarks
    }

    /// Detectors occasionally emit NaNs for a lost joint; such a hand is unusable.
    pub fn is_finite(&self) -> bool {
        self.landmarks.iter().all(|l| l.pos().is_finite())
    }

    /// Position of joint `index` as reported, possibly outside the unit square.
    pub fn point(&self, index: usize) -> Vec2f {
        self.landmarks[index].pos()
    }

    /// Position of joint `index`, clamped to the unit square.
    pub fn joint(&self, index: usize) -> Vec2f {
        self.landmarks[index]
            .pos()
            .clamp(vec2(0.0, 0.0), vec2(1.0, 1.0))
    }

    /// The same hand seen in a horizontally flipped camera image.
    pub fn mirrored(&self) -> Hand {
        Hand {
            landmarks: self.landmarks.map(|l| Landmark::new(1.0 - l.x, l.y)),
        }
    }
}

/// Anything that delivers per-frame hand keypoints.
///
/// Implementations may block until the next camera frame is available. A source that is
/// temporarily unavailable simply reports no hand.
pub trait LandmarkSource {
    fn next_hand(&mut self) -> Option<Hand>;
}

/// Plays back a fixed list of frames, then reports no hand forever.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedSource {
    frames: std::collections::VecDeque<Option<Hand>>,
}

#[cfg(test)]
impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = Option<Hand>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
impl LandmarkSource for ScriptedSource {
    fn next_hand(&mut self) -> Option<Hand> {
        self.frames.pop_front().flatten()
    }
}

/// Coarse hand shapes for the simulated source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandShape {
    Fist,
    Pointing,
    OpenPalm,
}

impl HandShape {
    /// Extended fingers, thumb first.
    pub fn fingers(self) -> [bool; 5] {
        match self {
            HandShape::Fist => [false; 5],
            HandShape::Pointing => [false, true, false, false, false],
            HandShape::OpenPalm => [true; 5],
        }
    }
}

/// Size of a synthetic hand in normalized units per model unit.
const HAND_SCALE: f32 = 0.08;

// Upright hand, palm facing the camera, thumb on the left. Model units, y pointing down, wrist
// at the origin.
const THUMB_BASE: [[f32; 2]; 2] = [[-0.3, -0.2], [-0.55, -0.4]];
const THUMB_OUT: [[f32; 2]; 2] = [[-0.8, -0.55], [-1.05, -0.7]];
const THUMB_IN: [[f32; 2]; 2] = [[-0.45, -0.65], [-0.15, -0.75]];
const FINGER_MCPS: [[f32; 2]; 4] = [[-0.4, -1.0], [-0.13, -1.05], [0.13, -1.0], [0.38, -0.9]];
// PIP, DIP and tip offsets from the MCP.
const FINGER_OUT: [f32; 3] = [-0.45, -0.75, -1.0];
const FINGER_IN: [f32; 3] = [-0.3, -0.15, 0.05];

/// Builds a plausible hand with the given fingers extended (thumb first), positioned so that an
/// extended index fingertip lands on `index_tip`.
pub fn synthetic_hand(extended: [bool; 5], index_tip: Vec2f) -> Hand {
    let [ix, iy] = FINGER_MCPS[0];
    let origin = index_tip - vec2(ix, iy + FINGER_OUT[2]) * HAND_SCALE;
    let place = |[x, y]: [f32; 2]| {
        let p = origin + vec2(x, y) * HAND_SCALE;
        Landmark::new(p.x(), p.y())
    };

    let mut landmarks = [Landmark::default(); LANDMARK_COUNT];
    landmarks[WRIST] = place([0.0, 0.0]);
    landmarks[THUMB_CMC] = place(THUMB_BASE[0]);
    landmarks[THUMB_MCP] = place(THUMB_BASE[1]);
    let thumb = if extended[0] { THUMB_OUT } else { THUMB_IN };
    landmarks[THUMB_IP] = place(thumb[0]);
    landmarks[THUMB_TIP] = place(thumb[1]);

    for (finger, &[mx, my]) in FINGER_MCPS.iter().enumerate() {
        let base = INDEX_MCP + finger * 4;
        let offsets = if extended[finger + 1] {
            FINGER_OUT
        } else {
            FINGER_IN
        };
        landmarks[base] = place([mx, my]);
        for (joint, dy) in offsets.into_iter().enumerate() {
            landmarks[base + 1 + joint] = place([mx, my + dy]);
        }
    }

    Hand::new(landmarks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_index_tip_is_anchored() {
        let tip = vec2(0.3, 0.4);
        let hand = synthetic_hand(HandShape::Pointing.fingers(), tip);
        assert!(hand.joint(INDEX_TIP).dist(tip) < 1e-5);
        // Wrist hangs below the fingertip.
        assert!(hand.joint(WRIST).y() > tip.y());
    }

    #[test]
    fn joints_are_clamped() {
        let mut landmarks = [Landmark::new(0.5, 0.5); LANDMARK_COUNT];
        landmarks[INDEX_TIP] = Landmark::new(-0.2, 1.7);
        let hand = Hand::new(landmarks);
        assert_eq!(hand.joint(INDEX_TIP), vec2(0.0, 1.0));
        assert_eq!(hand.point(INDEX_TIP), vec2(-0.2, 1.7));
    }

    #[test]
    fn nan_hand_is_not_finite() {
        let mut landmarks = [Landmark::new(0.5, 0.5); LANDMARK_COUNT];
        assert!(Hand::new(landmarks).is_finite());
        landmarks[PINKY_DIP].y = f32::NAN;
        assert!(!Hand::new(landmarks).is_finite());
    }

    #[test]
    fn scripted_source_runs_dry() {
        let hand = synthetic_hand(HandShape::Fist.fingers(), vec2(0.5, 0.5));
        let mut source = ScriptedSource::new([Some(hand.clone()), None]);
        assert_eq!(source.next_hand(), Some(hand));
        assert_eq!(source.next_hand(), None);
        assert_eq!(source.remaining(), 0);
        assert_eq!(source.next_hand(), None);
    }
}
