//! Turns one frame of hand keypoints into a posture and a stabilized cursor.

use std::{fmt, time::Duration};

use serde::Deserialize;

use crate::{
    landmarks::{
        Hand, INDEX_MCP, INDEX_TIP, MIDDLE_MCP, PINKY_MCP, RING_MCP, THUMB_IP, THUMB_TIP, WRIST,
    },
    math::{vec2, Vec2f},
    smoothing::{create_filter, CursorFilter, SmoothingConfig},
};

/// Below this palm size (in normalized units) the hand is too small or collapsed to judge.
const MIN_PALM_SIZE: f32 = 1e-4;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// How far (in palm sizes) a fingertip must reach past its PIP joint, away from the palm
    /// center, to count as extended.
    pub finger_extension: f32,
    /// Same for the thumb, measured sideways against the pinky knuckle.
    pub thumb_extension: f32,
    /// Consecutive frames without a hand that are bridged before the cursor history is dropped.
    pub max_dropout_frames: u32,
    /// Flip keypoints horizontally (for unmirrored camera images).
    pub mirror: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            finger_extension: 0.15,
            thumb_extension: 0.1,
            max_dropout_frames: 1,
            mirror: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posture {
    /// Only the index finger is extended.
    Draw,
    /// Open palm.
    Select,
    /// No hand, or any other hand shape.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Which fingers are extended, one bit per finger (thumb is bit 0).
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Extension(u8);

impl Extension {
    pub const NONE: Self = Self(0);
    pub const INDEX_ONLY: Self = Self(1 << Finger::Index as u8);
    pub const ALL: Self = Self(0b11111);

    pub fn from_fingers(extended: [bool; 5]) -> Self {
        let mut ext = Self::NONE;
        for (finger, up) in Finger::ALL.into_iter().zip(extended) {
            ext.set(finger, up);
        }
        ext
    }

    pub fn set(&mut self, finger: Finger, extended: bool) {
        if extended {
            self.0 |= finger.bit();
        } else {
            self.0 &= !finger.bit();
        }
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Only two exact patterns map to an action; partial shapes during hand transitions must
    /// not draw or select anything.
    pub fn posture(self) -> Posture {
        match self {
            Self::INDEX_ONLY => Posture::Draw,
            Self::ALL => Posture::Select,
            _ => Posture::None,
        }
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extension({:05b})", self.bits())
    }
}

/// Output of [`GestureClassifier::classify`] for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub posture: Posture,
    /// Smoothed cursor in canvas pixels. Present for [`Posture::Draw`] and [`Posture::Select`].
    pub cursor: Option<Vec2f>,
    pub extension: Extension,
}

impl Classification {
    pub const NO_HAND: Self = Self {
        posture: Posture::None,
        cursor: None,
        extension: Extension::NONE,
    };
}

pub struct GestureClassifier {
    config: GestureConfig,
    /// Canvas size in pixels; normalized keypoints are scaled by this.
    frame_size: Vec2f,
    filter: Box<dyn CursorFilter>,
    missed_frames: u32,
}

impl GestureClassifier {
    pub fn new(config: GestureConfig, smoothing: &SmoothingConfig, frame_size: Vec2f) -> Self {
        let filter = create_filter(smoothing);
        log::debug!(
            "gesture classifier: {} smoothing, {}x{} px",
            filter.name(),
            frame_size.x(),
            frame_size.y()
        );
        Self {
            config,
            frame_size,
            filter,
            missed_frames: 0,
        }
    }

    /// Classifies one frame. `elapsed` is the time since the previous frame.
    pub fn classify(&mut self, hand: Option<&Hand>, elapsed: Duration) -> Classification {
        let Some(hand) = hand.filter(|hand| hand.is_finite()) else {
            self.missed_frames = self.missed_frames.saturating_add(1);
            if self.missed_frames > self.config.max_dropout_frames {
                self.filter.reset();
            }
            return Classification::NO_HAND;
        };
        self.missed_frames = 0;

        let mirrored;
        let hand = if self.config.mirror {
            mirrored = hand.mirrored();
            &mirrored
        } else {
            hand
        };

        let extension = self.extension(hand);
        let posture = extension.posture();
        let cursor = match posture {
            Posture::Draw | Posture::Select => {
                let raw = self.to_pixels(hand.joint(INDEX_TIP));
                Some(self.filter.apply(raw, elapsed))
            }
            Posture::None => None,
        };

        Classification {
            posture,
            cursor,
            extension,
        }
    }

    /// Computes the finger extension vector of `hand`. Stateless.
    ///
    /// Measured on unclamped keypoints: a hand partly outside the frame keeps its shape.
    pub fn extension(&self, hand: &Hand) -> Extension {
        let palm_size = hand.point(WRIST).dist(hand.point(MIDDLE_MCP));
        if palm_size < MIN_PALM_SIZE {
            return Extension::NONE;
        }

        let mut palm_center = hand.point(WRIST);
        for mcp in [INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP] {
            palm_center += hand.point(mcp);
        }
        let palm_center = palm_center / 5.0;

        let mut extended = [false; 5];

        let pinky_base = hand.point(PINKY_MCP);
        let thumb_reach =
            hand.point(THUMB_TIP).dist(pinky_base) - hand.point(THUMB_IP).dist(pinky_base);
        extended[0] = thumb_reach > self.config.thumb_extension * palm_size;

        for (i, mcp) in [INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP].into_iter().enumerate() {
            // Joints of a finger are laid out as MCP, PIP, DIP, TIP.
            let pip = hand.point(mcp + 1);
            let tip = hand.point(mcp + 3);
            let reach = tip.dist(palm_center) - pip.dist(palm_center);
            extended[i + 1] = reach > self.config.finger_extension * palm_size;
        }

        Extension::from_fingers(extended)
    }

    fn to_pixels(&self, point: Vec2f) -> Vec2f {
        let max = self.frame_size - vec2(1.0, 1.0);
        (point * self.frame_size).clamp(vec2(0.0, 0.0), max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        landmarks::{synthetic_hand, HandShape, Landmark, LANDMARK_COUNT},
        smoothing::FilterKind,
    };

    const FRAME: Duration = Duration::from_millis(33);

    fn classifier(smoothing: SmoothingConfig) -> GestureClassifier {
        GestureClassifier::new(
            GestureConfig::default(),
            &smoothing,
            vec2(1000.0, 700.0),
        )
    }

    fn fingers(bits: u8) -> [bool; 5] {
        std::array::from_fn(|i| bits & (1 << i) != 0)
    }

    #[test]
    fn every_extension_pattern() {
        let mut classifier = classifier(SmoothingConfig::default());
        for bits in 0..32u8 {
            let hand = synthetic_hand(fingers(bits), vec2(0.5, 0.4));
            let result = classifier.classify(Some(&hand), FRAME);
            assert_eq!(result.extension.bits(), bits);

            let expected = match bits {
                0b00010 => Posture::Draw,
                0b11111 => Posture::Select,
                _ => Posture::None,
            };
            assert_eq!(result.posture, expected, "pattern {bits:05b}");
            assert_eq!(result.cursor.is_some(), expected != Posture::None);
        }
    }

    #[test]
    fn extension_ignores_rotation_and_mirroring() {
        let classifier = classifier(SmoothingConfig::default());
        let hand = synthetic_hand(HandShape::Pointing.fingers(), vec2(0.5, 0.4));

        // Lay the hand on its side around the wrist.
        let pivot = hand.joint(WRIST);
        let rotated = Hand::new(hand.landmarks().map(|l| {
            let d = l.pos() - pivot;
            Landmark::new(pivot.x() - d.y(), pivot.y() + d.x())
        }));

        assert_eq!(classifier.extension(&rotated), Extension::INDEX_ONLY);
        assert_eq!(classifier.extension(&hand.mirrored()), Extension::INDEX_ONLY);
    }

    #[test]
    fn open_palm_partly_out_of_frame() {
        let mut classifier = classifier(SmoothingConfig::default());
        // Fingertip at pixel (20, 40): the thumb and part of the palm are left of the frame.
        let hand = synthetic_hand(HandShape::OpenPalm.fingers(), vec2(0.02, 40.0 / 700.0));
        assert!(hand.point(THUMB_TIP).x() < 0.0);

        let result = classifier.classify(Some(&hand), FRAME);
        assert_eq!(result.extension, Extension::ALL);
        assert_eq!(result.posture, Posture::Select);
    }

    #[test]
    fn cursor_is_index_tip_in_pixels() {
        let mut classifier = classifier(SmoothingConfig {
            filter: FilterKind::None,
            ..Default::default()
        });
        let hand = synthetic_hand(HandShape::OpenPalm.fingers(), vec2(0.25, 0.5));
        let result = classifier.classify(Some(&hand), FRAME);
        assert_eq!(result.posture, Posture::Select);
        let cursor = result.cursor.unwrap();
        assert!(cursor.dist(vec2(250.0, 350.0)) < 0.01);
    }

    #[test]
    fn mirror_flips_cursor() {
        let mut classifier = GestureClassifier::new(
            GestureConfig {
                mirror: true,
                ..Default::default()
            },
            &SmoothingConfig {
                filter: FilterKind::None,
                ..Default::default()
            },
            vec2(1000.0, 700.0),
        );
        let hand = synthetic_hand(HandShape::Pointing.fingers(), vec2(0.25, 0.5));
        let cursor = classifier.classify(Some(&hand), FRAME).cursor.unwrap();
        assert!(cursor.dist(vec2(750.0, 350.0)) < 0.01);
    }

    #[test]
    fn no_hand_yields_nothing() {
        let mut classifier = classifier(SmoothingConfig::default());
        assert_eq!(classifier.classify(None, FRAME), Classification::NO_HAND);
    }

    #[test]
    fn malformed_hand_is_no_hand() {
        let mut classifier = classifier(SmoothingConfig::default());
        let mut landmarks = *synthetic_hand(HandShape::Pointing.fingers(), vec2(0.5, 0.5))
            .landmarks();
        landmarks[INDEX_TIP].x = f32::INFINITY;
        let result = classifier.classify(Some(&Hand::new(landmarks)), FRAME);
        assert_eq!(result, Classification::NO_HAND);

        let collapsed = Hand::new([Landmark::new(0.5, 0.5); LANDMARK_COUNT]);
        let result = classifier.classify(Some(&collapsed), FRAME);
        assert_eq!(result.posture, Posture::None);
        assert_eq!(result.extension, Extension::NONE);
    }

    #[test]
    fn smoothing_history_cleared_after_two_missing_frames() {
        let mut classifier = classifier(SmoothingConfig {
            filter: FilterKind::Exponential,
            alpha: 0.3,
            ..Default::default()
        });
        let left = synthetic_hand(HandShape::Pointing.fingers(), vec2(0.2, 0.5));
        let right = synthetic_hand(HandShape::Pointing.fingers(), vec2(0.8, 0.5));

        for _ in 0..5 {
            classifier.classify(Some(&left), FRAME);
        }
        classifier.classify(None, FRAME);
        classifier.classify(None, FRAME);

        let cursor = classifier.classify(Some(&right), FRAME).cursor.unwrap();
        let raw = right.joint(INDEX_TIP) * vec2(1000.0, 700.0);
        assert_eq!(cursor, raw);
    }

    #[test]
    fn single_dropped_frame_keeps_history() {
        let mut classifier = classifier(SmoothingConfig {
            filter: FilterKind::Exponential,
            alpha: 0.5,
            ..Default::default()
        });
        let left = synthetic_hand(HandShape::Pointing.fingers(), vec2(0.2, 0.5));
        let right = synthetic_hand(HandShape::Pointing.fingers(), vec2(0.4, 0.5));

        classifier.classify(Some(&left), FRAME);
        classifier.classify(None, FRAME);
        let cursor = classifier.classify(Some(&right), FRAME).cursor.unwrap();
        // Halfway between 200 and 400.
        assert!((cursor.x() - 300.0).abs() < 0.01);
    }
}
