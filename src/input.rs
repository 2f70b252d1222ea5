//! Host input: keyboard bindings and a mouse-driven stand-in for the hand tracker.

use std::collections::HashMap;

use winit::{event::MouseButton, keyboard::KeyCode};

use crate::{
    cmd::Cmd,
    config::Key,
    landmarks::{synthetic_hand, Hand, HandShape, LandmarkSource},
    math::{vec2, Vec2f},
};

pub struct Bindings {
    keys: HashMap<KeyCode, Cmd>,
}

impl Bindings {
    pub fn new(bind: &HashMap<Key, Cmd>) -> Self {
        Self {
            keys: bind.iter().map(|(key, &cmd)| (key.0, cmd)).collect(),
        }
    }

    /// Maps a key event to its command. Commands fire on press; only brush resizing repeats
    /// while the key is held.
    pub fn translate(&self, code: KeyCode, pressed: bool, repeat: bool) -> Option<Cmd> {
        if !pressed {
            return None;
        }
        let cmd = *self.keys.get(&code)?;
        if repeat && !matches!(cmd, Cmd::BrushUp | Cmd::BrushDown) {
            return None;
        }
        Some(cmd)
    }
}

/// Synthesizes a hand under the mouse pointer.
///
/// The left button extends the index finger (draw), the right button opens the palm
/// (select), and with no button held the hand is a fist. Leaving the window hides the hand.
#[derive(Debug, Default)]
pub struct SimulatedHand {
    /// Pointer position in normalized window coordinates.
    pointer: Option<Vec2f>,
    left: bool,
    right: bool,
}

impl SimulatedHand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer_moved(&mut self, position: Vec2f, window_size: Vec2f) {
        if window_size.x() <= 0.0 || window_size.y() <= 0.0 {
            return;
        }
        self.pointer = Some(vec2(
            position.x() / window_size.x(),
            position.y() / window_size.y(),
        ));
    }

    pub fn pointer_left(&mut self) {
        self.pointer = None;
    }

    pub fn button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.left = pressed,
            MouseButton::Right => self.right = pressed,
            _ => {}
        }
    }

    pub fn shape(&self) -> HandShape {
        if self.right {
            HandShape::OpenPalm
        } else if self.left {
            HandShape::Pointing
        } else {
            HandShape::Fist
        }
    }
}

impl LandmarkSource for SimulatedHand {
    fn next_hand(&mut self) -> Option<Hand> {
        let pointer = self.pointer?;
        Some(synthetic_hand(self.shape().fingers(), pointer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, landmarks::INDEX_TIP};

    #[test]
    fn default_bindings() {
        let bindings = Bindings::new(&Config::default().bind);
        assert_eq!(bindings.translate(KeyCode::KeyS, true, false), Some(Cmd::Save));
        assert_eq!(bindings.translate(KeyCode::KeyS, false, false), None);
        assert_eq!(bindings.translate(KeyCode::KeyS, true, true), None);
        assert_eq!(
            bindings.translate(KeyCode::Equal, true, true),
            Some(Cmd::BrushUp)
        );
        assert_eq!(
            bindings.translate(KeyCode::NumpadSubtract, true, false),
            Some(Cmd::BrushDown)
        );
        assert_eq!(bindings.translate(KeyCode::KeyZ, true, false), None);
    }

    #[test]
    fn simulated_hand_follows_pointer() {
        let mut sim = SimulatedHand::new();
        assert_eq!(sim.next_hand(), None);

        sim.pointer_moved(vec2(500.0, 350.0), vec2(1000.0, 700.0));
        assert_eq!(sim.shape(), HandShape::Fist);

        sim.button(MouseButton::Left, true);
        assert_eq!(sim.shape(), HandShape::Pointing);
        let hand = sim.next_hand().unwrap();
        assert!(hand.joint(INDEX_TIP).dist(vec2(0.5, 0.5)) < 1e-5);

        sim.button(MouseButton::Right, true);
        assert_eq!(sim.shape(), HandShape::OpenPalm);
        sim.button(MouseButton::Right, false);
        sim.button(MouseButton::Left, false);
        assert_eq!(sim.shape(), HandShape::Fist);

        sim.pointer_left();
        assert_eq!(sim.next_hand(), None);
    }
}
