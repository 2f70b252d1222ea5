use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::bail;
use serde::{de::Visitor, Deserialize};
use winit::keyboard::KeyCode;

use crate::{
    canvas::CanvasConfig,
    cmd::Cmd,
    gesture::GestureConfig,
    router::InteractionConfig,
    smoothing::{FilterKind, SmoothingConfig},
    ui::{Action, ToolbarConfig, UiRegion, PALETTE},
};

#[derive(Deserialize)]
#[serde(default)]
pub struct Config {
    pub canvas: CanvasConfig,
    pub gesture: GestureConfig,
    pub smoothing: SmoothingConfig,
    pub interaction: InteractionConfig,
    pub toolbar: ToolbarConfig,
    /// Custom control layout. Empty means the default toolbar.
    #[serde(rename = "region")]
    pub regions: Vec<UiRegion>,
    /// Where snapshots are written.
    pub output_dir: PathBuf,
    /// Replaces the default key bindings when present.
    pub bind: HashMap<Key, Cmd>,
}

impl Default for Config {
    fn default() -> Self {
        let bind = [
            (KeyCode::Equal, Cmd::BrushUp),
            (KeyCode::NumpadAdd, Cmd::BrushUp),
            (KeyCode::Minus, Cmd::BrushDown),
            (KeyCode::NumpadSubtract, Cmd::BrushDown),
            (KeyCode::KeyW, Cmd::ToggleWebcam),
            (KeyCode::KeyC, Cmd::Clear),
            (KeyCode::KeyS, Cmd::Save),
            (KeyCode::KeyQ, Cmd::Quit),
            (KeyCode::Escape, Cmd::Quit),
        ]
        .into_iter()
        .map(|(code, cmd)| (Key(code), cmd))
        .collect();

        Self {
            canvas: CanvasConfig::default(),
            gesture: GestureConfig::default(),
            smoothing: SmoothingConfig::default(),
            interaction: InteractionConfig::default(),
            toolbar: ToolbarConfig::default(),
            regions: Vec::new(),
            output_dir: PathBuf::from("."),
            bind,
        }
    }
}

impl Config {
    pub fn load<A: AsRef<Path>>(path: A) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let canvas = &self.canvas;
        if canvas.width == 0 || canvas.height == 0 {
            bail!(
                "canvas size must be non-zero (got {}x{})",
                canvas.width,
                canvas.height
            );
        }
        positive("canvas.eraser_scale", canvas.eraser_scale)?;
        positive("canvas.stroke_spacing", canvas.stroke_spacing)?;
        if !canvas.fast_motion.is_finite() || canvas.fast_motion < 0.0 {
            bail!("`canvas.fast_motion` must not be negative");
        }

        positive("gesture.finger_extension", self.gesture.finger_extension)?;
        positive("gesture.thumb_extension", self.gesture.thumb_extension)?;

        let smoothing = &self.smoothing;
        match smoothing.filter {
            FilterKind::Exponential if !(smoothing.alpha > 0.0 && smoothing.alpha <= 1.0) => {
                bail!(
                    "`smoothing.alpha` must be in (0, 1] (got {})",
                    smoothing.alpha
                );
            }
            FilterKind::MovingAverage if smoothing.window == 0 => {
                bail!("`smoothing.window` must be at least 1");
            }
            FilterKind::OneEuro => {
                positive("smoothing.min_cutoff", smoothing.min_cutoff)?;
                positive("smoothing.d_cutoff", smoothing.d_cutoff)?;
                if !smoothing.beta.is_finite() || smoothing.beta < 0.0 {
                    bail!("`smoothing.beta` must not be negative");
                }
            }
            _ => {}
        }
        if let Some(max_jump) = smoothing.max_jump {
            positive("smoothing.max_jump", max_jump)?;
        }
        if !smoothing.dead_zone.is_finite() || smoothing.dead_zone < 0.0 {
            bail!("`smoothing.dead_zone` must not be negative");
        }

        if self.interaction.dwell_ms == 0 {
            bail!("`interaction.dwell_ms` must be at least 1");
        }

        for region in &self.regions {
            if let Action::SelectColor(index) = region.action {
                if index >= PALETTE.len() {
                    bail!(
                        "[[region]] selects color {index}, but the palette only has {} colors",
                        PALETTE.len()
                    );
                }
            }
            if region.rect.width == 0 || region.rect.height == 0 {
                bail!("[[region]] at ({}, {}) has zero size", region.rect.x, region.rect.y);
            }
        }

        Ok(())
    }
}

fn positive(name: &str, value: f32) -> anyhow::Result<()> {
    if !value.is_finite() || value <= 0.0 {
        bail!("`{name}` must be a positive number (got {value})");
    }
    Ok(())
}

/// A physical key, named like the `KeyCode` variant without its `Key`/`Digit` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(pub(crate) KeyCode);

macro_rules! key_names {
    ($($name:literal => $code:ident,)*) => {
        const KEY_NAMES: &[(&str, KeyCode)] = &[$(($name, KeyCode::$code),)*];
    };
}

key_names! {
    "A" => KeyA, "B" => KeyB, "C" => KeyC, "D" => KeyD, "E" => KeyE, "F" => KeyF,
    "G" => KeyG, "H" => KeyH, "I" => KeyI, "J" => KeyJ, "K" => KeyK, "L" => KeyL,
    "M" => KeyM, "N" => KeyN, "O" => KeyO, "P" => KeyP, "Q" => KeyQ, "R" => KeyR,
    "S" => KeyS, "T" => KeyT, "U" => KeyU, "V" => KeyV, "W" => KeyW, "X" => KeyX,
    "Y" => KeyY, "Z" => KeyZ,
    "0" => Digit0, "1" => Digit1, "2" => Digit2, "3" => Digit3, "4" => Digit4,
    "5" => Digit5, "6" => Digit6, "7" => Digit7, "8" => Digit8, "9" => Digit9,
    "Equal" => Equal, "Minus" => Minus,
    "NumpadAdd" => NumpadAdd, "NumpadSubtract" => NumpadSubtract,
    "Escape" => Escape, "Space" => Space, "Enter" => Enter, "Backspace" => Backspace,
    "Delete" => Delete, "Tab" => Tab,
    "F1" => F1, "F2" => F2, "F3" => F3, "F4" => F4, "F5" => F5, "F6" => F6,
    "F7" => F7, "F8" => F8, "F9" => F9, "F10" => F10, "F11" => F11, "F12" => F12,
}

impl Key {
    fn from_name(name: &str) -> Option<Self> {
        KEY_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, code)| Key(code))
    }
}

impl<'a> Deserialize<'a> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        struct FromStrVisitor;

        impl<'de> Visitor<'de> for FromStrVisitor {
            type Value = Key;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("key name")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Key::from_name(v).ok_or_else(|| E::custom(format_args!("invalid key name '{v}'")))
            }
        }

        deserializer.deserialize_str(FromStrVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::Rect;

    #[test]
    fn parses_example_config() {
        let config = Config::load("config.example.toml").unwrap();
        assert_eq!(config.bind.get(&Key(KeyCode::KeyS)), Some(&Cmd::Save));
        assert_eq!(config.smoothing.filter, FilterKind::OneEuro);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.canvas.width, 1000);
        assert_eq!(config.interaction.dwell_ms, 800);
        assert!(config.regions.is_empty());
        assert_eq!(config.bind.len(), 9);
        assert_eq!(config.bind.get(&Key(KeyCode::Escape)), Some(&Cmd::Quit));
    }

    #[test]
    fn regions_and_bindings() {
        let config = Config::parse(
            r#"
            [bind]
            space = "CLEAR"
            F5 = "SAVE"

            [[region]]
            rect = { x = 0, y = 0, width = 50, height = 50 }
            action = { select_color = 3 }

            [[region]]
            rect = { x = 60, y = 0, width = 50, height = 50 }
            action = "clear_canvas"
            "#,
        )
        .unwrap();

        assert_eq!(config.bind.len(), 2);
        assert_eq!(config.bind.get(&Key(KeyCode::Space)), Some(&Cmd::Clear));
        assert_eq!(config.regions[0].action, Action::SelectColor(3));
        assert_eq!(config.regions[1].rect, Rect::new(60, 0, 50, 50));
    }

    #[test]
    fn rejects_invalid_values() {
        for bad in [
            "[canvas]\nwidth = 0",
            "[smoothing]\nalpha = 0.0",
            "[smoothing]\nalpha = 1.5",
            "[smoothing]\nfilter = \"moving_average\"\nwindow = 0",
            "[gesture]\nfinger_extension = -0.1",
            "[gesture]\nthumb_extension = nan",
            "[interaction]\ndwell_ms = 0",
            "[[region]]\nrect = { x = 0, y = 0, width = 5, height = 5 }\naction = { select_color = 8 }",
            "[bind]\nNotAKey = \"SAVE\"",
            "[bind]\nS = \"EXPLODE\"",
        ] {
            assert!(Config::parse(bad).is_err(), "accepted {bad:?}");
        }
    }
}
