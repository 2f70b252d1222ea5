//! On-canvas controls: the color palette and the eraser/clear buttons.
//!
//! Regions are plain rectangles in canvas pixels. They are hit-tested by the router and drawn
//! by the compositor, and never change after startup.

use serde::Deserialize;

use crate::{canvas::Rgb, math::Vec2f};

#[derive(Debug, Clone, Copy)]
pub struct Swatch {
    pub name: &'static str,
    pub color: Rgb,
}

#[rustfmt::skip]
pub const PALETTE: [Swatch; 8] = [
    Swatch { name: "Red", color: Rgb::new(255, 0, 0) },
    Swatch { name: "Green", color: Rgb::new(0, 255, 0) },
    Swatch { name: "Blue", color: Rgb::new(0, 0, 255) },
    Swatch { name: "Yellow", color: Rgb::new(255, 255, 0) },
    Swatch { name: "Magenta", color: Rgb::new(255, 0, 255) },
    Swatch { name: "Cyan", color: Rgb::new(0, 255, 255) },
    Swatch { name: "Black", color: Rgb::new(0, 0, 0) },
    Swatch { name: "White", color: Rgb::new(255, 255, 255) },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Half-open: the right and bottom edges belong to the neighbor.
    pub fn contains(&self, p: Vec2f) -> bool {
        p.x() >= self.x as f32
            && p.x() < self.right() as f32
            && p.y() >= self.y as f32
            && p.y() < self.bottom() as f32
    }

    fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            (self.right().max(other.right()) - x) as u32,
            (self.bottom().max(other.bottom()) - y) as u32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Index into [`PALETTE`].
    SelectColor(usize),
    ToggleEraser,
    ClearCanvas,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UiRegion {
    pub rect: Rect,
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolbarConfig {
    /// Height of the palette strip along the top edge.
    pub height: u32,
    pub button_width: u32,
    pub button_height: u32,
    pub margin: u32,
}

impl Default for ToolbarConfig {
    fn default() -> Self {
        Self {
            height: 80,
            button_width: 100,
            button_height: 60,
            margin: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    regions: Vec<UiRegion>,
    /// Bounding box of all regions.
    band: Option<Rect>,
}

impl Layout {
    pub fn new(regions: Vec<UiRegion>) -> Self {
        let band = regions
            .iter()
            .map(|r| r.rect)
            .reduce(|acc, rect| acc.union(&rect));
        Self { regions, band }
    }

    /// The default toolbar: swatches across the top, ERASE and CLEAR buttons at the right.
    pub fn toolbar(canvas_width: u32, config: &ToolbarConfig) -> Self {
        let ToolbarConfig {
            height,
            button_width,
            button_height,
            margin,
        } = *config;
        let right = canvas_width as i32;
        let slot = (button_width + margin) as i32;

        let clear = Rect::new(right - slot, margin as i32, button_width, button_height);
        let erase = Rect::new(right - 2 * slot, margin as i32, button_width, button_height);

        let palette_width = (erase.x - margin as i32).max(PALETTE.len() as i32);
        let swatch_width = palette_width as u32 / PALETTE.len() as u32;

        let mut regions: Vec<UiRegion> = (0..PALETTE.len())
            .map(|i| UiRegion {
                rect: Rect::new(i as i32 * swatch_width as i32, 0, swatch_width, height),
                action: Action::SelectColor(i),
            })
            .collect();
        regions.push(UiRegion {
            rect: erase,
            action: Action::ToggleEraser,
        });
        regions.push(UiRegion {
            rect: clear,
            action: Action::ClearCanvas,
        });

        Self::new(regions)
    }

    pub fn regions(&self) -> &[UiRegion] {
        &self.regions
    }

    /// Index of the first region containing `p`.
    pub fn hit_test(&self, p: Vec2f) -> Option<usize> {
        self.regions.iter().position(|r| r.rect.contains(p))
    }

    /// Whether `p` lies within the area occupied by the controls.
    pub fn in_band(&self, p: Vec2f) -> bool {
        self.band.is_some_and(|band| band.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vec2;

    #[test]
    fn default_toolbar() {
        let layout = Layout::toolbar(1000, &ToolbarConfig::default());
        let regions = layout.regions();
        assert_eq!(regions.len(), 10);

        assert_eq!(regions[0].rect, Rect::new(0, 0, 96, 80));
        assert_eq!(regions[7].rect, Rect::new(672, 0, 96, 80));
        assert_eq!(regions[8].rect, Rect::new(780, 10, 100, 60));
        assert_eq!(regions[8].action, Action::ToggleEraser);
        assert_eq!(regions[9].rect, Rect::new(890, 10, 100, 60));
        assert_eq!(regions[9].action, Action::ClearCanvas);

        // No two regions overlap, so hit-testing is unambiguous.
        for (i, a) in regions.iter().enumerate() {
            for b in &regions[i + 1..] {
                assert!(a.rect.right() <= b.rect.x || b.rect.right() <= a.rect.x);
            }
        }
    }

    #[test]
    fn hit_test() {
        let layout = Layout::toolbar(1000, &ToolbarConfig::default());
        assert_eq!(layout.hit_test(vec2(10.0, 10.0)), Some(0));
        assert_eq!(layout.hit_test(vec2(96.0, 10.0)), Some(1));
        assert_eq!(layout.hit_test(vec2(800.0, 40.0)), Some(8));
        assert_eq!(layout.hit_test(vec2(950.0, 69.0)), Some(9));
        assert_eq!(layout.hit_test(vec2(950.0, 75.0)), None);
        assert_eq!(layout.hit_test(vec2(500.0, 500.0)), None);

        assert!(layout.in_band(vec2(950.0, 75.0)));
        assert!(!layout.in_band(vec2(500.0, 80.0)));
    }

    #[test]
    fn empty_layout() {
        let layout = Layout::new(Vec::new());
        assert_eq!(layout.hit_test(vec2(0.0, 0.0)), None);
        assert!(!layout.in_band(vec2(0.0, 0.0)));
    }
}
