//! The paint surface: an RGB raster plus the stroke state machine that writes into it.

use bytemuck::NoUninit;
use serde::Deserialize;

use crate::math::{lerp, segment_dist, vec2, Vec2f};

pub const MIN_RADIUS: u32 = 1;
pub const MAX_RADIUS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, NoUninit)]
#[repr(C)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    /// Initial brush radius in pixels.
    pub brush_radius: u32,
    /// The eraser is this many times wider than the brush.
    pub eraser_scale: f32,
    /// Maximum distance between interpolated points on a fast stroke, in pixels.
    pub stroke_spacing: f32,
    /// Segments longer than this (in pixels) are subdivided.
    pub fast_motion: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 700,
            brush_radius: 4,
            eraser_scale: 3.0,
            stroke_spacing: 2.0,
            fast_motion: 6.0,
        }
    }
}

/// Active brush settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolState {
    pub color: Rgb,
    /// Always within `MIN_RADIUS..=MAX_RADIUS`.
    pub radius: u32,
    pub eraser: bool,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            color: Rgb::BLACK,
            radius: 4,
            eraser: false,
        }
    }
}

/// Fixed-size pixel buffer, row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl Raster {
    pub fn new(width: u32, height: u32, fill: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y * self.width + x) as usize])
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Packed RGB8 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    /// Paints every pixel whose center lies within `radius` of the segment `a..=b`.
    fn fill_capsule(&mut self, a: Vec2f, b: Vec2f, radius: f32, color: Rgb) {
        let min_x = (a.x().min(b.x()) - radius).floor().max(0.0) as u32;
        let min_y = (a.y().min(b.y()) - radius).floor().max(0.0) as u32;
        let max_x = (a.x().max(b.x()) + radius).ceil().min(self.width as f32 - 1.0);
        let max_y = (a.y().max(b.y()) + radius).ceil().min(self.height as f32 - 1.0);
        if max_x < 0.0 || max_y < 0.0 {
            return;
        }

        for y in min_y..=max_y as u32 {
            let row = (y * self.width) as usize;
            for x in min_x..=max_x as u32 {
                if segment_dist(vec2(x as f32, y as f32), a, b) <= radius {
                    self.pixels[row + x as usize] = color;
                }
            }
        }
    }
}

pub struct Canvas {
    raster: Raster,
    background: Rgb,
    tool: ToolState,
    /// Last committed point of the open stroke.
    anchor: Option<Vec2f>,
    eraser_scale: f32,
    spacing: f32,
    fast_motion: f32,
}

impl Canvas {
    pub fn new(config: &CanvasConfig) -> Self {
        let background = Rgb::WHITE;
        let mut canvas = Self {
            raster: Raster::new(config.width, config.height, background),
            background,
            tool: ToolState::default(),
            anchor: None,
            eraser_scale: config.eraser_scale.max(1.0),
            spacing: config.stroke_spacing.max(0.5),
            fast_motion: config.fast_motion.max(0.0),
        };
        canvas.set_tool(Rgb::BLACK, config.brush_radius as i32, false);
        canvas
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn tool(&self) -> ToolState {
        self.tool
    }

    pub fn is_stroking(&self) -> bool {
        self.anchor.is_some()
    }

    /// Updates the brush. `radius` is clamped to `MIN_RADIUS..=MAX_RADIUS`.
    pub fn set_tool(&mut self, color: Rgb, radius: i32, eraser: bool) {
        let radius = radius.clamp(MIN_RADIUS as i32, MAX_RADIUS as i32) as u32;
        self.tool = ToolState {
            color,
            radius,
            eraser,
        };
    }

    /// Starts a stroke at `point`. Nothing is painted until the stroke continues.
    pub fn begin_stroke(&mut self, point: Vec2f) {
        self.anchor = Some(point);
    }

    /// Extends the open stroke to `point`. Without an open stroke this starts one.
    pub fn continue_stroke(&mut self, point: Vec2f) {
        let Some(from) = self.anchor.replace(point) else {
            return;
        };

        let (color, radius) = if self.tool.eraser {
            (self.background, self.tool.radius as f32 * self.eraser_scale)
        } else {
            (self.tool.color, self.tool.radius as f32)
        };

        let dist = from.dist(point);
        if dist <= self.fast_motion {
            self.raster.fill_capsule(from, point, radius, color);
            return;
        }

        // A fast hand covers many pixels between two camera frames. Walk the gap in short
        // steps so the stroke stays solid.
        let steps = (dist / self.spacing).ceil() as usize;
        let mut prev = from;
        for i in 1..=steps {
            let next = lerp(from..=point, i as f32 / steps as f32);
            self.raster.fill_capsule(prev, next, radius, color);
            prev = next;
        }
    }

    pub fn end_stroke(&mut self) {
        self.anchor = None;
    }

    /// Resets every pixel to the background and closes the open stroke.
    pub fn clear(&mut self) {
        self.raster.fill(self.background);
        self.anchor = None;
    }

    /// Read-only view of the current pixels.
    pub fn export(&self) -> &Raster {
        &self.raster
    }
}
