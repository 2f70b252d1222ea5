//! Software compositor: paints the canvas plus the interactive overlay into the frame that gets
//! uploaded to the GPU.
//!
//! The overlay (controls, cursor, dwell bar, hand preview) is drawn fresh every frame and never
//! touches the canvas raster, so snapshots only ever contain ink.

use bytemuck::NoUninit;

use crate::{
    canvas::{Raster, Rgb, ToolState},
    gesture::Posture,
    landmarks::{Hand, HAND_SKELETON, LANDMARK_COUNT},
    math::Vec2f,
    ui::{Action, Layout, Rect, PALETTE},
};

const BUTTON: Rgba = Rgba::opaque(200, 200, 200);
const BUTTON_ACTIVE: Rgba = Rgba::opaque(0, 200, 0);
const OUTLINE: Rgba = Rgba::opaque(60, 60, 60);
const LABEL: Rgba = Rgba::opaque(0, 0, 0);
const HIGHLIGHT: Rgba = Rgba::opaque(255, 255, 255);
const DWELL_BAR: Rgba = Rgba::opaque(255, 160, 0);
const DWELL_BAR_HEIGHT: u32 = 4;
const SELECT_CURSOR: Rgba = Rgba::opaque(0, 120, 255);
const CROSSHAIR_SIZE: i32 = 10;
const PREVIEW_SIZE: (u32, u32) = (320, 240);
const PREVIEW_BACKGROUND: Rgba = Rgba::opaque(30, 30, 30);
const PREVIEW_BONE: Rgba = Rgba::opaque(0, 255, 0);
const PREVIEW_JOINT: Rgba = Rgba::opaque(255, 0, 0);
const GLYPH_SCALE: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, NoUninit)]
#[repr(C)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

impl From<Rgb> for Rgba {
    fn from(c: Rgb) -> Self {
        Self::opaque(c.r, c.g, c.b)
    }
}

/// RGBA8 image in the layout expected by the frame texture.
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba::opaque(0, 0, 0); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y * self.width + x) as usize])
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    #[inline]
    fn put_pixel(&mut self, x: i32, y: i32, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        self.pixels[(y as u32 * self.width + x as u32) as usize] = color;
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                self.put_pixel(x, y, color);
            }
        }
    }

    /// Draws a border of the given thickness just inside `rect`.
    fn outline_rect(&mut self, rect: Rect, thickness: u32, color: Rgba) {
        let t = thickness.min(rect.width / 2).min(rect.height / 2);
        let (w, h) = (rect.width, rect.height);
        self.fill_rect(Rect::new(rect.x, rect.y, w, t), color);
        self.fill_rect(Rect::new(rect.x, rect.bottom() - t as i32, w, t), color);
        self.fill_rect(Rect::new(rect.x, rect.y, t, h), color);
        self.fill_rect(Rect::new(rect.right() - t as i32, rect.y, t, h), color);
    }

    /// Bresenham line.
    fn draw_line(&mut self, (mut x0, mut y0): (i32, i32), (x1, y1): (i32, i32), color: Rgba) {
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put_pixel(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Midpoint circle, one pixel wide.
    fn draw_ring(&mut self, (cx, cy): (i32, i32), radius: i32, color: Rgba) {
        let (mut x, mut y, mut err) = (radius, 0, 1 - radius);
        while x >= y {
            for (dx, dy) in [
                (x, y),
                (y, x),
                (-y, x),
                (-x, y),
                (-x, -y),
                (-y, -x),
                (y, -x),
                (x, -y),
            ] {
                self.put_pixel(cx + dx, cy + dy, color);
            }
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }

    /// A "+" with a small gap at the center and a center dot.
    fn draw_crosshair(&mut self, (cx, cy): (i32, i32), size: i32, color: Rgba) {
        self.draw_line((cx - size, cy), (cx - 2, cy), color);
        self.draw_line((cx + 2, cy), (cx + size, cy), color);
        self.draw_line((cx, cy - size), (cx, cy - 2), color);
        self.draw_line((cx, cy + 2), (cx, cy + size), color);
        self.put_pixel(cx, cy, color);
    }

    fn draw_text(&mut self, (x, y): (i32, i32), text: &str, color: Rgba) {
        let mut pen = x;
        for ch in text.chars() {
            if let Some(rows) = glyph(ch) {
                for (row, bits) in rows.into_iter().enumerate() {
                    for col in 0..5 {
                        if bits & (0b10000 >> col) != 0 {
                            let px = pen + col * GLYPH_SCALE;
                            let py = y + row as i32 * GLYPH_SCALE;
                            self.fill_rect(
                                Rect::new(px, py, GLYPH_SCALE as u32, GLYPH_SCALE as u32),
                                color,
                            );
                        }
                    }
                }
            }
            pen += 6 * GLYPH_SCALE;
        }
    }
}

fn text_width(text: &str) -> i32 {
    (text.chars().count() as i32 * 6 - 1) * GLYPH_SCALE
}

/// 5x7 bitmap glyphs for button labels. Each row uses the low 5 bits, leftmost pixel first.
fn glyph(ch: char) -> Option<[u8; 7]> {
    Some(match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        _ => return None,
    })
}

/// Everything drawn on top of the canvas.
pub struct Overlay<'a> {
    pub layout: &'a Layout,
    pub tool: ToolState,
    /// Radius of the ring shown around a drawing cursor. Accounts for the eraser scale.
    pub brush_radius: f32,
    pub posture: Posture,
    pub cursor: Option<Vec2f>,
    /// Hovered region and dwell fraction.
    pub dwell: Option<(usize, f32)>,
    /// Hand to show in the preview inset. `None` hides the inset.
    pub preview: Option<&'a Hand>,
}

pub fn compose(frame: &mut Frame, raster: &Raster, overlay: &Overlay<'_>) {
    if frame.width != raster.width() || frame.height != raster.height() {
        *frame = Frame::new(raster.width(), raster.height());
    }
    for (dst, &src) in frame.pixels.iter_mut().zip(raster.pixels()) {
        *dst = src.into();
    }

    draw_controls(frame, overlay);

    if let Some((region, progress)) = overlay.dwell {
        if let Some(region) = overlay.layout.regions().get(region) {
            let rect = region.rect;
            let filled = (rect.width as f32 * progress.clamp(0.0, 1.0)) as u32;
            let bar = Rect::new(
                rect.x,
                rect.bottom() - DWELL_BAR_HEIGHT as i32,
                filled,
                DWELL_BAR_HEIGHT,
            );
            frame.fill_rect(bar, DWELL_BAR);
        }
    }

    if let Some(hand) = overlay.preview {
        draw_preview(frame, hand);
    }

    if let Some(cursor) = overlay.cursor {
        let center = (cursor.x().round() as i32, cursor.y().round() as i32);
        match overlay.posture {
            Posture::Draw => {
                let ring = if overlay.tool.eraser {
                    OUTLINE
                } else {
                    overlay.tool.color.into()
                };
                frame.draw_ring(center, overlay.brush_radius.round() as i32, ring);
                frame.draw_crosshair(center, CROSSHAIR_SIZE, OUTLINE);
            }
            Posture::Select => frame.draw_crosshair(center, CROSSHAIR_SIZE, SELECT_CURSOR),
            Posture::None => {}
        }
    }
}

fn draw_controls(frame: &mut Frame, overlay: &Overlay<'_>) {
    let tool = overlay.tool;
    for region in overlay.layout.regions() {
        let rect = region.rect;
        match region.action {
            Action::SelectColor(i) => {
                let Some(swatch) = PALETTE.get(i) else {
                    continue;
                };
                frame.fill_rect(rect, swatch.color.into());
                if !tool.eraser && tool.color == swatch.color {
                    frame.outline_rect(rect, 4, OUTLINE);
                    frame.outline_rect(rect, 2, HIGHLIGHT);
                } else {
                    frame.outline_rect(rect, 1, OUTLINE);
                }
            }
            Action::ToggleEraser => {
                let fill = if tool.eraser { BUTTON_ACTIVE } else { BUTTON };
                draw_button(frame, rect, fill, "ERASE");
            }
            Action::ClearCanvas => draw_button(frame, rect, BUTTON, "CLEAR"),
        }
    }
}

fn draw_button(frame: &mut Frame, rect: Rect, fill: Rgba, label: &str) {
    frame.fill_rect(rect, fill);
    frame.outline_rect(rect, 1, OUTLINE);
    let x = rect.x + (rect.width as i32 - text_width(label)) / 2;
    let y = rect.y + (rect.height as i32 - 7 * GLYPH_SCALE) / 2;
    frame.draw_text((x, y), label, LABEL);
}

/// Hand skeleton inset in the bottom-right corner.
fn draw_preview(frame: &mut Frame, hand: &Hand) {
    let width = PREVIEW_SIZE.0.min(frame.width / 2);
    let height = PREVIEW_SIZE.1.min(frame.height / 2);
    if width < 2 || height < 2 {
        return;
    }
    let inset = Rect::new(
        (frame.width - width) as i32,
        (frame.height - height) as i32,
        width,
        height,
    );
    frame.fill_rect(inset, PREVIEW_BACKGROUND);
    frame.outline_rect(inset, 1, OUTLINE);

    let to_inset = |i: usize| {
        let p = hand.joint(i);
        (
            inset.x + (p.x() * (width - 1) as f32).round() as i32,
            inset.y + (p.y() * (height - 1) as f32).round() as i32,
        )
    };
    for (a, b) in HAND_SKELETON {
        frame.draw_line(to_inset(a), to_inset(b), PREVIEW_BONE);
    }
    for i in 0..LANDMARK_COUNT {
        let (x, y) = to_inset(i);
        frame.fill_rect(Rect::new(x - 1, y - 1, 3, 3), PREVIEW_JOINT);
    }
}
