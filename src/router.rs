//! Decides what a classified frame means: a stroke step, a hover over a control, or nothing.

use std::time::Duration;

use serde::Deserialize;

use crate::{
    canvas::Canvas,
    gesture::{Classification, Posture},
    math::Vec2f,
    ui::{Action, Layout, PALETTE},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// How long an open palm has to rest on a control before it activates.
    pub dwell_ms: u64,
    /// End the stroke instead of drawing while the fingertip is over the controls.
    pub guard_toolbar: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            dwell_ms: 800,
            guard_toolbar: true,
        }
    }
}

/// Hover state for dwell selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DwellTracker {
    /// Region index currently under the cursor.
    hovered: Option<usize>,
    elapsed: Duration,
    /// Set once the hovered region has fired; cleared when the cursor leaves it.
    fired: bool,
}

impl DwellTracker {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Accounts one frame of hovering over `region`. Returns `true` on the frame the dwell
    /// threshold is reached.
    fn hover(&mut self, region: usize, elapsed: Duration, threshold: Duration) -> bool {
        if self.hovered != Some(region) {
            *self = Self {
                hovered: Some(region),
                ..Self::default()
            };
        } else if !self.fired {
            self.elapsed += elapsed;
        }

        if !self.fired && self.elapsed >= threshold {
            self.fired = true;
            self.elapsed = Duration::ZERO;
            return true;
        }
        false
    }
}

/// What the router did with a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Routed {
    Idle,
    /// A stroke was started or extended at this point.
    Stroke(Vec2f),
    /// The cursor rests on a control. `progress` runs from 0 to 1 until the action fires.
    Hover { region: usize, progress: f32 },
    Fired(Action),
}

pub struct InteractionRouter {
    layout: Layout,
    dwell: DwellTracker,
    threshold: Duration,
    guard_toolbar: bool,
}

impl InteractionRouter {
    pub fn new(layout: Layout, config: &InteractionConfig) -> Self {
        Self {
            layout,
            dwell: DwellTracker::default(),
            threshold: Duration::from_millis(config.dwell_ms),
            guard_toolbar: config.guard_toolbar,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Hovered region and how far its dwell has progressed, in `0.0..=1.0`.
    pub fn dwell_progress(&self) -> Option<(usize, f32)> {
        let region = self.dwell.hovered?;
        let progress = if self.dwell.fired {
            1.0
        } else if self.threshold.is_zero() {
            0.0
        } else {
            (self.dwell.elapsed.as_secs_f32() / self.threshold.as_secs_f32()).min(1.0)
        };
        Some((region, progress))
    }

    /// Applies one classified frame. `elapsed` is the time since the previous frame.
    pub fn route(
        &mut self,
        frame: &Classification,
        elapsed: Duration,
        canvas: &mut Canvas,
    ) -> Routed {
        match (frame.posture, frame.cursor) {
            (Posture::Draw, Some(point)) => {
                self.dwell.reset();
                if self.guard_toolbar && self.layout.in_band(point) {
                    canvas.end_stroke();
                    return Routed::Idle;
                }
                if canvas.is_stroking() {
                    canvas.continue_stroke(point);
                } else {
                    canvas.begin_stroke(point);
                }
                Routed::Stroke(point)
            }
            (Posture::Select, Some(point)) => {
                canvas.end_stroke();
                let Some(region) = self.layout.hit_test(point) else {
                    self.dwell.reset();
                    return Routed::Idle;
                };
                if self.dwell.hover(region, elapsed, self.threshold) {
                    let action = self.layout.regions()[region].action;
                    apply(action, canvas);
                    return Routed::Fired(action);
                }
                let (_, progress) = self.dwell_progress().unwrap_or((region, 0.0));
                Routed::Hover { region, progress }
            }
            _ => {
                canvas.end_stroke();
                self.dwell.reset();
                Routed::Idle
            }
        }
    }
}

fn apply(action: Action, canvas: &mut Canvas) {
    let tool = canvas.tool();
    match action {
        Action::SelectColor(i) => {
            let Some(swatch) = PALETTE.get(i) else {
                log::warn!("ignoring selection of nonexistent swatch {i}");
                return;
            };
            log::info!("selected color {}", swatch.name);
            canvas.set_tool(swatch.color, tool.radius as i32, false);
        }
        Action::ToggleEraser => {
            log::info!("eraser {}", if tool.eraser { "off" } else { "on" });
            canvas.set_tool(tool.color, tool.radius as i32, !tool.eraser);
        }
        Action::ClearCanvas => {
            log::info!("clearing canvas");
            canvas.clear();
        }
    }
}
