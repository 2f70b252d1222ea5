//! Per-frame glue between the hand tracker, the controls and the canvas.

use std::{fmt, time::Duration};

use crate::{
    canvas::Canvas,
    cmd::{Cmd, HostAction},
    compose::Overlay,
    config::Config,
    gesture::{Classification, GestureClassifier, Posture},
    landmarks::{Hand, LandmarkSource},
    math::vec2,
    router::{InteractionRouter, Routed},
    ui::Layout,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Drawing,
    Selecting,
    /// A hand is visible but not making a recognized posture.
    HandDetected,
    NoHand,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Drawing => "DRAWING",
            Status::Selecting => "SELECTION MODE",
            Status::HandDetected => "HAND DETECTED",
            Status::NoHand => "NO HAND DETECTED",
        })
    }
}

/// Outcome of the most recent [`PaintController::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub classification: Classification,
    pub routed: Routed,
    pub status: Status,
}

pub struct PaintController {
    classifier: GestureClassifier,
    router: InteractionRouter,
    canvas: Canvas,
    eraser_scale: f32,
    report: FrameReport,
    last_hand: Option<Hand>,
    webcam_visible: bool,
}

impl PaintController {
    pub fn new(config: &Config) -> Self {
        let canvas = Canvas::new(&config.canvas);
        let layout = if config.regions.is_empty() {
            Layout::toolbar(config.canvas.width, &config.toolbar)
        } else {
            Layout::new(config.regions.clone())
        };
        log::debug!("{} interactive regions", layout.regions().len());

        let frame_size = vec2(config.canvas.width as f32, config.canvas.height as f32);
        Self {
            classifier: GestureClassifier::new(
                config.gesture.clone(),
                &config.smoothing,
                frame_size,
            ),
            router: InteractionRouter::new(layout, &config.interaction),
            canvas,
            eraser_scale: config.canvas.eraser_scale,
            report: FrameReport {
                classification: Classification::NO_HAND,
                routed: Routed::Idle,
                status: Status::NoHand,
            },
            last_hand: None,
            webcam_visible: true,
        }
    }

    /// Processes one frame of tracking data. `elapsed` is the time since the previous frame.
    pub fn step(&mut self, hand: Option<Hand>, elapsed: Duration) -> &FrameReport {
        let classification = self.classifier.classify(hand.as_ref(), elapsed);
        let routed = self.router.route(&classification, elapsed, &mut self.canvas);

        let status = match classification.posture {
            Posture::Draw => Status::Drawing,
            Posture::Select => Status::Selecting,
            Posture::None if hand.as_ref().is_some_and(Hand::is_finite) => Status::HandDetected,
            Posture::None => Status::NoHand,
        };
        if status != self.report.status {
            log::debug!("{} -> {status}", self.report.status);
        }

        self.last_hand = hand;
        self.report = FrameReport {
            classification,
            routed,
            status,
        };
        &self.report
    }

    /// Pulls the next frame from `source` and steps.
    pub fn pump(&mut self, source: &mut impl LandmarkSource, elapsed: Duration) -> &FrameReport {
        let hand = source.next_hand();
        self.step(hand, elapsed)
    }

    /// Applies a keyboard command. Commands that need the host are handed back.
    pub fn handle(&mut self, cmd: Cmd) -> Option<HostAction> {
        let tool = self.canvas.tool();
        match cmd {
            Cmd::BrushUp | Cmd::BrushDown => {
                let delta = if cmd == Cmd::BrushUp { 1 } else { -1 };
                self.canvas
                    .set_tool(tool.color, tool.radius as i32 + delta, tool.eraser);
                log::info!("brush radius {}", self.canvas.tool().radius);
            }
            Cmd::ToggleWebcam => {
                self.webcam_visible = !self.webcam_visible;
                log::info!(
                    "hand preview {}",
                    if self.webcam_visible { "shown" } else { "hidden" }
                );
            }
            Cmd::Clear => {
                log::info!("clearing canvas");
                self.canvas.clear();
            }
            Cmd::Save => return Some(HostAction::Save),
            Cmd::Quit => return Some(HostAction::Quit),
        }
        None
    }

    pub fn report(&self) -> &FrameReport {
        &self.report
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn dwell_progress(&self) -> Option<(usize, f32)> {
        self.router.dwell_progress()
    }

    pub fn last_hand(&self) -> Option<&Hand> {
        self.last_hand.as_ref()
    }

    pub fn webcam_visible(&self) -> bool {
        self.webcam_visible
    }

    /// Overlay for the compositor, reflecting the last frame.
    pub fn overlay(&self) -> Overlay<'_> {
        let tool = self.canvas.tool();
        let brush_radius = if tool.eraser {
            tool.radius as f32 * self.eraser_scale
        } else {
            tool.radius as f32
        };
        Overlay {
            layout: self.router.layout(),
            tool,
            brush_radius,
            posture: self.report.classification.posture,
            cursor: self.report.classification.cursor,
            dwell: self.dwell_progress(),
            preview: self.last_hand().filter(|_| self.webcam_visible),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        canvas::{Rgb, MAX_RADIUS, MIN_RADIUS},
        landmarks::{synthetic_hand, HandShape, ScriptedSource},
        math::Vec2f,
        smoothing::FilterKind,
        ui::{Action, PALETTE},
    };

    const FRAME: Duration = Duration::from_millis(100);

    fn controller() -> PaintController {
        let mut config = Config::default();
        config.smoothing.filter = FilterKind::None;
        PaintController::new(&config)
    }

    /// Hand whose index fingertip sits at canvas pixel `p` on the default 1000x700 canvas.
    fn hand(shape: HandShape, p: Vec2f) -> Option<Hand> {
        Some(synthetic_hand(shape.fingers(), vec2(p.x() / 1000.0, p.y() / 700.0)))
    }

    #[test]
    fn status_labels() {
        let mut ctl = controller();
        assert_eq!(ctl.report().status.to_string(), "NO HAND DETECTED");

        let p = vec2(300.0, 300.0);
        let cases = [
            (hand(HandShape::Pointing, p), "DRAWING"),
            (hand(HandShape::OpenPalm, p), "SELECTION MODE"),
            (hand(HandShape::Fist, p), "HAND DETECTED"),
            (None, "NO HAND DETECTED"),
        ];
        for (hand, label) in cases {
            assert_eq!(ctl.step(hand, FRAME).status.to_string(), label);
        }
    }

    #[test]
    fn scripted_session() {
        let mut ctl = controller();
        ctl.handle(Cmd::BrushUp);
        assert_eq!(ctl.canvas().tool().radius, 5);

        let mut frames = vec![
            hand(HandShape::Pointing, vec2(100.0, 200.0)),
            hand(HandShape::Pointing, vec2(110.0, 200.0)),
            None,
            None,
        ];
        // Rest on the red swatch long enough to fire.
        frames.extend((0..9).map(|_| hand(HandShape::OpenPalm, vec2(80.0, 40.0))));
        let mut source = ScriptedSource::new(frames);

        let mut fired = Vec::new();
        while source.remaining() > 0 {
            if let Routed::Fired(action) = ctl.pump(&mut source, FRAME).routed {
                fired.push(action);
            }
        }

        assert_eq!(fired, [Action::SelectColor(0)]);
        let raster = ctl.canvas().export();
        for x in 96..=114 {
            assert_eq!(raster.pixel(x, 200), Some(Rgb::BLACK), "x={x}");
        }
        assert_eq!(ctl.canvas().tool().color, PALETTE[0].color);
        assert!(!ctl.canvas().tool().eraser);
        assert_eq!(ctl.dwell_progress(), Some((0, 1.0)));
    }

    #[test]
    fn brush_commands_clamp() {
        let mut ctl = controller();
        for _ in 0..100 {
            assert_eq!(ctl.handle(Cmd::BrushUp), None);
        }
        assert_eq!(ctl.canvas().tool().radius, MAX_RADIUS);
        for _ in 0..100 {
            ctl.handle(Cmd::BrushDown);
        }
        assert_eq!(ctl.canvas().tool().radius, MIN_RADIUS);
    }

    #[test]
    fn host_commands() {
        let mut ctl = controller();
        ctl.step(hand(HandShape::Pointing, vec2(300.0, 300.0)), FRAME);
        ctl.step(hand(HandShape::Pointing, vec2(350.0, 300.0)), FRAME);
        assert_eq!(ctl.handle(Cmd::Clear), None);
        assert_eq!(ctl.canvas().export().pixel(320, 300), Some(Rgb::WHITE));

        assert_eq!(ctl.handle(Cmd::Save), Some(HostAction::Save));
        assert_eq!(ctl.handle(Cmd::Quit), Some(HostAction::Quit));
    }

    #[test]
    fn overlay_follows_state() {
        let mut ctl = controller();
        ctl.step(hand(HandShape::Pointing, vec2(300.0, 300.0)), FRAME);

        let overlay = ctl.overlay();
        assert_eq!(overlay.posture, Posture::Draw);
        let cursor = overlay.cursor.unwrap();
        assert!(cursor.dist(vec2(300.0, 300.0)) < 1.0, "{cursor:?}");
        assert!(overlay.preview.is_some());
        assert_eq!(overlay.brush_radius, 4.0);

        ctl.handle(Cmd::ToggleWebcam);
        assert!(!ctl.webcam_visible());
        assert!(ctl.overlay().preview.is_none());
        assert!(ctl.last_hand().is_some());

        ctl.step(None, FRAME);
        assert!(ctl.last_hand().is_none());
    }
}
