//! Cursor smoothing.
//!
//! Fingertip positions straight from the landmark detector jitter by a few pixels even when the
//! hand is held still. The classifier runs every cursor sample through one of these filters.

use std::{collections::VecDeque, f32::consts::PI, time::Duration};

use serde::Deserialize;

use crate::math::{lerp, Vec2f};

/// A stateful 2-D point filter.
///
/// Every filter returns the first sample after construction or [`CursorFilter::reset`]
/// unchanged.
pub trait CursorFilter {
    fn apply(&mut self, point: Vec2f, elapsed: Duration) -> Vec2f;

    fn reset(&mut self);

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    None,
    Exponential,
    MovingAverage,
    OneEuro,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub filter: FilterKind,
    /// Weight of the newest sample for the exponential filter, in (0, 1].
    pub alpha: f32,
    /// Number of samples averaged by the moving average filter.
    pub window: usize,
    pub min_cutoff: f32,
    pub beta: f32,
    pub d_cutoff: f32,
    /// Jumps longer than this (in pixels) are treated as tracking glitches.
    pub max_jump: Option<f32>,
    /// Movements shorter than this (in pixels) are ignored.
    pub dead_zone: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            filter: FilterKind::Exponential,
            alpha: 0.45,
            window: 4,
            min_cutoff: 1.0,
            beta: 0.007,
            d_cutoff: 1.0,
            max_jump: None,
            dead_zone: 0.0,
        }
    }
}

/// Builds the filter chain described by `config`.
pub fn create_filter(config: &SmoothingConfig) -> Box<dyn CursorFilter> {
    let filter: Box<dyn CursorFilter> = match config.filter {
        FilterKind::None => Box::new(NoFilter),
        FilterKind::Exponential => Box::new(ExponentialFilter::new(config.alpha)),
        FilterKind::MovingAverage => Box::new(MovingAverageFilter::new(config.window)),
        FilterKind::OneEuro => Box::new(OneEuroFilter::new(
            config.min_cutoff,
            config.beta,
            config.d_cutoff,
        )),
    };
    if config.max_jump.is_none() && config.dead_zone <= 0.0 {
        return filter;
    }
    let guard = OutlierGuard::new(config.max_jump.unwrap_or(f32::INFINITY), config.dead_zone);
    Box::new(Guarded { guard, filter })
}

pub struct NoFilter;

impl CursorFilter for NoFilter {
    fn apply(&mut self, point: Vec2f, _elapsed: Duration) -> Vec2f {
        point
    }

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "none"
    }
}

pub struct ExponentialFilter {
    alpha: f32,
    last: Option<Vec2f>,
}

impl ExponentialFilter {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(f32::EPSILON, 1.0),
            last: None,
        }
    }
}

impl CursorFilter for ExponentialFilter {
    fn apply(&mut self, point: Vec2f, _elapsed: Duration) -> Vec2f {
        let out = match self.last {
            Some(last) => lerp(last..=point, self.alpha),
            None => point,
        };
        self.last = Some(out);
        out
    }

    fn reset(&mut self) {
        self.last = None;
    }

    fn name(&self) -> &'static str {
        "exponential"
    }
}

pub struct MovingAverageFilter {
    window: usize,
    samples: VecDeque<Vec2f>,
}

impl MovingAverageFilter {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
        }
    }
}

impl CursorFilter for MovingAverageFilter {
    fn apply(&mut self, point: Vec2f, _elapsed: Duration) -> Vec2f {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(point);

        let mut sum = self.samples[0];
        for &p in self.samples.iter().skip(1) {
            sum += p;
        }
        sum / self.samples.len() as f32
    }

    fn reset(&mut self) {
        self.samples.clear();
    }

    fn name(&self) -> &'static str {
        "moving_average"
    }
}

/// One Euro filter: heavy smoothing while the finger rests, little lag while it moves fast.
pub struct OneEuroFilter {
    x: OneEuroAxis,
    y: OneEuroAxis,
}

impl OneEuroFilter {
    pub fn new(min_cutoff: f32, beta: f32, d_cutoff: f32) -> Self {
        let axis = OneEuroAxis {
            min_cutoff,
            beta,
            d_cutoff,
            prev: None,
            d_prev: 0.0,
        };
        Self { x: axis, y: axis }
    }
}

impl CursorFilter for OneEuroFilter {
    fn apply(&mut self, point: Vec2f, elapsed: Duration) -> Vec2f {
        let dt = elapsed.as_secs_f32();
        [self.x.filter(point.x(), dt), self.y.filter(point.y(), dt)].into()
    }

    fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
    }

    fn name(&self) -> &'static str {
        "one_euro"
    }
}

#[derive(Clone, Copy)]
struct OneEuroAxis {
    min_cutoff: f32,
    beta: f32,
    d_cutoff: f32,
    prev: Option<f32>,
    d_prev: f32,
}

impl OneEuroAxis {
    fn smoothing_factor(dt: f32, cutoff: f32) -> f32 {
        let r = 2.0 * PI * cutoff * dt;
        r / (r + 1.0)
    }

    fn filter(&mut self, x: f32, dt: f32) -> f32 {
        let Some(prev) = self.prev else {
            self.prev = Some(x);
            self.d_prev = 0.0;
            return x;
        };
        if dt <= 0.0 {
            return prev;
        }

        let a_d = Self::smoothing_factor(dt, self.d_cutoff);
        let dx = (x - prev) / dt;
        let dx_hat = a_d * dx + (1.0 - a_d) * self.d_prev;

        let cutoff = self.min_cutoff + self.beta * dx_hat.abs();
        let a = Self::smoothing_factor(dt, cutoff);
        let x_hat = a * x + (1.0 - a) * prev;

        self.prev = Some(x_hat);
        self.d_prev = dx_hat;
        x_hat
    }

    fn reset(&mut self) {
        self.prev = None;
        self.d_prev = 0.0;
    }
}

/// Rejects implausible single-frame jumps and suppresses micro-tremor.
pub struct OutlierGuard {
    max_jump: f32,
    dead_zone: f32,
    prev: Option<Vec2f>,
    prev_step: f32,
    /// Last rejected position. A jump is accepted once the next sample lands near it.
    rejected: Option<Vec2f>,
}

impl OutlierGuard {
    pub fn new(max_jump: f32, dead_zone: f32) -> Self {
        Self {
            max_jump,
            dead_zone,
            prev: None,
            prev_step: 0.0,
            rejected: None,
        }
    }

    pub fn apply(&mut self, point: Vec2f) -> Vec2f {
        let Some(prev) = self.prev else {
            self.prev = Some(point);
            return point;
        };

        let step = prev.dist(point);
        // A long jump right after slow movement is almost always a misdetection.
        if step > self.max_jump && self.prev_step < self.max_jump * 0.5 {
            let repeated = self
                .rejected
                .is_some_and(|rejected| rejected.dist(point) <= self.max_jump);
            if !repeated {
                log::trace!("rejecting cursor jump of {step:.1}px");
                self.rejected = Some(point);
                return prev;
            }
        }
        self.rejected = None;
        if step < self.dead_zone {
            return prev;
        }

        self.prev_step = step;
        self.prev = Some(point);
        point
    }

    pub fn reset(&mut self) {
        self.prev = None;
        self.prev_step = 0.0;
        self.rejected = None;
    }
}

struct Guarded {
    guard: OutlierGuard,
    filter: Box<dyn CursorFilter>,
}

impl CursorFilter for Guarded {
    fn apply(&mut self, point: Vec2f, elapsed: Duration) -> Vec2f {
        let point = self.guard.apply(point);
        self.filter.apply(point, elapsed)
    }

    fn reset(&mut self) {
        self.guard.reset();
        self.filter.reset();
    }

    fn name(&self) -> &'static str {
        self.filter.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vec2;

    const FRAME: Duration = Duration::from_millis(33);

    #[test]
    fn exponential() {
        let mut filter = ExponentialFilter::new(0.5);
        assert_eq!(filter.apply(vec2(10.0, 20.0), FRAME), vec2(10.0, 20.0));
        assert_eq!(filter.apply(vec2(20.0, 30.0), FRAME), vec2(15.0, 25.0));

        filter.reset();
        assert_eq!(filter.apply(vec2(100.0, 0.0), FRAME), vec2(100.0, 0.0));
    }

    #[test]
    fn moving_average_drops_oldest() {
        let mut filter = MovingAverageFilter::new(3);
        filter.apply(vec2(10.0, 0.0), FRAME);
        filter.apply(vec2(20.0, 0.0), FRAME);
        assert_eq!(filter.apply(vec2(30.0, 0.0), FRAME), vec2(20.0, 0.0));
        assert_eq!(filter.apply(vec2(40.0, 0.0), FRAME), vec2(30.0, 0.0));
    }

    #[test]
    fn one_euro_converges_and_holds_on_zero_dt() {
        let mut filter = OneEuroFilter::new(1.0, 0.007, 1.0);
        assert_eq!(filter.apply(vec2(0.0, 0.0), FRAME), vec2(0.0, 0.0));

        let first = filter.apply(vec2(100.0, 0.0), FRAME);
        assert!(first.x() > 0.0 && first.x() < 100.0);
        assert_eq!(filter.apply(vec2(500.0, 0.0), Duration::ZERO), first);

        let mut last = first;
        for _ in 0..200 {
            last = filter.apply(vec2(100.0, 0.0), FRAME);
        }
        assert!((last.x() - 100.0).abs() < 0.5);
    }

    #[test]
    fn guard_rejects_glitch_and_dead_zone() {
        let mut guard = OutlierGuard::new(80.0, 2.0);
        assert_eq!(guard.apply(vec2(100.0, 100.0)), vec2(100.0, 100.0));
        // Sub-dead-zone tremor is swallowed.
        assert_eq!(guard.apply(vec2(101.0, 100.0)), vec2(100.0, 100.0));
        // Teleporting across the frame after resting is a glitch.
        assert_eq!(guard.apply(vec2(400.0, 100.0)), vec2(100.0, 100.0));
        assert_eq!(guard.apply(vec2(130.0, 100.0)), vec2(130.0, 100.0));
    }

    #[test]
    fn guard_follows_jump_that_holds() {
        let mut guard = OutlierGuard::new(120.0, 0.0);
        guard.apply(vec2(100.0, 100.0));
        assert_eq!(guard.apply(vec2(400.0, 100.0)), vec2(100.0, 100.0));
        // The hand really moved: the next sample confirms the new position.
        for x in [402.0, 404.0, 406.0, 408.0] {
            assert_eq!(guard.apply(vec2(x, 100.0)), vec2(x, 100.0));
        }
    }

    #[test]
    fn factory_wraps_guard() {
        let config = SmoothingConfig {
            filter: FilterKind::None,
            max_jump: Some(50.0),
            ..Default::default()
        };
        let mut filter = create_filter(&config);
        assert_eq!(filter.name(), "none");
        filter.apply(vec2(0.0, 0.0), FRAME);
        assert_eq!(filter.apply(vec2(300.0, 0.0), FRAME), vec2(0.0, 0.0));
    }
}
