//! Time-based easing for smoothed input values.
//!
//! Pointer and touch positions are not consumed raw: every input event
//! retargets a short ease-out tween and the smoothed value is advanced
//! once per frame. This keeps input handling event-driven and decoupled
//! from the render loop.

use cgmath::Vector2;
use instant::{Duration, Instant};

/// Quadratic ease-out: fast at the start, decelerating towards the end.
pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// A duration-bounded interpolation between two 2D values.
///
/// Sampling is pure; the tween never mutates itself. Retargeting is done
/// by constructing a new tween from the currently sampled value.
#[derive(Clone, Debug)]
pub struct Tween {
    from: Vector2<f32>,
    to: Vector2<f32>,
    started: Instant,
    duration: Duration,
}

impl Tween {
    pub fn new(from: Vector2<f32>, to: Vector2<f32>, duration: Duration) -> Self {
        Self {
            from,
            to,
            started: Instant::now(),
            duration,
        }
    }

    pub fn sample(&self, now: Instant) -> Vector2<f32> {
        self.sample_at(now.duration_since(self.started))
    }

    pub fn sample_at(&self, elapsed: Duration) -> Vector2<f32> {
        if self.duration.is_zero() {
            return self.to;
        }
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.from + (self.to - self.from) * ease_out_quad(t)
    }

    pub fn is_done(&self, now: Instant) -> bool {
        now.duration_since(self.started) >= self.duration
    }
}

/// Smoothed 2D cursor position fed by pointer-move and touch-move events.
///
/// Currently read by nothing else in the viewer; kept for future camera
/// reactivity.
#[derive(Debug)]
pub struct PointerState {
    smoothed: Vector2<f32>,
    tween: Option<Tween>,
}

impl Default for PointerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerState {
    pub fn new() -> Self {
        Self {
            smoothed: Vector2::new(0.0, 0.0),
            tween: None,
        }
    }

    /// Called on every pointer/touch event. Restarts the easing from the
    /// current smoothed value so quick successive events stay smooth.
    pub fn retarget(&mut self, target: Vector2<f32>) {
        self.tween = Some(Tween::new(self.smoothed, target, Duration::from_secs(1)));
    }

    /// Advance the smoothed value. Invoked once per frame by the viewer.
    pub fn advance(&mut self, now: Instant) -> Vector2<f32> {
        if let Some(tween) = &self.tween {
            self.smoothed = tween.sample(now);
            if tween.is_done(now) {
                self.tween = None;
            }
        }
        self.smoothed
    }

    pub fn value(&self) -> Vector2<f32> {
        self.smoothed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vector2<f32> {
        Vector2::new(x, y)
    }

    #[test]
    fn reaches_target_at_deadline() {
        let tween = Tween::new(v(0.0, 0.0), v(10.0, -4.0), Duration::from_secs(1));
        let end = tween.sample_at(Duration::from_secs(1));
        assert_eq!(end, v(10.0, -4.0));
        // past the deadline the value stays clamped at the target
        let after = tween.sample_at(Duration::from_secs(3));
        assert_eq!(after, v(10.0, -4.0));
    }

    #[test]
    fn eases_out() {
        let tween = Tween::new(v(0.0, 0.0), v(1.0, 0.0), Duration::from_secs(1));
        let halfway = tween.sample_at(Duration::from_millis(500)).x;
        // ease-out covers more than half the distance in the first half
        assert!(halfway > 0.5);
        // and is monotone
        let mut last = 0.0;
        for ms in (0..=1000).step_by(100) {
            let x = tween.sample_at(Duration::from_millis(ms)).x;
            assert!(x >= last);
            last = x;
        }
    }

    #[test]
    fn zero_duration_jumps_to_target() {
        let tween = Tween::new(v(1.0, 1.0), v(2.0, 2.0), Duration::ZERO);
        assert_eq!(tween.sample_at(Duration::ZERO), v(2.0, 2.0));
    }

    #[test]
    fn retarget_starts_from_current_value() {
        let mut pointer = PointerState::new();
        pointer.retarget(v(100.0, 0.0));
        let now = Instant::now();
        pointer.advance(now + Duration::from_secs(2));
        assert_eq!(pointer.value(), v(100.0, 0.0));
        pointer.retarget(v(0.0, 0.0));
        // before any time passes the smoothed value is unchanged
        assert_eq!(pointer.value(), v(100.0, 0.0));
    }
}
