// animation.rs — 过渡动画 (CSS transition 的等价实现)
//
// Style writes are buffered and committed on the next `step`, the same way a
// browser batches style changes until the next recalc: whatever transition is
// current at commit time drives every property changed since the last frame.

use std::time::Duration;

/// Timing function of a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    /// CSS `ease`, i.e. `cubic-bezier(0.25, 0.1, 0.25, 1)`.
    Ease,
    CubicBezier(f32, f32, f32, f32),
}

impl Easing {
    /// Map linear progress `t` in [0, 1] to eased progress.
    pub fn sample(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::Ease => cubic_bezier(0.25, 0.1, 0.25, 1.0, t),
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier(x1, y1, x2, y2, t),
        }
    }
}

fn bezier_axis(p1: f32, p2: f32, s: f32) -> f32 {
    // 端点固定为 0 和 1
    let inv = 1.0 - s;
    3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
}

fn bezier_axis_slope(p1: f32, p2: f32, s: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * p1 + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, x: f32) -> f32 {
    if x <= 0.0 || x >= 1.0 {
        return x;
    }

    // Newton first, bisection when the slope flattens out.
    let mut s = x;
    for _ in 0..8 {
        let err = bezier_axis(x1, x2, s) - x;
        if err.abs() < 1e-5 {
            return bezier_axis(y1, y2, s);
        }
        let slope = bezier_axis_slope(x1, x2, s);
        if slope.abs() < 1e-6 {
            break;
        }
        s -= err / slope;
    }

    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    s = x;
    for _ in 0..32 {
        let v = bezier_axis(x1, x2, s);
        if (v - x).abs() < 1e-5 {
            break;
        }
        if v < x {
            lo = s;
        } else {
            hi = s;
        }
        s = 0.5 * (lo + hi);
    }
    bezier_axis(y1, y2, s)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub duration: Duration,
    pub easing: Easing,
}

impl Timing {
    pub const fn new(duration: Duration, easing: Easing) -> Self {
        Self { duration, easing }
    }
}

/// Which properties animate, and after what delay. A property without a
/// timing snaps to its new value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transition {
    pub transform: Option<Timing>,
    pub opacity: Option<Timing>,
    pub delay: Duration,
}

impl Transition {
    /// `transition: all <timing>`
    pub fn all(timing: Timing) -> Self {
        Self {
            transform: Some(timing),
            opacity: Some(timing),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub trait Lerp: Copy {
    fn lerp(self, other: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

/// A value that eases from where it is toward its latest target.
#[derive(Debug, Clone, Copy)]
pub struct Animated<T: Lerp> {
    from: T,
    to: T,
    pending: Option<T>,
    timing: Option<Timing>,
    delay: Duration,
    elapsed: Duration,
}

impl<T: Lerp + PartialEq> Animated<T> {
    pub fn new(value: T) -> Self {
        Self {
            from: value,
            to: value,
            pending: None,
            timing: None,
            delay: Duration::ZERO,
            elapsed: Duration::ZERO,
        }
    }

    /// Latest written value, committed or not.
    pub fn target(&self) -> T {
        self.pending.unwrap_or(self.to)
    }

    pub fn set(&mut self, value: T) {
        self.pending = Some(value);
    }

    /// Displayed value at this moment.
    pub fn current(&self) -> T {
        let Some(timing) = self.timing else {
            return self.to;
        };
        if self.elapsed < self.delay {
            return self.from;
        }
        let run = self.elapsed - self.delay;
        if timing.duration.is_zero() || run >= timing.duration {
            return self.to;
        }
        let t = run.as_secs_f32() / timing.duration.as_secs_f32();
        self.from.lerp(self.to, timing.easing.sample(t))
    }

    /// Commit a pending write under `timing`, then advance by `dt`.
    pub fn step(&mut self, dt: Duration, timing: Option<Timing>, delay: Duration) {
        if let Some(next) = self.pending.take() {
            if next != self.to {
                self.from = self.current();
                self.to = next;
                self.timing = timing;
                self.delay = delay;
                self.elapsed = Duration::ZERO;
            }
        }
        self.elapsed = self.elapsed.saturating_add(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn ease_curves_hit_their_endpoints() {
        for easing in [Easing::Linear, Easing::Ease, Easing::CubicBezier(0.25, 1.0, 0.3, 1.0)] {
            assert_eq!(easing.sample(0.0), 0.0);
            assert_eq!(easing.sample(1.0), 1.0);
        }
    }

    #[test]
    fn ease_out_bezier_runs_ahead_of_linear() {
        let spread = Easing::CubicBezier(0.25, 1.0, 0.3, 1.0);
        assert!(spread.sample(0.3) > 0.6);
        let mid = Easing::Ease.sample(0.5);
        assert!((mid - 0.8024).abs() < 0.01, "ease(0.5) = {mid}");
    }

    #[test]
    fn write_without_timing_snaps_on_commit() {
        let mut v = Animated::new(0.0f32);
        v.set(1.0);
        assert_eq!(v.current(), 0.0);
        v.step(Duration::ZERO, None, Duration::ZERO);
        assert_eq!(v.current(), 1.0);
    }

    #[test]
    fn delayed_transition_holds_then_runs() {
        let mut v = Animated::new(0.0f32);
        v.set(10.0);
        let linear = Timing::new(ms(1000), Easing::Linear);
        v.step(Duration::ZERO, Some(linear), ms(500));

        v.step(ms(400), None, Duration::ZERO);
        assert_eq!(v.current(), 0.0);

        v.step(ms(600), None, Duration::ZERO);
        assert!((v.current() - 5.0).abs() < 1e-4);

        v.step(ms(600), None, Duration::ZERO);
        assert_eq!(v.current(), 10.0);
        assert_eq!(v.target(), 10.0);
    }

    #[test]
    fn retarget_starts_from_the_displayed_value() {
        let linear = Timing::new(ms(1000), Easing::Linear);
        let mut v = Animated::new(0.0f32);
        v.set(10.0);
        v.step(ms(500), Some(linear), Duration::ZERO);
        v.set(0.0);
        v.step(Duration::ZERO, Some(linear), Duration::ZERO);
        assert!((v.current() - 5.0).abs() < 1e-4);
    }
}
