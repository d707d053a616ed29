// spin.rs — 自动旋转 (无限循环的线性动画，可暂停/继续)

use std::time::Duration;

use crate::scene::{Class, Node};
use crate::state::CarouselState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinDirection {
    /// `spin`: yaw grows.
    Forward,
    /// `spin-revert`: yaw shrinks.
    Reverse,
}

impl SpinDirection {
    pub fn keyframes(self) -> &'static str {
        match self {
            SpinDirection::Forward => "spin",
            SpinDirection::Reverse => "spin-revert",
        }
    }

    fn sign(self) -> f32 {
        match self {
            SpinDirection::Forward => 1.0,
            SpinDirection::Reverse => -1.0,
        }
    }
}

/// `animation: <keyframes> <period> infinite linear`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinAnimation {
    pub direction: SpinDirection,
    pub period: Duration,
}

impl SpinAnimation {
    /// `None` when the speed cannot describe a revolution.
    pub fn from_speed(seconds_per_turn: f32) -> Option<Self> {
        if !seconds_per_turn.is_finite() || seconds_per_turn == 0.0 {
            return None;
        }
        let direction = if seconds_per_turn > 0.0 {
            SpinDirection::Forward
        } else {
            SpinDirection::Reverse
        };
        // 过大溢出 Duration，过小则周期为零
        let period = Duration::try_from_secs_f32(seconds_per_turn.abs())
            .ok()
            .filter(|p| !p.is_zero())?;
        Some(Self { direction, period })
    }

    pub fn css(&self) -> String {
        format!(
            "{} {}s infinite linear",
            self.direction.keyframes(),
            self.period.as_secs_f32()
        )
    }
}

#[derive(Debug, Clone)]
pub struct AutoSpin {
    animation: Option<SpinAnimation>,
    /// Degrees into the current revolution.
    phase: f32,
    running: bool,
}

impl AutoSpin {
    pub fn new(state: &CarouselState) -> Self {
        let animation = if state.auto_rotate {
            SpinAnimation::from_speed(state.rotate_speed)
        } else {
            None
        };
        if state.auto_rotate && animation.is_none() {
            log::warn!("auto-rotate speed {} is unusable, spin disabled", state.rotate_speed);
        }
        Self {
            animation,
            phase: 0.0,
            running: false,
        }
    }

    pub fn animation(&self) -> Option<SpinAnimation> {
        self.animation
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn angle(&self) -> f32 {
        self.phase
    }

    /// Mark the spin container as cycling (once per session) and play.
    pub fn start(&mut self, state: &mut CarouselState, node: Option<&mut Node>) {
        if state.auto_rotate && !state.spin_started {
            if let Some(node) = node {
                node.add_class(Class::AutoSpin);
            }
            state.spin_started = true;
            log::info!("auto-spin started");
        }
        self.resume();
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        self.running = self.animation.is_some();
    }

    pub fn advance(&mut self, dt: Duration) {
        let Some(anim) = self.animation.filter(|_| self.running) else {
            return;
        };
        let turns = dt.as_secs_f32() / anim.period.as_secs_f32();
        self.phase = (self.phase + anim.direction.sign() * 360.0 * turns).rem_euclid(360.0);
    }
}
