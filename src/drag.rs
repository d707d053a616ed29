// drag.rs — 指针拖拽与惯性衰减
//
// Idle -> Dragging -> Decaying -> Idle. A pointer-down from any state starts
// a fresh session; the caller cancels the returned decay timer.

use std::time::Duration;

use glam::Vec2;

use crate::scheduler::TimerId;
use crate::state::CarouselState;

/// Degrees of rotation per pixel of pointer travel.
pub const DRAG_SENSITIVITY: f32 = 0.1;
/// Velocity kept per decay tick.
pub const DECAY_FACTOR: f32 = 0.95;
/// Decay stops once both velocity components drop below this.
pub const CONVERGENCE_THRESHOLD: f32 = 0.5;
pub const DECAY_INTERVAL: Duration = Duration::from_millis(17);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging,
    Decaying,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub last: Vec2,
    pub velocity: Vec2,
    pub active: bool,
    decay_timer: Option<TimerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayStep {
    Coasting,
    /// At rest; the interval to cancel, if one was attached.
    Converged(Option<TimerId>),
}

#[derive(Debug, Clone, Default)]
pub struct DragController {
    session: Option<DragSession>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DragPhase {
        match self.session {
            None => DragPhase::Idle,
            Some(s) if s.active => DragPhase::Dragging,
            Some(_) => DragPhase::Decaying,
        }
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Start a session at `pos`. Returns the decay timer it preempts.
    pub fn pointer_down(&mut self, pos: Vec2) -> Option<TimerId> {
        let preempted = self.session.take().and_then(|s| s.decay_timer);
        self.session = Some(DragSession {
            last: pos,
            velocity: Vec2::ZERO,
            active: true,
            decay_timer: None,
        });
        preempted
    }

    /// Turn pointer travel into rotation. Returns `true` when the angles moved
    /// and the transform needs re-applying.
    pub fn pointer_move(&mut self, pos: Vec2, state: &mut CarouselState) -> bool {
        let Some(session) = self.session.as_mut().filter(|s| s.active) else {
            return false;
        };
        let delta = pos - session.last;
        state.yaw += delta.x * DRAG_SENSITIVITY;
        state.tilt += delta.y * DRAG_SENSITIVITY;
        session.velocity = delta;
        session.last = pos;
        true
    }

    /// Release. Returns `true` when a decay loop should be scheduled.
    pub fn pointer_up(&mut self) -> bool {
        match self.session.as_mut() {
            Some(s) if s.active => {
                s.active = false;
                true
            }
            _ => false,
        }
    }

    /// Remember the interval driving the decay.
    pub fn attach_decay_timer(&mut self, id: TimerId) {
        if let Some(s) = self.session.as_mut() {
            s.decay_timer = Some(id);
        }
    }

    /// One inertia tick: damp, advance, test for rest.
    pub fn decay_tick(&mut self, state: &mut CarouselState) -> Option<DecayStep> {
        let session = self.session.as_mut().filter(|s| !s.active)?;
        session.velocity *= DECAY_FACTOR;
        state.yaw += session.velocity.x * DRAG_SENSITIVITY;
        state.tilt += session.velocity.y * DRAG_SENSITIVITY;

        if is_at_rest(session.velocity) {
            let timer = session.decay_timer;
            self.session = None;
            return Some(DecayStep::Converged(timer));
        }
        Some(DecayStep::Coasting)
    }
}

pub fn is_at_rest(velocity: Vec2) -> bool {
    velocity.x.abs() < CONVERGENCE_THRESHOLD && velocity.y.abs() < CONVERGENCE_THRESHOLD
}

/// Ticks needed for a release velocity to come to rest.
pub fn ticks_to_rest(mut velocity: Vec2) -> usize {
    if !velocity.is_finite() {
        return 0;
    }
    let mut ticks = 0;
    loop {
        velocity *= DECAY_FACTOR;
        ticks += 1;
        if is_at_rest(velocity) {
            return ticks;
        }
    }
}
