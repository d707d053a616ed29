// reveal.rs — 开场揭幕：礼物打开 → 封面淡出 → 展开 → 文字发光 → 自动旋转
//
// Each phase schedules the next on the engine's timer queue. Scheduled steps
// always run; nothing cancels a reveal once it has begun.

use std::time::Duration;

use crate::animation::{Easing, Timing, Transition};
use crate::engine::{CarouselEngine, EngineEvent, Effects, Task};
use crate::item::{ImageEffects, ItemTransform, RingItem, RingVisual};
use crate::layout;
use crate::particles::BurstOptions;
use crate::scene::Class;

/// Lid animation length before the cover starts fading.
pub const OPENING_DELAY: Duration = Duration::from_millis(1100);
/// Collapsed items wait this long before spreading.
pub const SPREAD_DELAY: Duration = Duration::from_millis(800);
/// From the start of spreading until the cover leaves layout.
pub const COVER_HIDE_DELAY: Duration = Duration::from_millis(2200);
/// From the spread until the caption glows and the ring spins.
pub const SETTLE_DELAY: Duration = Duration::from_millis(3000);

pub const INITIAL_TILT: f32 = 12.0;

pub const SPREAD_TRANSITION: Transition = Transition {
    transform: Some(Timing::new(
        Duration::from_millis(2600),
        Easing::CubicBezier(0.25, 1.0, 0.3, 1.0),
    )),
    opacity: Some(Timing::new(Duration::from_secs(2), Easing::Ease)),
    delay: Duration::ZERO,
};

/// `transition: all 1.2s ease` on decorated photos.
pub const EFFECTS_TIMING: Timing = Timing::new(Duration::from_millis(1200), Easing::Ease);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RevealPhase {
    Covered,
    Opening,
    Spreading,
    Glowing,
    Spinning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStep {
    BeginSpreading,
    SpreadItems,
    HideCover,
    Settle,
}

#[derive(Debug, Clone)]
pub struct RevealOrchestrator {
    phase: RevealPhase,
}

impl RevealOrchestrator {
    pub fn new() -> Self {
        Self {
            phase: RevealPhase::Covered,
        }
    }

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    /// Phases only move forward.
    fn enter(&mut self, next: RevealPhase) -> bool {
        if next <= self.phase {
            log::debug!("reveal already past {:?}, staying in {:?}", next, self.phase);
            return false;
        }
        log::info!("reveal: {:?} -> {:?}", self.phase, next);
        self.phase = next;
        true
    }
}

impl Default for RevealOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Effects> CarouselEngine<E> {
    fn enter_phase(&mut self, phase: RevealPhase) {
        if self.reveal.enter(phase) {
            self.record(EngineEvent::PhaseEntered(phase));
        }
    }

    /// The gift was clicked.
    ///
    /// Call at most once per session. The trigger stops accepting pointer
    /// input here, which is the only thing keeping a second activation out;
    /// a second call would schedule a second, overlapping set of phases.
    pub fn activate_reveal(&mut self) {
        self.enter_phase(RevealPhase::Opening);

        if let Some(trigger) = self.scene.trigger.as_mut() {
            trigger.interactive = false;
            trigger.add_class(Class::Open);
        }

        self.effects.burst(BurstOptions::GIFT);
        self.record(EngineEvent::BurstFired);
        self.play_music();

        self.scheduler
            .set_timeout(OPENING_DELAY, Task::Reveal(RevealStep::BeginSpreading));
    }

    pub(crate) fn run_reveal_step(&mut self, step: RevealStep) {
        match step {
            RevealStep::BeginSpreading => {
                if let Some(cover) = self.scene.cover.as_mut() {
                    cover.add_class(Class::FadeOut);
                }
                self.begin_spreading();
            }
            RevealStep::SpreadItems => self.spread_items(),
            RevealStep::HideCover => {
                if let Some(cover) = self.scene.cover.as_mut() {
                    cover.removed = true;
                    self.record(EngineEvent::CoverHidden);
                }
                log::info!("reveal complete");
            }
            RevealStep::Settle => self.settle(),
        }
    }

    /// Show the container at the opening tilt with every item folded away.
    pub(crate) fn begin_spreading(&mut self) {
        self.enter_phase(RevealPhase::Spreading);

        if let Some(drag) = self.scene.drag.as_mut() {
            drag.remove_class(Class::Hidden);
        }

        self.state.yaw = 0.0;
        self.state.tilt = INITIAL_TILT;
        self.apply_transform();

        for item in &mut self.scene.items {
            let visual = item.as_ring_visual();
            visual.apply_transform(ItemTransform::COLLAPSED);
            visual.set_opacity(0.0);
        }
        self.record(EngineEvent::ItemsCollapsed);
        self.scheduler
            .set_timeout(SPREAD_DELAY, Task::Reveal(RevealStep::SpreadItems));

        self.restore_image_effects();
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.start();
        }

        self.scheduler
            .set_timeout(COVER_HIDE_DELAY, Task::Reveal(RevealStep::HideCover));
    }

    fn restore_image_effects(&mut self) {
        for item in &mut self.scene.items {
            if let RingItem::Image(img) = item {
                img.effects = Some(ImageEffects::default());
                img.set_transition(Transition::all(EFFECTS_TIMING));
            }
        }
    }

    fn spread_items(&mut self) {
        if let Some(drag) = self.scene.drag.as_mut() {
            drag.add_class(Class::RevealZoom);
        }

        let count = layout::layout(&mut self.scene.items, self.state.radius, None);
        for item in &mut self.scene.items {
            let visual = item.as_ring_visual();
            visual.set_transition(SPREAD_TRANSITION);
            visual.set_opacity(1.0);
        }
        self.record(EngineEvent::ItemsSpread(count));

        self.scheduler
            .set_timeout(SETTLE_DELAY, Task::Reveal(RevealStep::Settle));
    }

    fn settle(&mut self) {
        self.enter_phase(RevealPhase::Glowing);
        match self.scene.caption.as_mut() {
            Some(caption) => {
                caption.add_class(Class::Glow);
                self.record(EngineEvent::CaptionGlow);
            }
            None => log::debug!("no caption to glow"),
        }

        self.enter_phase(RevealPhase::Spinning);
        self.spin.start(&mut self.state, self.scene.spin.as_mut());
        if self.spin.is_running() {
            self.record(EngineEvent::SpinStarted);
        }
    }
}
