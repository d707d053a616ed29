// engine.rs — 旋转木马引擎：持有全部状态，分发输入与定时任务

use std::path::Path;
use std::time::Duration;

use glam::{Mat4, Vec2};

use crate::config::CarouselConfig;
use crate::drag::{DecayStep, DragController, DragPhase, DECAY_INTERVAL};
use crate::error::{CarouselError, Result};
use crate::layout;
use crate::particles::{AmbientOverlay, BurstOptions};
use crate::reveal::{RevealOrchestrator, RevealPhase, RevealStep};
use crate::scene::{AudioTag, Role, Scene};
use crate::scheduler::{Scheduler, TimerId};
use crate::spin::AutoSpin;
use crate::state::CarouselState;
use crate::transform::{self, ContainerTransform};

/// Collaborators that live outside the engine.
pub trait Effects {
    /// Fire-and-forget confetti.
    fn burst(&mut self, options: BurstOptions);
    /// Start background music. The element is the implementor's to create.
    fn play_audio(&mut self, source: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    DecayTick,
    Reveal(RevealStep),
}

/// Notable things the engine did, stamped with the virtual time.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PhaseEntered(RevealPhase),
    BurstFired,
    AudioStarted,
    AudioRejected,
    ItemsCollapsed,
    ItemsSpread(usize),
    CoverHidden,
    CaptionGlow,
    SpinStarted,
    DecayStarted,
    DecayConverged,
}

pub struct CarouselEngine<E: Effects> {
    pub(crate) config: CarouselConfig,
    pub(crate) state: CarouselState,
    pub(crate) scene: Scene,
    pub(crate) scheduler: Scheduler<Task>,
    pub(crate) drag: DragController,
    pub(crate) spin: AutoSpin,
    pub(crate) reveal: RevealOrchestrator,
    pub(crate) overlay: Option<AmbientOverlay>,
    pub(crate) effects: E,
    viewport: Vec2,
    events: Vec<(Duration, EngineEvent)>,
    started: bool,
}

impl<E: Effects> CarouselEngine<E> {
    pub fn new(config: CarouselConfig, scene: Scene, effects: E) -> Self {
        let state = CarouselState::new(&config, scene.items.len());
        let spin = AutoSpin::new(&state);
        Self {
            config,
            state,
            scene,
            scheduler: Scheduler::new(),
            drag: DragController::new(),
            spin,
            reveal: RevealOrchestrator::new(),
            overlay: None,
            effects,
            viewport: Vec2::ZERO,
            events: Vec::new(),
            started: false,
        }
    }

    /// Scene built from the configured items, caption and gift flag.
    pub fn from_config(config: CarouselConfig, effects: E) -> Self {
        let scene = Scene::new(config.ring_items())
            .with_gift(config.gift)
            .with_caption(config.caption.clone());
        Self::new(config, scene, effects)
    }

    /// Size the scene, lay the ring out, and either wait behind the cover or
    /// go straight to spreading.
    pub fn start(&mut self, viewport: Vec2) {
        if self.started {
            log::warn!("carousel already started");
            return;
        }
        self.started = true;
        self.viewport = viewport;

        for role in [Role::DragContainer, Role::SpinContainer, Role::Ground] {
            if self.scene.node(role).is_none() {
                log::warn!("{}", CarouselError::MissingElement(role));
            }
        }
        if self.scene.cover.is_some() != self.scene.trigger.is_some() {
            let role = if self.scene.cover.is_none() {
                Role::Cover
            } else {
                Role::RevealTrigger
            };
            log::warn!("{}; skipping the gift", CarouselError::MissingElement(role));
        }

        let item_box = Vec2::new(self.config.item_width, self.config.item_height);
        if let Some(spin) = self.scene.node_mut(Role::SpinContainer) {
            spin.size = Some(item_box);
        }
        self.size_ground();

        if let Some(canvas) = self.scene.canvas.as_mut() {
            canvas.size = Some(viewport);
            self.overlay = Some(AmbientOverlay::new(viewport));
        }

        self.mount_audio();
        if let Some(anim) = self.spin.animation() {
            log::debug!("auto-spin configured: {}", anim.css());
        }

        layout::layout(&mut self.scene.items, self.state.radius, None);
        self.apply_transform();

        if self.scene.has_reveal() {
            log::info!("waiting for the gift to be opened");
        } else {
            self.begin_spreading();
        }
    }

    fn mount_audio(&mut self) {
        let Some(source) = self.config.music_path() else {
            return;
        };
        if self.scene.audio_mount.is_none() {
            log::debug!("no audio mount, music element not placed");
            return;
        }
        self.scene.audio = Some(AudioTag {
            source,
            controls: self.config.music_controls,
            looping: true,
        });
    }

    fn size_ground(&mut self) {
        let extent = self.state.ground_extent();
        if let Some(ground) = self.scene.node_mut(Role::Ground) {
            ground.size = Some(Vec2::splat(extent));
        }
    }

    /// Clamp tilt and push the composed rotation to the spin container.
    pub fn apply_transform(&mut self) -> bool {
        transform::apply_transform(&mut self.state, self.scene.motion_target())
    }

    pub(crate) fn record(&mut self, event: EngineEvent) {
        self.events.push((self.scheduler.now(), event));
    }

    pub(crate) fn play_music(&mut self) {
        let Some(source) = self.config.music_path() else {
            return;
        };
        match self.effects.play_audio(&source) {
            Ok(()) => {
                log::info!("music started");
                self.record(EngineEvent::AudioStarted);
            }
            Err(e) => {
                log::warn!("music blocked: {}", e);
                self.record(EngineEvent::AudioRejected);
            }
        }
    }

    // --- 指针输入 ---

    pub fn pointer_down(&mut self, pos: Vec2) {
        if self.scene.drag.is_none() {
            return;
        }
        if let Some(timer) = self.drag.pointer_down(pos) {
            self.scheduler.clear(timer);
        }
    }

    pub fn pointer_move(&mut self, pos: Vec2) {
        if self.drag.pointer_move(pos, &mut self.state) {
            self.apply_transform();
        }
    }

    pub fn pointer_up(&mut self) {
        if !self.drag.pointer_up() {
            return;
        }
        let timer = self.scheduler.set_interval(DECAY_INTERVAL, Task::DecayTick);
        self.drag.attach_decay_timer(timer);
        self.spin.pause();
        self.record(EngineEvent::DecayStarted);
    }

    fn on_decay_tick(&mut self, timer: TimerId) {
        let Some(step) = self.drag.decay_tick(&mut self.state) else {
            // 会话已被新的按下替换
            self.scheduler.clear(timer);
            return;
        };
        self.apply_transform();
        self.spin.pause();

        if let DecayStep::Converged(attached) = step {
            self.scheduler.clear(attached.unwrap_or(timer));
            if self.state.spin_started {
                self.spin.resume();
            }
            self.record(EngineEvent::DecayConverged);
        }
    }

    /// Mouse wheel: grow or shrink the ring, then reflow at once.
    pub fn wheel(&mut self, wheel_delta: f32) {
        let radius = self.state.zoom(wheel_delta);
        log::trace!("radius {:.1}", radius);
        layout::layout(&mut self.scene.items, radius, Some(Duration::ZERO));
    }

    pub fn resize(&mut self, viewport: Vec2) {
        self.viewport = viewport;
        if let Some(canvas) = self.scene.canvas.as_mut() {
            canvas.size = Some(viewport);
        }
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.resize(viewport);
        }
        self.size_ground();
        layout::layout(&mut self.scene.items, self.state.radius, None);
        self.apply_transform();
    }

    /// The celebrate button.
    pub fn celebrate(&mut self) {
        self.effects.burst(BurstOptions::CELEBRATE);
        self.record(EngineEvent::BurstFired);
    }

    // --- 时间 ---

    /// Move the virtual clock, running every timer that falls due on the way.
    pub fn advance(&mut self, dt: Duration) {
        let until = self.scheduler.now() + dt;
        let mut cursor = self.scheduler.now();
        while let Some((id, task)) = self.scheduler.pop_due(until) {
            let at = self.scheduler.now();
            self.step_visuals(at - cursor);
            cursor = at;
            match task {
                Task::DecayTick => self.on_decay_tick(id),
                Task::Reveal(step) => self.run_reveal_step(step),
            }
        }
        self.scheduler.settle(until);
        self.step_visuals(until - cursor);
    }

    fn step_visuals(&mut self, dt: Duration) {
        self.spin.advance(dt);
        for item in &mut self.scene.items {
            item.step(dt);
        }
    }

    /// One display frame of the ambient overlay.
    pub fn animation_frame(&mut self) {
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.step();
        }
    }

    // --- 查询 ---

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn state(&self) -> &CarouselState {
        &self.state
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn config(&self) -> &CarouselConfig {
        &self.config
    }

    pub fn phase(&self) -> RevealPhase {
        self.reveal.phase()
    }

    pub fn drag_phase(&self) -> DragPhase {
        self.drag.phase()
    }

    pub fn spin(&self) -> &AutoSpin {
        &self.spin
    }

    pub fn overlay(&self) -> Option<&AmbientOverlay> {
        self.overlay.as_ref()
    }

    pub fn effects(&self) -> &E {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut E {
        &mut self.effects
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    /// Whether a click on the gift should count.
    pub fn trigger_accepts_input(&self) -> bool {
        self.scene
            .trigger
            .as_ref()
            .is_some_and(|t| t.interactive && t.is_visible())
    }

    pub fn drain_events(&mut self) -> Vec<(Duration, EngineEvent)> {
        std::mem::take(&mut self.events)
    }

    /// Rotation of the whole ring: the applied container transform followed
    /// by the auto-spin phase.
    pub fn ring_matrix(&self) -> Mat4 {
        let container = self
            .scene
            .spin
            .as_ref()
            .and_then(|n| n.transform)
            .unwrap_or_else(|| ContainerTransform::from_state(&self.state));
        container.matrix() * Mat4::from_rotation_y(self.spin.angle().to_radians())
    }

    pub fn item_matrix(&self, index: usize) -> Option<Mat4> {
        let item = self.scene.items.get(index)?;
        Some(self.ring_matrix() * item.visual().transform().matrix())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::item::RingItem;
    use crate::scene::Class;

    #[derive(Debug, Default)]
    pub(crate) struct Recorder {
        pub bursts: Vec<BurstOptions>,
        pub plays: usize,
        pub reject: bool,
    }

    impl Effects for Recorder {
        fn burst(&mut self, options: BurstOptions) {
            self.bursts.push(options);
        }

        fn play_audio(&mut self, source: &Path) -> Result<()> {
            self.plays += 1;
            if self.reject {
                return Err(CarouselError::PlaybackRejected {
                    source_path: source.to_path_buf(),
                    reason: "autoplay blocked".into(),
                });
            }
            Ok(())
        }
    }

    pub(crate) fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    pub(crate) fn engine(items: usize, gift: bool) -> CarouselEngine<Recorder> {
        let ring = (0..items)
            .map(|i| RingItem::from_path(format!("p{}.jpg", i)))
            .collect();
        let config = CarouselConfig {
            gift,
            ..CarouselConfig::default()
        };
        let scene = Scene::new(ring)
            .with_gift(gift)
            .with_caption(Some("Happy Birthday!".into()));
        CarouselEngine::new(config, scene, Recorder::default())
    }

    #[test]
    fn start_sizes_the_scene() {
        let mut e = engine(6, true);
        e.start(Vec2::new(1280.0, 720.0));

        assert_eq!(e.scene().ground.as_ref().and_then(|g| g.size), Some(Vec2::splat(600.0)));
        assert_eq!(e.scene().spin.as_ref().and_then(|s| s.size), Some(Vec2::new(120.0, 170.0)));
        assert_eq!(
            e.scene().audio.as_ref().map(|a| (a.controls, a.looping)),
            Some((false, true))
        );
        assert_eq!(e.phase(), RevealPhase::Covered);
        assert!(e.scene().drag.as_ref().is_some_and(|d| d.has(Class::Hidden)));
        assert_eq!(
            e.scene().spin.as_ref().and_then(|s| s.transform).map(|t| t.css()).as_deref(),
            Some("rotateX(-10deg) rotateY(0deg)")
        );
    }

    #[test]
    fn drag_then_release_coasts_to_rest() {
        let mut e = engine(6, false);
        e.start(Vec2::new(800.0, 600.0));
        e.advance(ms(10_000));
        assert_eq!(e.phase(), RevealPhase::Spinning);
        let yaw0 = e.state().yaw;

        e.pointer_down(Vec2::new(100.0, 100.0));
        e.pointer_move(Vec2::new(150.0, 100.0));
        assert!((e.state().yaw - yaw0 - 5.0).abs() < 1e-4);

        e.pointer_up();
        assert!(!e.spin().is_running());
        assert_eq!(e.drag_phase(), DragPhase::Decaying);

        let mut increments = Vec::new();
        for _ in 0..200 {
            let before = e.state().yaw;
            e.advance(DECAY_INTERVAL);
            let inc = e.state().yaw - before;
            if inc == 0.0 {
                break;
            }
            increments.push(inc);
        }
        assert!(increments.windows(2).all(|w| w[1] < w[0]));
        assert!((increments[0] - 4.75).abs() < 1e-3);
        assert_eq!(increments.len(), crate::drag::ticks_to_rest(Vec2::new(50.0, 0.0)));
        assert_eq!(e.drag_phase(), DragPhase::Idle);
        assert!(e.spin().is_running());
        assert_eq!(e.scheduler.pending(), 0);
    }

    #[test]
    fn press_cancels_running_decay() {
        let mut e = engine(4, false);
        e.start(Vec2::new(800.0, 600.0));
        e.pointer_down(Vec2::ZERO);
        e.pointer_move(Vec2::new(80.0, 40.0));
        e.pointer_up();
        e.advance(ms(34));
        let pending = e.scheduler.pending();

        e.pointer_down(Vec2::new(10.0, 10.0));
        assert_eq!(e.scheduler.pending(), pending - 1);
        let yaw = e.state().yaw;
        e.advance(ms(17 * 5));
        assert_eq!(e.state().yaw, yaw);
    }

    #[test]
    fn tilt_stays_clamped_through_any_drag() {
        let mut e = engine(4, false);
        e.start(Vec2::new(800.0, 600.0));
        e.pointer_down(Vec2::ZERO);
        let mut y = 0.0;
        for dy in [900.0, 2500.0, -8000.0, 300.0, 6000.0] {
            y += dy;
            e.pointer_move(Vec2::new(0.0, y));
            assert!((-180.0..=180.0).contains(&e.state().tilt));
        }
        e.pointer_up();
        for _ in 0..300 {
            e.advance(DECAY_INTERVAL);
            assert!((-180.0..=180.0).contains(&e.state().tilt));
        }
    }

    #[test]
    fn wheel_never_shrinks_past_the_floor() {
        let mut e = engine(5, false);
        e.start(Vec2::new(800.0, 600.0));
        for _ in 0..50 {
            e.wheel(-1200.0);
        }
        assert_eq!(e.state().radius, 80.0);
        e.advance(ms(1));
        let depth = e.scene().items[0].visual().target_transform().translate_z;
        assert_eq!(depth, 80.0);
        assert_eq!(e.scene().items[0].visual().transition().delay, Duration::ZERO);
    }

    #[test]
    fn resize_reflows_without_touching_angles() {
        let mut e = engine(3, false);
        e.start(Vec2::new(800.0, 600.0));
        e.advance(ms(5_000));
        e.pointer_down(Vec2::ZERO);
        e.pointer_move(Vec2::new(30.0, 20.0));
        let (yaw, tilt) = (e.state().yaw, e.state().tilt);

        e.resize(Vec2::new(1920.0, 1080.0));
        assert_eq!((e.state().yaw, e.state().tilt), (yaw, tilt));
        assert_eq!(e.overlay().map(|o| o.size()), Some(Vec2::new(1920.0, 1080.0)));
        assert_eq!(e.drag_phase(), DragPhase::Dragging);
    }

    #[test]
    fn missing_containers_degrade_quietly() {
        let mut e = engine(3, false);
        e.scene.drag = None;
        e.start(Vec2::new(800.0, 600.0));
        e.pointer_down(Vec2::ZERO);
        e.pointer_move(Vec2::new(50.0, 0.0));
        assert_eq!(e.drag_phase(), DragPhase::Idle);
        assert!(e.scene().spin.as_ref().is_some_and(|s| s.transform.is_none()));
        e.advance(ms(10_000));
        assert_eq!(e.phase(), RevealPhase::Spinning);
    }

    #[test]
    fn unusable_spin_speed_keeps_the_ring_finite() {
        for json in [r#"{"rotate_speed":1e30}"#, r#"{"rotate_speed":1e-12}"#] {
            let config: CarouselConfig = serde_json::from_str(json).unwrap();
            let ring = (0..3)
                .map(|i| RingItem::from_path(format!("p{}.jpg", i)))
                .collect();
            let scene = Scene::new(ring).with_gift(false);
            let mut e = CarouselEngine::new(config, scene, Recorder::default());
            e.start(Vec2::new(800.0, 600.0));
            e.advance(ms(10_000));

            assert_eq!(e.phase(), RevealPhase::Spinning);
            assert!(!e.spin().is_running());
            assert!(e.ring_matrix().is_finite());
            assert!(e.item_matrix(0).is_some_and(|m| m.is_finite()));
        }
    }

    #[test]
    fn ring_matrix_includes_spin_phase() {
        let mut e = engine(2, false);
        e.start(Vec2::new(800.0, 600.0));
        e.advance(ms(3_800));
        let before = e.ring_matrix();
        e.advance(ms(15_000));
        assert!(e.spin().is_running());
        assert_ne!(before, e.ring_matrix());
        assert!(e.item_matrix(1).is_some());
        assert!(e.item_matrix(2).is_none());
    }
}
