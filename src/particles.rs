// particles.rs — 背景粒子 (烟花点、上升的爱心) 与彩纸礼花
//
// Particles are plain records in flat vectors. Culling uses `retain`, so
// after warm-up the per-frame step stops allocating.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const FIREWORK_SPAWN_CHANCE: f64 = 0.1;
pub const HEART_SPAWN_CHANCE: f64 = 0.05;
pub const FIREWORK_LIFE: u32 = 100;
pub const HEART_FADE_PER_FRAME: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Firework {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Degrees on the colour wheel, full saturation.
    pub hue: f32,
    pub life: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heart {
    pub pos: Vec2,
    pub size: f32,
    pub rise: f32,
    pub opacity: f32,
}

impl Heart {
    /// Two cubic segments, left lobe then right lobe: `[start, c1, c2, end]`.
    pub fn outline(&self) -> [[Vec2; 4]; 2] {
        let Vec2 { x, y } = self.pos;
        let s = self.size;
        [
            [
                Vec2::new(x, y),
                Vec2::new(x - s / 2.0, y - s / 2.0),
                Vec2::new(x - s, y + s / 3.0),
                Vec2::new(x, y + s),
            ],
            [
                Vec2::new(x, y + s),
                Vec2::new(x + s, y + s / 3.0),
                Vec2::new(x + s / 2.0, y - s / 2.0),
                Vec2::new(x, y),
            ],
        ]
    }
}

/// Full-viewport ambient layer behind the carousel.
#[derive(Debug, Clone)]
pub struct AmbientOverlay {
    size: Vec2,
    running: bool,
    fireworks: Vec<Firework>,
    hearts: Vec<Heart>,
    rng: StdRng,
}

impl AmbientOverlay {
    pub fn new(size: Vec2) -> Self {
        Self::with_rng(size, StdRng::from_entropy())
    }

    pub fn seeded(size: Vec2, seed: u64) -> Self {
        Self::with_rng(size, StdRng::seed_from_u64(seed))
    }

    fn with_rng(size: Vec2, rng: StdRng) -> Self {
        Self {
            size,
            running: false,
            fireworks: Vec::with_capacity(64),
            hearts: Vec::with_capacity(32),
            rng,
        }
    }

    pub fn start(&mut self) {
        if !self.running {
            log::debug!("ambient overlay running at {}x{}", self.size.x, self.size.y);
        }
        self.running = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn resize(&mut self, size: Vec2) {
        self.size = size;
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn fireworks(&self) -> &[Firework] {
        &self.fireworks
    }

    pub fn hearts(&self) -> &[Heart] {
        &self.hearts
    }

    /// One animation frame: maybe spawn, then move and cull.
    pub fn step(&mut self) {
        if !self.running {
            return;
        }

        if self.rng.gen_bool(FIREWORK_SPAWN_CHANCE) {
            let fw = Firework {
                pos: Vec2::new(
                    self.rng.gen_range(0.0..=self.size.x),
                    self.rng.gen_range(0.0..=self.size.y),
                ),
                vel: Vec2::new(self.rng.gen_range(-3.0..3.0), self.rng.gen_range(-3.0..3.0)),
                radius: self.rng.gen_range(2.0..4.0),
                hue: self.rng.gen_range(0.0..360.0),
                life: FIREWORK_LIFE,
            };
            self.fireworks.push(fw);
        }
        if self.rng.gen_bool(HEART_SPAWN_CHANCE) {
            let heart = Heart {
                pos: Vec2::new(self.rng.gen_range(0.0..=self.size.x), self.size.y),
                size: self.rng.gen_range(20.0..40.0),
                rise: self.rng.gen_range(-2.0..-1.0),
                opacity: 1.0,
            };
            self.hearts.push(heart);
        }

        for fw in &mut self.fireworks {
            fw.pos += fw.vel;
            fw.life = fw.life.saturating_sub(1);
        }
        for h in &mut self.hearts {
            h.pos.y += h.rise;
            h.opacity -= HEART_FADE_PER_FRAME;
        }
        self.fireworks.retain(|f| f.life > 0);
        self.hearts.retain(|h| h.opacity > 0.0);
    }
}

/// Arguments of the external confetti call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstOptions {
    pub particle_count: u32,
    /// Cone width in degrees.
    pub spread: f32,
    /// Launch height as a fraction of the viewport.
    pub origin_y: f32,
}

impl BurstOptions {
    /// Fired when the gift opens.
    pub const GIFT: Self = Self {
        particle_count: 100,
        spread: 90.0,
        origin_y: 0.6,
    };

    /// Fired by the celebrate button.
    pub const CELEBRATE: Self = Self {
        particle_count: 80,
        spread: 120.0,
        origin_y: 0.6,
    };
}

pub const CONFETTI_COLORS: [[u8; 3]; 7] = [
    [0x26, 0xcc, 0xff],
    [0xa2, 0x5a, 0xfd],
    [0xff, 0x5e, 0x7e],
    [0x88, 0xff, 0x5a],
    [0xfc, 0xff, 0x42],
    [0xff, 0xa6, 0x2d],
    [0xff, 0x36, 0xff],
];

const CONFETTI_START_VELOCITY: f32 = 45.0;
const CONFETTI_DECAY: f32 = 0.9;
const CONFETTI_GRAVITY: f32 = 3.0;
const CONFETTI_TICKS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Confetto {
    pub pos: Vec2,
    /// Heading in radians, screen space (negative is up).
    pub angle: f32,
    pub speed: f32,
    pub color: [u8; 3],
    pub tick: u32,
}

impl Confetto {
    pub fn opacity(&self) -> f32 {
        1.0 - self.tick as f32 / CONFETTI_TICKS as f32
    }
}

/// Cone-shaped confetti bursts under gravity.
#[derive(Debug, Clone)]
pub struct ConfettiCannon {
    size: Vec2,
    pieces: Vec<Confetto>,
    rng: StdRng,
}

impl ConfettiCannon {
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            pieces: Vec::with_capacity(256),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(size: Vec2, seed: u64) -> Self {
        Self {
            size,
            pieces: Vec::with_capacity(256),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn resize(&mut self, size: Vec2) {
        self.size = size;
    }

    pub fn pieces(&self) -> &[Confetto] {
        &self.pieces
    }

    pub fn burst(&mut self, options: BurstOptions) {
        let origin = Vec2::new(self.size.x * 0.5, self.size.y * options.origin_y);
        let spread = options.spread.to_radians();
        let up = -std::f32::consts::FRAC_PI_2;
        for _ in 0..options.particle_count {
            let jitter = 0.5 * spread - self.rng.gen::<f32>() * spread;
            let speed = CONFETTI_START_VELOCITY * 0.5 + self.rng.gen::<f32>() * CONFETTI_START_VELOCITY;
            let color = CONFETTI_COLORS[self.rng.gen_range(0..CONFETTI_COLORS.len())];
            self.pieces.push(Confetto {
                pos: origin,
                angle: up + jitter,
                speed,
                color,
                tick: 0,
            });
        }
    }

    pub fn step(&mut self) {
        for p in &mut self.pieces {
            p.pos.x += p.angle.cos() * p.speed;
            p.pos.y += p.angle.sin() * p.speed + CONFETTI_GRAVITY;
            p.speed *= CONFETTI_DECAY;
            p.tick += 1;
        }
        self.pieces.retain(|p| p.tick < CONFETTI_TICKS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_overlay_does_nothing() {
        let mut overlay = AmbientOverlay::seeded(Vec2::new(800.0, 600.0), 1);
        for _ in 0..100 {
            overlay.step();
        }
        assert!(overlay.fireworks().is_empty());
        assert!(overlay.hearts().is_empty());
    }

    #[test]
    fn particles_spawn_inside_and_expire() {
        let size = Vec2::new(800.0, 600.0);
        let mut overlay = AmbientOverlay::seeded(size, 42);
        overlay.start();
        for _ in 0..500 {
            overlay.step();
            assert!(overlay.fireworks().iter().all(|f| f.life > 0 && f.life <= FIREWORK_LIFE));
            assert!(overlay.hearts().iter().all(|h| h.opacity > 0.0 && h.pos.y < size.y));
        }
        assert!(!overlay.fireworks().is_empty());
        // 每帧 10% 概率、寿命 100 帧 → 稳定在 10 个左右
        assert!(overlay.fireworks().len() < 40);
        assert!(overlay.hearts().len() < 40);
    }

    #[test]
    fn heart_outline_closes_on_itself() {
        let heart = Heart {
            pos: Vec2::new(10.0, 20.0),
            size: 30.0,
            rise: -1.5,
            opacity: 1.0,
        };
        let [left, right] = heart.outline();
        assert_eq!(left[0], right[3]);
        assert_eq!(left[3], right[0]);
        assert_eq!(left[3], Vec2::new(10.0, 50.0));
    }

    #[test]
    fn burst_launches_upward_and_falls_away() {
        let mut cannon = ConfettiCannon::seeded(Vec2::new(1000.0, 1000.0), 9);
        cannon.burst(BurstOptions::GIFT);
        assert_eq!(cannon.pieces().len(), 100);
        assert!(cannon.pieces().iter().all(|p| p.pos == Vec2::new(500.0, 600.0)));

        cannon.step();
        assert!(cannon.pieces().iter().all(|p| p.pos.y < 600.0));

        for _ in 0..CONFETTI_TICKS {
            cannon.step();
        }
        assert!(cannon.pieces().is_empty());
    }
}
