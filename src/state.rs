// state.rs — 旋转木马状态 (角度、半径、自动旋转)

use crate::config::CarouselConfig;

/// Pixels of wheel delta per pixel of radius.
pub const WHEEL_DIVISOR: f32 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CarouselState {
    pub item_count: usize,
    pub radius: f32,
    pub min_radius: f32,
    /// Rotation about the horizontal axis, degrees. Clamped on every apply.
    pub tilt: f32,
    /// Rotation about the vertical axis, degrees. Never normalized.
    pub yaw: f32,
    pub auto_rotate: bool,
    /// Seconds per revolution; the sign picks the direction.
    pub rotate_speed: f32,
    /// Set once the auto-spin class has been applied.
    pub spin_started: bool,
}

impl CarouselState {
    pub fn new(config: &CarouselConfig, item_count: usize) -> Self {
        Self {
            item_count,
            radius: config.radius.max(config.min_radius),
            min_radius: config.min_radius,
            tilt: 10.0,
            yaw: 0.0,
            auto_rotate: config.auto_rotate,
            rotate_speed: config.rotate_speed,
            spin_started: false,
        }
    }

    /// Grow or shrink the ring by a wheel delta; never below the floor.
    pub fn zoom(&mut self, wheel_delta: f32) -> f32 {
        self.radius = (self.radius + wheel_delta / WHEEL_DIVISOR).max(self.min_radius);
        self.radius
    }

    /// Edge length of the square ground plane.
    pub fn ground_extent(&self) -> f32 {
        self.radius * 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_clamps_to_floor() {
        let mut state = CarouselState::new(&CarouselConfig::default(), 0);
        assert_eq!(state.zoom(120.0), 206.0);
        assert_eq!(state.zoom(-120.0 * 100.0), 80.0);
        assert_eq!(state.radius, 80.0);
        assert_eq!(state.ground_extent(), 240.0);
    }

    #[test]
    fn configured_radius_below_floor_is_raised() {
        let config = CarouselConfig {
            radius: 10.0,
            ..CarouselConfig::default()
        };
        assert_eq!(CarouselState::new(&config, 3).radius, 80.0);
    }
}
