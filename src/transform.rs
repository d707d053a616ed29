// transform.rs — 容器旋转的合成与应用

use glam::Mat4;

use crate::scene::Node;
use crate::state::CarouselState;

pub const TILT_LIMIT: f32 = 180.0;

/// `rotateX(..) rotateY(..)` on the spin container, in that order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerTransform {
    pub rotate_x: f32,
    pub rotate_y: f32,
}

impl ContainerTransform {
    pub fn from_state(state: &CarouselState) -> Self {
        Self {
            rotate_x: -state.tilt,
            rotate_y: state.yaw,
        }
    }

    pub fn css(&self) -> String {
        format!("rotateX({}deg) rotateY({}deg)", self.rotate_x, self.rotate_y)
    }

    /// CSS axes: x right, y down, z toward the viewer.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_x(self.rotate_x.to_radians())
            * Mat4::from_rotation_y(self.rotate_y.to_radians())
    }
}

/// Saturate tilt into range, then write the composed rotation to `target`.
///
/// Returns `false` when there is no target; tilt is still clamped.
pub fn apply_transform(state: &mut CarouselState, target: Option<&mut Node>) -> bool {
    state.tilt = state.tilt.clamp(-TILT_LIMIT, TILT_LIMIT);

    let Some(node) = target else {
        return false;
    };
    node.transform = Some(ContainerTransform::from_state(state));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CarouselConfig;
    use glam::Vec3;

    fn state() -> CarouselState {
        CarouselState::new(&CarouselConfig::default(), 6)
    }

    #[test]
    fn tilt_saturates_both_ways() {
        let mut s = state();
        let mut node = Node::new();

        s.tilt = 500.0;
        apply_transform(&mut s, Some(&mut node));
        assert_eq!(s.tilt, 180.0);

        s.tilt = -181.5;
        apply_transform(&mut s, Some(&mut node));
        assert_eq!(s.tilt, -180.0);
        assert_eq!(node.transform.map(|t| t.rotate_x), Some(180.0));
    }

    #[test]
    fn apply_is_idempotent() {
        let mut s = state();
        s.tilt = 12.0;
        s.yaw = 725.5;
        let mut node = Node::new();

        apply_transform(&mut s, Some(&mut node));
        let first = node.transform.map(|t| t.css());
        apply_transform(&mut s, Some(&mut node));
        let second = node.transform.map(|t| t.css());

        assert_eq!(first.as_deref(), Some("rotateX(-12deg) rotateY(725.5deg)"));
        assert_eq!(first, second);
    }

    #[test]
    fn missing_target_is_skipped() {
        let mut s = state();
        s.tilt = 999.0;
        assert!(!apply_transform(&mut s, None));
        assert_eq!(s.tilt, 180.0);
    }

    #[test]
    fn rotation_order_is_x_then_y() {
        let t = ContainerTransform {
            rotate_x: -90.0,
            rotate_y: 90.0,
        };
        let swapped =
            Mat4::from_rotation_y(90f32.to_radians()) * Mat4::from_rotation_x(-90f32.to_radians());

        let p = Vec3::new(0.0, 0.0, 100.0);
        let a = t.matrix().transform_point3(p);
        let b = swapped.transform_point3(p);
        assert!(a.distance(b) > 1.0);
    }
}
