// geometry.rs — 透视投影 (等价于 CSS perspective: 1000px)
//
// CSS axes throughout: x right, y down, z toward the viewer, origin at the
// centre of the viewport.

use glam::{Mat4, Vec2, Vec3};

pub const PERSPECTIVE: f32 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub distance: f32,
    pub center: Vec2,
}

impl Projection {
    pub fn new(viewport: Vec2) -> Self {
        Self {
            distance: PERSPECTIVE,
            center: viewport * 0.5,
        }
    }

    /// Screen position, or `None` at or behind the eye.
    pub fn project(&self, p: Vec3) -> Option<Vec2> {
        let w = self.distance - p.z;
        if w <= 1.0 {
            return None;
        }
        Some(self.center + p.truncate() * (self.distance / w))
    }
}

/// Corners of a `size` box centred on the origin, clockwise from top-left.
pub fn rect_corners(size: Vec2) -> [Vec3; 4] {
    let h = size * 0.5;
    [
        Vec3::new(-h.x, -h.y, 0.0),
        Vec3::new(h.x, -h.y, 0.0),
        Vec3::new(h.x, h.y, 0.0),
        Vec3::new(-h.x, h.y, 0.0),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedQuad {
    pub corners: [Vec2; 4],
    /// View-space z of the centre; larger is nearer.
    pub depth: f32,
}

pub fn project_quad(matrix: Mat4, size: Vec2, projection: &Projection) -> Option<ProjectedQuad> {
    let local = rect_corners(size);
    let mut corners = [Vec2::ZERO; 4];
    for (out, p) in corners.iter_mut().zip(local) {
        *out = projection.project(matrix.transform_point3(p))?;
    }
    Some(ProjectedQuad {
        corners,
        depth: matrix.transform_point3(Vec3::ZERO).z,
    })
}

/// Mirror image hanging `gap` px below a `size` box (`-webkit-box-reflect: below`).
pub fn reflection_matrix(size: Vec2, gap: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, size.y + gap, 0.0)) * Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))
}

/// Floor square lying flat `drop` px below the ring's centre.
pub fn ground_matrix(drop: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, drop, 0.0))
        * Mat4::from_rotation_x(90f32.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_lands_on_the_viewport_centre() {
        let p = Projection::new(Vec2::new(800.0, 600.0));
        assert_eq!(p.project(Vec3::ZERO), Some(Vec2::new(400.0, 300.0)));
    }

    #[test]
    fn nearer_points_spread_wider() {
        let p = Projection::new(Vec2::ZERO);
        let near = p.project(Vec3::new(100.0, 0.0, 200.0)).map(|v| v.x);
        let far = p.project(Vec3::new(100.0, 0.0, -200.0)).map(|v| v.x);
        assert_eq!(near, Some(125.0));
        assert!(far.is_some_and(|x| (x - 1000.0 / 12.0).abs() < 1e-3));
        assert_eq!(p.project(Vec3::new(0.0, 0.0, 1000.0)), None);
    }

    #[test]
    fn front_item_sorts_after_back_item() {
        let proj = Projection::new(Vec2::new(800.0, 600.0));
        let size = Vec2::new(120.0, 170.0);
        let front = Mat4::from_translation(Vec3::new(0.0, 0.0, 200.0));
        let back = Mat4::from_rotation_y(180f32.to_radians()) * front;

        let f = project_quad(front, size, &proj).map(|q| q.depth);
        let b = project_quad(back, size, &proj).map(|q| q.depth);
        assert!(f > b);
    }

    #[test]
    fn reflection_hangs_below() {
        let m = reflection_matrix(Vec2::new(120.0, 170.0), 10.0);
        let top = m.transform_point3(Vec3::new(0.0, -85.0, 0.0));
        assert!((top.y - 265.0).abs() < 1e-3);
    }

    #[test]
    fn ground_lies_flat() {
        let m = ground_matrix(85.0);
        let p = m.transform_point3(Vec3::new(0.0, -100.0, 0.0));
        assert!((p.y - 85.0).abs() < 1e-3);
        assert!((p.z.abs() - 100.0).abs() < 1e-3);
    }
}
