// item.rs — 环上的图片/视频元素

use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::{Mat4, Vec3};

use crate::animation::{Animated, Lerp, Transition};

/// `rotateY(angle) translateZ(depth)` in item-local space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ItemTransform {
    pub rotate_y: f32,
    pub translate_z: f32,
}

impl ItemTransform {
    /// Folded flat onto the ring axis.
    pub const COLLAPSED: Self = Self {
        rotate_y: 0.0,
        translate_z: 0.0,
    };

    pub fn css(&self) -> String {
        format!("rotateY({}deg) translateZ({}px)", self.rotate_y, self.translate_z)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.rotate_y.to_radians())
            * Mat4::from_translation(Vec3::new(0.0, 0.0, self.translate_z))
    }
}

impl Lerp for ItemTransform {
    fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            rotate_y: self.rotate_y.lerp(other.rotate_y, t),
            translate_z: self.translate_z.lerp(other.translate_z, t),
        }
    }
}

/// What the engine may do to a ring item.
pub trait RingVisual {
    fn apply_transform(&mut self, transform: ItemTransform);
    fn set_opacity(&mut self, opacity: f32);
    fn set_transition(&mut self, transition: Transition);
}

/// Styled state shared by both item kinds.
#[derive(Debug, Clone)]
pub struct Visual {
    transform: Animated<ItemTransform>,
    opacity: Animated<f32>,
    transition: Transition,
}

impl Visual {
    fn new() -> Self {
        Self {
            transform: Animated::new(ItemTransform::COLLAPSED),
            opacity: Animated::new(1.0),
            transition: Transition::default(),
        }
    }

    pub fn target_transform(&self) -> ItemTransform {
        self.transform.target()
    }

    pub fn target_opacity(&self) -> f32 {
        self.opacity.target()
    }

    pub fn transform(&self) -> ItemTransform {
        self.transform.current()
    }

    pub fn opacity(&self) -> f32 {
        self.opacity.current()
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    fn step(&mut self, dt: Duration) {
        let tr = self.transition;
        self.transform.step(dt, tr.transform, tr.delay);
        self.opacity.step(dt, tr.opacity, tr.delay);
    }
}

/// Box shadow and floor reflection on photos.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageEffects {
    pub glow_radius: f32,
    pub reflection_gap: f32,
}

impl Default for ImageEffects {
    fn default() -> Self {
        Self {
            glow_radius: 8.0,
            reflection_gap: 10.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageItem {
    pub source: PathBuf,
    pub effects: Option<ImageEffects>,
    visual: Visual,
}

impl ImageItem {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            effects: None,
            visual: Visual::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VideoItem {
    pub source: PathBuf,
    /// Still frame shown in place of the video stream.
    pub poster: Option<PathBuf>,
    visual: Visual,
}

impl VideoItem {
    pub fn new(source: impl Into<PathBuf>, poster: Option<PathBuf>) -> Self {
        Self {
            source: source.into(),
            poster,
            visual: Visual::new(),
        }
    }
}

macro_rules! impl_ring_visual {
    ($ty:ty) => {
        impl RingVisual for $ty {
            fn apply_transform(&mut self, transform: ItemTransform) {
                self.visual.transform.set(transform);
            }

            fn set_opacity(&mut self, opacity: f32) {
                self.visual.opacity.set(opacity.clamp(0.0, 1.0));
            }

            fn set_transition(&mut self, transition: Transition) {
                self.visual.transition = transition;
            }
        }
    };
}

impl_ring_visual!(ImageItem);
impl_ring_visual!(VideoItem);

#[derive(Debug, Clone)]
pub enum RingItem {
    Image(ImageItem),
    Video(VideoItem),
}

impl RingItem {
    /// Pick the kind from the file extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if is_video(&path) {
            RingItem::Video(VideoItem::new(path, None))
        } else {
            RingItem::Image(ImageItem::new(path))
        }
    }

    pub fn visual(&self) -> &Visual {
        match self {
            RingItem::Image(i) => &i.visual,
            RingItem::Video(v) => &v.visual,
        }
    }

    pub fn as_ring_visual(&mut self) -> &mut dyn RingVisual {
        match self {
            RingItem::Image(i) => i as &mut dyn RingVisual,
            RingItem::Video(v) => v as &mut dyn RingVisual,
        }
    }

    pub fn source(&self) -> &Path {
        match self {
            RingItem::Image(i) => i.source.as_path(),
            RingItem::Video(v) => v.source.as_path(),
        }
    }

    /// File to decode for display: the photo, or a video's poster.
    pub fn still(&self) -> Option<&Path> {
        match self {
            RingItem::Image(i) => Some(i.source.as_path()),
            RingItem::Video(v) => v.poster.as_deref(),
        }
    }

    pub fn step(&mut self, dt: Duration) {
        match self {
            RingItem::Image(i) => i.visual.step(dt),
            RingItem::Video(v) => v.visual.step(dt),
        }
    }
}

pub fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "mp4" | "webm" | "mov" | "ogv"))
        .unwrap_or(false)
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png" | "bmp" | "gif"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Easing, Timing};

    #[test]
    fn kind_follows_extension() {
        assert!(matches!(RingItem::from_path("a/clip.MP4"), RingItem::Video(_)));
        assert!(matches!(RingItem::from_path("a/photo.jpg"), RingItem::Image(_)));
        assert!(is_image(Path::new("x.PNG")));
        assert!(!is_image(Path::new("x.txt")));
    }

    #[test]
    fn both_kinds_share_the_visual_surface() {
        let mut items = vec![
            RingItem::Image(ImageItem::new("a.jpg")),
            RingItem::Video(VideoItem::new("b.mp4", Some("b.jpg".into()))),
        ];
        for item in &mut items {
            let v = item.as_ring_visual();
            v.apply_transform(ItemTransform {
                rotate_y: 90.0,
                translate_z: 200.0,
            });
            v.set_opacity(3.0);
        }
        for item in &mut items {
            item.step(Duration::ZERO);
            assert_eq!(item.visual().transform().css(), "rotateY(90deg) translateZ(200px)");
            assert_eq!(item.visual().opacity(), 1.0);
        }
        assert_eq!(items[1].still(), Some(Path::new("b.jpg")));
    }

    #[test]
    fn transition_applies_at_commit() {
        let mut item = RingItem::from_path("a.jpg");
        let v = item.as_ring_visual();
        v.set_opacity(0.0);
        v.set_transition(Transition::all(Timing::new(
            Duration::from_secs(2),
            Easing::Linear,
        )));
        item.step(Duration::from_secs(1));
        assert!((item.visual().opacity() - 0.5).abs() < 1e-4);
        assert_eq!(item.visual().target_opacity(), 0.0);
    }

    #[test]
    fn item_matrix_pushes_outward_along_rotated_depth() {
        let t = ItemTransform {
            rotate_y: 90.0,
            translate_z: 200.0,
        };
        let p = t.matrix().transform_point3(Vec3::ZERO);
        assert!((p.x - 200.0).abs() < 1e-3);
        assert!(p.z.abs() < 1e-3);
    }
}
