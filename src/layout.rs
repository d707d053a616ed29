// layout.rs — 环形布局：N 个元素均匀分布在给定半径的圆上

use std::time::Duration;

use crate::animation::{Easing, Timing, Transition};
use crate::item::{ItemTransform, RingItem};

/// `transition: transform 1s`
pub const LAYOUT_TIMING: Timing = Timing::new(Duration::from_secs(1), Easing::Ease);

/// Transform-only transition; opacity changes snap.
pub const LAYOUT_TRANSITION: Transition = Transition {
    transform: Some(LAYOUT_TIMING),
    opacity: None,
    delay: Duration::ZERO,
};

/// Degrees between neighbours times `index`.
pub fn angular_offset(index: usize, count: usize) -> f32 {
    if count == 0 {
        return 0.0;
    }
    index as f32 * (360.0 / count as f32)
}

/// Default cascade: the last item moves first, a quarter second apart.
pub fn stagger_delay(index: usize, count: usize) -> Duration {
    Duration::from_secs_f32(count.saturating_sub(index) as f32 / 4.0)
}

pub fn ring_transform(index: usize, count: usize, radius: f32) -> ItemTransform {
    ItemTransform {
        rotate_y: angular_offset(index, count),
        translate_z: radius,
    }
}

/// Place every item on the ring. Opacity and decorations are left alone.
///
/// Returns the number of items written; zero items is a no-op.
pub fn layout(items: &mut [RingItem], radius: f32, stagger: Option<Duration>) -> usize {
    let count = items.len();
    for (index, item) in items.iter_mut().enumerate() {
        let delay = stagger.unwrap_or_else(|| stagger_delay(index, count));
        let visual = item.as_ring_visual();
        visual.apply_transform(ring_transform(index, count, radius));
        visual.set_transition(LAYOUT_TRANSITION.with_delay(delay));
    }
    if count > 0 {
        log::debug!("laid out {} items at radius {:.0}px", count, radius);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(n: usize) -> Vec<RingItem> {
        (0..n)
            .map(|i| RingItem::from_path(format!("photo{}.jpg", i)))
            .collect()
    }

    #[test]
    fn offsets_cover_the_circle_without_duplicates() {
        for n in 1..=24 {
            let mut items = ring(n);
            assert_eq!(layout(&mut items, 200.0, None), n);

            let mut offsets: Vec<f32> = items
                .iter()
                .map(|i| i.visual().target_transform().rotate_y)
                .collect();
            let step = 360.0 / n as f32;
            for (i, off) in offsets.iter().enumerate() {
                assert_eq!(*off, i as f32 * step);
                assert!(*off < 360.0);
            }
            offsets.dedup();
            assert_eq!(offsets.len(), n);
        }
    }

    #[test]
    fn empty_ring_is_a_no_op() {
        let mut items = ring(0);
        assert_eq!(layout(&mut items, 200.0, None), 0);
    }

    #[test]
    fn default_delays_cascade_from_the_last_item() {
        let mut items = ring(4);
        layout(&mut items, 150.0, None);
        let delays: Vec<f32> = items
            .iter()
            .map(|i| i.visual().transition().delay.as_secs_f32())
            .collect();
        assert_eq!(delays, vec![1.0, 0.75, 0.5, 0.25]);
    }

    #[test]
    fn explicit_stagger_wins_and_opacity_survives() {
        let mut items = ring(3);
        items[1].as_ring_visual().set_opacity(0.25);
        layout(&mut items, 80.0, Some(Duration::ZERO));

        for item in &items {
            assert_eq!(item.visual().transition().delay, Duration::ZERO);
            assert_eq!(item.visual().target_transform().translate_z, 80.0);
        }
        assert_eq!(items[1].visual().target_opacity(), 0.25);
    }

    #[test]
    fn relayout_reflows_to_the_new_radius() {
        let mut items = ring(2);
        layout(&mut items, 200.0, None);
        layout(&mut items, 120.0, None);
        assert_eq!(items[0].visual().target_transform().css(), "rotateY(0deg) translateZ(120px)");
        assert_eq!(items[1].visual().target_transform().css(), "rotateY(180deg) translateZ(120px)");
    }
}
