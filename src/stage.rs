// stage.rs — 舞台绘制：地面、照片环、礼盒封面、标语与粒子 (egui painter)

use std::time::Duration;

use egui::epaint::{CubicBezierShape, Hsva, Mesh, Vertex, WHITE_UV};
use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, TextureHandle, TextureId};
use glam::{Mat4, Vec2, Vec3};

use gift_carousel::animation::Easing;
use gift_carousel::geometry::{self, Projection};
use gift_carousel::item::RingItem;
use gift_carousel::particles::{AmbientOverlay, ConfettiCannon};
use gift_carousel::scene::{Class, Node};
use gift_carousel::CarouselEngine;

use crate::desktop::DesktopEffects;

const COVER_FADE: f32 = 1.0;
const LID_LIFT: f32 = 0.8;
const REVEAL_ZOOM: f32 = 1.2;
const GLOW_PERIOD: f32 = 2.0;
/// Each ring quad is cut into GRID x GRID cells so the texture follows the perspective.
const GRID: usize = 6;
const GIFT_BOX: egui::Vec2 = egui::vec2(160.0, 120.0);
const EASE_OUT: Easing = Easing::CubicBezier(0.0, 0.0, 0.58, 1.0);

/// Engine time at which a class first showed up on a node.
#[derive(Debug, Default)]
struct Cue(Option<Duration>);

impl Cue {
    /// Seconds since the class appeared, or `None` while absent.
    fn observe(&mut self, on: bool, now: Duration) -> Option<f32> {
        if !on {
            self.0 = None;
            return None;
        }
        let since = *self.0.get_or_insert(now);
        Some(now.saturating_sub(since).as_secs_f32())
    }
}

fn progress(elapsed: f32, duration: f32) -> f32 {
    (elapsed / duration).clamp(0.0, 1.0)
}

fn pos2(v: Vec2) -> Pos2 {
    Pos2::new(v.x, v.y)
}

pub struct Stage {
    textures: Vec<Option<TextureHandle>>,
    lid: Cue,
    cover_fade: Cue,
    zoom: Cue,
    glow: Cue,
    gift_rect: Option<Rect>,
}

impl Stage {
    pub fn new(item_count: usize) -> Self {
        Self {
            textures: vec![None; item_count],
            lid: Cue::default(),
            cover_fade: Cue::default(),
            zoom: Cue::default(),
            glow: Cue::default(),
            gift_rect: None,
        }
    }

    pub fn set_texture(&mut self, ctx: &egui::Context, index: usize, image: image::RgbaImage) {
        let Some(slot) = self.textures.get_mut(index) else {
            log::warn!("texture for unknown item {}", index);
            return;
        };
        let size = [image.width() as usize, image.height() as usize];
        let pixels = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
        *slot = Some(ctx.load_texture(format!("item-{}", index), pixels, egui::TextureOptions::LINEAR));
    }

    /// Clickable area of the gift, while it still takes clicks.
    pub fn gift_rect(&self) -> Option<Rect> {
        self.gift_rect
    }

    pub fn paint(&mut self, ctx: &egui::Context, engine: &CarouselEngine<DesktopEffects>) {
        let painter = ctx.layer_painter(egui::LayerId::background());
        let now = engine.now();
        let scene = engine.scene();
        let projection = Projection::new(engine.viewport());

        if let Some(overlay) = engine.overlay() {
            paint_overlay(&painter, overlay);
        }

        if scene.drag.as_ref().is_some_and(Node::is_visible) {
            let zooming = scene.drag.as_ref().is_some_and(|d| d.has(Class::RevealZoom));
            let scale = self
                .zoom
                .observe(zooming, now)
                .map_or(1.0, |t| 0.6 + 0.4 * EASE_OUT.sample(progress(t, REVEAL_ZOOM)));
            let zoom = Mat4::from_scale(Vec3::splat(scale));
            let ring = zoom * engine.ring_matrix();

            let config = engine.config();
            let item_box = scene
                .spin
                .as_ref()
                .and_then(|s| s.size)
                .unwrap_or(Vec2::new(config.item_width, config.item_height));

            if let Some(extent) = scene.ground.as_ref().filter(|g| g.is_visible()).and_then(|g| g.size) {
                let m = ring * geometry::ground_matrix(item_box.y * 0.5);
                paint_ground(&painter, m, extent, &projection);
            }

            self.paint_items(&painter, engine, ring, item_box, &projection);

            if let Some(caption) = scene.caption.as_ref().filter(|c| c.is_visible()) {
                let glowing = self.glow.observe(caption.has(Class::Glow), now);
                let anchor = ring.transform_point3(Vec3::new(0.0, item_box.y * 0.5 + 40.0, 0.0));
                if let (Some(text), Some(at)) = (caption.text.as_deref(), projection.project(anchor)) {
                    paint_caption(&painter, pos2(at), text, glowing);
                }
            }
        }

        self.paint_cover(&painter, engine);
        paint_confetti(&painter, &engine.effects().confetti);
    }

    fn paint_items(
        &self,
        painter: &Painter,
        engine: &CarouselEngine<DesktopEffects>,
        ring: Mat4,
        item_box: Vec2,
        projection: &Projection,
    ) {
        // 远处先画
        let mut order: Vec<(usize, f32)> = engine
            .scene()
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let m = ring * item.visual().transform().matrix();
                (i, m.transform_point3(Vec3::ZERO).z)
            })
            .collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1));

        for (index, _) in order {
            let item = &engine.scene().items[index];
            let opacity = item.visual().opacity();
            if opacity <= 0.0 {
                continue;
            }
            let matrix = ring * item.visual().transform().matrix();
            let texture = self.textures.get(index).and_then(|t| t.as_ref()).map(TextureHandle::id);
            let tint = Color32::WHITE.gamma_multiply(opacity);
            let fill = Color32::from_rgb(40, 24, 44).gamma_multiply(opacity);

            if let RingItem::Image(img) = item {
                if let Some(fx) = img.effects {
                    let m = matrix * geometry::reflection_matrix(item_box, fx.reflection_gap);
                    // 倒影：靠近照片处透明，向下渐显到 #0005
                    let shade = |v: f32| {
                        let a = 0.33 * ((0.5 - v) / 0.5).max(0.0) * opacity;
                        Color32::WHITE.gamma_multiply(a)
                    };
                    if let Some(mesh) = grid_mesh(m, item_box, projection, texture, shade) {
                        painter.add(Shape::mesh(mesh));
                    }
                }
            }

            let base = if texture.is_some() { tint } else { fill };
            let Some(mesh) = grid_mesh(matrix, item_box, projection, texture, |_| base) else {
                continue;
            };
            painter.add(Shape::mesh(mesh));

            let Some(quad) = geometry::project_quad(matrix, item_box, projection) else {
                continue;
            };
            let outline: Vec<Pos2> = quad.corners.iter().copied().map(pos2).collect();
            match item {
                RingItem::Image(img) => {
                    if let Some(fx) = img.effects {
                        let halo = Color32::from_rgba_unmultiplied(255, 255, 255, 48).gamma_multiply(opacity);
                        painter.add(Shape::closed_line(outline.clone(), Stroke::new(fx.glow_radius, halo)));
                        painter.add(Shape::closed_line(outline, Stroke::new(1.0, tint)));
                    }
                }
                RingItem::Video(_) => {
                    if texture.is_none() {
                        let center = projection.project(matrix.transform_point3(Vec3::ZERO));
                        if let Some(c) = center {
                            painter.text(pos2(c), Align2::CENTER_CENTER, "▶", FontId::proportional(28.0), tint);
                        }
                    }
                    painter.add(Shape::closed_line(outline, Stroke::new(1.0, tint.gamma_multiply(0.5))));
                }
            }
        }
    }

    fn paint_cover(&mut self, painter: &Painter, engine: &CarouselEngine<DesktopEffects>) {
        self.gift_rect = None;
        let scene = engine.scene();
        let now = engine.now();
        let Some(cover) = scene.cover.as_ref().filter(|c| !c.removed) else {
            return;
        };

        let alpha = self
            .cover_fade
            .observe(cover.has(Class::FadeOut), now)
            .map_or(1.0, |t| 1.0 - progress(t, COVER_FADE));
        if alpha <= 0.0 {
            return;
        }
        let viewport = engine.viewport();
        let screen = Rect::from_min_size(Pos2::ZERO, egui::vec2(viewport.x, viewport.y));
        painter.rect_filled(screen, 0.0, Color32::from_rgb(14, 6, 18).gamma_multiply(alpha));

        let Some(trigger) = scene.trigger.as_ref().filter(|t| t.is_visible()) else {
            return;
        };
        let center = screen.center() + egui::vec2(0.0, 30.0);
        let body = Rect::from_center_size(center, GIFT_BOX);
        let lift = self
            .lid
            .observe(trigger.has(Class::Open), now)
            .map_or(0.0, |t| EASE_OUT.sample(progress(t, LID_LIFT)));
        let lid = Rect::from_center_size(
            body.center_top() - egui::vec2(0.0, 14.0 + 120.0 * lift),
            egui::vec2(GIFT_BOX.x + 20.0, 30.0),
        );

        let red = Color32::from_rgb(214, 48, 88).gamma_multiply(alpha);
        let gold = Color32::from_rgb(255, 205, 96).gamma_multiply(alpha);
        painter.rect_filled(body, 6.0, red);
        painter.rect_filled(Rect::from_center_size(body.center(), egui::vec2(22.0, body.height())), 0.0, gold);

        let lid_alpha = alpha * (1.0 - lift);
        painter.rect_filled(lid, 6.0, red.gamma_multiply(1.0 - lift));
        painter.rect_filled(
            Rect::from_center_size(lid.center(), egui::vec2(22.0, lid.height())),
            0.0,
            gold.gamma_multiply(1.0 - lift),
        );
        painter.circle_filled(lid.center_top(), 12.0, gold.gamma_multiply(1.0 - lift));

        if engine.trigger_accepts_input() {
            painter.text(
                body.center_bottom() + egui::vec2(0.0, 28.0),
                Align2::CENTER_CENTER,
                "click the gift",
                FontId::proportional(18.0),
                Color32::from_white_alpha(200).gamma_multiply(lid_alpha),
            );
            self.gift_rect = Some(body.union(lid));
        }
    }
}

/// Triangulated `size` quad under `matrix`; `shade` gets the texture v (0 = top).
fn grid_mesh(
    matrix: Mat4,
    size: Vec2,
    projection: &Projection,
    texture: Option<TextureId>,
    shade: impl Fn(f32) -> Color32,
) -> Option<Mesh> {
    let mut mesh = Mesh::with_texture(texture.unwrap_or_default());
    for row in 0..=GRID {
        let v = row as f32 / GRID as f32;
        let color = shade(v);
        for col in 0..=GRID {
            let u = col as f32 / GRID as f32;
            let local = Vec3::new((u - 0.5) * size.x, (v - 0.5) * size.y, 0.0);
            let screen = projection.project(matrix.transform_point3(local))?;
            let uv = if texture.is_some() { Pos2::new(u, v) } else { WHITE_UV };
            mesh.vertices.push(Vertex { pos: pos2(screen), uv, color });
        }
    }
    let stride = (GRID + 1) as u32;
    for row in 0..GRID as u32 {
        for col in 0..GRID as u32 {
            let i = row * stride + col;
            mesh.add_triangle(i, i + 1, i + stride + 1);
            mesh.add_triangle(i, i + stride + 1, i + stride);
        }
    }
    Some(mesh)
}

/// Radial glow on the floor: bright centre fading to the edges.
fn paint_ground(painter: &Painter, matrix: Mat4, extent: Vec2, projection: &Projection) {
    let Some(centre) = projection.project(matrix.transform_point3(Vec3::ZERO)) else {
        return;
    };
    let mut mesh = Mesh::default();
    mesh.colored_vertex(pos2(centre), Color32::from_rgba_unmultiplied(153, 153, 153, 90));

    const RIM: u32 = 32;
    for k in 0..RIM {
        let a = k as f32 / RIM as f32 * std::f32::consts::TAU;
        let p = Vec3::new(a.cos(), a.sin(), 0.0) * extent.x * 0.5;
        let Some(s) = projection.project(matrix.transform_point3(p)) else {
            return;
        };
        mesh.colored_vertex(pos2(s), Color32::TRANSPARENT);
    }
    for k in 0..RIM {
        mesh.add_triangle(0, 1 + k, 1 + (k + 1) % RIM);
    }
    painter.add(Shape::mesh(mesh));
}

fn paint_caption(painter: &Painter, at: Pos2, text: &str, glowing: Option<f32>) {
    let font = FontId::proportional(30.0);
    if let Some(t) = glowing {
        let fade_in = progress(t, 1.0);
        let pulse = 0.5 + 0.5 * (t * std::f32::consts::TAU / GLOW_PERIOD).sin();
        let glow = Color32::from_rgb(255, 110, 180).gamma_multiply(0.25 * fade_in * (0.6 + 0.4 * pulse));
        for r in [4.0f32, 2.5] {
            for k in 0..8 {
                let a = k as f32 * std::f32::consts::FRAC_PI_4;
                let off = egui::vec2(a.cos(), a.sin()) * r;
                painter.text(at + off, Align2::CENTER_CENTER, text, font.clone(), glow);
            }
        }
    }
    painter.text(at, Align2::CENTER_CENTER, text, font, Color32::from_white_alpha(230));
}

fn paint_overlay(painter: &Painter, overlay: &AmbientOverlay) {
    for f in overlay.fireworks() {
        let fade = f.life as f32 / gift_carousel::particles::FIREWORK_LIFE as f32;
        let color: Color32 = Hsva::new(f.hue / 360.0, 1.0, 1.0, fade).into();
        painter.circle_filled(pos2(f.pos), f.radius, color);
    }
    for h in overlay.hearts() {
        let color = Color32::from_rgb(255, 105, 180).gamma_multiply(h.opacity.clamp(0.0, 1.0));
        for half in h.outline() {
            let points = half.map(pos2);
            painter.add(CubicBezierShape::from_points_stroke(points, true, color, Stroke::NONE));
        }
    }
}

fn paint_confetti(painter: &Painter, cannon: &ConfettiCannon) {
    for p in cannon.pieces() {
        let [r, g, b] = p.color;
        let color = Color32::from_rgb(r, g, b).gamma_multiply(p.opacity());
        let size = egui::vec2(8.0, 5.0 + 3.0 * (p.tick as f32 * 0.3).sin().abs());
        painter.rect_filled(Rect::from_center_size(pos2(p.pos), size), 1.0, color);
    }
}
