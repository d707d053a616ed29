// main.rs — 桌面入口：窗口、输入分发、帧循环与状态栏

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // 在 Release 模式下隐藏控制台窗口

mod audio;
mod desktop;
mod renderer;
mod stage;

use desktop::{DesktopEffects, MusicStatus};
use renderer::Renderer;
use stage::Stage;

use gift_carousel::{CarouselConfig, CarouselEngine, CarouselError, RevealPhase};

use winit::{
    dpi::LogicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

use glam::Vec2;
use image::io::Reader as ImageReader;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Longest frame step fed to the engine, so a stalled window doesn't skip the reveal.
const MAX_FRAME_STEP: f32 = 0.1;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = CarouselConfig::load();

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Gift Carousel")
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)
            .unwrap(),
    );

    let mut renderer = pollster::block_on(Renderer::new(window.clone()));

    let scale = window.scale_factor();
    let viewport = logical_size(window.inner_size(), scale);
    let mut engine = CarouselEngine::from_config(config, DesktopEffects::new(viewport));
    let mut stage = Stage::new(engine.scene().items.len());

    // 异步加载通道
    let (tx, rx): (Sender<(usize, image::RgbaImage)>, Receiver<(usize, image::RgbaImage)>) = channel();
    for (index, item) in engine.scene().items.iter().enumerate() {
        match item.still() {
            Some(path) => start_load_image(index, path.to_path_buf(), tx.clone()),
            None => log::info!("{:?} has no poster, drawing a placeholder", item.source()),
        }
    }
    engine.start(viewport);

    // 交互状态
    let mut cursor = Vec2::ZERO;
    let mut is_fullscreen = false;

    // FPS 计算
    let started_at = Instant::now();
    let mut last_tick = Instant::now();
    let mut last_fps_time = Instant::now();
    let mut frame_count = 0;
    let mut fps = 0.0;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        // 检查是否有新加载的图片
        while let Ok((index, rgba)) = rx.try_recv() {
            stage.set_texture(&renderer.egui_ctx, index, rgba);
        }

        match event {
            Event::WindowEvent { event, .. } => {
                // 先让 egui 处理事件
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                        let size = logical_size(new_size, window.scale_factor());
                        engine.resize(size);
                        engine.effects_mut().confetti.resize(size);
                    }

                    // 键盘快捷键
                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            match input.virtual_keycode {
                                Some(VirtualKeyCode::C) => engine.celebrate(),
                                Some(VirtualKeyCode::F11) => {
                                    is_fullscreen = !is_fullscreen;
                                    if is_fullscreen {
                                        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                                    } else {
                                        window.set_fullscreen(None);
                                    }
                                }
                                _ => {}
                            }
                        }
                    }

                    // 鼠标交互
                    WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => match state {
                        ElementState::Pressed => {
                            let on_gift = stage
                                .gift_rect()
                                .is_some_and(|r| r.contains(egui::pos2(cursor.x, cursor.y)));
                            if on_gift && engine.trigger_accepts_input() {
                                engine.activate_reveal();
                            }
                            engine.pointer_down(cursor);
                        }
                        ElementState::Released => engine.pointer_up(),
                    },

                    WindowEvent::CursorMoved { position, .. } => {
                        let logical = position.to_logical::<f32>(window.scale_factor());
                        cursor = Vec2::new(logical.x, logical.y);
                        engine.pointer_move(cursor);
                    }

                    WindowEvent::CursorLeft { .. } => engine.pointer_up(),

                    WindowEvent::MouseWheel { delta, .. } => {
                        // 与浏览器 wheelDelta 同号：向上滚为正，一格 120
                        let wheel_delta = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y * 120.0,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
                        };
                        engine.wheel(wheel_delta);
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                // FPS 统计
                frame_count += 1;
                let now = Instant::now();
                if now.duration_since(last_fps_time).as_secs_f32() >= 1.0 {
                    fps = frame_count as f32 / now.duration_since(last_fps_time).as_secs_f32();
                    frame_count = 0;
                    last_fps_time = now;
                }

                let dt = now.duration_since(last_tick).min(std::time::Duration::from_secs_f32(MAX_FRAME_STEP));
                last_tick = now;
                engine.advance(dt);
                engine.animation_frame();
                engine.effects_mut().confetti.step();
                for (at, event) in engine.drain_events() {
                    log::debug!("[{:>6} ms] {:?}", at.as_millis(), event);
                }

                let glow = if engine.phase() >= RevealPhase::Spreading { 1.0 } else { 0.0 };
                renderer.update_backdrop(started_at.elapsed().as_secs_f32(), glow);

                let mut toggle_music = false;
                let render_result = renderer.render_with_ui(&window, |ctx| {
                    stage.paint(ctx, &engine);
                    toggle_music = draw_status_bar(ctx, &engine, fps);
                });
                if toggle_music {
                    engine.effects_mut().toggle_music();
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::error!("render error: {:?}", e),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

fn logical_size(size: winit::dpi::PhysicalSize<u32>, scale: f64) -> Vec2 {
    let logical = size.to_logical::<f32>(scale);
    Vec2::new(logical.width, logical.height)
}

fn start_load_image(index: usize, path: PathBuf, tx: Sender<(usize, image::RgbaImage)>) {
    thread::spawn(move || {
        log::debug!("loading {:?} in background", path);

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("{}", CarouselError::Io { path, source: e });
                return;
            }
        };
        let reader = BufReader::new(file);

        let img_result = ImageReader::new(reader)
            .with_guessed_format()
            .map_err(image::ImageError::IoError)
            .and_then(|r| r.decode());

        match img_result {
            Ok(img) => {
                let rgba = img.to_rgba8();
                log::debug!("{:?} decoded, {}x{}", path, rgba.width(), rgba.height());
                if tx.send((index, rgba)).is_err() {
                    log::warn!("window closed before {:?} arrived", path);
                }
            }
            Err(e) => log::warn!(
                "{}",
                CarouselError::Decode { path, reason: e.to_string() }
            ),
        }
    });
}

/// Returns true when the music play/pause control was clicked.
fn draw_status_bar(ctx: &egui::Context, engine: &CarouselEngine<DesktopEffects>, fps: f32) -> bool {
    let mut toggle_music = false;
    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label(format!("{:?}", engine.phase()));
            ui.label("|");
            let state = engine.state();
            ui.label(format!("Yaw: {:.1}°", state.yaw));
            ui.label("|");
            ui.label(format!("Tilt: {:.1}°", state.tilt));
            ui.label("|");
            ui.label(format!("Radius: {:.0}px", state.radius));

            // 音乐元素挂载后才显示
            if let Some(tag) = engine.scene().audio.as_ref() {
                ui.label("|");
                let status = engine.effects().music_status();
                let (text, color) = match status {
                    MusicStatus::Idle => ("♪ waiting", egui::Color32::GRAY),
                    MusicStatus::Playing => ("♪ playing", egui::Color32::LIGHT_GREEN),
                    MusicStatus::Paused => ("♪ paused", egui::Color32::LIGHT_GRAY),
                    MusicStatus::Blocked => ("♪ blocked", egui::Color32::YELLOW),
                };
                ui.label(egui::RichText::new(text).color(color));

                if tag.controls && matches!(status, MusicStatus::Playing | MusicStatus::Paused) {
                    let icon = if status == MusicStatus::Playing { "⏸" } else { "▶" };
                    toggle_music = ui.small_button(icon).clicked();
                }
            }

            ui.label("|");
            ui.label(egui::RichText::new(format!("FPS: {:.1}", fps)).color(egui::Color32::GREEN));
        });
    });
    toggle_music
}
