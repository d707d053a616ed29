// lib.rs — 3D 相册旋转木马引擎
//
// Everything here is window-free: the desktop front end in `main.rs` feeds
// pointer input and frame time in, and reads transforms back out.

pub mod animation;
pub mod config;
pub mod drag;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod item;
pub mod layout;
pub mod particles;
pub mod reveal;
pub mod scene;
pub mod scheduler;
pub mod spin;
pub mod state;
pub mod transform;

pub use config::CarouselConfig;
pub use engine::{CarouselEngine, Effects, EngineEvent};
pub use error::{CarouselError, Result};
pub use reveal::RevealPhase;
