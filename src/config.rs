// config.rs — 启动配置
//
// Looked up in this order:
// - CLI: --config <path>
// - Env: CAROUSEL_CONFIG
// - <exe_dir>/assets/carousel.json
// - ./assets/carousel.json  (dev working dir)
// - built-in defaults
//
// Fixed once loaded; nothing reconfigures the carousel at runtime.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{CarouselError, Result};
use crate::item::{is_image, is_video, ImageItem, RingItem, VideoItem};

const CONFIG_FILE: &str = "carousel.json";
const CONFIG_ENV: &str = "CAROUSEL_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ItemSource {
    Path(PathBuf),
    Video { video: PathBuf, poster: Option<PathBuf> },
}

impl ItemSource {
    fn into_item(self, base: &Path) -> RingItem {
        match self {
            ItemSource::Path(p) => RingItem::from_path(base.join(p)),
            ItemSource::Video { video, poster } => {
                RingItem::Video(VideoItem::new(base.join(video), poster.map(|p| base.join(p))))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CarouselConfig {
    pub radius: f32,
    pub min_radius: f32,
    pub auto_rotate: bool,
    /// Seconds per revolution; negative spins the other way.
    pub rotate_speed: f32,
    pub item_width: f32,
    pub item_height: f32,
    pub music: Option<PathBuf>,
    pub music_controls: bool,
    /// Cover + gift trigger present.
    pub gift: bool,
    pub caption: Option<String>,
    pub items: Vec<ItemSource>,
    /// Scanned when `items` is empty.
    pub photo_dir: PathBuf,
    /// Paths in the file are relative to this; set by the loader.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            radius: 200.0,
            min_radius: 80.0,
            auto_rotate: true,
            rotate_speed: -60.0,
            item_width: 120.0,
            item_height: 170.0,
            music: Some(PathBuf::from("music/setlove.mp3")),
            music_controls: false,
            gift: true,
            caption: Some("Happy Birthday!".to_string()),
            items: Vec::new(),
            photo_dir: PathBuf::from("assets/photos"),
            base_dir: PathBuf::new(),
        }
    }
}

impl CarouselConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CarouselError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: CarouselConfig =
            serde_json::from_str(&text).map_err(|source| CarouselError::Config {
                path: path.to_path_buf(),
                source,
            })?;
        // assets/carousel.json 的路径相对于 assets 的上一级
        let dir = path.parent().unwrap_or(Path::new(""));
        let base = if dir.ends_with("assets") {
            dir.parent().unwrap_or(dir)
        } else {
            dir
        };
        config.base_dir = base.to_path_buf();
        Ok(config)
    }

    /// Resolve from CLI/env/search path; any failure falls back to defaults.
    pub fn load() -> Self {
        let Some(path) = resolve_config_path(std::env::args()) else {
            log::info!("no {} found, using defaults", CONFIG_FILE);
            return Self::default();
        };
        match Self::from_file(&path) {
            Ok(config) => {
                log::info!("config loaded from {:?}", path);
                config
            }
            Err(e) => {
                log::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    pub fn music_path(&self) -> Option<PathBuf> {
        self.music.as_ref().map(|m| self.base_dir.join(m))
    }

    /// Ring items in collection order.
    pub fn ring_items(&self) -> Vec<RingItem> {
        if !self.items.is_empty() {
            return self
                .items
                .iter()
                .cloned()
                .map(|s| s.into_item(&self.base_dir))
                .collect();
        }

        let dir = self.base_dir.join(&self.photo_dir);
        let entries = match std::fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) => {
                log::warn!("cannot list {:?}: {}", dir, e);
                return Vec::new();
            }
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| is_image(p) || is_video(p))
            .collect();
        paths.sort();
        paths
            .into_iter()
            .map(|p| {
                if is_video(&p) {
                    RingItem::Video(VideoItem::new(p, None))
                } else {
                    RingItem::Image(ImageItem::new(p))
                }
            })
            .collect()
    }
}

/// --config <path>, then $CAROUSEL_CONFIG, then the asset search path.
pub fn resolve_config_path(args: impl IntoIterator<Item = String>) -> Option<PathBuf> {
    let mut it = args.into_iter();
    while let Some(a) = it.next() {
        if a == "--config" {
            if let Some(v) = it.next() {
                return Some(PathBuf::from(v));
            }
        }
    }

    if let Ok(v) = std::env::var(CONFIG_ENV) {
        if !v.trim().is_empty() {
            return Some(PathBuf::from(v));
        }
    }

    find_config_file()
}

/// Find assets/carousel.json by searching:
/// 1) <exe_dir>/assets/carousel.json
/// 2) ./assets/carousel.json
fn find_config_file() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join("assets").join(CONFIG_FILE);
            if p.exists() {
                return Some(p);
            }
        }
    }

    let p = PathBuf::from("assets").join(CONFIG_FILE);
    if p.exists() {
        return Some(p);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_stock_page() {
        let c = CarouselConfig::default();
        assert_eq!(c.radius, 200.0);
        assert!(c.auto_rotate);
        assert_eq!(c.rotate_speed, -60.0);
        assert_eq!((c.item_width, c.item_height), (120.0, 170.0));
        assert!(!c.music_controls);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c: CarouselConfig = serde_json::from_str(
            r#"{ "radius": 260, "gift": false, "items": ["a.jpg", { "video": "b.mp4", "poster": "b.jpg" }] }"#,
        )
        .unwrap();
        assert_eq!(c.radius, 260.0);
        assert!(!c.gift);
        assert_eq!(c.min_radius, 80.0);

        let items = c.ring_items();
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], RingItem::Image(_)));
        assert_eq!(items[1].still(), Some(Path::new("b.jpg")));
    }

    #[test]
    fn cli_flag_wins() {
        let args = ["app", "--config", "/tmp/x.json"].map(String::from);
        assert_eq!(resolve_config_path(args), Some(PathBuf::from("/tmp/x.json")));
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let err = CarouselConfig::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, CarouselError::Io { .. }));
    }
}
