// desktop.rs — 桌面端的外部协作者：彩纸炮与背景音乐

use std::path::Path;

use glam::Vec2;

use gift_carousel::particles::{BurstOptions, ConfettiCannon};
use gift_carousel::{Effects, Result};

use crate::audio::MusicPlayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicStatus {
    /// Never asked to play.
    Idle,
    Playing,
    Paused,
    /// The last attempt was refused (missing file, no device, bad codec).
    Blocked,
}

pub struct DesktopEffects {
    pub confetti: ConfettiCannon,
    music: Option<MusicPlayer>,
    blocked: bool,
}

impl DesktopEffects {
    pub fn new(viewport: Vec2) -> Self {
        Self {
            confetti: ConfettiCannon::new(viewport),
            music: None,
            blocked: false,
        }
    }

    pub fn music_status(&self) -> MusicStatus {
        match &self.music {
            Some(m) if m.is_playing() => MusicStatus::Playing,
            Some(_) => MusicStatus::Paused,
            None if self.blocked => MusicStatus::Blocked,
            None => MusicStatus::Idle,
        }
    }

    /// Play/pause from the transport controls.
    pub fn toggle_music(&mut self) {
        if let Some(m) = &self.music {
            m.set_playing(!m.is_playing());
        }
    }
}

impl Effects for DesktopEffects {
    fn burst(&mut self, options: BurstOptions) {
        log::debug!("confetti x{}", options.particle_count);
        self.confetti.burst(options);
    }

    fn play_audio(&mut self, source: &Path) -> Result<()> {
        if let Some(m) = self.music.as_ref().filter(|m| m.source() == source) {
            m.set_playing(true);
            return Ok(());
        }
        // 首次播放时才打开设备
        self.music = None;
        match MusicPlayer::open(source, true) {
            Ok(player) => {
                self.music = Some(player);
                self.blocked = false;
                Ok(())
            }
            Err(e) => {
                self.blocked = true;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gift_carousel::CarouselError;

    #[test]
    fn missing_track_is_rejected_not_fatal() {
        let mut fx = DesktopEffects::new(Vec2::new(800.0, 600.0));
        assert_eq!(fx.music_status(), MusicStatus::Idle);
        let err = fx.play_audio(Path::new("/nonexistent/track.mp3"));
        assert!(matches!(err, Err(CarouselError::PlaybackRejected { .. })));
        assert_eq!(fx.music_status(), MusicStatus::Blocked);

        // 没有播放器时切换无效果
        fx.toggle_music();
        assert_eq!(fx.music_status(), MusicStatus::Blocked);
    }

    #[test]
    fn bursts_reach_the_cannon() {
        let mut fx = DesktopEffects::new(Vec2::new(800.0, 600.0));
        fx.burst(BurstOptions::CELEBRATE);
        assert_eq!(fx.confetti.pieces().len(), 80);
    }
}
