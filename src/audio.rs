// audio.rs — 背景音乐：symphonia 解码，cpal 输出

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use gift_carousel::{CarouselError, Result};

fn rejected(source: &Path, reason: impl ToString) -> CarouselError {
    CarouselError::PlaybackRejected {
        source_path: source.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Decoded, device-rate samples shared with the output callback.
#[derive(Debug)]
pub struct Playback {
    /// Interleaved, `channels` per frame.
    samples: Vec<f32>,
    channels: usize,
    cursor: usize,
    playing: bool,
    looping: bool,
    /// The decoder thread has delivered everything.
    complete: bool,
}

impl Playback {
    pub fn new(channels: usize, looping: bool) -> Self {
        Self {
            samples: Vec::new(),
            channels: channels.max(1),
            cursor: 0,
            playing: true,
            looping,
            complete: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn append(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    pub fn finish(&mut self) {
        self.complete = true;
    }

    /// Fill an interleaved device buffer. Silence while paused or while the
    /// decoder is behind; the end of a looping track wraps to the start.
    pub fn fill(&mut self, out: &mut [f32]) {
        for frame in out.chunks_mut(self.channels) {
            if !self.playing {
                frame.fill(0.0);
                continue;
            }
            if self.cursor + self.channels > self.samples.len() {
                if !self.complete || self.samples.is_empty() {
                    frame.fill(0.0);
                    continue;
                }
                if !self.looping {
                    self.playing = false;
                    frame.fill(0.0);
                    continue;
                }
                self.cursor = 0;
            }
            let n = frame.len();
            frame.copy_from_slice(&self.samples[self.cursor..self.cursor + n]);
            self.cursor += self.channels;
        }
    }
}

/// Linear sample-rate and channel-count conversion, carried across chunks.
#[derive(Debug, Clone)]
pub struct Resampler {
    /// Input frames per output frame.
    step: f64,
    /// Read position in the current input chunk, in frames.
    pos: f64,
    in_channels: usize,
    out_channels: usize,
}

impl Resampler {
    pub fn new(in_rate: u32, out_rate: u32, in_channels: usize, out_channels: usize) -> Self {
        Self {
            step: in_rate.max(1) as f64 / out_rate.max(1) as f64,
            pos: 0.0,
            in_channels: in_channels.max(1),
            out_channels: out_channels.max(1),
        }
    }

    /// Convert one interleaved chunk, appending output frames to `out`.
    /// Output channels beyond the input's repeat its last channel.
    pub fn push(&mut self, input: &[f32], out: &mut Vec<f32>) {
        let frames = input.len() / self.in_channels;
        while self.pos < frames as f64 {
            let i = self.pos as usize;
            let j = (i + 1).min(frames - 1);
            let frac = (self.pos - i as f64) as f32;
            for c in 0..self.out_channels {
                let ch = c.min(self.in_channels - 1);
                let a = input[i * self.in_channels + ch];
                let b = input[j * self.in_channels + ch];
                out.push(a + (b - a) * frac);
            }
            self.pos += self.step;
        }
        self.pos -= frames as f64;
    }
}

/// A probed track with its codec ready; decoding happens on a worker thread.
struct TrackDecoder {
    source: PathBuf,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
}

impl TrackDecoder {
    fn open(source: &Path) -> Result<Self> {
        let file = File::open(source).map_err(|e| rejected(source, e))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = source.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }
        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| rejected(source, e))?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| rejected(source, "no audio track"))?;
        let track_id = track.id;
        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| rejected(source, e))?;

        Ok(Self {
            source: source.to_path_buf(),
            format,
            decoder,
            track_id,
        })
    }

    /// Decode in the background, feeding `state` at `out_rate` / `out_channels`.
    fn spawn(mut self, state: Arc<Mutex<Playback>>, out_rate: u32, out_channels: usize) {
        thread::spawn(move || {
            let mut resampler: Option<Resampler> = None;
            let mut chunk = Vec::new();
            loop {
                // 播放器已释放
                if Arc::strong_count(&state) == 1 {
                    return;
                }
                let packet = match self.format.next_packet() {
                    Ok(p) => p,
                    Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                    Err(e) => {
                        log::warn!("{:?}: stopped reading: {}", self.source, e);
                        break;
                    }
                };
                if packet.track_id() != self.track_id {
                    continue;
                }
                let decoded = match self.decoder.decode(&packet) {
                    Ok(d) => d,
                    Err(SymphoniaError::DecodeError(e)) => {
                        log::debug!("{:?}: skipped a bad packet: {}", self.source, e);
                        continue;
                    }
                    Err(e) => {
                        log::warn!("{:?}: stopped decoding: {}", self.source, e);
                        break;
                    }
                };

                let spec = *decoded.spec();
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);

                let r = resampler.get_or_insert_with(|| {
                    Resampler::new(spec.rate, out_rate, spec.channels.count(), out_channels)
                });
                r.in_channels = spec.channels.count().max(1);
                chunk.clear();
                r.push(buf.samples(), &mut chunk);

                match state.lock() {
                    Ok(mut p) => p.append(&chunk),
                    Err(_) => return,
                }
            }
            if let Ok(mut p) = state.lock() {
                p.finish();
            }
            log::debug!("{:?} fully decoded", self.source);
        });
    }
}

/// Background music on the default output device.
pub struct MusicPlayer {
    source: PathBuf,
    state: Arc<Mutex<Playback>>,
    _stream: cpal::Stream,
}

impl MusicPlayer {
    /// Probe the track, open the device and start playing while the rest of
    /// the file decodes. Any failure on the way is a rejected playback.
    pub fn open(source: &Path, looping: bool) -> Result<Self> {
        let track = TrackDecoder::open(source)?;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| rejected(source, "no output device"))?;
        let config = device
            .default_output_config()
            .map_err(|e| rejected(source, e))?
            .config();
        let channels = config.channels as usize;

        let state = Arc::new(Mutex::new(Playback::new(channels, looping)));
        let shared = Arc::clone(&state);
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| match shared.lock() {
                    Ok(mut p) => p.fill(data),
                    Err(_) => data.fill(0.0),
                },
                |err| log::warn!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| rejected(source, e))?;
        stream.play().map_err(|e| rejected(source, e))?;

        track.spawn(Arc::clone(&state), config.sample_rate.0, channels);
        log::info!("playing {:?} at {} Hz", source, config.sample_rate.0);

        Ok(Self {
            source: source.to_path_buf(),
            state,
            _stream: stream,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().map(|p| p.is_playing()).unwrap_or(false)
    }

    pub fn set_playing(&self, playing: bool) {
        if let Ok(mut p) = self.state.lock() {
            p.set_playing(playing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_stereo_passes_through() {
        let mut r = Resampler::new(48_000, 48_000, 2, 2);
        let mut out = Vec::new();
        r.push(&[0.1, 0.2, 0.3, 0.4], &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn mono_fans_out_and_upsamples() {
        let mut r = Resampler::new(1, 2, 1, 2);
        let mut out = Vec::new();
        r.push(&[0.0, 1.0, 2.0, 3.0], &mut out);
        let left: Vec<f32> = out.iter().step_by(2).copied().collect();
        assert_eq!(left, vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.0]);
        assert!(out.chunks(2).all(|f| f[0] == f[1]));

        // 下一块从 0 继续
        out.clear();
        r.push(&[4.0], &mut out);
        assert_eq!(out, vec![4.0, 4.0, 4.0, 4.0]);
    }

    #[test]
    fn downsampling_drops_frames() {
        let mut r = Resampler::new(2, 1, 1, 1);
        let mut out = Vec::new();
        r.push(&[0.0, 1.0, 2.0, 3.0, 4.0], &mut out);
        assert_eq!(out, vec![0.0, 2.0, 4.0]);
        out.clear();
        r.push(&[5.0, 6.0], &mut out);
        assert_eq!(out, vec![6.0]);
    }

    #[test]
    fn looping_track_wraps() {
        let mut p = Playback::new(2, true);
        p.append(&[1.0, 1.0, 2.0, 2.0]);
        p.finish();
        let mut out = [0.0; 6];
        p.fill(&mut out);
        assert_eq!(out, [1.0, 1.0, 2.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn one_shot_track_stops_at_the_end() {
        let mut p = Playback::new(1, false);
        p.append(&[0.5]);
        p.finish();
        let mut out = [9.0; 3];
        p.fill(&mut out);
        assert_eq!(out, [0.5, 0.0, 0.0]);
        assert!(!p.is_playing());
    }

    #[test]
    fn starved_or_paused_output_is_silent() {
        let mut p = Playback::new(1, true);
        p.append(&[0.5]);
        let mut out = [9.0; 2];
        p.fill(&mut out);
        assert_eq!(out, [0.5, 0.0]);
        assert!(p.is_playing());

        p.append(&[0.7]);
        p.set_playing(false);
        let mut out = [9.0; 1];
        p.fill(&mut out);
        assert_eq!(out, [0.0]);

        p.set_playing(true);
        p.fill(&mut out);
        assert_eq!(out, [0.7]);
    }

    #[test]
    fn unreadable_sources_are_rejected_before_the_device() {
        let missing = TrackDecoder::open(Path::new("/nonexistent/track.mp3"));
        assert!(matches!(missing, Err(CarouselError::PlaybackRejected { .. })));

        let path = std::env::temp_dir().join("gift_carousel_not_audio.mp3");
        std::fs::write(&path, b"this is not an audio file at all").unwrap();
        let garbage = TrackDecoder::open(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(garbage, Err(CarouselError::PlaybackRejected { .. })));
    }
}
