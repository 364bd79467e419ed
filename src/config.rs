//! Configuration structures for the voicebot system

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureSettings,
    pub vad: VadSettings,
    pub calibration: CalibrationSettings,
    pub playback: PlaybackSettings,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self, crate::error::ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| {
            crate::error::ConfigError::FileNotFound(path.display().to_string())
        })?;

        toml::from_str(&content)
            .map_err(|e| crate::error::ConfigError::Parse(e.to_string()))
    }
}

/// One capture configuration candidate: sample rate and channel count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Sample rate (Hz)
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl CaptureConfig {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }
}

impl std::fmt::Display for CaptureConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Hz/{}ch", self.sample_rate, self.channels)
    }
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Preferred sample rate (Hz), tried first
    pub preferred_sample_rate: u32,
    /// Preferred channel count, tried first
    pub preferred_channels: u16,
    /// Fallback sample rate tried when the preferred rate is rejected
    pub fallback_sample_rate: u32,
    /// Capture device target (None = platform default source)
    pub target: Option<String>,
    /// Frame duration in milliseconds (the atomic unit of VAD processing)
    pub frame_ms: u32,
    /// Bounded wait before force-killing the capture subprocess (ms)
    pub shutdown_wait_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            preferred_sample_rate: 16000,
            preferred_channels: 1,
            fallback_sample_rate: 48000,
            target: None,
            frame_ms: 30,
            shutdown_wait_ms: 800,
        }
    }
}

impl CaptureSettings {
    /// Candidate configurations in fixed priority order: preferred rate
    /// mono first, then stereo, then the fallback rate variants.
    pub fn candidates(&self) -> Vec<CaptureConfig> {
        vec![
            CaptureConfig::new(self.preferred_sample_rate, self.preferred_channels),
            CaptureConfig::new(self.preferred_sample_rate, 2),
            CaptureConfig::new(self.fallback_sample_rate, self.preferred_channels),
            CaptureConfig::new(self.fallback_sample_rate, 2),
        ]
    }
}

/// Voice activity detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VadSettings {
    /// Base RMS threshold; the adaptive threshold never drops below this
    pub silence_threshold_base: f32,
    /// Trailing silence that ends an utterance (ms)
    pub end_silence_ms: u32,
    /// Minimum accumulated speech before silence may end the utterance (ms)
    pub min_speech_ms: u32,
    /// Hard cap on utterance length (ms)
    pub max_recording_ms: u32,
    /// Overall listening attempt timeout (seconds)
    pub attempt_timeout_secs: u64,
    /// Utterances shorter than this many bytes are discarded as noise
    pub min_utterance_bytes: usize,
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            silence_threshold_base: 120.0,
            end_silence_ms: 800,
            min_speech_ms: 300,
            max_recording_ms: 15000,
            attempt_timeout_secs: 30,
            min_utterance_bytes: 1000,
        }
    }
}

/// Noise calibration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    /// Number of initial frames sampled for the noise floor (~300ms at 30ms frames)
    pub sample_count: usize,
    /// Multiplier applied to the measured noise floor
    pub noise_factor: f32,
    /// Noise floor assumed when no calibration frames could be read
    pub fallback_noise_floor: f32,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            sample_count: 10,
            noise_factor: 1.8,
            fallback_noise_floor: 50.0,
        }
    }
}

/// Playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Playback device target (None = platform default sink)
    pub target: Option<String>,
    /// Sample rate assumed when a synthesis chunk does not carry one
    pub default_sample_rate: u32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            target: None,
            default_sample_rate: 24000,
        }
    }
}
