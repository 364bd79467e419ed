//! Custom error types for the voicebot audio core

use thiserror::Error;

/// Main error type for the voicebot system
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(String),

    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

/// Audio capture and playback errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to spawn audio subprocess '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No working capture configuration found ({attempts} candidates tried)")]
    NoWorkingConfig { attempts: usize },

    #[error("Audio stream IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Synthesis sample rate mismatch: stream opened at {expected} Hz, chunk at {actual} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },
}

pub type Result<T> = std::result::Result<T, VoiceError>;
