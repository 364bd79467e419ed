//! Voice Chatbot Audio Core
//!
//! Captures streaming microphone audio through an external audio
//! subprocess, detects utterance boundaries with energy-based VAD and
//! adaptive noise calibration, and streams synthesized speech back to a
//! playback sink.
//!
//! # Architecture
//!
//! - `audio`: capture negotiation, noise calibration, VAD, playback
//! - `pipeline`: collaborator traits (STT/LLM/TTS) and the turn driver
//! - `stop`: cooperative stop-signal capability
//! - `wav`: WAV persistence for diagnostic flows
//! - `config`: configuration structures
//! - `error`: error types
//!
//! # Example
//!
//! ```no_run
//! use voicebot::{Config, Listener, PwCatBackend, StopSignal};
//!
//! let config = Config::default();
//! let listener = Listener::new(&config);
//! let mut backend = PwCatBackend::new(&config.capture);
//! let stop = StopSignal::new();
//!
//! match listener.listen(&mut backend, &stop) {
//!     Ok(result) => println!("{:?}", result),
//!     Err(e) => eprintln!("listen failed: {}", e),
//! }
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod stop;
pub mod wav;

// Re-exports for convenience
pub use audio::{
    ListenResult, Listener, NoiseProfile, PlaybackReport, PlaybackStreamer, PwCatBackend,
    PwCatPlayback, SynthesisChunk, Utterance, VadOutcome, VadStateMachine,
};
pub use config::{CaptureConfig, Config};
pub use error::{AudioError, ConfigError, Result, VoiceError};
pub use pipeline::{Conversation, ResponseGenerator, Synthesizer, Transcriber, TurnResult};
pub use stop::{StopButton, StopSignal};
