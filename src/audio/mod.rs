//! Audio capture, calibration, VAD, and playback modules

pub mod calibrate;
pub mod frame;
pub mod listen;
pub mod negotiate;
pub mod playback;
pub mod source;
pub mod vad;

#[cfg(test)]
pub(crate) mod testing;

pub use calibrate::{calibrate, NoiseProfile};
pub use frame::{frame_bytes, rms_energy};
pub use listen::{ListenResult, Listener, Utterance};
pub use negotiate::{negotiate, Negotiated};
pub use playback::{PlaybackBackend, PlaybackReport, PlaybackSink, PlaybackStreamer, PwCatPlayback, SynthesisChunk};
pub use source::{CaptureBackend, FrameRead, FrameSource, PwCatBackend, PwCatSource};
pub use vad::{VadOutcome, VadPhase, VadStateMachine};
