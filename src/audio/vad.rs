//! Voice activity detection state machine
//!
//! Frame-driven: the session loop feeds each captured frame and its RMS
//! energy, and the machine tracks speech/silence durations until one of
//! the terminal outcomes is reached. Time advances by one frame period
//! per pushed frame, which keeps the machine fully deterministic.

use tracing::{debug, trace};

use crate::config::VadSettings;

/// Detection phase within one listening attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadPhase {
    /// No speech detected yet
    Idle,
    /// Accumulating an utterance
    Speaking,
}

/// Terminal outcome of a listening attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadOutcome {
    /// Utterance boundaries found (trailing silence after enough speech)
    Completed,
    /// Speech ran past the hard length cap; the buffer is kept as-is
    MaxLengthReached,
    /// No speech detected within the attempt timeout
    TimedOut,
    /// External stop signal; the buffer is discarded
    Cancelled,
}

/// Append-only accumulator for the bytes of the current utterance
#[derive(Debug, Default)]
struct UtteranceBuffer {
    bytes: Vec<u8>,
}

impl UtteranceBuffer {
    fn append(&mut self, frame: &[u8]) {
        self.bytes.extend_from_slice(frame);
    }

    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn discard(&mut self) {
        self.bytes.clear();
    }

    fn freeze(self) -> Vec<u8> {
        self.bytes
    }
}

/// Energy-based VAD state machine for one listening attempt
pub struct VadStateMachine {
    threshold: f32,
    frame_ms: u32,
    end_silence_ms: u32,
    min_speech_ms: u32,
    max_recording_ms: u32,
    attempt_timeout_ms: u32,
    phase: VadPhase,
    silence_ms: u32,
    speech_ms: u32,
    elapsed_ms: u32,
    buffer: UtteranceBuffer,
}

impl VadStateMachine {
    /// Create a machine for one attempt with a calibrated threshold.
    pub fn new(settings: &VadSettings, frame_ms: u32, threshold: f32) -> Self {
        Self {
            threshold,
            frame_ms,
            end_silence_ms: settings.end_silence_ms,
            min_speech_ms: settings.min_speech_ms,
            max_recording_ms: settings.max_recording_ms,
            attempt_timeout_ms: (settings.attempt_timeout_secs * 1000) as u32,
            phase: VadPhase::Idle,
            silence_ms: 0,
            speech_ms: 0,
            elapsed_ms: 0,
            buffer: UtteranceBuffer::default(),
        }
    }

    /// Process one frame with its RMS energy.
    ///
    /// Returns a terminal outcome once the attempt is over; the frame that
    /// triggers speech detection is the first byte of the buffer (frames
    /// are never discarded retroactively).
    pub fn push(&mut self, frame: &[u8], energy: f32) -> Option<VadOutcome> {
        if self.phase == VadPhase::Idle && self.elapsed_ms >= self.attempt_timeout_ms {
            debug!("VAD: attempt timed out after {}ms without speech", self.elapsed_ms);
            return Some(VadOutcome::TimedOut);
        }

        self.elapsed_ms += self.frame_ms;

        match self.phase {
            VadPhase::Idle => {
                if energy > self.threshold {
                    debug!("VAD: Idle -> Speaking (energy {:.1} > {:.1})", energy, self.threshold);
                    self.phase = VadPhase::Speaking;
                    self.silence_ms = 0;
                    self.speech_ms = self.frame_ms;
                    self.buffer.append(frame);
                }
                // Below-threshold idle frames are discarded, not buffered.
            }
            VadPhase::Speaking => {
                self.buffer.append(frame);
                if energy < self.threshold {
                    self.silence_ms += self.frame_ms;
                } else {
                    self.silence_ms = 0;
                    self.speech_ms += self.frame_ms;
                }
                trace!(
                    "VAD: speaking, energy {:.1}, speech {}ms, silence {}ms",
                    energy,
                    self.speech_ms,
                    self.silence_ms
                );

                if self.silence_ms >= self.end_silence_ms && self.speech_ms >= self.min_speech_ms {
                    debug!(
                        "VAD: utterance complete ({} bytes, {}ms speech)",
                        self.buffer.len(),
                        self.speech_ms
                    );
                    return Some(VadOutcome::Completed);
                } else if self.elapsed_ms >= self.max_recording_ms {
                    debug!("VAD: max recording length reached ({} bytes)", self.buffer.len());
                    return Some(VadOutcome::MaxLengthReached);
                }
            }
        }

        None
    }

    /// External stop signal: discard the buffer and end the attempt.
    pub fn cancel(&mut self) -> VadOutcome {
        self.buffer.discard();
        VadOutcome::Cancelled
    }

    /// The capture stream ended. Mid-utterance this finalizes whatever
    /// was buffered; before speech onset there is nothing to deliver.
    pub fn end_of_stream(&self) -> VadOutcome {
        match self.phase {
            VadPhase::Speaking => VadOutcome::Completed,
            VadPhase::Idle => VadOutcome::TimedOut,
        }
    }

    pub fn phase(&self) -> VadPhase {
        self.phase
    }

    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Freeze and hand off the accumulated utterance bytes.
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer.freeze()
    }
}
