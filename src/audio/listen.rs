//! Listening session: negotiate, calibrate, then run the VAD loop
//!
//! One synchronous poll loop per listening attempt. Frames are pulled on
//! demand via blocking reads; cancellation and the wall-clock timeout are
//! checked once per iteration, so their resolution is one frame period.

use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::audio::calibrate::calibrate;
use crate::audio::frame::rms_energy;
use crate::audio::negotiate::negotiate;
use crate::audio::source::{CaptureBackend, FrameRead, FrameSource};
use crate::audio::vad::{VadOutcome, VadPhase, VadStateMachine};
use crate::config::{CalibrationSettings, CaptureConfig, CaptureSettings, Config, VadSettings};
use crate::error::Result;
use crate::stop::StopSignal;

/// One continuous span of captured speech
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Raw little-endian 16-bit signed PCM
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Utterance {
    pub fn duration_secs(&self) -> f32 {
        let bytes_per_sec = self.sample_rate as usize * 2 * self.channels as usize;
        self.pcm.len() as f32 / bytes_per_sec as f32
    }

    /// Decode the PCM bytes into i16 samples.
    pub fn samples(&self) -> Vec<i16> {
        self.pcm
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }
}

/// Outcome of one listening attempt
#[derive(Debug)]
pub enum ListenResult {
    /// A complete utterance, ready for transcription
    Utterance(Utterance),
    /// Nothing worth transcribing: timeout, device failure, or audio below
    /// the minimum utterance length
    NoSpeech,
    /// The stop signal was asserted; the buffer was discarded
    Cancelled,
}

/// Runs listening attempts against a capture backend
pub struct Listener {
    capture: CaptureSettings,
    vad: VadSettings,
    calibration: CalibrationSettings,
}

impl Listener {
    pub fn new(config: &Config) -> Self {
        Self {
            capture: config.capture.clone(),
            vad: config.vad.clone(),
            calibration: config.calibration.clone(),
        }
    }

    /// Record one utterance bounded by silence (or by the length cap).
    ///
    /// A failed negotiation surfaces as an error; everything after that
    /// degrades to `NoSpeech` rather than failing the attempt.
    pub fn listen<B: CaptureBackend>(
        &self,
        backend: &mut B,
        stop: &StopSignal,
    ) -> Result<ListenResult> {
        info!("Listening (speak now)");

        let candidates = self.capture.candidates();
        let negotiated = negotiate(backend, &candidates)?;
        let config = negotiated.config;
        let mut source = negotiated.source;

        let profile = calibrate(
            &negotiated.first_frame,
            &mut source,
            &self.calibration,
            &self.vad,
        );

        let mut vad = VadStateMachine::new(&self.vad, self.capture.frame_ms, profile.threshold);
        let attempt_timeout = Duration::from_secs(self.vad.attempt_timeout_secs);
        let started = Instant::now();

        // The probe frame is real audio: evaluate it for speech onset so a
        // user already talking during calibration is not clipped.
        let first_energy = rms_energy(&negotiated.first_frame);
        if let Some(outcome) = vad.push(&negotiated.first_frame, first_energy) {
            return Ok(self.finish(outcome, vad, &config));
        }

        loop {
            if stop.is_stopped() {
                info!("Recording stopped by external signal");
                let outcome = vad.cancel();
                return Ok(self.finish(outcome, vad, &config));
            }

            if started.elapsed() > attempt_timeout {
                let outcome = match vad.phase() {
                    VadPhase::Idle => VadOutcome::TimedOut,
                    // Mid-utterance the cap on elapsed time finalizes
                    // whatever was buffered.
                    VadPhase::Speaking => VadOutcome::Completed,
                };
                return Ok(self.finish(outcome, vad, &config));
            }

            let frame = match source.read_frame() {
                Ok(FrameRead::Frame(frame)) => frame,
                Ok(FrameRead::EndOfStream) => {
                    source.shutdown();
                    let err = source.diagnostics();
                    if !err.is_empty() {
                        warn!("Capture stream ended: {}", err);
                    }
                    return Ok(self.finish(vad.end_of_stream(), vad, &config));
                }
                Err(e) => {
                    // Mid-stream IO failure degrades to end-of-stream.
                    warn!("Capture read error: {}", e);
                    source.shutdown();
                    return Ok(self.finish(vad.end_of_stream(), vad, &config));
                }
            };

            let energy = rms_energy(&frame);
            trace!("Frame energy {:.1}", energy);

            if let Some(outcome) = vad.push(&frame, energy) {
                return Ok(self.finish(outcome, vad, &config));
            }
        }
    }

    fn finish(
        &self,
        outcome: VadOutcome,
        vad: VadStateMachine,
        config: &CaptureConfig,
    ) -> ListenResult {
        match outcome {
            VadOutcome::Completed => {
                let pcm = vad.into_buffer();
                if pcm.len() < self.vad.min_utterance_bytes {
                    debug!(
                        "Utterance too short ({} bytes), treating as noise",
                        pcm.len()
                    );
                    return ListenResult::NoSpeech;
                }
                let utterance = Utterance {
                    pcm,
                    sample_rate: config.sample_rate,
                    channels: config.channels,
                };
                info!("Recorded {:.1}s", utterance.duration_secs());
                ListenResult::Utterance(utterance)
            }
            VadOutcome::MaxLengthReached => {
                let utterance = Utterance {
                    pcm: vad.into_buffer(),
                    sample_rate: config.sample_rate,
                    channels: config.channels,
                };
                info!("Max recording length ({:.1}s)", utterance.duration_secs());
                ListenResult::Utterance(utterance)
            }
            VadOutcome::TimedOut => {
                debug!("No speech detected within the attempt timeout");
                ListenResult::NoSpeech
            }
            VadOutcome::Cancelled => ListenResult::Cancelled,
        }
    }

    /// Record a fixed number of seconds regardless of speech content.
    ///
    /// Used by the audio sanity-check flow; reuses capture negotiation so
    /// it exercises the same device path as real listening.
    pub fn record_fixed<B: CaptureBackend>(
        &self,
        backend: &mut B,
        stop: &StopSignal,
        seconds: u32,
    ) -> Result<Option<Utterance>> {
        let candidates = self.capture.candidates();
        let negotiated = negotiate(backend, &candidates)?;
        let config = negotiated.config;
        let mut source = negotiated.source;

        let total_frames = (seconds * 1000 / self.capture.frame_ms) as usize;
        let mut pcm = negotiated.first_frame;

        for _ in 1..total_frames {
            if stop.is_stopped() {
                break;
            }
            match source.read_frame() {
                Ok(FrameRead::Frame(frame)) => pcm.extend_from_slice(&frame),
                Ok(FrameRead::EndOfStream) => {
                    source.shutdown();
                    let err = source.diagnostics();
                    if !err.is_empty() {
                        warn!("Capture stream ended: {}", err);
                    }
                    break;
                }
                Err(e) => {
                    warn!("Capture read error: {}", e);
                    break;
                }
            }
        }

        if pcm.is_empty() {
            return Ok(None);
        }
        Ok(Some(Utterance {
            pcm,
            sample_rate: config.sample_rate,
            channels: config.channels,
        }))
    }
}
