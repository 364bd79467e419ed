//! Streaming playback of synthesized speech
//!
//! Synthesis produces floating-point sample chunks lazily; each reply
//! opens exactly one playback subprocess and writes chunks as they
//! arrive, so multi-chunk replies play without gaps or restarts.

use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::audio::source::terminate_child;
use crate::config::PlaybackSettings;
use crate::error::AudioError;

/// One chunk of synthesized audio: mono f32 samples at a fixed rate.
///
/// All chunks within one reply must share the same sample rate.
#[derive(Debug, Clone)]
pub struct SynthesisChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// How a playback run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackReport {
    /// False when a sink write failed and playback ended early
    pub completed: bool,
    pub chunks_written: usize,
}

/// Destination for converted PCM, one per reply
pub trait PlaybackSink {
    /// Write raw s16le PCM bytes.
    fn write_pcm(&mut self, pcm: &[u8]) -> std::io::Result<()>;

    /// Close the stream and wait for the sink to drain.
    fn finish(&mut self) -> std::io::Result<()>;
}

/// Opens playback sinks at a given sample rate
pub trait PlaybackBackend {
    type Sink: PlaybackSink;

    fn open(&mut self, sample_rate: u32) -> Result<Self::Sink, AudioError>;
}

/// Playback sink wrapping one `pw-cat --playback` subprocess
pub struct PwCatSink {
    child: Child,
    stdin: Option<ChildStdin>,
    shutdown_wait: Duration,
}

impl PlaybackSink for PwCatSink {
    fn write_pcm(&mut self, pcm: &[u8]) -> std::io::Result<()> {
        match self.stdin.as_mut() {
            Some(stdin) => stdin.write_all(pcm),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "playback stream already closed",
            )),
        }
    }

    fn finish(&mut self) -> std::io::Result<()> {
        // Dropping stdin closes the pipe so the sink drains and exits.
        drop(self.stdin.take());
        let status = self.child.wait()?;
        if !status.success() {
            warn!("Playback subprocess exited with {}", status);
        }
        Ok(())
    }
}

impl Drop for PwCatSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        terminate_child(&mut self.child, self.shutdown_wait);
    }
}

/// Production playback backend spawning `pw-cat` playback processes.
///
/// Output is fixed to a single channel; synthesis is mono.
pub struct PwCatPlayback {
    target: Option<String>,
    shutdown_wait: Duration,
}

impl PwCatPlayback {
    pub fn new(settings: &PlaybackSettings) -> Self {
        Self {
            target: settings.target.clone(),
            shutdown_wait: Duration::from_millis(800),
        }
    }
}

impl PlaybackBackend for PwCatPlayback {
    type Sink = PwCatSink;

    fn open(&mut self, sample_rate: u32) -> Result<Self::Sink, AudioError> {
        let mut cmd = Command::new("pw-cat");
        cmd.args(["--playback", "-", "--format", "s16"])
            .args(["--rate", &sample_rate.to_string()])
            .args(["--channels", "1"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(target) = &self.target {
            cmd.args(["--target", target]);
        }

        debug!("Spawning playback: pw-cat --playback @ {} Hz", sample_rate);

        let mut child = cmd.spawn().map_err(|source| AudioError::SpawnFailed {
            command: format!("pw-cat --playback @ {} Hz", sample_rate),
            source,
        })?;
        let stdin = child.stdin.take();

        Ok(PwCatSink {
            child,
            stdin,
            shutdown_wait: self.shutdown_wait,
        })
    }
}

/// Convert f32 samples (clamped to [-1, 1]) to little-endian s16 PCM.
pub fn chunk_to_pcm(samples: &[f32]) -> Vec<u8> {
    let mut pcm = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        pcm.extend_from_slice(&value.to_le_bytes());
    }
    pcm
}

/// Streams synthesis chunks into a playback sink
pub struct PlaybackStreamer<B> {
    backend: B,
}

impl<B: PlaybackBackend> PlaybackStreamer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Play a sequence of synthesis chunks through one sink.
    ///
    /// The sink is opened at the first chunk's sample rate; a later chunk
    /// with a different rate is a collaborator precondition violation and
    /// is rejected before anything malformed is written. A sink write
    /// failure ends playback early but is not an error: it is reported in
    /// the returned `PlaybackReport`.
    pub fn play(
        &mut self,
        chunks: impl IntoIterator<Item = SynthesisChunk>,
    ) -> Result<PlaybackReport, AudioError> {
        let mut chunks = chunks.into_iter();

        let Some(first) = chunks.next() else {
            debug!("Nothing to play");
            return Ok(PlaybackReport {
                completed: true,
                chunks_written: 0,
            });
        };

        let sample_rate = first.sample_rate;
        let mut sink = self.backend.open(sample_rate)?;
        let mut report = PlaybackReport {
            completed: true,
            chunks_written: 0,
        };

        let mut pending = Some(first);
        while let Some(chunk) = pending.take().or_else(|| chunks.next()) {
            if chunk.sample_rate != sample_rate {
                return Err(AudioError::SampleRateMismatch {
                    expected: sample_rate,
                    actual: chunk.sample_rate,
                });
            }

            let pcm = chunk_to_pcm(&chunk.samples);
            trace!("Writing {} PCM bytes to playback sink", pcm.len());
            if let Err(e) = sink.write_pcm(&pcm) {
                warn!("Playback write failed, ending reply early: {}", e);
                report.completed = false;
                break;
            }
            report.chunks_written += 1;
        }

        if let Err(e) = sink.finish() {
            warn!("Playback sink did not drain cleanly: {}", e);
            report.completed = false;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink mirroring every write into the backend's shared buffer,
    /// optionally failing after a number of writes.
    struct MemorySink {
        fail_after: Option<usize>,
        writes: usize,
        captured: std::rc::Rc<std::cell::RefCell<Vec<u8>>>,
    }

    struct MemoryBackend {
        fail_after: Option<usize>,
        opened_rates: Vec<u32>,
        captured: std::rc::Rc<std::cell::RefCell<Vec<u8>>>,
    }

    impl PlaybackSink for MemorySink {
        fn write_pcm(&mut self, pcm: &[u8]) -> std::io::Result<()> {
            if let Some(limit) = self.fail_after {
                if self.writes >= limit {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "sink gone",
                    ));
                }
            }
            self.writes += 1;
            self.captured.borrow_mut().extend_from_slice(pcm);
            Ok(())
        }

        fn finish(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl PlaybackBackend for MemoryBackend {
        type Sink = MemorySink;

        fn open(&mut self, sample_rate: u32) -> Result<Self::Sink, AudioError> {
            self.opened_rates.push(sample_rate);
            Ok(MemorySink {
                fail_after: self.fail_after,
                writes: 0,
                captured: std::rc::Rc::clone(&self.captured),
            })
        }
    }

    fn backend(fail_after: Option<usize>) -> MemoryBackend {
        MemoryBackend {
            fail_after,
            opened_rates: Vec::new(),
            captured: std::rc::Rc::new(std::cell::RefCell::new(Vec::new())),
        }
    }

    fn chunk(samples: Vec<f32>, rate: u32) -> SynthesisChunk {
        SynthesisChunk {
            samples,
            sample_rate: rate,
        }
    }

    #[test]
    fn test_conversion_clamps_and_scales() {
        let pcm = chunk_to_pcm(&[0.0, 1.0, -1.0, 2.0, -2.0, 0.5]);
        let samples: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(samples[0], 0);
        assert_eq!(samples[1], 32767);
        assert_eq!(samples[2], -32767);
        assert_eq!(samples[3], 32767); // clamped
        assert_eq!(samples[4], -32767); // clamped
        assert_eq!(samples[5], (0.5f32 * 32767.0) as i16);
    }

    #[test]
    fn test_chunks_concatenate_byte_for_byte() {
        let chunks = vec![
            chunk(vec![0.1; 7], 24000),
            chunk(vec![-0.2; 13], 24000),
            chunk(vec![0.3; 1], 24000),
            chunk(vec![0.0; 256], 24000),
        ];
        let mut expected = Vec::new();
        for c in &chunks {
            expected.extend_from_slice(&chunk_to_pcm(&c.samples));
        }

        let mut streamer = PlaybackStreamer::new(backend(None));
        let report = streamer.play(chunks).unwrap();

        assert!(report.completed);
        assert_eq!(report.chunks_written, 4);
        assert_eq!(*streamer.backend.captured.borrow(), expected);
        assert_eq!(streamer.backend.opened_rates, vec![24000]);
    }

    #[test]
    fn test_empty_reply_opens_no_sink() {
        let mut streamer = PlaybackStreamer::new(backend(None));
        let report = streamer.play(Vec::new()).unwrap();
        assert!(report.completed);
        assert_eq!(report.chunks_written, 0);
        assert!(streamer.backend.opened_rates.is_empty());
    }

    #[test]
    fn test_write_failure_ends_early_without_error() {
        let chunks = vec![
            chunk(vec![0.1; 10], 24000),
            chunk(vec![0.2; 10], 24000),
            chunk(vec![0.3; 10], 24000),
        ];
        let mut streamer = PlaybackStreamer::new(backend(Some(1)));
        let report = streamer.play(chunks).unwrap();

        assert!(!report.completed);
        assert_eq!(report.chunks_written, 1);
    }

    #[test]
    fn test_sample_rate_mismatch_rejected() {
        let chunks = vec![chunk(vec![0.1; 10], 24000), chunk(vec![0.2; 10], 22050)];
        let mut streamer = PlaybackStreamer::new(backend(None));
        let err = streamer.play(chunks).unwrap_err();

        assert!(matches!(
            err,
            AudioError::SampleRateMismatch {
                expected: 24000,
                actual: 22050
            }
        ));
        // The mismatching chunk was never written
        assert_eq!(streamer.backend.captured.borrow().len(), 10 * 2);
    }
}
