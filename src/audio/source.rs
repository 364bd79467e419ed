//! Capture frame sources backed by an external audio subprocess
//!
//! The capture device is a `pw-cat --record` child process whose stdout
//! carries raw s16le PCM. The `FrameSource`/`CaptureBackend` traits keep
//! the negotiation and session loops independent of the concrete child,
//! so tests can substitute scripted sources.

use std::io::{ErrorKind, Read};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::audio::frame::frame_bytes;
use crate::config::{CaptureConfig, CaptureSettings};
use crate::error::AudioError;

/// Result of reading one frame from a capture source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRead {
    /// One complete frame of raw PCM bytes
    Frame(Vec<u8>),
    /// The stream ended; a short read is never surfaced as a partial frame
    EndOfStream,
}

/// One external capture stream delivering fixed-size PCM frames
pub trait FrameSource {
    /// Block until exactly one frame is available, or the stream ends.
    fn read_frame(&mut self) -> std::io::Result<FrameRead>;

    /// Drain any human-readable rejection diagnostics from the source.
    ///
    /// Call after `EndOfStream` (or after `shutdown`); on a live stream
    /// this may block until the underlying process exits.
    fn diagnostics(&mut self) -> String;

    /// Terminate the underlying process. Never fails; safe to call twice.
    fn shutdown(&mut self);
}

/// Opens capture sources for candidate configurations
pub trait CaptureBackend {
    type Source: FrameSource;

    fn open(&mut self, config: &CaptureConfig) -> Result<Self::Source, AudioError>;
}

/// Capture source wrapping one `pw-cat --record` subprocess
pub struct PwCatSource {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<ChildStderr>,
    frame_bytes: usize,
    shutdown_wait: Duration,
    finished: bool,
}

impl PwCatSource {
    fn spawn(
        config: &CaptureConfig,
        frame_ms: u32,
        target: Option<&str>,
        shutdown_wait: Duration,
    ) -> Result<Self, AudioError> {
        let mut cmd = Command::new("pw-cat");
        cmd.args(["--record", "-", "--format", "s16"])
            .args(["--rate", &config.sample_rate.to_string()])
            .args(["--channels", &config.channels.to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(target) = target {
            cmd.args(["--target", target]);
        }

        debug!("Spawning capture: pw-cat --record ({})", config);

        let mut child = cmd.spawn().map_err(|source| AudioError::SpawnFailed {
            command: format!("pw-cat --record ({})", config),
            source,
        })?;

        // Both pipes were requested above, so the handles are present.
        let stdout = child.stdout.take().ok_or_else(|| AudioError::SpawnFailed {
            command: "pw-cat --record".to_string(),
            source: std::io::Error::new(ErrorKind::BrokenPipe, "missing stdout pipe"),
        })?;
        let stderr = child.stderr.take();

        Ok(Self {
            child,
            stdout,
            stderr,
            frame_bytes: frame_bytes(config, frame_ms),
            shutdown_wait,
            finished: false,
        })
    }

    /// Byte length of the frames this source produces
    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }
}

impl FrameSource for PwCatSource {
    fn read_frame(&mut self) -> std::io::Result<FrameRead> {
        let mut buf = vec![0u8; self.frame_bytes];
        let mut filled = 0;

        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => {
                    trace!("Capture stream ended ({} bytes short)", buf.len() - filled);
                    return Ok(FrameRead::EndOfStream);
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(FrameRead::Frame(buf))
    }

    fn diagnostics(&mut self) -> String {
        let Some(mut stderr) = self.stderr.take() else {
            return String::new();
        };

        let mut raw = Vec::new();
        if let Err(e) = stderr.read_to_end(&mut raw) {
            trace!("Failed to drain capture stderr: {}", e);
        }
        String::from_utf8_lossy(&raw).trim().to_string()
    }

    fn shutdown(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        terminate_child(&mut self.child, self.shutdown_wait);
    }
}

impl Drop for PwCatSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Production capture backend spawning `pw-cat` record processes
pub struct PwCatBackend {
    frame_ms: u32,
    target: Option<String>,
    shutdown_wait: Duration,
}

impl PwCatBackend {
    pub fn new(settings: &CaptureSettings) -> Self {
        Self {
            frame_ms: settings.frame_ms,
            target: settings.target.clone(),
            shutdown_wait: Duration::from_millis(settings.shutdown_wait_ms),
        }
    }
}

impl CaptureBackend for PwCatBackend {
    type Source = PwCatSource;

    fn open(&mut self, config: &CaptureConfig) -> Result<Self::Source, AudioError> {
        PwCatSource::spawn(
            config,
            self.frame_ms,
            self.target.as_deref(),
            self.shutdown_wait,
        )
    }
}

/// Terminate a child process: SIGTERM, bounded wait, SIGKILL on timeout.
///
/// All termination errors are swallowed; cleanup must never fail.
pub(crate) fn terminate_child(child: &mut Child, wait: Duration) {
    match child.try_wait() {
        Ok(Some(_)) => return,
        Ok(None) => {}
        Err(e) => {
            trace!("try_wait failed before terminate: {}", e);
        }
    }

    // std's Child only exposes SIGKILL; ask politely first.
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }

    let deadline = Instant::now() + wait;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                trace!("Audio subprocess exited: {}", status);
                return;
            }
            Ok(None) => {}
            Err(e) => {
                trace!("try_wait failed during terminate: {}", e);
                return;
            }
        }
        if Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    warn!("Audio subprocess did not exit in {:?}, killing", wait);
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_failure_is_typed() {
        // A record process can only fail to spawn if the binary is absent;
        // simulate with a command name that cannot exist.
        let mut cmd = Command::new("definitely-not-pw-cat-7f3a");
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let err = cmd.spawn().map(|mut c| {
            let _ = c.kill();
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_terminate_child_swallow_exited() {
        let mut child = Command::new("true").spawn().unwrap();
        let _ = child.wait();
        // Already reaped; terminate must be a no-op, not a panic.
        terminate_child(&mut child, Duration::from_millis(50));
    }

    #[test]
    fn test_terminate_child_kills_long_runner() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let start = Instant::now();
        terminate_child(&mut child, Duration::from_millis(500));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(matches!(child.try_wait(), Ok(Some(_))));
    }
}
