//! Scripted capture sources for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::audio::source::{CaptureBackend, FrameRead, FrameSource};
use crate::config::CaptureConfig;
use crate::error::AudioError;

/// In-memory frame source replaying a fixed script of frames
#[derive(Debug)]
pub(crate) struct ScriptedSource {
    frames: VecDeque<Vec<u8>>,
    fail_first_read: bool,
    diagnostics: String,
    shut_down: bool,
    live_counter: Option<Arc<AtomicUsize>>,
}

impl ScriptedSource {
    pub(crate) fn with_frames(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into(),
            fail_first_read: false,
            diagnostics: String::new(),
            shut_down: false,
            live_counter: None,
        }
    }

    /// A source that immediately reports end-of-stream (device refused)
    pub(crate) fn empty() -> Self {
        Self::with_frames(Vec::new())
    }

    /// A source whose first read fails with an IO error
    pub(crate) fn failing() -> Self {
        let mut source = Self::empty();
        source.fail_first_read = true;
        source
    }

    pub(crate) fn with_diagnostics(mut self, text: &str) -> Self {
        self.diagnostics = text.to_string();
        self
    }

    fn track(&mut self, counter: Arc<AtomicUsize>) {
        counter.fetch_add(1, Ordering::SeqCst);
        self.live_counter = Some(counter);
    }
}

impl FrameSource for ScriptedSource {
    fn read_frame(&mut self) -> std::io::Result<FrameRead> {
        if self.fail_first_read {
            self.fail_first_read = false;
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted read failure",
            ));
        }
        Ok(match self.frames.pop_front() {
            Some(frame) => FrameRead::Frame(frame),
            None => FrameRead::EndOfStream,
        })
    }

    fn diagnostics(&mut self) -> String {
        std::mem::take(&mut self.diagnostics)
    }

    fn shutdown(&mut self) {
        if !self.shut_down {
            self.shut_down = true;
            if let Some(counter) = &self.live_counter {
                counter.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Backend handing out scripted sources in order
pub(crate) struct ScriptedBackend {
    sources: VecDeque<ScriptedSource>,
    opened: usize,
    live: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub(crate) fn new(sources: Vec<ScriptedSource>) -> Self {
        Self {
            sources: sources.into(),
            opened: 0,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many sources were opened so far
    pub(crate) fn opened(&self) -> usize {
        self.opened
    }

    /// Sources opened but not yet shut down
    pub(crate) fn live_sources(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for ScriptedBackend {
    type Source = ScriptedSource;

    fn open(&mut self, _config: &CaptureConfig) -> Result<Self::Source, AudioError> {
        let mut source = self.sources.pop_front().ok_or(AudioError::NoWorkingConfig {
            attempts: self.opened,
        })?;
        self.opened += 1;
        source.track(Arc::clone(&self.live));
        Ok(source)
    }
}
