//! Cooperative stop signal for listening and playback loops
//!
//! Combines a process-level flag (set from the Ctrl+C handler) with an
//! optional hardware-button poll. The audio loops only ever see a boolean
//! capability, never the concrete binding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Optional external stop button capability
pub enum StopButton {
    /// A pollable button (e.g. GPIO); the closure returns true while pressed
    Available(Box<dyn Fn() -> bool + Send + Sync>),
    /// No button hardware bound
    Unavailable,
}

/// Stop signal checked once per frame-processing iteration
pub struct StopSignal {
    flag: Arc<AtomicBool>,
    button: StopButton,
}

impl StopSignal {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            button: StopButton::Unavailable,
        }
    }

    pub fn with_button(poll: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            button: StopButton::Available(Box::new(poll)),
        }
    }

    /// Route SIGINT to this signal.
    pub fn install_ctrlc(&self) -> Result<(), ctrlc::Error> {
        let flag = Arc::clone(&self.flag);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
    }

    /// Assert the stop signal programmatically.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Re-arm after a handled stop so the next attempt can run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        match &self.button {
            StopButton::Available(poll) => poll(),
            StopButton::Unavailable => false,
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}
