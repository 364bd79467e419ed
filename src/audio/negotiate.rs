//! Capture configuration negotiation
//!
//! The capture device may reject the preferred rate/channel combination,
//! so candidates are probed in priority order until one yields real data.

use tracing::{debug, info, warn};

use crate::audio::source::{CaptureBackend, FrameRead, FrameSource};
use crate::config::CaptureConfig;
use crate::error::AudioError;

/// A working capture stream together with the probe frame that proved it.
///
/// The first frame was consumed to verify the configuration; it is real
/// audio and must be replayed into calibration, not dropped.
#[derive(Debug)]
pub struct Negotiated<S> {
    pub config: CaptureConfig,
    pub source: S,
    pub first_frame: Vec<u8>,
}

/// Try candidate configurations in order until one produces a frame.
///
/// Rejected candidates have their subprocess closed and stderr diagnostics
/// logged; exhausting the list is a typed failure, not a crash.
pub fn negotiate<B: CaptureBackend>(
    backend: &mut B,
    candidates: &[CaptureConfig],
) -> Result<Negotiated<B::Source>, AudioError> {
    for config in candidates {
        debug!("Probing capture config {}", config);

        // A spawn failure means the capture tool itself is broken or
        // missing; trying further candidates cannot help.
        let mut source = backend.open(config)?;

        match source.read_frame() {
            Ok(FrameRead::Frame(first_frame)) => {
                info!("Capture negotiated at {}", config);
                return Ok(Negotiated {
                    config: *config,
                    source,
                    first_frame,
                });
            }
            Ok(FrameRead::EndOfStream) => {
                source.shutdown();
                let err = source.diagnostics();
                if err.is_empty() {
                    warn!("Capture produced no data at {}, trying next", config);
                } else {
                    warn!("Capture refused {}: {}", config, err);
                }
            }
            Err(e) => {
                source.shutdown();
                warn!("Capture read failed at {}: {}", config, e);
            }
        }
    }

    Err(AudioError::NoWorkingConfig {
        attempts: candidates.len(),
    })
}
