//! Adaptive noise floor calibration
//!
//! A short run of initial frames establishes the ambient energy level so
//! the speech threshold tracks the environment instead of a fixed
//! constant. The median is used rather than the mean so one loud
//! transient during calibration cannot skew the floor.

use tracing::{debug, warn};

use crate::audio::frame::rms_energy;
use crate::audio::source::{FrameRead, FrameSource};
use crate::config::{CalibrationSettings, VadSettings};

/// Noise floor estimate and the derived speech threshold.
///
/// Immutable after calibration; one profile per capture session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseProfile {
    pub noise_floor: f32,
    pub threshold: f32,
    /// Frames that actually contributed; fewer than requested means the
    /// stream ended early and the estimate is degraded.
    pub samples_used: usize,
}

/// Measure the noise floor from the already-consumed first frame plus
/// follow-up reads, and derive the detection threshold.
///
/// Calibration never aborts the session: if no frames were collectible
/// the configured fallback floor is used instead.
pub fn calibrate<S: FrameSource>(
    first_frame: &[u8],
    source: &mut S,
    calibration: &CalibrationSettings,
    vad: &VadSettings,
) -> NoiseProfile {
    let mut energies = Vec::with_capacity(calibration.sample_count);
    if !first_frame.is_empty() {
        energies.push(rms_energy(first_frame));
    }

    while energies.len() < calibration.sample_count {
        match source.read_frame() {
            Ok(FrameRead::Frame(frame)) => energies.push(rms_energy(&frame)),
            Ok(FrameRead::EndOfStream) => break,
            Err(e) => {
                warn!("Calibration read failed: {}", e);
                break;
            }
        }
    }

    let samples_used = energies.len();
    let noise_floor = if energies.is_empty() {
        calibration.fallback_noise_floor
    } else {
        median(&mut energies)
    };

    if samples_used < calibration.sample_count {
        // Degraded mode: the estimate stands on fewer samples than asked for.
        warn!(
            "Noise calibration degraded: {}/{} frames collected",
            samples_used, calibration.sample_count
        );
    }

    let threshold = vad
        .silence_threshold_base
        .max(noise_floor * calibration.noise_factor);

    debug!(
        "Noise floor: {:.1} | Threshold: {:.1} ({} samples)",
        noise_floor, threshold, samples_used
    );

    NoiseProfile {
        noise_floor,
        threshold,
        samples_used,
    }
}

fn median(values: &mut [f32]) -> f32 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frame::samples_to_pcm;
    use crate::audio::testing::ScriptedSource;

    fn tone_frame(amplitude: i16) -> Vec<u8> {
        samples_to_pcm(&[amplitude; 480])
    }

    fn defaults() -> (CalibrationSettings, VadSettings) {
        (CalibrationSettings::default(), VadSettings::default())
    }

    #[test]
    fn test_threshold_never_below_baseline() {
        let (calibration, vad) = defaults();
        let mut source = ScriptedSource::with_frames(vec![tone_frame(10); 9]);
        let profile = calibrate(&tone_frame(10), &mut source, &calibration, &vad);

        assert!((profile.noise_floor - 10.0).abs() < 0.1);
        assert_eq!(profile.threshold, 120.0);
        assert_eq!(profile.samples_used, 10);
    }

    #[test]
    fn test_threshold_scales_with_loud_floor() {
        let (calibration, vad) = defaults();
        let mut source = ScriptedSource::with_frames(vec![tone_frame(200); 9]);
        let profile = calibrate(&tone_frame(200), &mut source, &calibration, &vad);

        assert!((profile.noise_floor - 200.0).abs() < 0.5);
        assert!((profile.threshold - 360.0).abs() < 1.0);
    }

    #[test]
    fn test_threshold_monotone_in_floor() {
        let (calibration, vad) = defaults();
        let mut last = 0.0;
        for amplitude in [10i16, 50, 100, 200, 400, 1000] {
            let mut source = ScriptedSource::with_frames(vec![tone_frame(amplitude); 9]);
            let profile = calibrate(&tone_frame(amplitude), &mut source, &calibration, &vad);
            assert!(profile.threshold >= last);
            assert!(profile.threshold >= vad.silence_threshold_base);
            last = profile.threshold;
        }
    }

    #[test]
    fn test_median_resists_transient() {
        let (calibration, vad) = defaults();
        // One loud clap in the middle of otherwise quiet calibration
        let mut frames = vec![tone_frame(40); 9];
        frames[4] = tone_frame(20000);
        let mut source = ScriptedSource::with_frames(frames);
        let profile = calibrate(&tone_frame(40), &mut source, &calibration, &vad);

        assert!((profile.noise_floor - 40.0).abs() < 0.5);
        assert_eq!(profile.threshold, 120.0);
    }

    #[test]
    fn test_early_stream_end_is_degraded_not_fatal() {
        let (calibration, vad) = defaults();
        let mut source = ScriptedSource::with_frames(vec![tone_frame(30); 2]);
        let profile = calibrate(&tone_frame(30), &mut source, &calibration, &vad);

        assert_eq!(profile.samples_used, 3);
        assert!((profile.noise_floor - 30.0).abs() < 0.5);
    }

    #[test]
    fn test_no_frames_falls_back() {
        let (calibration, vad) = defaults();
        let mut source = ScriptedSource::empty();
        let profile = calibrate(&[], &mut source, &calibration, &vad);

        assert_eq!(profile.samples_used, 0);
        assert_eq!(profile.noise_floor, 50.0);
        assert_eq!(profile.threshold, 120.0);
    }
}
