//! Frame geometry and energy computation

use crate::config::CaptureConfig;

/// Bytes per 16-bit sample
pub const BYTES_PER_SAMPLE: usize = 2;

/// Byte length of one frame of `frame_ms` milliseconds at the given
/// capture configuration (16-bit samples).
pub fn frame_bytes(config: &CaptureConfig, frame_ms: u32) -> usize {
    (config.sample_rate as usize * frame_ms as usize / 1000)
        * BYTES_PER_SAMPLE
        * config.channels as usize
}

/// RMS energy of a frame of little-endian 16-bit signed PCM.
///
/// Computed in floating point so that squaring full-scale samples cannot
/// overflow. A trailing odd byte is ignored.
pub fn rms_energy(pcm: &[u8]) -> f32 {
    let sample_count = pcm.len() / BYTES_PER_SAMPLE;
    if sample_count == 0 {
        return 0.0;
    }

    let sum_squares: f32 = pcm
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|b| {
            let s = i16::from_le_bytes([b[0], b[1]]) as f32;
            s * s
        })
        .sum();

    (sum_squares / sample_count as f32).sqrt()
}

/// Encode i16 samples as little-endian PCM bytes.
pub fn samples_to_pcm(samples: &[i16]) -> Vec<u8> {
    let mut pcm = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for s in samples {
        pcm.extend_from_slice(&s.to_le_bytes());
    }
    pcm
}
