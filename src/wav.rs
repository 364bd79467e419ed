//! WAV persistence for diagnostic and test flows

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::audio::Utterance;
use crate::error::{Result, VoiceError};

/// Write an utterance as an uncompressed 16-bit WAV file.
pub fn save_wav<P: AsRef<Path>>(utterance: &Utterance, path: P) -> Result<()> {
    let spec = WavSpec {
        channels: utterance.channels,
        sample_rate: utterance.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer =
        WavWriter::create(path, spec).map_err(|e| VoiceError::Wav(e.to_string()))?;

    for sample in utterance.samples() {
        writer
            .write_sample(sample)
            .map_err(|e| VoiceError::Wav(e.to_string()))?;
    }

    writer.finalize().map_err(|e| VoiceError::Wav(e.to_string()))?;
    Ok(())
}

/// Read a 16-bit WAV file back into f32 samples in [-1, 1] plus its
/// sample rate. Multi-channel files are downmixed to mono.
pub fn read_samples<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(path).map_err(|e| VoiceError::Wav(e.to_string()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().filter_map(|s| s.ok()).collect(),
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .filter_map(|s| s.ok())
                .map(|s| s as f32 / max_val)
                .collect()
        }
    };

    let mono: Vec<f32> = if spec.channels > 1 {
        samples
            .chunks(spec.channels as usize)
            .map(|chunk| chunk.iter().sum::<f32>() / spec.channels as f32)
            .collect()
    } else {
        samples
    };

    Ok((mono, spec.sample_rate))
}
