use crate::{ParleyError, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use tracing::debug;

/// Encode audio samples into an in-memory WAV blob
///
/// # Arguments
/// * `samples` - Audio samples (f32, range -1.0 to 1.0)
/// * `sample_rate` - Sample rate in Hz
/// * `channels` - Number of channels
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).map_err(|e| {
            ParleyError::AudioProcessingError(format!("Failed to create WAV writer: {}", e))
        })?;

        // Convert f32 samples to i16
        for &sample in samples {
            let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(sample_i16).map_err(|e| {
                ParleyError::AudioProcessingError(format!("Failed to write sample: {}", e))
            })?;
        }

        writer.finalize().map_err(|e| {
            ParleyError::AudioProcessingError(format!("Failed to finalize WAV data: {}", e))
        })?;
    }

    let data = cursor.into_inner();
    debug!("Encoded {} samples into {} WAV bytes", samples.len(), data.len());
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;
    use std::f32::consts::PI;

    #[test]
    fn test_encode_round_trip() {
        let sample_rate = 48000;
        let frequency = 440.0;
        let samples: Vec<f32> = (0..sample_rate as usize)
            .map(|i| (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect();

        let data = encode_wav(&samples, sample_rate, 1).unwrap();

        let reader = WavReader::new(Cursor::new(data)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, sample_rate);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len() as usize, samples.len());
    }

    #[test]
    fn test_encode_empty_capture() {
        // an aborted-then-stopped session can produce zero samples; the
        // header must still be valid
        let data = encode_wav(&[], 48000, 1).unwrap();
        let reader = WavReader::new(Cursor::new(data)).unwrap();
        assert_eq!(reader.len(), 0);
    }

    #[test]
    fn test_clipping_samples_clamped() {
        let samples = vec![2.0f32, -2.0];
        let data = encode_wav(&samples, 48000, 1).unwrap();
        let mut reader = WavReader::new(Cursor::new(data)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![i16::MAX, -i16::MAX]);
    }
}
