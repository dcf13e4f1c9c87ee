//! WAV file I/O for the native engine
//!
//! Reads any PCM layout hound understands into an [`AudioBuffer`] and writes
//! buffers back out with an explicit [`WavSpec`], so merge results keep the
//! sample rate, channel count and bit depth of the seed they grew from.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::engine::buffer::AudioBuffer;
use crate::error::{MergeError, Result};

/// Read the format header of a WAV file without decoding samples
pub fn probe_wav(path: &Path) -> Result<WavSpec> {
    let reader = WavReader::open(path).map_err(|e| open_error(path, e))?;
    Ok(reader.spec())
}

/// Read a WAV file into a planar buffer
///
/// # Returns
/// The decoded samples together with the file's original spec.
///
/// # Errors
/// * `Engine` - If the file is missing, not a WAV file or has an
///   unsupported bit depth
pub fn read_wav(path: &Path) -> Result<(AudioBuffer, WavSpec)> {
    let reader = WavReader::open(path).map_err(|e| open_error(path, e))?;
    let spec = reader.spec();

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    let buffer =
        AudioBuffer::from_interleaved(&interleaved, spec.channels as usize, spec.sample_rate)?;

    Ok((buffer, spec))
}

/// Write a planar buffer to `path` using `spec`
///
/// The buffer's channel count and rate must already match `spec`. Integer
/// formats clamp out-of-range sums instead of wrapping.
pub fn write_wav(path: &Path, buffer: &AudioBuffer, spec: WavSpec) -> Result<()> {
    if buffer.channels() != spec.channels as usize {
        return Err(MergeError::engine(
            "encode",
            format!(
                "buffer has {} channels but output spec has {}",
                buffer.channels(),
                spec.channels
            ),
        ));
    }

    let mut writer = WavWriter::create(path, spec).map_err(|e| write_error(path, e))?;
    let interleaved = buffer.to_interleaved();

    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => {
            for sample in interleaved {
                writer.write_sample(sample).map_err(|e| write_error(path, e))?;
            }
        }
        (SampleFormat::Int, 8) => {
            for sample in interleaved {
                let scaled = (sample * 127.0).round().clamp(-128.0, 127.0) as i8;
                writer.write_sample(scaled).map_err(|e| write_error(path, e))?;
            }
        }
        (SampleFormat::Int, 16) => {
            for sample in interleaved {
                let scaled = (sample * 32767.0).round().clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(|e| write_error(path, e))?;
            }
        }
        (SampleFormat::Int, 24) => {
            for sample in interleaved {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).round().clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(|e| write_error(path, e))?;
            }
        }
        (SampleFormat::Int, 32) => {
            for sample in interleaved {
                let scaled = (sample as f64 * 2147483647.0)
                    .round()
                    .clamp(-2147483648.0, 2147483647.0) as i32;
                writer.write_sample(scaled).map_err(|e| write_error(path, e))?;
            }
        }
        (format, bits) => {
            return Err(MergeError::engine(
                "encode",
                format!("unsupported WAV layout: {:?} {}-bit", format, bits),
            ));
        }
    }

    writer.finalize().map_err(|e| write_error(path, e))?;

    Ok(())
}

/// Generate a mono sine tone, used to build fixtures
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let frames = (duration_secs * sample_rate as f32).round() as usize;
    let mut buffer = AudioBuffer::new(1, frames, sample_rate);

    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;

    for (i, sample) in buffer.samples[0].iter_mut().enumerate() {
        *sample = 0.5 * (angular_freq * i as f32).sin();
    }

    buffer
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn open_error(path: &Path, e: hound::Error) -> MergeError {
    MergeError::Engine {
        operation: "decode",
        reason: format!("failed to open WAV file {}: {}", path.display(), e),
        source: Some(Box::new(e)),
    }
}

fn write_error(path: &Path, e: hound::Error) -> MergeError {
    MergeError::Engine {
        operation: "encode",
        reason: format!("failed to write WAV file {}: {}", path.display(), e),
        source: Some(Box::new(e)),
    }
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let decode_error = |e: hound::Error| MergeError::Engine {
        operation: "decode",
        reason: format!("failed to read {}-bit samples: {}", bits_per_sample, e),
        source: Some(Box::new(e)),
    };

    match (sample_format, bits_per_sample) {
        (SampleFormat::Float, _) => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(decode_error),
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(decode_error),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(decode_error),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(decode_error),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| (v as f64 / 2147483648.0) as f32))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(decode_error),
        (SampleFormat::Int, bits) => Err(MergeError::engine(
            "decode",
            format!("{}-bit integer audio is not supported", bits),
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use test_case::test_case;

    fn spec(channels: u16, sample_rate: u32, bits: u16, format: SampleFormat) -> WavSpec {
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: bits,
            sample_format: format,
        }
    }

    #[test_case(16, SampleFormat::Int, 0.001 ; "pcm 16")]
    #[test_case(24, SampleFormat::Int, 0.0001 ; "pcm 24")]
    #[test_case(32, SampleFormat::Float, 1e-6 ; "float 32")]
    fn test_write_then_read_preserves_samples(bits: u16, format: SampleFormat, tolerance: f32) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let original = generate_test_tone(440.0, 0.1, 8000);

        write_wav(&path, &original, spec(1, 8000, bits, format)).unwrap();
        let (decoded, decoded_spec) = read_wav(&path).unwrap();

        assert_eq!(decoded_spec.bits_per_sample, bits);
        assert_eq!(decoded.len(), original.len());
        for (orig, dec) in original.samples[0].iter().zip(&decoded.samples[0]) {
            assert!((orig - dec).abs() < tolerance, "{} vs {}", orig, dec);
        }
    }

    #[test]
    fn test_write_empty_buffer_keeps_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seed.wav");
        let empty = AudioBuffer::new(2, 0, 44100);

        write_wav(&path, &empty, spec(2, 44100, 16, SampleFormat::Int)).unwrap();

        let probed = probe_wav(&path).unwrap();
        assert_eq!(probed.channels, 2);
        assert_eq!(probed.sample_rate, 44100);
        let (decoded, _) = read_wav(&path).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.channels(), 2);
    }

    #[test]
    fn test_integer_output_clamps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("loud.wav");
        let loud = AudioBuffer {
            samples: vec![vec![1.8, -1.8]],
            sample_rate: 8000,
        };

        write_wav(&path, &loud, spec(1, 8000, 16, SampleFormat::Int)).unwrap();

        let mut reader = WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![32767, -32768]);
    }

    #[test]
    fn test_channel_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        let mono = AudioBuffer::new(1, 10, 8000);

        let result = write_wav(&path, &mono, spec(2, 8000, 16, SampleFormat::Int));
        assert!(result.is_err());
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_wav(Path::new("/nonexistent/path/audio.wav"));
        match result.unwrap_err() {
            MergeError::Engine { operation, reason, .. } => {
                assert_eq!(operation, "decode");
                assert!(reason.contains("nonexistent"));
            }
            other => panic!("Expected Engine error, got: {:?}", other),
        }
    }
}
