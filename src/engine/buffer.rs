//! Audio Buffer Management
//!
//! Planar 32-bit float buffer used by the native engine to time-shift and sum
//! clips. Unlike a fixed internal format, the buffer keeps whatever sample
//! rate and channel count the source file had, since the merged output must
//! match the seed's format.

use std::time::Duration;

use crate::error::{MergeError, Result};

// ============================================================================
// Helper Functions
// ============================================================================

/// Number of frames covering `delay` at `sample_rate`, rounded to nearest
///
/// Saturates at `usize::MAX`; growing a buffer that far fails in [`AudioBuffer::mix_at`].
#[inline]
pub fn frames_for(delay: Duration, sample_rate: u32) -> usize {
    let micros = delay.as_micros();
    usize::try_from((micros * sample_rate as u128 + 500_000) / 1_000_000).unwrap_or(usize::MAX)
}

/// Linear interpolation resampling of one channel
///
/// `ratio` is target rate over source rate.
pub fn resample_linear(samples: &[f32], ratio: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let source_len = samples.len();
    let target_len = ((source_len as f64) * ratio).round() as usize;
    let mut output = Vec::with_capacity(target_len);

    for i in 0..target_len {
        // Map output index to source position
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < source_len {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else if src_idx < source_len {
            samples[src_idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Planar audio buffer
///
/// # Example
/// ```
/// use aclip_merge::engine::AudioBuffer;
///
/// // 0.5 seconds of stereo silence at 8 kHz
/// let buffer = AudioBuffer::new(2, 4000, 8000);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.len(), 4000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is frames
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a zeroed buffer with `channels` channels of `frames` frames
    pub fn new(channels: usize, frames: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; frames]; channels],
            sample_rate,
        }
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Errors
    /// * `Engine` - If the data length is not a multiple of the channel count
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(MergeError::engine("decode", "audio has zero channels"));
        }

        if interleaved.len() % channels != 0 {
            return Err(MergeError::engine(
                "decode",
                format!(
                    "interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    channels
                ),
            ));
        }

        let frames = interleaved.len() / channels;
        let mut samples = vec![Vec::with_capacity(frames); channels];

        for frame in interleaved.chunks_exact(channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format (L, R, L, R, ... for stereo)
    pub fn to_interleaved(&self) -> Vec<f32> {
        let frames = self.len();
        let mut interleaved = Vec::with_capacity(self.channels() * frames);

        for frame in 0..frames {
            for channel in &self.samples {
                interleaved.push(channel[frame]);
            }
        }

        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of frames per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer holds no frames
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|&s| s.abs())
            .fold(0.0_f32, f32::max)
    }

    /// Convert to `target` channels
    ///
    /// Mono is duplicated into every channel and anything mixing down to mono
    /// is averaged. Other layouts map channel `i` to source channel
    /// `i % source_channels`.
    pub fn remix(&self, target: usize) -> AudioBuffer {
        let source = self.channels();
        if source == target || source == 0 {
            return self.clone();
        }

        let samples = if target == 1 {
            let frames = self.len();
            let scale = 1.0 / source as f32;
            let mut mono = vec![0.0_f32; frames];
            for channel in &self.samples {
                for (out, &s) in mono.iter_mut().zip(channel) {
                    *out += s * scale;
                }
            }
            vec![mono]
        } else {
            (0..target)
                .map(|ch| self.samples[ch % source].clone())
                .collect()
        };

        AudioBuffer {
            samples,
            sample_rate: self.sample_rate,
        }
    }

    /// Resample every channel to `target_rate`
    pub fn resample(&self, target_rate: u32) -> AudioBuffer {
        if target_rate == self.sample_rate || self.sample_rate == 0 {
            return self.clone();
        }

        let ratio = target_rate as f64 / self.sample_rate as f64;
        AudioBuffer {
            samples: self
                .samples
                .iter()
                .map(|channel| resample_linear(channel, ratio))
                .collect(),
            sample_rate: target_rate,
        }
    }

    /// Sum `other` into this buffer starting at frame `offset`
    ///
    /// The buffer grows to `max(len, offset + other.len())`. No level
    /// normalization is applied. `other` must already share this buffer's
    /// channel count and sample rate.
    ///
    /// # Errors
    /// Returns `Engine` if the grown buffer cannot be allocated.
    pub fn mix_at(&mut self, offset: usize, other: &AudioBuffer) -> Result<()> {
        let end = offset
            .checked_add(other.len())
            .ok_or_else(|| {
                MergeError::engine("mix", format!("offset {} overflows the timeline", offset))
            })?
            .max(self.len());

        for channel in &mut self.samples {
            channel
                .try_reserve(end - channel.len())
                .map_err(|e| MergeError::Engine {
                    operation: "mix",
                    reason: format!("cannot grow buffer to {} frames", end),
                    source: Some(Box::new(e)),
                })?;
            channel.resize(end, 0.0);
        }

        for (dst, src) in self.samples.iter_mut().zip(&other.samples) {
            for (out, &s) in dst[offset..offset + src.len()].iter_mut().zip(src) {
                *out += s;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    fn create_test_buffer(samples: Vec<Vec<f32>>, sample_rate: u32) -> AudioBuffer {
        AudioBuffer {
            samples,
            sample_rate,
        }
    }

    #[test]
    fn test_frames_for_rounds_to_nearest() {
        assert_eq!(frames_for(Duration::from_millis(0), 48000), 0);
        assert_eq!(frames_for(Duration::from_millis(500), 8000), 4000);
        assert_eq!(frames_for(Duration::from_millis(2000), 44100), 88200);
        // 1 ms at 44.1 kHz is 44.1 frames
        assert_eq!(frames_for(Duration::from_millis(1), 44100), 44);
        // 0.5 ms at 3 kHz is 1.5 frames, rounds up
        assert_eq!(frames_for(Duration::from_micros(500), 3000), 2);
    }

    #[test]
    fn test_interleaved_conversion() {
        let buffer =
            AudioBuffer::from_interleaved(&[1.0, 5.0, 2.0, 6.0, 3.0, 7.0], 2, 8000).unwrap();
        assert_eq!(buffer.samples, vec![vec![1.0, 2.0, 3.0], vec![5.0, 6.0, 7.0]]);
        assert_eq!(buffer.to_interleaved(), vec![1.0, 5.0, 2.0, 6.0, 3.0, 7.0]);
    }

    #[test]
    fn test_from_interleaved_rejects_ragged_data() {
        let result = AudioBuffer::from_interleaved(&[1.0, 2.0, 3.0], 2, 8000);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_interleaved_empty_keeps_channels() {
        let buffer = AudioBuffer::from_interleaved(&[], 2, 44100).unwrap();
        assert_eq!(buffer.channels(), 2);
        assert!(buffer.is_empty());
        assert_eq!(buffer.duration_secs(), 0.0);
    }

    #[test]
    fn test_mix_at_extends_and_sums() {
        let mut base = create_test_buffer(vec![vec![0.5, 0.5, 0.5]], 8000);
        let clip = create_test_buffer(vec![vec![0.25, 0.25, 0.25]], 8000);

        base.mix_at(2, &clip).unwrap();

        assert_eq!(base.samples[0], vec![0.5, 0.5, 0.75, 0.25, 0.25]);
    }

    #[test]
    fn test_mix_at_does_not_normalize() {
        let mut base = create_test_buffer(vec![vec![0.8; 4]], 8000);
        let clip = create_test_buffer(vec![vec![0.8; 4]], 8000);

        base.mix_at(0, &clip).unwrap();

        assert_relative_eq!(base.peak(), 1.6, epsilon = 1e-6);
    }

    #[test]
    fn test_mix_onto_empty_seed() {
        let mut seed = AudioBuffer::new(2, 0, 8000);
        let clip = create_test_buffer(vec![vec![0.1, 0.2], vec![0.3, 0.4]], 8000);

        seed.mix_at(0, &clip).unwrap();

        assert_eq!(seed, clip);
    }

    #[test]
    fn test_mix_at_unallocatable_offset_is_error() {
        let mut base = create_test_buffer(vec![vec![0.5; 4]], 8000);
        let clip = create_test_buffer(vec![vec![0.5; 4]], 8000);

        let err = base.mix_at(usize::MAX / 2, &clip).unwrap_err();

        assert_eq!(err.error_code(), "ENGINE_FAILED");
        assert_eq!(base.len(), 4, "failed mix must leave the buffer as it was");
    }

    #[test]
    fn test_mix_at_overflowing_offset_is_error() {
        let mut base = create_test_buffer(vec![vec![0.5; 4]], 8000);
        let clip = create_test_buffer(vec![vec![0.5; 4]], 8000);

        assert!(base.mix_at(usize::MAX, &clip).is_err());
    }

    #[test]
    fn test_remix_mono_to_stereo_duplicates() {
        let mono = create_test_buffer(vec![vec![0.1, 0.2]], 8000);
        let stereo = mono.remix(2);
        assert_eq!(stereo.samples, vec![vec![0.1, 0.2], vec![0.1, 0.2]]);
    }

    #[test]
    fn test_remix_stereo_to_mono_averages() {
        let stereo = create_test_buffer(vec![vec![1.0, 0.0], vec![0.0, 1.0]], 8000);
        let mono = stereo.remix(1);
        assert_eq!(mono.samples, vec![vec![0.5, 0.5]]);
    }

    #[test]
    fn test_resample_changes_length() {
        let buffer = AudioBuffer::new(1, 8000, 8000);
        let resampled = buffer.resample(16000);
        assert_eq!(resampled.sample_rate, 16000);
        assert_eq!(resampled.len(), 16000);
        assert_relative_eq!(resampled.duration_secs(), 1.0);
    }

    #[test]
    fn test_resample_linear_interpolates() {
        let resampled = resample_linear(&[0.0, 1.0, 0.0], 2.0);
        assert_eq!(resampled.len(), 6);
        assert_relative_eq!(resampled[1], 0.5, epsilon = 1e-6);
    }
}
