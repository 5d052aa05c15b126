use std::sync::Arc;
use std::time::Duration;

use crate::error::DecodeError;

/// Decoded, interleaved PCM audio. Immutable once built; cloning shares the samples.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Arc<[f32]>,
    channels: u16,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Result<Self, DecodeError> {
        if channels == 0 || sample_rate == 0 {
            return Err(DecodeError::InvalidFormat { channels, sample_rate });
        }
        if samples.len() < channels as usize {
            return Err(DecodeError::Empty);
        }

        // Drop a trailing partial frame so every frame has all channels
        let mut samples = samples;
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);

        Ok(Self {
            samples: samples.into(),
            channels,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }

    /// Index of the first interleaved sample at `position`, clamped to the end of the buffer.
    pub fn sample_index_at(&self, position: Duration) -> usize {
        let frame = (position.as_secs_f64() * self.sample_rate as f64).floor() as usize;
        frame.min(self.frame_count()) * self.channels as usize
    }

    pub(crate) fn shared_samples(&self) -> Arc<[f32]> {
        Arc::clone(&self.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_and_frames() {
        let buffer = SampleBuffer::new(vec![0.0; 44100 * 2], 2, 44100).unwrap();
        assert_eq!(buffer.frame_count(), 44100);
        assert_eq!(buffer.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_frame_is_dropped() {
        let buffer = SampleBuffer::new(vec![0.1, 0.2, 0.3], 2, 8000).unwrap();
        assert_eq!(buffer.samples().len(), 2);
        assert_eq!(buffer.frame_count(), 1);
    }

    #[test]
    fn test_rejects_empty_and_invalid() {
        assert!(matches!(SampleBuffer::new(Vec::new(), 1, 44100), Err(DecodeError::Empty)));
        assert!(matches!(
            SampleBuffer::new(vec![0.0; 4], 0, 44100),
            Err(DecodeError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_sample_index_clamps_to_end() {
        let buffer = SampleBuffer::new(vec![0.0; 200], 2, 100).unwrap();
        assert_eq!(buffer.sample_index_at(Duration::from_millis(500)), 100);
        assert_eq!(buffer.sample_index_at(Duration::from_secs(10)), 200);
    }
}
