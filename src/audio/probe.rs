use super::analyser::Analyser;
use super::BIN_COUNT;

/// One snapshot of byte magnitudes, lowest frequency first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyFrame {
    bins: [u8; BIN_COUNT],
}

impl FrequencyFrame {
    pub fn new() -> Self {
        Self { bins: [0; BIN_COUNT] }
    }

    pub fn from_bins(bins: [u8; BIN_COUNT]) -> Self {
        Self { bins }
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

impl Default for FrequencyFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the analyser into a single frame that is reused every tick.
#[derive(Debug, Default)]
pub struct FrequencyProbe {
    frame: FrequencyFrame,
}

impl FrequencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the frame with the analyser's current snapshot.
    pub fn refresh(&mut self, analyser: &mut Analyser) -> &FrequencyFrame {
        analyser.byte_frequency_data(&mut self.frame.bins);
        &self.frame
    }

    pub fn frame(&self) -> &FrequencyFrame {
        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FFT_SIZE;

    #[test]
    fn test_frame_shape_without_signal() {
        let mut analyser = Analyser::new();
        let mut probe = FrequencyProbe::new();
        let frame = probe.refresh(&mut analyser);
        assert_eq!(frame.len(), FFT_SIZE / 2);
        assert!(frame.bins().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_refresh_overwrites_in_place() {
        let mut analyser = Analyser::new();
        let mut probe = FrequencyProbe::new();

        analyser.tap().lock().unwrap().extend(&[0.5; FFT_SIZE]);
        let loud = probe.refresh(&mut analyser).clone();
        assert!(loud.bins()[0] > 0);

        analyser.tap().lock().unwrap().extend(&[0.0; FFT_SIZE]);
        for _ in 0..200 {
            probe.refresh(&mut analyser);
        }
        assert_eq!(probe.frame().len(), loud.len());
        assert!(probe.frame().bins().iter().all(|&b| b == 0));
    }
}
