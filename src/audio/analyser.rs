use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{BIN_COUNT, FFT_SIZE};

const SMOOTHING_TIME_CONSTANT: f32 = 0.8;
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;

/// Mono samples that passed through the graph most recently.
///
/// Written from the output device's thread, read on the engine thread.
#[derive(Debug)]
pub struct TapRing {
    samples: VecDeque<f32>,
}

impl TapRing {
    fn new() -> Self {
        Self {
            samples: VecDeque::from(vec![0.0; FFT_SIZE]),
        }
    }

    pub fn extend(&mut self, mono: &[f32]) {
        for &sample in mono {
            if self.samples.len() == FFT_SIZE {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }
    }

    /// Overwrite the window with silence.
    pub fn silence(&mut self) {
        self.samples.iter_mut().for_each(|sample| *sample = 0.0);
    }

    fn copy_into(&self, out: &mut [f32; FFT_SIZE]) {
        for (slot, &sample) in out.iter_mut().zip(self.samples.iter()) {
            *slot = sample;
        }
    }
}

pub type SharedTap = Arc<Mutex<TapRing>>;

/// Frequency-analysis node. Audio passes through untouched; only the most
/// recent window is kept for analysis.
///
/// Magnitudes follow the usual analyser pipeline: Blackman window, FFT,
/// |X|/N, exponential smoothing, decibels, then a linear map of
/// `[MIN_DECIBELS, MAX_DECIBELS]` onto `0..=255`.
pub struct Analyser {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    tap: SharedTap,
    time_domain: [f32; FFT_SIZE],
    scratch: Vec<Complex<f32>>,
    smoothed: [f32; BIN_COUNT],
}

impl Analyser {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        Self {
            fft,
            window: Self::blackman_window(FFT_SIZE),
            tap: Arc::new(Mutex::new(TapRing::new())),
            time_domain: [0.0; FFT_SIZE],
            scratch: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            smoothed: [0.0; BIN_COUNT],
        }
    }

    fn blackman_window(size: usize) -> Vec<f32> {
        let alpha = 0.16;
        let a0 = 0.5 * (1.0 - alpha);
        let a1 = 0.5;
        let a2 = 0.5 * alpha;
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
                a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
            })
            .collect()
    }

    /// Handle given to sources so they can feed this node.
    pub fn tap(&self) -> SharedTap {
        Arc::clone(&self.tap)
    }

    /// Write the current byte spectrum into `out`.
    pub fn byte_frequency_data(&mut self, out: &mut [u8; BIN_COUNT]) {
        if let Ok(ring) = self.tap.lock() {
            ring.copy_into(&mut self.time_domain);
        }

        for ((slot, &sample), &weight) in self
            .scratch
            .iter_mut()
            .zip(self.time_domain.iter())
            .zip(self.window.iter())
        {
            *slot = Complex::new(sample * weight, 0.0);
        }

        self.fft.process(&mut self.scratch);

        let scale = 1.0 / FFT_SIZE as f32;
        for (i, byte) in out.iter_mut().enumerate() {
            let magnitude = self.scratch[i].norm() * scale;
            let smoothed = SMOOTHING_TIME_CONSTANT * self.smoothed[i]
                + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;
            self.smoothed[i] = smoothed;
            *byte = Self::to_byte(smoothed);
        }
    }

    fn to_byte(magnitude: f32) -> u8 {
        if magnitude.is_nan() || magnitude <= 0.0 {
            return 0;
        }
        let db = 20.0 * magnitude.log10();
        let scaled = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
        scaled.clamp(0.0, 255.0) as u8
    }
}

impl Default for Analyser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_sine(analyser: &Analyser, bin: usize, amplitude: f32) {
        let samples: Vec<f32> = (0..FFT_SIZE)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * bin as f32 * i as f32 / FFT_SIZE as f32;
                phase.sin() * amplitude
            })
            .collect();
        analyser.tap().lock().unwrap().extend(&samples);
    }

    #[test]
    fn test_silence_gives_zeros() {
        let mut analyser = Analyser::new();
        let mut out = [7u8; BIN_COUNT];
        analyser.byte_frequency_data(&mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let mut analyser = Analyser::new();
        feed_sine(&analyser, 16, 0.01);

        let mut out = [0u8; BIN_COUNT];
        // Let smoothing settle
        for _ in 0..30 {
            analyser.byte_frequency_data(&mut out);
        }

        let peak = out
            .iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 16);
        assert!(out[16] > 150);
        assert!(out[15] < out[16] && out[17] < out[16]);
        assert_eq!(out[100], 0);
    }

    #[test]
    fn test_smoothing_decays_after_signal_stops() {
        let mut analyser = Analyser::new();
        feed_sine(&analyser, 8, 0.01);
        let mut out = [0u8; BIN_COUNT];
        for _ in 0..30 {
            analyser.byte_frequency_data(&mut out);
        }
        let loud = out[8];

        analyser.tap().lock().unwrap().extend(&[0.0; FFT_SIZE]);
        analyser.byte_frequency_data(&mut out);
        assert!(out[8] < loud);
        assert!(out[8] > 0);
    }

    #[test]
    fn test_silenced_window_decays_to_zero() {
        let mut analyser = Analyser::new();
        feed_sine(&analyser, 8, 0.01);
        let mut out = [0u8; BIN_COUNT];
        analyser.byte_frequency_data(&mut out);
        assert!(out[8] > 0);

        analyser.tap().lock().unwrap().silence();
        for _ in 0..300 {
            analyser.byte_frequency_data(&mut out);
        }
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_byte_mapping_edges() {
        assert_eq!(Analyser::to_byte(0.0), 0);
        assert_eq!(Analyser::to_byte(f32::NAN), 0);
        assert_eq!(Analyser::to_byte(1e-6), 0); // -120 dB
        assert_eq!(Analyser::to_byte(1.0), 255); // 0 dB
    }

    #[test]
    fn test_ring_keeps_latest_window() {
        let mut ring = TapRing::new();
        let ramp: Vec<f32> = (0..FFT_SIZE + 10).map(|i| i as f32).collect();
        ring.extend(&ramp);
        let mut out = [0.0; FFT_SIZE];
        ring.copy_into(&mut out);
        assert_eq!(out[0], 10.0);
        assert_eq!(out[FFT_SIZE - 1], (FFT_SIZE + 9) as f32);
    }
}
