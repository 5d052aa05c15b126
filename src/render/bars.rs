use serde::{Deserialize, Serialize};

use super::{Color, Surface};
use crate::audio::FrequencyFrame;

/// Look of the bar graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BarStyle {
    pub color: Color,
    /// Magnitude (0-255) is divided by this to get the bar height in pixels.
    pub height_divisor: f32,
    /// Only the lowest `1 / bin_fraction` of the bins are drawn.
    pub bin_fraction: usize,
    /// Pixels between neighbouring bars.
    pub gap: f32,
}

impl Default for BarStyle {
    fn default() -> Self {
        Self {
            color: Color::rgba(255, 255, 255, 0.3),
            height_divisor: 3.0,
            bin_fraction: 4,
            gap: 1.0,
        }
    }
}

impl BarStyle {
    /// Width of each bar for a surface `surface_width` pixels wide.
    pub fn bar_width(&self, surface_width: f32, bin_count: usize) -> f32 {
        (surface_width / (bin_count as f32 / 2.5)) * 1.5
    }

    pub fn visible_bins(&self, bin_count: usize) -> usize {
        bin_count / self.bin_fraction.max(1)
    }
}

/// Clear `surface` and draw one bar per visible bin, bottom-aligned.
pub fn paint_bars<S: Surface + ?Sized>(surface: &mut S, frame: &FrequencyFrame, style: &BarStyle) {
    let height = surface.height();
    let bar_width = style.bar_width(surface.width(), frame.len());
    let divisor = if style.height_divisor > 0.0 { style.height_divisor } else { 1.0 };

    surface.clear();

    let mut x = 0.0;
    for &magnitude in frame.bins().iter().take(style.visible_bins(frame.len())) {
        let bar_height = magnitude as f32 / divisor;
        surface.fill_rect(x, height - bar_height, bar_width, bar_height, style.color);
        x += bar_width + style.gap;
    }
}
