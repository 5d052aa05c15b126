pub mod bars;
pub mod canvas;
pub mod terminal;

pub use bars::{paint_bars, BarStyle};
pub use canvas::PixelCanvas;
pub use terminal::TerminalSurface;

use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::AudioPlayback;

/// Straight (non-premultiplied) RGBA, alpha in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_rgba_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a.clamp(0.0, 1.0),
        ]
    }
}

/// `m:ss` for status lines.
pub fn format_clock(time: Duration) -> String {
    let secs = time.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// A 2D target that only knows how to clear itself and fill rectangles.
/// Coordinates are in pixels with the origin at the top-left corner.
pub trait Surface {
    fn width(&self) -> f32;
    fn height(&self) -> f32;
    fn clear(&mut self);
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color);
}

/// Something that will call back once on the next display refresh.
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// A frame was painted and the next one requested.
    Painted,
    /// Playback had stopped; the loop did not reschedule.
    Stopped,
    /// Not one of ours (the loop was not running).
    Idle,
}

/// Per-frame visualizer task.
///
/// Each tick first looks at the playback state. While playing it requests
/// the next frame and paints; otherwise it simply does not reschedule, so a
/// pause is noticed one tick late at most.
#[derive(Debug)]
pub struct RenderLoop {
    style: BarStyle,
    scheduled: bool,
    frames_painted: u64,
}

impl RenderLoop {
    pub fn new(style: BarStyle) -> Self {
        Self {
            style,
            scheduled: false,
            frames_painted: 0,
        }
    }

    /// Schedule the first tick. Does nothing if the loop is already running.
    pub fn start(&mut self, scheduler: &mut dyn FrameScheduler) -> bool {
        if self.scheduled {
            return false;
        }
        self.scheduled = true;
        scheduler.request_frame();
        true
    }

    pub fn is_running(&self) -> bool {
        self.scheduled
    }

    pub fn frames_painted(&self) -> u64 {
        self.frames_painted
    }

    pub fn tick<S: Surface + ?Sized>(
        &mut self,
        engine: &mut AudioPlayback,
        surface: &mut S,
        scheduler: &mut dyn FrameScheduler,
    ) -> Tick {
        if !self.scheduled {
            return Tick::Idle;
        }

        engine.update();
        if !engine.is_playing() {
            self.scheduled = false;
            debug!("Render loop stopped after {} frames", self.frames_painted);
            return Tick::Stopped;
        }

        scheduler.request_frame();

        let frame = match engine.frequency_data() {
            Some(frame) => frame,
            None => {
                self.scheduled = false;
                return Tick::Stopped;
            }
        };
        paint_bars(surface, frame, &self.style);
        self.frames_painted += 1;
        Tick::Painted
    }
}
