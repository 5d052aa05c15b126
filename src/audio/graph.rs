use log::debug;
use rodio::Source;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::analyser::{Analyser, SharedTap};
use super::SampleBuffer;
use crate::error::EngineResult;

/// Mono frames gathered before taking the tap lock.
const TAP_BLOCK: usize = 64;

/// Where a started source sends its samples.
pub trait OutputDevice {
    /// Start pulling from `stream` at `volume`.
    ///
    /// # Errors
    /// Returns [`EngineError::Graph`](crate::error::EngineError::Graph) when the
    /// device refuses the new voice.
    fn connect(&self, stream: TappedSource, volume: f32) -> EngineResult<Box<dyn OutputVoice>>;

    fn device_name(&self) -> String;
}

/// A stream currently attached to an output device.
pub trait OutputVoice {
    fn stop(&mut self);
    fn set_volume(&mut self, volume: f32);
}

#[derive(Debug, Default)]
struct SourceFlags {
    halted: AtomicBool,
    drained: AtomicBool,
}

/// Sample stream handed to the device: plays the buffer from an offset and
/// copies a mono mix of everything it yields into the analyser tap.
pub struct TappedSource {
    samples: Arc<[f32]>,
    position: usize,
    channels: u16,
    sample_rate: u32,
    tap: SharedTap,
    pending: Vec<f32>,
    frame_sum: f32,
    frame_channel: u16,
    flags: Arc<SourceFlags>,
}

impl TappedSource {
    fn flush_tap(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        // Never block the device thread; retry with the next block instead
        if let Ok(mut ring) = self.tap.try_lock() {
            // Checked under the lock so nothing lands after the stop silenced the ring
            if !self.flags.halted.load(Ordering::SeqCst) {
                ring.extend(&self.pending);
            }
            self.pending.clear();
        } else if self.pending.len() > TAP_BLOCK * 8 {
            let excess = self.pending.len() - TAP_BLOCK;
            self.pending.drain(..excess);
        }
    }

    fn finish(&mut self) -> Option<f32> {
        self.flush_tap();
        self.flags.drained.store(true, Ordering::SeqCst);
        None
    }
}

impl Iterator for TappedSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.flags.halted.load(Ordering::Relaxed) {
            return self.finish();
        }

        let sample = match self.samples.get(self.position) {
            Some(&sample) => sample,
            None => return self.finish(),
        };
        self.position += 1;

        self.frame_sum += sample;
        self.frame_channel += 1;
        if self.frame_channel == self.channels {
            self.pending.push(self.frame_sum / self.channels as f32);
            self.frame_sum = 0.0;
            self.frame_channel = 0;
            if self.pending.len() >= TAP_BLOCK {
                self.flush_tap();
            }
        }

        Some(sample)
    }
}

impl Source for TappedSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        let frames = (self.samples.len() - self.position) / self.channels as usize;
        Some(Duration::from_secs_f64(frames as f64 / self.sample_rate as f64))
    }
}

#[derive(Debug, Default)]
struct LiveCounter {
    live: AtomicUsize,
    peak: AtomicUsize,
}

/// Decrements the live-source count when the owning source goes away.
struct LiveGuard(Arc<LiveCounter>);

impl LiveGuard {
    fn acquire(counter: &Arc<LiveCounter>) -> Self {
        let now_live = counter.live.fetch_add(1, Ordering::SeqCst) + 1;
        counter.peak.fetch_max(now_live, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A source bound to a buffer and wired into an analyser, not yet started.
///
/// Single use: [`start`](Self::start) consumes it.
pub struct SourceNode {
    buffer: SampleBuffer,
    tap: SharedTap,
}

impl SourceNode {
    pub fn new(buffer: &SampleBuffer, analyser: &Analyser) -> Self {
        Self {
            buffer: buffer.clone(),
            tap: analyser.tap(),
        }
    }

    fn start(
        self,
        offset: Duration,
        device: &dyn OutputDevice,
        volume: f32,
        counter: &Arc<LiveCounter>,
    ) -> EngineResult<ActiveSource> {
        let flags = Arc::new(SourceFlags::default());
        let stream = TappedSource {
            samples: self.buffer.shared_samples(),
            position: self.buffer.sample_index_at(offset),
            channels: self.buffer.channels(),
            sample_rate: self.buffer.sample_rate(),
            tap: Arc::clone(&self.tap),
            pending: Vec::with_capacity(TAP_BLOCK),
            frame_sum: 0.0,
            frame_channel: 0,
            flags: Arc::clone(&flags),
        };

        let voice = device.connect(stream, volume)?;
        debug!("Source started at {:.3}s", offset.as_secs_f32());

        Ok(ActiveSource {
            voice,
            tap: self.tap,
            flags,
            _live: LiveGuard::acquire(counter),
        })
    }
}

/// A running source. Stopping (or dropping) it silences it for good, and the
/// analyser window it was feeding goes quiet with it.
pub struct ActiveSource {
    voice: Box<dyn OutputVoice>,
    tap: SharedTap,
    flags: Arc<SourceFlags>,
    _live: LiveGuard,
}

impl ActiveSource {
    pub fn stop(self) {
        debug!("Source stopped");
    }

    /// The device has pulled the last sample.
    pub fn is_drained(&self) -> bool {
        self.flags.drained.load(Ordering::SeqCst)
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.voice.set_volume(volume);
    }
}

impl Drop for ActiveSource {
    fn drop(&mut self) {
        self.flags.halted.store(true, Ordering::SeqCst);
        self.voice.stop();
        if let Ok(mut ring) = self.tap.lock() {
            ring.silence();
        }
    }
}

/// source -> analyser -> output for one loaded buffer.
///
/// The analyser lives as long as the graph; sources come and go with each play.
pub struct SignalGraph {
    buffer: SampleBuffer,
    analyser: Analyser,
    active: Option<ActiveSource>,
    counter: Arc<LiveCounter>,
}

impl SignalGraph {
    pub fn new(buffer: SampleBuffer) -> Self {
        Self {
            buffer,
            analyser: Analyser::new(),
            active: None,
            counter: Arc::new(LiveCounter::default()),
        }
    }

    pub fn analyser_mut(&mut self) -> &mut Analyser {
        &mut self.analyser
    }

    /// Build a fresh source and start it at `offset`. Any running source is
    /// stopped first, so at most one is ever live.
    pub fn start(&mut self, offset: Duration, device: &dyn OutputDevice, volume: f32) -> EngineResult<()> {
        self.stop();
        let node = SourceNode::new(&self.buffer, &self.analyser);
        self.active = Some(node.start(offset, device, volume, &self.counter)?);
        Ok(())
    }

    /// Stop the running source, if any. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(source) => {
                source.stop();
                true
            }
            None => false,
        }
    }

    /// The running source reached the end of the buffer.
    pub fn source_drained(&self) -> bool {
        self.active.as_ref().map_or(false, ActiveSource::is_drained)
    }

    pub fn set_volume(&mut self, volume: f32) {
        if let Some(source) = &mut self.active {
            source.set_volume(volume);
        }
    }

    pub fn live_sources(&self) -> usize {
        self.counter.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live sources seen by this graph.
    pub fn peak_live_sources(&self) -> usize {
        self.counter.peak.load(Ordering::SeqCst)
    }
}
