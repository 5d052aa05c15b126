use log::{debug, info, warn};
use std::time::Duration;

use super::output::RodioOutput;
use super::{
    AudioDecoder, Clock, FrequencyFrame, FrequencyProbe, LoadOutcome, OutputDevice, PlaybackState,
    SampleBuffer, SignalGraph, SystemClock, TransportClock,
};
use crate::error::EngineResult;

/// The player: one loaded buffer, its signal graph, and the transport.
///
/// All state lives here and is driven from a single thread. Decoding is the
/// only asynchronous step and never touches this struct until its result is
/// handed to [`install`](Self::install) or [`complete_load`](Self::complete_load).
pub struct AudioPlayback {
    output: Box<dyn OutputDevice>,
    clock: Box<dyn Clock>,
    transport: TransportClock,
    graph: Option<SignalGraph>,
    probe: FrequencyProbe,
    volume: f32,
}

impl AudioPlayback {
    /// Player on the default output device and the wall clock.
    ///
    /// # Errors
    /// [`EngineError::EnvironmentUnsupported`](crate::error::EngineError::EnvironmentUnsupported)
    /// when no audio output can be opened.
    pub fn new() -> EngineResult<Self> {
        let output = RodioOutput::open()?;
        Ok(Self::with_output(Box::new(output), Box::new(SystemClock::new())))
    }

    pub fn with_output(output: Box<dyn OutputDevice>, clock: Box<dyn Clock>) -> Self {
        info!("Audio output: {}", output.device_name());
        Self {
            output,
            clock,
            transport: TransportClock::new(),
            graph: None,
            probe: FrequencyProbe::new(),
            volume: 1.0,
        }
    }

    /// Decode `bytes` and, on success, make them the current buffer.
    ///
    /// A failed decode leaves the previous buffer, state and offset untouched.
    pub async fn load_file(&mut self, decoder: &dyn AudioDecoder, bytes: Vec<u8>) -> EngineResult<()> {
        match decoder.decode(bytes).await {
            Ok(buffer) => {
                self.install(buffer);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to decode audio: {}", e);
                Err(e.into())
            }
        }
    }

    /// Install the result of a background decode from a [`LoadQueue`](super::LoadQueue).
    pub fn complete_load(&mut self, outcome: LoadOutcome) -> EngineResult<()> {
        match outcome.result {
            Ok(buffer) => {
                debug!("Installing decode #{}", outcome.ticket);
                self.install(buffer);
                Ok(())
            }
            Err(e) => {
                warn!("Decode #{} failed: {}", outcome.ticket, e);
                Err(e.into())
            }
        }
    }

    /// Replace the current buffer. The old graph is torn down first and the
    /// transport comes back Paused at zero.
    pub fn install(&mut self, buffer: SampleBuffer) {
        if let Some(mut old) = self.graph.take() {
            if old.stop() {
                info!("Stopped playback of previous file");
            }
        }

        info!(
            "Loaded audio ({:.2}s, {}Hz, {} channels)",
            buffer.duration().as_secs_f32(),
            buffer.sample_rate(),
            buffer.channels()
        );
        self.transport.reset(buffer.duration());
        self.graph = Some(SignalGraph::new(buffer));
    }

    /// Start playback from the frozen offset.
    ///
    /// Returns `Ok(false)` when nothing happened: no audio loaded yet, or
    /// already playing.
    pub fn play(&mut self) -> EngineResult<bool> {
        let graph = match self.graph.as_mut() {
            Some(graph) => graph,
            None => {
                warn!("Play requested before any audio was loaded");
                return Ok(false);
            }
        };

        let now = self.clock.now();
        let offset = match self.transport.play(now) {
            Some(offset) => offset,
            None => {
                debug!("Play requested while already playing");
                return Ok(false);
            }
        };

        if let Err(e) = graph.start(offset, self.output.as_ref(), self.volume) {
            self.transport.halt(now);
            warn!("Could not start playback: {}", e);
            return Err(e);
        }

        info!("Audio playback started at {:.2}s", offset.as_secs_f32());
        Ok(true)
    }

    /// Stop the active source and freeze the offset. Returns whether anything changed.
    pub fn pause(&mut self) -> bool {
        let offset = match self.transport.pause(self.clock.now()) {
            Some(offset) => offset,
            None => return false,
        };
        if let Some(graph) = self.graph.as_mut() {
            graph.stop();
        }

        info!("Audio playback paused at {:.2}s", offset.as_secs_f32());
        true
    }

    pub fn toggle_play_pause(&mut self) -> EngineResult<PlaybackState> {
        if self.is_playing() {
            self.pause();
        } else {
            self.play()?;
        }
        Ok(self.state())
    }

    /// Jump to `position` (clamped to the track length). A playing track
    /// continues from there on a fresh source.
    pub fn seek(&mut self, position: Duration) -> EngineResult<()> {
        let now = self.clock.now();
        let offset = match self.transport.seek(position, now) {
            Some(offset) => offset,
            None => return Ok(()),
        };

        if self.transport.state() == PlaybackState::Playing {
            if let Some(graph) = self.graph.as_mut() {
                if let Err(e) = graph.start(offset, self.output.as_ref(), self.volume) {
                    self.transport.halt(now);
                    warn!("Could not restart playback after seek: {}", e);
                    return Err(e);
                }
            }
        }

        info!("Seeked to {:.2}s", offset.as_secs_f32());
        Ok(())
    }

    /// Seek relative to the current position.
    pub fn seek_by(&mut self, delta_secs: f64) -> EngineResult<()> {
        let current = self.position().as_secs_f64();
        let target = (current + delta_secs).max(0.0);
        self.seek(Duration::from_secs_f64(target))
    }

    /// Observe the end of the track. When the active source has run dry the
    /// transport halts and rewinds so the next play starts over. Returns
    /// whether the track ended on this call.
    pub fn update(&mut self) -> bool {
        let graph = match self.graph.as_mut() {
            Some(graph) => graph,
            None => return false,
        };
        if self.transport.state() != PlaybackState::Playing || !graph.source_drained() {
            return false;
        }

        let now = self.clock.now();
        self.transport.halt(now);
        graph.stop();
        self.transport.seek(Duration::ZERO, now);
        info!("Reached end of track");
        true
    }

    /// Refresh and borrow the current spectrum. `None` until a file is loaded.
    pub fn frequency_data(&mut self) -> Option<&FrequencyFrame> {
        let graph = self.graph.as_mut()?;
        Some(self.probe.refresh(graph.analyser_mut()))
    }

    pub fn state(&self) -> PlaybackState {
        self.transport.state()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.state() == PlaybackState::Playing
    }

    pub fn position(&self) -> Duration {
        self.transport.position(self.clock.now())
    }

    /// Length of the loaded track, zero when nothing is loaded.
    pub fn duration(&self) -> Duration {
        self.transport.length()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Clamped to `0.0..=1.0`; NaN or infinite input means full volume.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        if let Some(graph) = self.graph.as_mut() {
            graph.set_volume(self.volume);
        }
    }

    /// Sources currently connected to the output.
    pub fn live_sources(&self) -> usize {
        self.graph.as_ref().map_or(0, SignalGraph::live_sources)
    }

    /// Most sources that were ever live at once for the current file.
    pub fn peak_live_sources(&self) -> usize {
        self.graph.as_ref().map_or(0, SignalGraph::peak_live_sources)
    }
}
