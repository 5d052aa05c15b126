use cpal::traits::{DeviceTrait, HostTrait};
use log::{info, warn};
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::thread;
use std::time::Duration;

use super::graph::{OutputDevice, OutputVoice, TappedSource};
use crate::error::{EngineError, EngineResult};

/// The system's default output device.
pub struct RodioOutput {
    #[allow(dead_code)]
    stream: OutputStream,
    stream_handle: OutputStreamHandle,
    name: String,
}

impl RodioOutput {
    /// Open the default output device.
    ///
    /// # Errors
    /// [`EngineError::EnvironmentUnsupported`] when no device exists or it cannot be opened.
    pub fn open() -> EngineResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::EnvironmentUnsupported("no output device available".to_string()))?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let (stream, stream_handle) = OutputStream::try_from_device(&device)
            .map_err(|e| EngineError::EnvironmentUnsupported(e.to_string()))?;

        info!("Using audio output device: {}", name);
        Ok(Self {
            stream,
            stream_handle,
            name,
        })
    }
}

impl OutputDevice for RodioOutput {
    fn connect(&self, stream: TappedSource, volume: f32) -> EngineResult<Box<dyn OutputVoice>> {
        let sink = Sink::try_new(&self.stream_handle).map_err(|e| EngineError::Graph(e.to_string()))?;
        sink.set_volume(volume);
        sink.append(stream);
        Ok(Box::new(RodioVoice { sink }))
    }

    fn device_name(&self) -> String {
        self.name.clone()
    }
}

struct RodioVoice {
    sink: Sink,
}

impl OutputVoice for RodioVoice {
    fn stop(&mut self) {
        self.sink.stop();
    }

    fn set_volume(&mut self, volume: f32) {
        self.sink.set_volume(volume);
    }
}

/// Consumes samples at their real-time rate without producing sound.
///
/// Keeps the analyser fed on machines without an audio device and in `--mute` runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

const NULL_TICK: Duration = Duration::from_millis(10);

impl OutputDevice for NullOutput {
    fn connect(&self, mut stream: TappedSource, _volume: f32) -> EngineResult<Box<dyn OutputVoice>> {
        let per_tick = (stream.sample_rate() as usize * stream.channels() as usize / 100).max(1);

        thread::Builder::new()
            .name("null-output".to_string())
            .spawn(move || loop {
                if stream.by_ref().take(per_tick).count() < per_tick {
                    break;
                }
                thread::sleep(NULL_TICK);
            })
            .map_err(|e| EngineError::Graph(e.to_string()))?;

        Ok(Box::new(NullVoice))
    }

    fn device_name(&self) -> String {
        "null".to_string()
    }
}

struct NullVoice;

impl OutputVoice for NullVoice {
    // The pulling thread notices the halted source on its own
    fn stop(&mut self) {}

    fn set_volume(&mut self, _volume: f32) {}
}

/// Default device, or the silent one when the environment has no audio.
pub fn open_default_or_null(mute: bool) -> Box<dyn OutputDevice> {
    if mute {
        return Box::new(NullOutput);
    }
    match RodioOutput::open() {
        Ok(output) => Box::new(output),
        Err(e) => {
            warn!("{}. Falling back to silent output.", e);
            Box::new(NullOutput)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Default)]
    struct PullState {
        streams: RefCell<Vec<TappedSource>>,
        stopped: Cell<usize>,
        volume: Cell<f32>,
        refuse: Cell<bool>,
    }

    /// Device whose samples are pulled by the test itself. Clones share state.
    #[derive(Clone, Default)]
    pub(crate) struct PullDevice {
        state: Rc<PullState>,
    }

    impl PullDevice {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Pull up to `n` samples from the most recently connected stream.
        pub(crate) fn pull(&self, n: usize) -> Vec<f32> {
            let mut streams = self.state.streams.borrow_mut();
            match streams.last_mut() {
                Some(stream) => stream.by_ref().take(n).collect(),
                None => Vec::new(),
            }
        }

        pub(crate) fn connections(&self) -> usize {
            self.state.streams.borrow().len()
        }

        pub(crate) fn stopped_voices(&self) -> usize {
            self.state.stopped.get()
        }

        pub(crate) fn volume(&self) -> f32 {
            self.state.volume.get()
        }

        pub(crate) fn refuse_connections(&self, refuse: bool) {
            self.state.refuse.set(refuse);
        }
    }

    struct PullVoice {
        state: Rc<PullState>,
    }

    impl OutputVoice for PullVoice {
        fn stop(&mut self) {
            self.state.stopped.set(self.state.stopped.get() + 1);
        }

        fn set_volume(&mut self, volume: f32) {
            self.state.volume.set(volume);
        }
    }

    impl OutputDevice for PullDevice {
        fn connect(&self, stream: TappedSource, volume: f32) -> EngineResult<Box<dyn OutputVoice>> {
            if self.state.refuse.get() {
                return Err(EngineError::Graph("device refused voice".to_string()));
            }
            self.state.streams.borrow_mut().push(stream);
            self.state.volume.set(volume);
            Ok(Box::new(PullVoice {
                state: Rc::clone(&self.state),
            }))
        }

        fn device_name(&self) -> String {
            "pull".to_string()
        }
    }
}
