pub mod analyser;
pub mod buffer;
pub mod decoder;
pub mod graph;
pub mod loader;
pub mod output;
pub mod playback;
pub mod probe;
pub mod transport;

pub use analyser::Analyser;
pub use buffer::SampleBuffer;
pub use decoder::{AudioDecoder, RodioDecoder};
pub use graph::{OutputDevice, OutputVoice, SignalGraph};
pub use loader::{LoadOutcome, LoadQueue};
pub use output::{open_default_or_null, NullOutput, RodioOutput};
pub use playback::AudioPlayback;
pub use probe::{FrequencyFrame, FrequencyProbe};
pub use transport::{Clock, ManualClock, PlaybackState, SystemClock, TransportClock};

/// Analysis window in samples. Fixed; not a runtime option.
pub const FFT_SIZE: usize = 256;

/// Magnitude bins produced per analysis window.
pub const BIN_COUNT: usize = FFT_SIZE / 2;
