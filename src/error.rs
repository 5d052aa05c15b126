use thiserror::Error;

/// Reasons a byte stream could not be turned into a [`SampleBuffer`](crate::audio::SampleBuffer).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unrecognized or malformed audio data: {0}")]
    Unsupported(String),

    #[error("audio stream decoded to zero samples")]
    Empty,

    #[error("audio stream reports {channels} channels at {sample_rate} Hz")]
    InvalidFormat { channels: u16, sample_rate: u32 },

    #[error("decode task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// No usable audio output could be opened on this machine.
    #[error("audio environment unsupported: {0}")]
    EnvironmentUnsupported(String),

    #[error("failed to connect source to output: {0}")]
    Graph(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
