use async_trait::async_trait;
use log::{debug, info};
use rodio::{Decoder, Source};
use std::io::Cursor;

use super::SampleBuffer;
use crate::error::DecodeError;

/// Turns complete encoded files into sample buffers.
///
/// Implementations must not touch playback state: the caller decides when
/// (and whether) a finished buffer is installed. That keeps a slow decode from
/// clobbering the result of a faster one that was started later.
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    /// Decode a complete in-memory file.
    ///
    /// # Errors
    /// Returns [`DecodeError`] when the bytes are not a recognized encoding or
    /// decode to nothing.
    async fn decode(&self, bytes: Vec<u8>) -> Result<SampleBuffer, DecodeError>;

    /// Short name used in log lines.
    fn decoder_type(&self) -> &'static str;
}

/// Decoder backed by rodio's format probing (WAV/FLAC/Vorbis/MP3, plus AAC/MP4 through symphonia).
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioDecoder;

impl RodioDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioDecoder for RodioDecoder {
    async fn decode(&self, bytes: Vec<u8>) -> Result<SampleBuffer, DecodeError> {
        tokio::task::spawn_blocking(move || decode_bytes(bytes))
            .await
            .map_err(|e| DecodeError::Task(e.to_string()))?
    }

    fn decoder_type(&self) -> &'static str {
        "rodio"
    }
}

/// Synchronous decode of a complete file held in memory.
pub fn decode_bytes(bytes: Vec<u8>) -> Result<SampleBuffer, DecodeError> {
    let encoded_len = bytes.len();
    let source = Decoder::new(Cursor::new(bytes))
        .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

    let channels = source.channels();
    let sample_rate = source.sample_rate();
    debug!("Probed stream: {} channels at {} Hz", channels, sample_rate);

    let samples: Vec<f32> = source.convert_samples().collect();
    let buffer = SampleBuffer::new(samples, channels, sample_rate)?;

    info!(
        "Decoded {} bytes into {:.2}s of audio ({}Hz, {} channels)",
        encoded_len,
        buffer.duration().as_secs_f32(),
        sample_rate,
        channels
    );
    Ok(buffer)
}
