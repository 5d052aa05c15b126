//! bassbars: play an audio file and draw its low-frequency spectrum as bars.
//!
//! [`audio::AudioPlayback`] owns the decoded buffer, the source -> analyser ->
//! output graph and the transport clock. [`render::RenderLoop`] turns the
//! analyser output into clear/fill commands on any [`render::Surface`].

pub mod audio;
pub mod config;
pub mod error;
pub mod graphics;
pub mod render;

pub use error::{DecodeError, EngineError, EngineResult};
