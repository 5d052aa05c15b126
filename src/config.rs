use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::render::BarStyle;

#[derive(Parser, Debug)]
#[command(name = "bassbars")]
#[command(about = "Audio player with a live frequency-bar visualizer")]
pub struct PlayerArgs {
    /// Audio file to load on startup (WAV, FLAC, OGG, MP3, M4A). Files can also be dropped on the window.
    pub audio_file: Option<PathBuf>,

    /// Window width in logical pixels
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Window height in logical pixels
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    /// Playback volume (0.0-1.0)
    #[arg(long, default_value_t = 1.0, value_parser = parse_volume)]
    pub volume: f32,

    /// Do not open an audio device; samples are consumed silently
    #[arg(long)]
    pub mute: bool,

    /// Start playing as soon as the file is decoded
    #[arg(long)]
    pub autoplay: bool,

    /// Bar style as JSON, e.g. '{"height_divisor": 2.0}'
    #[arg(long)]
    pub style: Option<String>,
}

#[derive(Parser, Debug)]
#[command(name = "bassbars-term")]
#[command(about = "Terminal audio player with a frequency-bar visualizer")]
pub struct TerminalArgs {
    /// Audio file to play
    pub audio_file: PathBuf,

    /// Width of the bar graph in characters
    #[arg(long, default_value_t = 96)]
    pub columns: usize,

    /// Height of the bar graph in lines
    #[arg(long, default_value_t = 24)]
    pub rows: usize,

    /// Redraws per second
    #[arg(long, default_value_t = 30.0)]
    pub fps: f32,

    /// Playback volume (0.0-1.0)
    #[arg(long, default_value_t = 1.0, value_parser = parse_volume)]
    pub volume: f32,

    /// Do not open an audio device; samples are consumed silently
    #[arg(long)]
    pub mute: bool,

    /// Bar style as JSON, e.g. '{"gap": 0.0}'
    #[arg(long)]
    pub style: Option<String>,
}

fn parse_volume(value: &str) -> std::result::Result<f32, String> {
    let volume: f32 = value.parse().map_err(|e| format!("{}", e))?;
    if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
        return Err(format!("volume must be between 0.0 and 1.0, got {}", value));
    }
    Ok(volume)
}

/// Parse a `--style` value, falling back to the default look when absent.
pub fn parse_style(json: Option<&str>) -> Result<BarStyle> {
    match json {
        Some(json) => serde_json::from_str(json).context("invalid --style JSON"),
        None => Ok(BarStyle::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_defaults() {
        let args = PlayerArgs::try_parse_from(["bassbars"]).unwrap();
        assert!(args.audio_file.is_none());
        assert_eq!((args.width, args.height), (1200, 800));
        assert_eq!(args.volume, 1.0);
        assert!(!args.mute && !args.autoplay);
    }

    #[test]
    fn test_player_flags() {
        let args = PlayerArgs::try_parse_from([
            "bassbars", "song.wav", "--mute", "--autoplay", "--volume", "0.5", "--style", "{}",
        ])
        .unwrap();
        assert_eq!(args.audio_file, Some(PathBuf::from("song.wav")));
        assert!(args.mute && args.autoplay);
        assert_eq!(args.volume, 0.5);
        assert_eq!(parse_style(args.style.as_deref()).unwrap(), BarStyle::default());
    }

    #[test]
    fn test_terminal_requires_file() {
        assert!(TerminalArgs::try_parse_from(["bassbars-term"]).is_err());
        let args = TerminalArgs::try_parse_from(["bassbars-term", "a.mp3", "--rows", "12"]).unwrap();
        assert_eq!(args.rows, 12);
        assert_eq!(args.columns, 96);
    }

    #[test]
    fn test_volume_must_be_a_finite_fraction() {
        for bad in ["NaN", "inf", "1.5", "-0.1", "loud"] {
            assert!(PlayerArgs::try_parse_from(["bassbars", "--volume", bad]).is_err(), "{}", bad);
            assert!(TerminalArgs::try_parse_from(["bassbars-term", "a.wav", "--volume", bad]).is_err());
        }
        let args = PlayerArgs::try_parse_from(["bassbars", "--volume", "0"]).unwrap();
        assert_eq!(args.volume, 0.0);
    }

    #[test]
    fn test_bad_style_is_an_error() {
        assert!(parse_style(Some("{not json")).is_err());
        assert_eq!(parse_style(None).unwrap(), BarStyle::default());
    }
}
