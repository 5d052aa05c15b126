use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{error, info};
use std::io::{BufRead, Write};
use std::thread;
use std::time::Duration;

use bassbars::audio::{open_default_or_null, AudioPlayback, RodioDecoder, SystemClock};
use bassbars::config::{parse_style, TerminalArgs};
use bassbars::render::{format_clock, FrameScheduler, RenderLoop, TerminalSurface, Tick};

const SEEK_STEP_SECS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Toggle,
    Forward,
    Back,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" | "p" => Some(Command::Toggle),
            "f" => Some(Command::Forward),
            "b" => Some(Command::Back),
            "q" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Holds at most one pending frame; the main loop runs it on the next beat.
#[derive(Debug, Default)]
struct FramePacer {
    pending: bool,
}

impl FramePacer {
    fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

impl FrameScheduler for FramePacer {
    fn request_frame(&mut self) {
        self.pending = true;
    }
}

fn spawn_stdin_reader() -> Receiver<Command> {
    let (sender, receiver) = crossbeam_channel::unbounded();
    let spawned = thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if let Some(command) = Command::parse(&line) {
                    if sender.send(command).is_err() {
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        error!("Keyboard commands unavailable: {}", e);
    }
    receiver
}

fn draw(surface: &TerminalSurface, engine: &AudioPlayback) -> Result<()> {
    let mut out = std::io::stdout().lock();
    write!(
        out,
        "\x1B[2J\x1B[1;1H{}\n{:?} {} / {}  [enter] play/pause  [f]/[b] seek  [q] quit\n",
        surface.render(),
        engine.state(),
        format_clock(engine.position()),
        format_clock(engine.duration())
    )?;
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = TerminalArgs::parse();
    let style = parse_style(args.style.as_deref())?;

    let runtime = tokio::runtime::Runtime::new()?;
    let mut engine = AudioPlayback::with_output(
        open_default_or_null(args.mute),
        Box::new(SystemClock::new()),
    );
    engine.set_volume(args.volume);

    let bytes = std::fs::read(&args.audio_file)
        .with_context(|| format!("failed to read {}", args.audio_file.display()))?;
    runtime.block_on(engine.load_file(&RodioDecoder::new(), bytes))?;

    let frame_interval = Duration::from_secs_f32(1.0 / args.fps.max(1.0));
    let mut surface = TerminalSurface::new(args.columns, args.rows);
    let mut render_loop = RenderLoop::new(style);
    let mut pacer = FramePacer::default();
    let commands = spawn_stdin_reader();
    let mut stdin_open = true;

    engine.play()?;
    render_loop.start(&mut pacer);
    info!("Playing {}", args.audio_file.display());

    loop {
        let command = if stdin_open {
            match commands.recv_timeout(frame_interval) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    stdin_open = false;
                    None
                }
            }
        } else {
            thread::sleep(frame_interval);
            None
        };

        let result = match command {
            Some(Command::Quit) => break,
            Some(Command::Toggle) => engine.toggle_play_pause().map(|_| ()),
            Some(Command::Forward) => engine.seek_by(SEEK_STEP_SECS),
            Some(Command::Back) => engine.seek_by(-SEEK_STEP_SECS),
            None => Ok(()),
        };
        if let Err(e) = result {
            error!("Playback error: {}", e);
        }
        if engine.is_playing() {
            render_loop.start(&mut pacer);
        }

        if pacer.take() {
            if let Tick::Painted | Tick::Stopped = render_loop.tick(&mut engine, &mut surface, &mut pacer) {
                draw(&surface, &engine)?;
            }
        } else {
            engine.update();
        }

        if !stdin_open && !engine.is_playing() {
            break;
        }
    }

    engine.pause();
    info!("Stopped at {}", format_clock(engine.position()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse(""), Some(Command::Toggle));
        assert_eq!(Command::parse("p\n"), Some(Command::Toggle));
        assert_eq!(Command::parse(" f "), Some(Command::Forward));
        assert_eq!(Command::parse("b"), Some(Command::Back));
        assert_eq!(Command::parse("q"), Some(Command::Quit));
        assert_eq!(Command::parse("x"), None);
    }

    #[test]
    fn test_pacer_holds_one_frame() {
        let mut pacer = FramePacer::default();
        assert!(!pacer.take());
        pacer.request_frame();
        pacer.request_frame();
        assert!(pacer.take());
        assert!(!pacer.take());
    }
}
