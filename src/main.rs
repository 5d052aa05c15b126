use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    event::{ElementState, Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowBuilder},
};

use bassbars::audio::{open_default_or_null, AudioDecoder, AudioPlayback, LoadQueue, PlaybackState, RodioDecoder, SystemClock};
use bassbars::config::{parse_style, PlayerArgs};
use bassbars::graphics::GraphicsEngine;
use bassbars::render::{format_clock, FrameScheduler, RenderLoop};

const SEEK_STEP_SECS: f64 = 5.0;
const IDLE_WAKEUP: Duration = Duration::from_millis(50);

/// Frames are requested from the window's redraw queue.
struct RedrawScheduler<'w>(&'w Window);

impl FrameScheduler for RedrawScheduler<'_> {
    fn request_frame(&mut self) {
        self.0.request_redraw();
    }
}

fn read_audio(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn window_title(engine: &AudioPlayback) -> String {
    let status = match engine.state() {
        PlaybackState::Idle => return "bassbars - drop an audio file".to_string(),
        PlaybackState::Playing => "Playing",
        PlaybackState::Paused => "Paused",
    };
    format!(
        "bassbars - {} {} / {}",
        status,
        format_clock(engine.position()),
        format_clock(engine.duration())
    )
}

fn main() -> Result<()> {
    env_logger::init();
    let args = PlayerArgs::parse();
    let style = parse_style(args.style.as_deref())?;
    info!("Starting bassbars");

    let runtime = tokio::runtime::Runtime::new()?;
    let decoder: Arc<dyn AudioDecoder> = Arc::new(RodioDecoder::new());
    let mut queue = LoadQueue::new(decoder, runtime.handle().clone());

    let mut engine = AudioPlayback::with_output(
        open_default_or_null(args.mute),
        Box::new(SystemClock::new()),
    );
    engine.set_volume(args.volume);

    if let Some(path) = &args.audio_file {
        info!("Loading {}...", path.display());
        queue.submit(read_audio(path)?);
    }

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("bassbars")
            .with_inner_size(winit::dpi::LogicalSize::new(args.width, args.height))
            .build(&event_loop)?,
    );

    let mut graphics_engine = pollster::block_on(GraphicsEngine::new(&window))?;
    let mut render_loop = RenderLoop::new(style);
    let mut title = String::new();

    info!("Space: play/pause, Left/Right: seek, Esc: quit");

    let window_clone = Arc::clone(&window);
    event_loop.run(move |event, elwt| {
        let mut scheduler = RedrawScheduler(&window_clone);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    info!("Close requested");
                    engine.pause();
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape) => {
                            info!("Escape pressed");
                            engine.pause();
                            elwt.exit();
                        }
                        PhysicalKey::Code(KeyCode::Space) if !event.repeat => {
                            match engine.toggle_play_pause() {
                                Ok(PlaybackState::Playing) => {
                                    render_loop.start(&mut scheduler);
                                }
                                Ok(_) => {}
                                Err(e) => error!("Playback error: {}", e),
                            }
                        }
                        PhysicalKey::Code(KeyCode::ArrowLeft) => {
                            if let Err(e) = engine.seek_by(-SEEK_STEP_SECS) {
                                error!("Seek failed: {}", e);
                            }
                        }
                        PhysicalKey::Code(KeyCode::ArrowRight) => {
                            if let Err(e) = engine.seek_by(SEEK_STEP_SECS) {
                                error!("Seek failed: {}", e);
                            }
                        }
                        _ => {}
                    }
                }
                WindowEvent::DroppedFile(path) => match read_audio(&path) {
                    Ok(bytes) => {
                        info!("Loading {}...", path.display());
                        queue.submit(bytes);
                    }
                    Err(e) => error!("{:#}", e),
                },
                WindowEvent::Resized(physical_size) => {
                    graphics_engine.resize(physical_size);
                }
                WindowEvent::RedrawRequested => {
                    render_loop.tick(&mut engine, &mut graphics_engine, &mut scheduler);
                    if let Err(e) = graphics_engine.present() {
                        error!("Render error: {}", e);
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                while let Some(outcome) = queue.try_next() {
                    match engine.complete_load(outcome) {
                        Ok(()) if args.autoplay => match engine.play() {
                            Ok(_) => {
                                render_loop.start(&mut scheduler);
                            }
                            Err(e) => error!("Playback error: {}", e),
                        },
                        Ok(()) => info!("Press Space to play"),
                        Err(e) => warn!("Keeping current audio: {}", e),
                    }
                }

                engine.update();

                let next_title = window_title(&engine);
                if next_title != title {
                    window_clone.set_title(&next_title);
                    title = next_title;
                }

                elwt.set_control_flow(ControlFlow::WaitUntil(Instant::now() + IDLE_WAKEUP));
            }
            _ => {}
        }
    })?;

    Ok(())
}
