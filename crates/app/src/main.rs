use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use canvas_player_core::{
    AudioAsset, AudioOutput, BufferedSource, EventQueue, FrameScheduler, MediaHost, PixelSurface,
    PlaybackState, PlayerEvent, PlayerOptions, PlayerSession, Result, Surface, TimerHost, TimerId,
    ViewportSize, VisualSource,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            video,
            audio,
            duration,
            fps,
            width,
            height,
        } => run_play(video, audio, duration, fps, ViewportSize::new(width, height)),
        Commands::CheckConfig { path } => run_check_config(&path),
    }
}

/// Drives a full playback session against a simulated environment: a
/// virtual audio engine clock, a buffered visual stream and an in-memory
/// surface, stepped by a 60 Hz cooperative loop.
fn run_play(
    video: String,
    audio: String,
    duration: f64,
    fps: u32,
    layout: ViewportSize,
) -> Result<()> {
    tracing::info!(%video, %audio, duration, fps, "starting simulated playback");

    let options = PlayerOptions {
        frames_per_second: fps,
        surface_locator: "main-canvas".to_string(),
        stream_locator: "video-slot".to_string(),
        video_url: video,
        audio_url: audio,
        ..PlayerOptions::default()
    };

    let engine_seconds = Rc::new(Cell::new(0.0_f64));
    let audible = Rc::new(Cell::new(false));
    let source = Rc::new(RefCell::new(BufferedSource::new(duration, fps)));
    let surface = Rc::new(RefCell::new(PixelSurface::new(layout)));
    let load_pending = Rc::new(Cell::new(false));
    let frame_requested = Rc::new(Cell::new(false));
    let timer_queue = Rc::new(RefCell::new(TimerQueue::default()));
    let queue = EventQueue::new();

    let host = SimHost {
        surface: surface.clone(),
        source: source.clone(),
        audio: Rc::new(RefCell::new(SimAudio {
            engine_seconds: engine_seconds.clone(),
            audible: audible.clone(),
        })),
        load_pending: load_pending.clone(),
    };

    let mut session = PlayerSession::new(
        options,
        Box::new(host),
        Box::new(LoopScheduler {
            requested: frame_requested.clone(),
        }),
        Box::new(LoopTimers {
            state: timer_queue.clone(),
            now: engine_seconds.clone(),
        }),
        queue.clone(),
    )?;

    session.initialize();
    // The download-and-decode that a real host performs asynchronously
    // resolves immediately in the simulation.
    if load_pending.replace(false) {
        session.audio_loaded(Ok(AudioAsset {
            duration_seconds: duration,
            sample_rate: 48_000,
        }))?;
    }
    source.borrow_mut().finish_loading();
    drain(&mut session, &queue);

    session.play();

    let start = Instant::now();
    let step = 1.0 / 60.0;
    let mut now = 0.0;
    let mut resized = false;

    while session.playback_state() == Some(PlaybackState::Playing) {
        now += step;
        engine_seconds.set(now);

        // Exercise the resize path once, mid-stream: a burst of signals
        // that must settle into a single recompute.
        if !resized && now >= duration * 0.5 {
            surface
                .borrow_mut()
                .set_layout_size(ViewportSize::new(layout.width * 2, layout.height * 2));
            for _ in 0..3 {
                session.dispatch(PlayerEvent::ResizeSignal);
            }
            resized = true;
        }

        if frame_requested.replace(false) {
            session.dispatch(PlayerEvent::Tick {
                now: start + Duration::from_secs_f64(now),
            });
        }

        let due = timer_queue.borrow_mut().take_due(now);
        for id in due {
            session.dispatch(PlayerEvent::ResizeElapsed(id));
        }

        drain(&mut session, &queue);

        if now > duration + 5.0 {
            tracing::warn!("simulation overran the media duration; stopping");
            break;
        }
    }

    tracing::info!(
        frames_painted = surface.borrow().blit_count(),
        final_position = source.borrow().current_position(),
        audible = audible.get(),
        "playback finished"
    );
    session.teardown();
    Ok(())
}

/// Loads a player options document and reports whether it describes a
/// constructible session.
fn run_check_config(path: &PathBuf) -> Result<()> {
    let json = std::fs::read_to_string(path)?;
    let options = PlayerOptions::from_json(&json)?;
    options.validate()?;
    tracing::info!(
        fps = options.frames_per_second,
        surface = %options.surface_locator,
        stream = %options.stream_locator,
        "options file is valid"
    );
    Ok(())
}

fn drain(session: &mut PlayerSession, queue: &EventQueue) {
    while let Some(event) = queue.pop() {
        session.dispatch(event);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// Audio engine double whose hardware clock is the simulation's virtual
/// time.
struct SimAudio {
    engine_seconds: Rc<Cell<f64>>,
    audible: Rc<Cell<bool>>,
}

impl AudioOutput for SimAudio {
    fn clock_seconds(&self) -> f64 {
        self.engine_seconds.get()
    }

    fn start(&mut self) {
        self.audible.set(true);
    }

    fn stop(&mut self) {
        self.audible.set(false);
    }
}

/// Embedding environment backed by the simulated elements.
struct SimHost {
    surface: Rc<RefCell<PixelSurface>>,
    source: Rc<RefCell<BufferedSource>>,
    audio: Rc<RefCell<SimAudio>>,
    load_pending: Rc<Cell<bool>>,
}

impl MediaHost for SimHost {
    fn resolve_surface(&mut self, locator: &str) -> Option<Rc<RefCell<dyn Surface>>> {
        tracing::debug!(locator, "surface resolved");
        Some(self.surface.clone())
    }

    fn attach_stream(&mut self, locator: &str, url: &str) -> Option<Rc<RefCell<dyn VisualSource>>> {
        tracing::debug!(locator, url, "visual stream attached");
        Some(self.source.clone())
    }

    fn set_stream_hidden(&mut self, locator: &str, hidden: bool) {
        tracing::debug!(locator, hidden, "stream visibility changed");
    }

    fn open_audio(&mut self) -> Result<Rc<RefCell<dyn AudioOutput>>> {
        Ok(self.audio.clone())
    }

    fn begin_audio_load(&mut self, url: &str) {
        tracing::debug!(url, "audio load started");
        self.load_pending.set(true);
    }
}

/// Frame scheduler that records the controller's request for the next
/// display tick; the loop honors it on its following step.
struct LoopScheduler {
    requested: Rc<Cell<bool>>,
}

impl FrameScheduler for LoopScheduler {
    fn request_frame(&mut self) {
        self.requested.set(true);
    }
}

#[derive(Default)]
struct TimerQueue {
    next: u64,
    due: Vec<(TimerId, f64)>,
}

impl TimerQueue {
    fn take_due(&mut self, now: f64) -> Vec<TimerId> {
        let mut fired = Vec::new();
        self.due.retain(|(id, due_at)| {
            if *due_at <= now {
                fired.push(*id);
                false
            } else {
                true
            }
        });
        fired
    }
}

/// One-shot timers keyed to the simulation's virtual clock.
struct LoopTimers {
    state: Rc<RefCell<TimerQueue>>,
    now: Rc<Cell<f64>>,
}

impl TimerHost for LoopTimers {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        let mut queue = self.state.borrow_mut();
        let id = TimerId(queue.next);
        queue.next += 1;
        let due_at = self.now.get() + delay.as_secs_f64();
        queue.due.push((id, due_at));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.state.borrow_mut().due.retain(|(live, _)| *live != id);
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-locked canvas video player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a simulated playback session end to end.
    Play {
        /// Visual stream asset to attach.
        #[arg(long, default_value = "assets/clip.mp4")]
        video: String,
        /// Audio asset that provides the master clock.
        #[arg(long, default_value = "assets/clip.ogg")]
        audio: String,
        /// Simulated media duration in seconds.
        #[arg(long, default_value_t = 10.0)]
        duration: f64,
        /// Sync-write cadence in frames per second.
        #[arg(long, default_value_t = 25)]
        fps: u32,
        /// Initial viewport width in pixels.
        #[arg(long, default_value_t = 640)]
        width: u32,
        /// Initial viewport height in pixels.
        #[arg(long, default_value_t = 360)]
        height: u32,
    },
    /// Validate a player options file.
    CheckConfig {
        /// Path to the JSON options document.
        path: PathBuf,
    },
}
