//! Session setup and lifetime.
//!
//! A [`PlayerSession`] validates its configuration, resolves the surface and
//! stream locators through the embedding [`MediaHost`], opens the audio
//! engine, and waits for the audio asset to decode. Only when the asset
//! resolves does it hide the primary visual element, construct the
//! [`PlaybackController`] and bind the source subscriptions, so the
//! controller never observes a half-loaded world. Teardown severs every
//! subscription it created and is safe to call at any point, any number of
//! times.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use crate::clock::{AudioOutput, MediaClock};
use crate::config::PlayerOptions;
use crate::controller::{PlaybackController, PlaybackState, SyncCadence};
use crate::events::{EventQueue, FrameScheduler, PlayerEvent, SubscriptionId, TimerHost};
use crate::source::{SourceEvent, VisualSource};
use crate::surface::Surface;
use crate::{PlayerError, Result};

/// Metadata for a successfully decoded audio asset.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    pub duration_seconds: f64,
    pub sample_rate: u32,
}

/// The embedding environment.
///
/// Element construction, network loading and decoding live behind this
/// trait; the session only ever sees resolved handles and a completion
/// notification.
pub trait MediaHost {
    /// Resolves a drawable surface by locator.
    fn resolve_surface(&mut self, locator: &str) -> Option<Rc<RefCell<dyn Surface>>>;
    /// Creates the visual stream element inside the named container and
    /// points it at `url`.
    fn attach_stream(&mut self, locator: &str, url: &str) -> Option<Rc<RefCell<dyn VisualSource>>>;
    /// Shows or hides the primary visual element.
    fn set_stream_hidden(&mut self, locator: &str, hidden: bool);
    /// Opens the audio engine. Failing here is fatal for the session.
    fn open_audio(&mut self) -> Result<Rc<RefCell<dyn AudioOutput>>>;
    /// Starts the asynchronous download-and-decode of the audio asset. The
    /// host reports completion through [`PlayerSession::audio_loaded`].
    fn begin_audio_load(&mut self, url: &str);
}

enum Phase {
    /// Constructed, load not yet requested.
    Idle {
        scheduler: Box<dyn FrameScheduler>,
        timers: Box<dyn TimerHost>,
    },
    /// Audio load in flight.
    Loading {
        scheduler: Box<dyn FrameScheduler>,
        timers: Box<dyn TimerHost>,
    },
    /// Controller constructed and bound.
    Ready { controller: PlaybackController },
    /// Torn down; terminal.
    Torn,
}

/// One playback widget instance.
///
/// Multiple sessions can coexist; all state is owned by the instance.
pub struct PlayerSession {
    options: PlayerOptions,
    host: Box<dyn MediaHost>,
    surface: Rc<RefCell<dyn Surface>>,
    source: Rc<RefCell<dyn VisualSource>>,
    audio: Rc<RefCell<dyn AudioOutput>>,
    queue: EventQueue,
    phase: Phase,
    subscriptions: Vec<SubscriptionId>,
}

impl PlayerSession {
    /// Validates the options, resolves both locators and opens the audio
    /// engine. Any failure here is fatal and leaves nothing scheduled.
    pub fn new(
        options: PlayerOptions,
        mut host: Box<dyn MediaHost>,
        scheduler: Box<dyn FrameScheduler>,
        timers: Box<dyn TimerHost>,
        queue: EventQueue,
    ) -> Result<Self> {
        options.validate()?;

        let surface = host.resolve_surface(&options.surface_locator).ok_or_else(|| {
            PlayerError::config(format!(
                "surface locator `{}` did not resolve",
                options.surface_locator
            ))
        })?;
        let source = host
            .attach_stream(&options.stream_locator, &options.video_url)
            .ok_or_else(|| {
                PlayerError::config(format!(
                    "stream locator `{}` did not resolve",
                    options.stream_locator
                ))
            })?;
        let audio = host.open_audio()?;

        Ok(Self {
            options,
            host,
            surface,
            source,
            audio,
            queue,
            phase: Phase::Idle { scheduler, timers },
            subscriptions: Vec::new(),
        })
    }

    /// Kicks off the audio asset load. Idempotent while the load is in
    /// flight or already complete.
    pub fn initialize(&mut self) {
        match mem::replace(&mut self.phase, Phase::Torn) {
            Phase::Idle { scheduler, timers } => {
                tracing::info!(url = %self.options.audio_url, "loading audio asset");
                self.host.begin_audio_load(&self.options.audio_url);
                self.phase = Phase::Loading { scheduler, timers };
            }
            other => {
                tracing::debug!("initialize called again; ignoring");
                self.phase = other;
            }
        }
    }

    /// Delivers the single-resolution result of the audio load.
    ///
    /// The first delivery while loading decides the session's fate; any
    /// other delivery is ignored with a warning.
    pub fn audio_loaded(&mut self, result: std::result::Result<AudioAsset, String>) -> Result<()> {
        match mem::replace(&mut self.phase, Phase::Torn) {
            Phase::Loading { scheduler, timers } => match result {
                Ok(asset) => {
                    self.bind(asset, scheduler, timers);
                    Ok(())
                }
                Err(message) => {
                    tracing::error!(error = %message, "audio asset failed to load");
                    // Back to idle so a caller may retry the load.
                    self.phase = Phase::Idle { scheduler, timers };
                    Err(PlayerError::AssetLoad(message))
                }
            },
            other => {
                tracing::warn!("audio load resolved more than once; ignoring");
                self.phase = other;
                Ok(())
            }
        }
    }

    fn bind(
        &mut self,
        asset: AudioAsset,
        scheduler: Box<dyn FrameScheduler>,
        timers: Box<dyn TimerHost>,
    ) {
        if self.options.hide_video {
            self.host
                .set_stream_hidden(&self.options.stream_locator, true);
        }

        let queue = self.queue.clone();
        let subscription = self.source.borrow_mut().subscribe(Box::new(move |event| {
            queue.push(match event {
                SourceEvent::Ready => PlayerEvent::SourceReady,
                SourceEvent::PositionChanged => PlayerEvent::SourcePositionChanged,
            });
        }));
        self.subscriptions.push(subscription);

        let controller = PlaybackController::new(
            MediaClock::new(self.audio.clone()),
            self.source.clone(),
            self.surface.clone(),
            scheduler,
            timers,
            SyncCadence::from_fps(self.options.frames_per_second),
            self.options.resize_quiet(),
        );

        tracing::info!(
            duration = asset.duration_seconds,
            sample_rate = asset.sample_rate,
            "player initialized"
        );
        self.phase = Phase::Ready { controller };
    }

    /// Forwards one host-loop event to the controller. Events arriving
    /// before the session is ready are dropped.
    pub fn dispatch(&mut self, event: PlayerEvent) {
        match &mut self.phase {
            Phase::Ready { controller } => controller.handle(event),
            _ => tracing::debug!(?event, "event dropped before readiness"),
        }
    }

    pub fn play(&mut self) {
        match &mut self.phase {
            Phase::Ready { controller } => controller.play(),
            _ => tracing::warn!("play ignored; session not ready"),
        }
    }

    pub fn pause(&mut self) {
        match &mut self.phase {
            Phase::Ready { controller } => controller.pause(),
            _ => tracing::warn!("pause ignored; session not ready"),
        }
    }

    pub fn toggle_play_pause(&mut self) {
        match &mut self.phase {
            Phase::Ready { controller } => controller.toggle_play_pause(),
            _ => tracing::warn!("toggle ignored; session not ready"),
        }
    }

    /// Whether the controller is constructed and bound.
    pub fn is_ready(&self) -> bool {
        matches!(self.phase, Phase::Ready { .. })
    }

    /// Current playback state, if the session is ready.
    pub fn playback_state(&self) -> Option<PlaybackState> {
        match &self.phase {
            Phase::Ready { controller } => Some(controller.state()),
            _ => None,
        }
    }

    /// Releases every subscription and parks the session. Idempotent, and
    /// callable even if the session was never initialized.
    pub fn teardown(&mut self) {
        if matches!(self.phase, Phase::Torn) {
            return;
        }

        {
            let mut source = self.source.borrow_mut();
            for id in self.subscriptions.drain(..) {
                source.unsubscribe(id);
            }
        }

        if let Phase::Ready { controller } = &mut self.phase {
            controller.release();
        }

        self.phase = Phase::Torn;
        tracing::info!("session torn down");
    }
}

impl std::fmt::Debug for PlayerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self.phase {
            Phase::Idle { .. } => "idle",
            Phase::Loading { .. } => "loading",
            Phase::Ready { .. } => "ready",
            Phase::Torn => "torn",
        };
        f.debug_struct("PlayerSession")
            .field("phase", &phase)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
