//! Core library for the canvas video player.
//!
//! The crate implements the playback synchronization and render-loop
//! engine: a widget that paints decoded video frames onto a drawable
//! surface while keeping the visual timeline locked to an independent
//! audio clock. Each module owns a distinct subsystem (master clock,
//! visual stream, surface, resize debouncing, the playback controller,
//! session lifetime) and everything runs on a single cooperative event
//! loop supplied by the host.

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod resize;
pub mod session;
pub mod source;
pub mod surface;

pub use clock::{AudioOutput, MediaClock};
pub use config::PlayerOptions;
pub use controller::{PlaybackController, PlaybackState, SyncCadence};
pub use error::{PlayerError, Result};
pub use events::{
    EventQueue, FrameScheduler, Notifier, PlayerEvent, SubscriptionId, TimerHost, TimerId,
};
pub use resize::ResizeDebouncer;
pub use session::{AudioAsset, MediaHost, PlayerSession};
pub use source::{BufferedSource, SourceEvent, VisualSource};
pub use surface::{PixelSurface, Surface, ViewportSize};
