use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{PlayerError, Result};

/// Construction-time options for a player session.
///
/// The two locators identify the drawable surface and the container the
/// visual stream is attached to; both are mandatory and validated before any
/// clock or controller is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerOptions {
    /// Caps how often a position-sync write is issued, not how often the
    /// display refreshes.
    pub frames_per_second: u32,
    /// Hide the primary visual element once the session is initialized.
    /// Cosmetic, irrelevant to sync logic.
    pub hide_video: bool,
    /// Quiet window for the resize debouncer, in milliseconds.
    pub resize_quiet_ms: u64,
    /// Locator for the drawable surface.
    pub surface_locator: String,
    /// Locator for the container the visual stream is attached to.
    pub stream_locator: String,
    /// Visual stream asset to attach.
    pub video_url: String,
    /// Audio asset that provides the master clock.
    pub audio_url: String,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            frames_per_second: 25,
            hide_video: true,
            resize_quiet_ms: 1000,
            surface_locator: String::new(),
            stream_locator: String::new(),
            video_url: String::new(),
            audio_url: String::new(),
        }
    }
}

impl PlayerOptions {
    /// Checks that the options describe a constructible session.
    pub fn validate(&self) -> Result<()> {
        if self.frames_per_second == 0 {
            return Err(PlayerError::InvalidInput(
                "frames_per_second must be at least 1",
            ));
        }
        if self.surface_locator.is_empty() {
            return Err(PlayerError::config("no surface locator provided"));
        }
        if self.stream_locator.is_empty() {
            return Err(PlayerError::config("no stream locator provided"));
        }
        if self.video_url.is_empty() {
            return Err(PlayerError::config("no video url provided"));
        }
        if self.audio_url.is_empty() {
            return Err(PlayerError::config("no audio url provided"));
        }
        Ok(())
    }

    /// The resize quiet window as a [`Duration`].
    pub fn resize_quiet(&self) -> Duration {
        Duration::from_millis(self.resize_quiet_ms)
    }

    /// Parses options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| PlayerError::config(err.to_string()))
    }

    /// Serializes the options as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| PlayerError::config(err.to_string()))
    }
}
