/// Result alias that carries the custom [`PlayerError`] type.
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// A construction-time configuration problem: a missing or unresolvable
    /// locator, or an invalid option value. Construction does not proceed
    /// and no partial state is left scheduled.
    #[error("configuration error: {0}")]
    Config(String),
    /// The audio engine could not be opened. Audio-lock is load-bearing for
    /// synchronization, so this is fatal rather than a degraded fallback.
    #[error("audio engine unavailable: {0}")]
    AudioUnavailable(String),
    /// The audio asset failed to download or decode.
    #[error("audio asset failed to load: {0}")]
    AssetLoad(String),
    /// A caller handed the engine a value it cannot work with.
    #[error("{0}")]
    InvalidInput(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl PlayerError {
    /// Creates a configuration error wrapping the provided message.
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }
}
