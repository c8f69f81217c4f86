/// Result alias that carries the custom [`MetronomeError`] type.
pub type Result<T> = std::result::Result<T, MetronomeError>;

/// Common error type for the core crate.
///
/// Every variant except [`MetronomeError::Message`] is fatal: the metronome is
/// useless without a working click, so callers print the error and exit.
#[derive(Debug, thiserror::Error)]
pub enum MetronomeError {
    /// The embedded click sample could not be decoded.
    #[error("failed to decode click sample: {0}")]
    Decode(#[from] hound::Error),
    /// The audio device or output stream could not be opened.
    #[error("failed to initialise audio output: {0}")]
    AudioInit(String),
    /// The output stream went away before the click finished playing.
    #[error("click playback did not complete: {0}")]
    Playback(String),
    /// The click could not be rewound to its first sample.
    #[error("failed to rewind click sample: {0}")]
    Rewind(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Free-form failure without a more specific variant.
    #[error("{0}")]
    Message(String),
}

impl MetronomeError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}
