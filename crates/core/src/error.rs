/// Result alias that carries the custom [`RhythmError`] type.
pub type Result<T> = std::result::Result<T, RhythmError>;

/// Common error type for the core crate.
///
/// Nothing inside a running round produces one of these. They only surface
/// from loading configuration, charts and score tables.
#[derive(Debug, thiserror::Error)]
pub enum RhythmError {
    /// Free-form message for failures that do not deserve their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A JSON document (config, chart or score table) failed to parse.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A configuration value is outside the range the engine can work with.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// The requested level does not exist in the song library.
    #[error("no level {0} in the song library")]
    UnknownLevel(usize),
}

impl RhythmError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for RhythmError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for RhythmError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
