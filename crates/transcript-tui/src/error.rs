//! Error types for the transcript-tui crate

use thiserror::Error;

/// Result type alias for transcript-tui operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for transcript-tui
#[derive(Error, Debug)]
pub enum Error {
    /// Scroll command carried neither a raw offset nor an activity target
    #[error("scroll command needs either a scroll offset or an activity id")]
    InvalidScrollTarget,

    /// Style option payload that could not be deserialized
    #[error("invalid style options: {0}")]
    Style(#[from] serde_json::Error),
}
