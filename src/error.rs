use thiserror::Error;

/// Message used whenever the caller supplies no usable video input
pub const EMPTY_INPUT_MESSAGE: &str = "Video input must be a non-empty string";

/// Errors surfaced by the extraction core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubtitlerError {
    /// The input could not be resolved to a video ID. Never reaches the network.
    #[error("{0}")]
    InvalidReference(String),

    /// The video ID was valid but no transcript could be fetched
    #[error("{0}")]
    ExtractionFailed(String),
}

impl SubtitlerError {
    pub fn empty_input() -> Self {
        SubtitlerError::InvalidReference(EMPTY_INPUT_MESSAGE.to_string())
    }

    pub fn invalid_input(raw: &str) -> Self {
        SubtitlerError::InvalidReference(format!(
            "Invalid video input: {raw}. Must be a valid YouTube URL or 11-character video ID"
        ))
    }
}

/// Failures reported by a transcript fetcher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transcripts are disabled")]
    TranscriptsDisabled,

    #[error("video is unavailable")]
    VideoUnavailable,

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Other(e.to_string())
    }
}
