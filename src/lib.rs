pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod output;
pub mod server;
pub mod video_id;
pub mod youtube;

use serde::Serialize;

pub use error::{FetchError, SubtitlerError};
pub use extractor::SubtitleExtractor;
pub use fetcher::TranscriptFetcher;
pub use video_id::{VideoId, normalize};

/// Preferred caption languages, most widely spoken first
pub const DEFAULT_LANGUAGES: [&str; 29] = [
    "en", "fr", "es", "de", "ru", "zh", "it", "pt", "ja", "ar", "hi", "bn", "pa", "te", "ta", "ml", "mr", "gu", "kn",
    "or", "nl", "pl", "ro", "sv", "tr", "uk", "vi", "yo", "zu",
];

/// Hosts accepted in a video URL (compared case-insensitively)
pub const YOUTUBE_HOSTS: [&str; 4] = ["youtube.com", "www.youtube.com", "youtu.be", "m.youtube.com"];

/// Length of a canonical YouTube video ID
pub const VIDEO_ID_LENGTH: usize = 11;

/// Owned copy of [`DEFAULT_LANGUAGES`]
pub fn default_languages() -> Vec<String> {
    DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect()
}

/// A single captioned segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Transcript fetched for a validated video
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub video_id: VideoId,
    pub languages: Vec<String>,
    pub segments: Vec<Segment>,
}
