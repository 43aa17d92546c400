use async_trait::async_trait;

use crate::{FetchError, Segment, VideoId};

/// Source of caption fragments for a validated video.
///
/// Implementations must be shareable across requests; the extractor holds one
/// behind an `Arc` and calls it once per extraction.
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    /// Fetch the caption fragments of `video_id`, in playback order, using the
    /// first of `languages` that has a track.
    async fn fetch(&self, video_id: &VideoId, languages: &[String]) -> Result<Vec<Segment>, FetchError>;
}
