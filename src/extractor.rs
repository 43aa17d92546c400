use std::sync::Arc;

use log::{debug, info, warn};

use crate::output::render_text;
use crate::{FetchError, SubtitlerError, Transcript, TranscriptFetcher, default_languages, normalize};

/// Resolves video references and fetches their subtitles
#[derive(Clone)]
pub struct SubtitleExtractor {
    fetcher: Arc<dyn TranscriptFetcher>,
    default_languages: Vec<String>,
}

impl SubtitleExtractor {
    pub fn new(fetcher: Arc<dyn TranscriptFetcher>) -> Self {
        Self {
            fetcher,
            default_languages: default_languages(),
        }
    }

    /// Replace the fallback language list. An empty list keeps the built-in one.
    pub fn with_default_languages(mut self, languages: Vec<String>) -> Self {
        if !languages.is_empty() {
            self.default_languages = languages;
        }
        self
    }

    pub fn default_languages(&self) -> &[String] {
        &self.default_languages
    }

    /// Subtitles of the referenced video as a single space-joined string
    pub async fn extract_subtitles(&self, video_input: &str, languages: Option<&[String]>) -> Result<String, SubtitlerError> {
        let transcript = self.fetch_transcript(video_input, languages).await?;
        Ok(render_text(&transcript.segments))
    }

    /// Validate `video_input`, then fetch its transcript once.
    ///
    /// Invalid input fails with [`SubtitlerError::InvalidReference`] before any
    /// network access; every fetcher failure becomes
    /// [`SubtitlerError::ExtractionFailed`] naming the video ID.
    pub async fn fetch_transcript(
        &self,
        video_input: &str,
        languages: Option<&[String]>,
    ) -> Result<Transcript, SubtitlerError> {
        let video_input = video_input.trim();
        if video_input.is_empty() {
            return Err(SubtitlerError::empty_input());
        }

        let video_id = normalize(video_input)?;
        let languages = match languages {
            Some(langs) if !langs.is_empty() => langs.to_vec(),
            _ => self.default_languages.clone(),
        };
        debug!("Fetching transcript for {video_id} with languages {languages:?}");

        match self.fetcher.fetch(&video_id, &languages).await {
            Ok(segments) => {
                info!("Fetched {} segments for {video_id}", segments.len());
                Ok(Transcript {
                    video_id,
                    languages,
                    segments,
                })
            }
            Err(e) => {
                warn!("Transcript fetch failed for {video_id}: {e}");
                let message = match e {
                    FetchError::TranscriptsDisabled => format!("Subtitles are disabled for video {video_id}"),
                    FetchError::VideoUnavailable => format!("Video {video_id} is unavailable"),
                    FetchError::Other(cause) => format!("Failed to extract subtitles for {video_id}: {cause}"),
                };
                Err(SubtitlerError::ExtractionFailed(message))
            }
        }
    }
}
