use std::fmt;

use log::debug;
use serde::Serialize;
use url::Url;

use crate::{SubtitlerError, VIDEO_ID_LENGTH, YOUTUBE_HOSTS};

const SHORT_LINK_HOST: &str = "youtu.be";
const WATCH_PATHS: [&str; 2] = ["/watch", "/watch/"];

/// Canonical 11-character YouTube video ID.
///
/// Only obtainable through validation: [`VideoId::parse`], [`video_id_from_url`]
/// or [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Validate a bare video ID: 11 characters of `[A-Za-z0-9_-]` with at least
    /// one alphanumeric. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        has_id_shape(raw, true).then(|| VideoId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolve a URL or bare ID into a canonical video ID
pub fn normalize(raw: &str) -> Result<VideoId, SubtitlerError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(SubtitlerError::empty_input());
    }

    if let Some(id) = video_id_from_url(input) {
        debug!("Resolved video ID {id} from URL");
        return Ok(id);
    }

    VideoId::parse(input).ok_or_else(|| SubtitlerError::invalid_input(input))
}

/// Whether `raw` is a YouTube video URL this service can extract an ID from
pub fn is_youtube_url(raw: &str) -> bool {
    video_id_from_url(raw).is_some()
}

/// Extract the video ID from a `youtu.be/<id>` or `youtube.com/watch?v=<id>` URL.
///
/// Anything that fails to parse as a URL, uses another host, or has a
/// malformed path/query yields `None`. Host and path are matched against the
/// text as written, so inputs the URL parser would rewrite (dot segments,
/// backslashes, percent-encoded hosts, explicit ports) do not match.
pub fn video_id_from_url(raw: &str) -> Option<VideoId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (authority, raw_path) = split_authority(raw)?;
    let host = recognized_host(authority)?;
    let url = Url::parse(raw).ok()?;
    if url.path() != raw_path {
        return None;
    }

    let candidate = if host == SHORT_LINK_HOST {
        // Short links only accept plain alphanumerics, unlike watch URLs
        let id = url.path().trim_start_matches('/');
        has_id_shape(id, false).then(|| id.to_string())?
    } else {
        if !WATCH_PATHS.contains(&url.path()) {
            return None;
        }
        let id = url
            .query_pairs()
            .find(|(key, value)| key == "v" && !value.is_empty())
            .map(|(_, value)| value.into_owned())?;
        has_id_shape(&id, true).then_some(id)?
    };

    Some(VideoId(candidate))
}

/// Authority and path text of `scheme://authority/path?query#fragment`, unparsed
fn split_authority(raw: &str) -> Option<(&str, &str)> {
    let (_, rest) = raw.split_once("://")?;
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    let path_end = tail.find(['?', '#']).unwrap_or(tail.len());
    Some((authority, &tail[..path_end]))
}

/// The authority, lowercased, if it is exactly one of the YouTube hosts.
/// Credentials or a port (even the default one) do not match.
fn recognized_host(authority: &str) -> Option<&'static str> {
    YOUTUBE_HOSTS.into_iter().find(|known| known.eq_ignore_ascii_case(authority))
}

fn has_id_shape(candidate: &str, allow_separators: bool) -> bool {
    if candidate.chars().count() != VIDEO_ID_LENGTH {
        return false;
    }
    let mut core = candidate.chars().filter(|c| !(allow_separators && matches!(c, '_' | '-'))).peekable();
    core.peek().is_some() && core.all(|c| c.is_ascii_alphanumeric())
}
