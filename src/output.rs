use eyre::Result;

use crate::{Segment, Transcript};

/// Render segments as plain text, joined by single spaces
pub fn render_text(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ")
}

/// Render the transcript with timing plus the joined text
pub fn render_json(transcript: &Transcript) -> Result<String> {
    let value = serde_json::json!({
        "video_id": transcript.video_id,
        "languages": transcript.languages,
        "segments": transcript.segments,
        "subtitles": render_text(&transcript.segments),
    });
    Ok(serde_json::to_string_pretty(&value)?)
}
