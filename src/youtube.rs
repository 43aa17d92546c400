use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::{FetchError, Segment, TranscriptFetcher, VideoId};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Fetches captions through YouTube's InnerTube player API
#[derive(Debug, Clone)]
pub struct InnerTubeFetcher {
    client: reqwest::Client,
}

impl InnerTubeFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn player_response(&self, video_id: &VideoId, lang: &str) -> Result<InnerTubePlayerResponse, FetchError> {
        // Step 1: Fetch the watch page to get the InnerTube API key
        let watch_url = format!("{YOUTUBE_BASE_URL}/watch?v={video_id}");
        debug!("Fetching watch page: {watch_url}");

        let page_html = check_status(self.client.get(&watch_url).send().await?)?
            .text()
            .await?;

        if page_html.contains("class=\"g-recaptcha\"") {
            return Err(FetchError::Other("YouTube is blocking requests from this IP (captcha)".into()));
        }

        let api_key = extract_api_key(&page_html)?;
        debug!("Extracted InnerTube API key: {api_key}");

        // Step 2: Call InnerTube player endpoint
        let player_url = format!("{YOUTUBE_BASE_URL}/youtubei/v1/player?key={api_key}&prettyPrint=false");

        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": lang,
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id
        });

        let resp = check_status(self.client.post(&player_url).json(&body).send().await?)?
            .json()
            .await?;
        Ok(resp)
    }
}

#[async_trait]
impl TranscriptFetcher for InnerTubeFetcher {
    async fn fetch(&self, video_id: &VideoId, languages: &[String]) -> Result<Vec<Segment>, FetchError> {
        let hl = languages.first().map(String::as_str).unwrap_or("en");
        let resp = self.player_response(video_id, hl).await?;

        check_playability(resp.playability_status.as_ref())?;
        let tracks = caption_tracks(resp)?;
        let track = select_track(&tracks, languages)?;
        debug!(
            "Using caption track: lang={} generated={}",
            track.language_code,
            track.is_generated()
        );

        // Step 3: Fetch the caption XML
        let caption_xml = check_status(self.client.get(&track.base_url).send().await?)?
            .text()
            .await?;

        parse_caption_xml(&caption_xml)
    }
}

fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    if resp.status() == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::Other(
            "YouTube is rate limiting requests from this IP (HTTP 429)".into(),
        ));
    }
    Ok(resp.error_for_status()?)
}

fn extract_api_key(html: &str) -> Result<String, FetchError> {
    let patterns = [r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#, r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#];
    for pattern in patterns {
        let re = Regex::new(pattern).map_err(|e| FetchError::Other(e.to_string()))?;
        if let Some(caps) = re.captures(html) {
            return Ok(caps[1].to_string());
        }
    }

    Err(FetchError::Other("could not extract InnerTube API key from watch page".into()))
}

fn check_playability(status: Option<&PlayabilityStatus>) -> Result<(), FetchError> {
    let Some(status) = status else {
        return Ok(());
    };
    let code = status.status.as_deref().unwrap_or("OK");
    if code == "OK" {
        return Ok(());
    }

    let reason = status.reason.as_deref().unwrap_or("");
    if code == "ERROR" && reason.to_lowercase().contains("unavailable") {
        return Err(FetchError::VideoUnavailable);
    }
    Err(FetchError::Other(format!("video is not playable ({code}): {reason}")))
}

fn caption_tracks(resp: InnerTubePlayerResponse) -> Result<Vec<CaptionTrack>, FetchError> {
    let tracks = resp
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .and_then(|r| r.caption_tracks)
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(FetchError::TranscriptsDisabled);
    }
    Ok(tracks)
}

/// First track matching the language list; manual tracks win over generated
/// ones for the same language.
fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Result<&'a CaptionTrack, FetchError> {
    for lang in languages {
        let mut candidates = tracks.iter().filter(|t| &t.language_code == lang);
        let manual = candidates.clone().find(|t| !t.is_generated());
        if let Some(track) = manual.or_else(|| candidates.next()) {
            return Ok(track);
        }
    }

    let available: Vec<&str> = tracks.iter().map(|t| t.language_code.as_str()).collect();
    Err(FetchError::Other(format!(
        "no transcript found for any of [{}]; available: [{}]",
        languages.join(", "),
        available.join(", ")
    )))
}

fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>, FetchError> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current_start: Option<f64> = None;
    let mut current_dur: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = None;
                let mut dur = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"start" => {
                            start = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        b"dur" => {
                            dur = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        _ => {}
                    }
                }
                current_start = start;
                current_dur = dur;
            }
            Ok(Event::Text(ref e)) => {
                if let Some(start) = current_start.take() {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    let text = html_escape::decode_html_entities(&raw_text).to_string();
                    if !text.is_empty() {
                        segments.push(Segment {
                            text,
                            start,
                            duration: current_dur.take().unwrap_or(0.0),
                        });
                    }
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                current_start = None;
                current_dur = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FetchError::Other(format!("error parsing caption XML: {e}"))),
            _ => {}
        }
    }

    Ok(segments)
}
