use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use eyre::{Result, WrapErr};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::signal;

use crate::{SubtitleExtractor, SubtitlerError};

/// Shared by every request; nothing in it is mutated after startup
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<SubtitleExtractor>,
    pub api_key: Arc<str>,
}

impl AppState {
    pub fn new(extractor: SubtitleExtractor, api_key: &str) -> Self {
        Self {
            extractor: Arc::new(extractor),
            api_key: Arc::from(api_key),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubtitleRequest {
    /// Kept loose so a non-string value is reported like an empty one
    #[serde(default)]
    pub video_url: serde_json::Value,
    #[serde(default)]
    pub languages: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubtitleResponse {
    pub subtitles: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    detail: String,
    bearer_challenge: bool,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            error,
            detail: detail.into(),
            bearer_challenge: false,
        }
    }

    fn not_authenticated() -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", "Not authenticated")
    }

    fn invalid_api_key() -> Self {
        Self {
            bearer_challenge: true,
            ..Self::new(StatusCode::UNAUTHORIZED, "unauthorized", "Invalid API key")
        }
    }

    fn unexpected(message: impl std::fmt::Display) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            format!("Unexpected error: {message}"),
        )
    }
}

impl From<SubtitlerError> for ApiError {
    fn from(e: SubtitlerError) -> Self {
        match e {
            SubtitlerError::InvalidReference(msg) => Self::new(StatusCode::BAD_REQUEST, "invalid_video_input", msg),
            SubtitlerError::ExtractionFailed(msg) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "subtitle_extraction_failed", msg)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "invalid_request", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.error,
            "detail": self.detail,
        }));
        let mut response = (self.status, body).into_response();
        if self.bearer_challenge {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/extract-subtitles", post(extract_subtitles))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("binding to {addr}"))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("running HTTP server")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {e}");
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn require_bearer(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, ApiError> {
    let authorized = match req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
    {
        None => return Err(ApiError::not_authenticated()),
        Some(token) => tokens_match(token, &state.api_key),
    };

    if !authorized {
        warn!("Rejected request with invalid API key");
        return Err(ApiError::invalid_api_key());
    }
    Ok(next.run(req).await)
}

/// Compare without short-circuiting on the first differing byte
fn tokens_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    given.len() == expected.len() && given.iter().zip(expected).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

async fn extract_subtitles(
    State(state): State<AppState>,
    payload: Result<Json<SubtitleRequest>, JsonRejection>,
) -> Result<Json<SubtitleResponse>, ApiError> {
    let Json(request) = payload?;
    let video_input = request
        .video_url
        .as_str()
        .ok_or_else(SubtitlerError::empty_input)?
        .to_string();
    info!("Extracting subtitles for {video_input:?}");

    // A panicking fetcher surfaces here as a JoinError
    let extractor = state.extractor.clone();
    let outcome = tokio::spawn(async move {
        extractor
            .extract_subtitles(&video_input, request.languages.as_deref())
            .await
    })
    .await;

    match outcome {
        Ok(Ok(subtitles)) => Ok(Json(SubtitleResponse { subtitles })),
        Ok(Err(e)) => {
            warn!("Extraction failed: {e}");
            Err(e.into())
        }
        Err(join_err) => {
            error!("Extraction task failed: {join_err}");
            Err(ApiError::unexpected(join_err))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::extractor::tests::MockFetcher;
    use crate::{FetchError, TranscriptFetcher};

    const API_KEY: &str = "test-secret";

    fn app(fetcher: Arc<dyn TranscriptFetcher>) -> Router {
        router(AppState::new(SubtitleExtractor::new(fetcher), API_KEY))
    }

    fn extract_request(auth: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/extract-subtitles")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_needs_no_auth() {
        let response = app(MockFetcher::returning(&[]))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn test_extract_success() {
        let fetcher = MockFetcher::returning(&["Hello world", "This is a test"]);
        let response = app(fetcher.clone())
            .oneshot(extract_request(
                Some("Bearer test-secret"),
                r#"{"video_url": "https://youtu.be/dQw4w9WgXcQ", "languages": ["es", "en"]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "subtitles": "Hello world This is a test" }));
        let calls = fetcher.calls();
        assert_eq!(calls[0].0, "dQw4w9WgXcQ");
        assert_eq!(calls[0].1, vec!["es".to_string(), "en".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_token_is_forbidden() {
        let fetcher = MockFetcher::returning(&["x"]);
        let response = app(fetcher.clone())
            .oneshot(extract_request(None, r#"{"video_url": "dQw4w9WgXcQ"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_token_is_unauthorized() {
        let fetcher = MockFetcher::returning(&["x"]);
        let response = app(fetcher.clone())
            .oneshot(extract_request(Some("Bearer nope"), r#"{"video_url": "dQw4w9WgXcQ"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
        assert_eq!(
            json_body(response).await,
            json!({ "error": "unauthorized", "detail": "Invalid API key" })
        );
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_video_is_bad_request() {
        let response = app(MockFetcher::returning(&[]))
            .oneshot(extract_request(
                Some("Bearer test-secret"),
                r#"{"video_url": "https://vimeo.com/123456"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "invalid_video_input");
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid video input"));
    }

    #[tokio::test]
    async fn test_non_string_video_is_bad_request() {
        for body in [r#"{"video_url": 123}"#, r#"{"video_url": null}"#, r#"{}"#] {
            let response = app(MockFetcher::returning(&[]))
                .oneshot(extract_request(Some("Bearer test-secret"), body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(
                json_body(response).await["detail"],
                "Video input must be a non-empty string"
            );
        }
    }

    #[tokio::test]
    async fn test_extraction_failure_is_server_error() {
        let response = app(MockFetcher::failing(FetchError::TranscriptsDisabled))
            .oneshot(extract_request(Some("Bearer test-secret"), r#"{"video_url": "dQw4w9WgXcQ"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({
                "error": "subtitle_extraction_failed",
                "detail": "Subtitles are disabled for video dQw4w9WgXcQ",
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let response = app(MockFetcher::returning(&[]))
            .oneshot(extract_request(Some("Bearer test-secret"), "{not json"))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(json_body(response).await["error"], "invalid_request");
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("test-secret", "test-secret"));
        assert!(!tokens_match("test-secreT", "test-secret"));
        assert!(!tokens_match("test-secret-longer", "test-secret"));
        assert!(!tokens_match("", "test-secret"));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer   "), None);
    }
}
