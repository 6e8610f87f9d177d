use crate::error::GeminiError;
use crate::gemini::{GeminiClient, GeminiConfig, build_prompt, parse_summary};
use crate::summary::SummarizeResponse;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::any::Any;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, warn};

type SharedState = Arc<AppState>;

pub const HEALTH_MESSAGE: &str = "AccessNow Gemini backend is running";
pub const DEFAULT_PORT: u16 = 3000;

pub struct AppState {
    pub gemini: GeminiClient,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub addr: SocketAddr,
    pub gemini: GeminiConfig,
}

impl RelayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            gemini: GeminiConfig::new(api_key),
        }
    }
}

#[derive(Debug)]
pub enum RelayError {
    Io(std::io::Error),
    Client(GeminiError),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Io(err) => write!(f, "io error: {err}"),
            RelayError::Client(err) => write!(f, "failed to build upstream client: {err}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<std::io::Error> for RelayError {
    fn from(value: std::io::Error) -> Self {
        RelayError::Io(value)
    }
}

impl From<GeminiError> for RelayError {
    fn from(value: GeminiError) -> Self {
        RelayError::Client(value)
    }
}

pub async fn serve(config: RelayConfig) -> Result<(), RelayError> {
    let state = Arc::new(AppState {
        gemini: GeminiClient::new(config.gemini.clone())?,
    });
    let router = build_router(state);
    info!(
        %config.addr,
        model = %config.gemini.model,
        timeout = ?config.gemini.timeout,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/summarize", post(summarize))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new())
                .on_response(DefaultOnResponse::new()),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(%detail, "Summarize handler panicked");
    ApiError::internal("Summarization failed").into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> &'static str {
    HEALTH_MESSAGE
}

#[derive(Debug, Deserialize)]
struct SummarizeParams {
    text: Option<String>,
}

async fn summarize(
    State(state): State<SharedState>,
    payload: Result<Json<SummarizeParams>, JsonRejection>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let params = match payload {
        Ok(Json(params)) => params,
        Err(JsonRejection::MissingJsonContentType(_)) => SummarizeParams { text: None },
        Err(JsonRejection::JsonDataError(rejection)) => {
            error!(error = %rejection.body_text(), "Summarize error");
            return Err(ApiError::internal("Summarization failed"));
        }
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected summarize body");
            return Err(ApiError::bad_request("Invalid JSON body"));
        }
    };
    let text = params
        .text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("No text provided"))?;

    let value = match state.gemini.generate_content(build_prompt(&text)).await {
        Ok(value) => value,
        Err(GeminiError::Upstream { status, body }) => {
            error!(status, body = %body, "Gemini error");
            return Err(ApiError::internal("Gemini API error"));
        }
        Err(err) => {
            error!(error = %err, "Summarize error");
            return Err(ApiError::internal("Summarization failed"));
        }
    };

    let summary = parse_summary(&value).unwrap_or_else(|reason| {
        warn!(%reason, "upstream response carried no summary text");
        String::new()
    });
    Ok(Json(SummarizeResponse { summary }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::{GenerateContentRequest, MAX_INPUT_CHARS};
    use axum::{body, body::Body, http::Request};
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_router(upstream: &MockServer) -> Router {
        let gemini = GeminiClient::new(GeminiConfig {
            base_url: upstream.uri(),
            ..GeminiConfig::new("test-key")
        })
        .unwrap();
        build_router(Arc::new(AppState { gemini }))
    }

    async fn mock_upstream(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    fn summary_body(text: &str) -> serde_json::Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    async fn post_json(router: Router, body: String) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                Request::post("/summarize")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_returns_static_text() {
        let upstream = MockServer::start().await;
        let response = test_router(&upstream)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], HEALTH_MESSAGE.as_bytes());
    }

    #[tokio::test]
    async fn blank_or_missing_text_is_rejected() {
        let upstream = mock_upstream(ResponseTemplate::new(200)).await;
        for body in [r#"{"text":""}"#, r#"{"text":"   "}"#, "{}"] {
            let (status, payload) = post_json(test_router(&upstream), body.to_string()).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(payload, json!({ "error": "No text provided" }));
        }
        assert!(upstream.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let upstream = mock_upstream(ResponseTemplate::new(200)).await;
        let (status, payload) = post_json(test_router(&upstream), "not json".into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload, json!({ "error": "Invalid JSON body" }));
    }

    #[tokio::test]
    async fn non_string_text_is_internal_error() {
        let upstream = mock_upstream(ResponseTemplate::new(200)).await;
        let (status, payload) = post_json(test_router(&upstream), r#"{"text":123}"#.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(payload, json!({ "error": "Summarization failed" }));
        assert!(upstream.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn body_without_content_type_counts_as_empty() {
        let upstream = mock_upstream(ResponseTemplate::new(200)).await;
        let response = test_router(&upstream)
            .oneshot(
                Request::post("/summarize")
                    .body(Body::from(r#"{"text":"hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(payload, json!({ "error": "No text provided" }));
        assert!(upstream.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn summary_is_returned_trimmed() {
        let upstream =
            mock_upstream(ResponseTemplate::new(200).set_body_json(summary_body("\n- a\n- b\n")))
                .await;
        let (status, payload) =
            post_json(test_router(&upstream), json!({ "text": "Page" }).to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload, json!({ "summary": "- a\n- b" }));
    }

    #[tokio::test]
    async fn long_text_is_truncated_before_forwarding() {
        let upstream = mock_upstream(ResponseTemplate::new(200).set_body_json(summary_body("ok"))).await;
        let text = format!("{}{}", "b".repeat(MAX_INPUT_CHARS), "OVERFLOW");
        let (status, _) =
            post_json(test_router(&upstream), json!({ "text": text }).to_string()).await;
        assert_eq!(status, StatusCode::OK);

        let requests = upstream.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let forwarded: GenerateContentRequest = serde_json::from_slice(&requests[0].body).unwrap();
        let prompt = &forwarded.contents[0].parts[0].text;
        assert!(prompt.contains(&"b".repeat(MAX_INPUT_CHARS)));
        assert!(!prompt.contains("OVERFLOW"));
    }

    #[tokio::test]
    async fn upstream_failure_hides_body() {
        let upstream = mock_upstream(
            ResponseTemplate::new(429).set_body_string("quota for project 1234 exhausted"),
        )
        .await;
        let (status, payload) =
            post_json(test_router(&upstream), json!({ "text": "Page" }).to_string()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(payload, json!({ "error": "Gemini API error" }));
    }

    #[tokio::test]
    async fn malformed_upstream_payload_is_internal_error() {
        let upstream =
            mock_upstream(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;
        let (status, payload) =
            post_json(test_router(&upstream), json!({ "text": "Page" }).to_string()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(payload, json!({ "error": "Summarization failed" }));
    }

    #[tokio::test]
    async fn missing_candidate_text_yields_empty_summary() {
        let upstream =
            mock_upstream(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
                .await;
        let (status, payload) =
            post_json(test_router(&upstream), json!({ "text": "Page" }).to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload, json!({ "summary": "" }));
    }
}
