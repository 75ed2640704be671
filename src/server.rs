use crate::config::ServerConfig;
use crate::downloader::{content_disposition, MediaProxy, ProxyError};
use crate::extractor::{ExtractError, ExtractionResult, MediaExtractor};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn, Span};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    extractor: Arc<dyn MediaExtractor>,
    proxy: Arc<MediaProxy>,
    semaphore: Arc<Semaphore>,
}

impl AppState {
    pub fn new(extractor: Arc<dyn MediaExtractor>, proxy: MediaProxy, max_concurrent: u32) -> Self {
        Self {
            extractor,
            proxy: Arc::new(proxy),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1) as usize)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExtractRequest {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Serialize)]
struct ExtractResponse {
    success: bool,
    #[serde(flatten)]
    result: ExtractionResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    success: bool,
}

#[derive(Debug, Deserialize)]
struct DownloadParams {
    #[serde(default)]
    url: String,
    #[serde(default)]
    filename: Option<String>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            success: false,
        }),
    )
        .into_response()
}

pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let origin = HeaderValue::from_str(&config.allowed_origin).unwrap_or_else(|_| {
        warn!("Invalid allowed origin {:?}, CORS disabled", config.allowed_origin);
        HeaderValue::from_static("null")
    });
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/extract", post(handle_extract))
        .route("/api/download", get(handle_download))
        .route("/health", get(handle_health))
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn handle_extract(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid JSON payload");
    };
    let url = request.url.trim().to_string();
    if url.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "URL is required");
    }

    let request_id = Uuid::new_v4();
    let Ok(_permit) = state.semaphore.clone().acquire_owned().await else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down");
    };

    let extractor = state.extractor.clone();
    let target = url.clone();
    let span = Span::current();
    let outcome = tokio::task::spawn_blocking(move || {
        span.in_scope(|| extractor.extract(&target))
    })
    .await;

    let result = outcome.unwrap_or_else(|e| {
        error!(%request_id, "Extraction task failed: {}", e);
        Err(ExtractError::Internal)
    });

    match result {
        Ok(result) => {
            info!(%request_id, url = %result.media_url, "Extraction succeeded");
            (StatusCode::OK, Json(ExtractResponse { success: true, result })).into_response()
        }
        Err(e) => {
            warn!(%request_id, "Extraction error for URL {}: {}", url, e);
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

async fn handle_download(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> Response {
    let media = match state.proxy.fetch(&params.url).await {
        Ok(media) => media,
        Err(e @ (ProxyError::MissingUrl | ProxyError::UnsupportedUrl(_))) => {
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
        Err(ProxyError::Upstream(_)) => {
            return (StatusCode::NOT_FOUND, "Media not found").into_response();
        }
        Err(ProxyError::Fetch(e)) => {
            warn!("Failed to fetch media: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch media").into_response();
        }
    };

    let mut headers = HeaderMap::new();
    if let Some(value) = media
        .content_type
        .as_deref()
        .and_then(|v| HeaderValue::from_str(v).ok())
    {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Some(len) = media.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    if let Some(name) = params.filename.as_deref().filter(|n| !n.is_empty()) {
        if let Ok(value) = HeaderValue::from_str(&content_disposition(name)) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
    }

    (headers, Body::from_stream(media.into_stream())).into_response()
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve(
    state: AppState,
    config: &ServerConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Threads media server starting on {}", addr);
    info!("Frontend available at: http://{}", addr);
    info!("API endpoint: http://{}/api/extract", addr);

    axum::serve(listener, router(state, config))
        .with_graceful_shutdown(shutdown)
        .await
}
