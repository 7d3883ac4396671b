//! HTTP transport for the concierge shopping search.
//!
//! Exposes `POST /api/chat` (multipart: `message` text, `requestId`
//! text, optional `image` file) and `GET /health`. All search
//! semantics live in `concierge-search`; this binary wires backends,
//! middleware, and response shaping.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use concierge_core::{defaults, Error, SearchRequest, SearchResponse};
use concierge_db::{create_pool, PgCatalogRepository};
use concierge_inference::{ClipVisionBackend, HttpImageFetcher, IntentClassifier, OpenAIBackend};
use concierge_search::SearchPipeline;

mod dedup;

use dedup::RecentRequests;

/// 10 MB cap on the multipart body; catalog images are small.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically in
/// logs and across services.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APP STATE
// =============================================================================

#[derive(Clone)]
struct AppState {
    pipeline: Arc<SearchPipeline>,
    recent: Arc<RecentRequests>,
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

/// Errors rendered to the client. The body is always conversation
/// shaped (`{"reply": ...}`) so the chat UI can display it inline.
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    UnsupportedMedia(String),
    TooManyRequests,
    Internal(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::UnsupportedFormat(msg) => ApiError::UnsupportedMedia(msg),
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, reply) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::UnsupportedMedia(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg),
            ApiError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "I'm still working on your previous request. One moment!".to_string(),
            ),
            ApiError::Internal(err) => {
                error!(error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Sorry, something went wrong while processing your request. Please try again."
                        .to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({ "reply": reply }));
        (status, body).into_response()
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Decoded `/api/chat` multipart form.
#[derive(Debug, Default)]
struct ChatForm {
    message: String,
    request_id: Option<String>,
    image: Option<String>,
}

async fn read_chat_form(mut multipart: Multipart) -> Result<ChatForm, ApiError> {
    let mut form = ChatForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?
    {
        match field.name() {
            Some("message") => {
                form.message = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid message field: {}", e)))?;
            }
            Some("requestId") => {
                form.request_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Invalid requestId: {}", e)))?,
                );
            }
            Some("image") => {
                let content_type = field.content_type().map(|ct| ct.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read image: {}", e)))?;
                if !bytes.is_empty() {
                    form.image = Some(image_data_uri(content_type.as_deref(), &bytes));
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Encode an uploaded image part as a data URI, trusting the part's
/// declared content type. Unsupported types are caught downstream
/// when the URI is parsed.
fn image_data_uri(content_type: Option<&str>, bytes: &[u8]) -> String {
    let mime = content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or("image/jpeg");
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

async fn chat(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SearchResponse>, ApiError> {
    let form = read_chat_form(multipart).await?;

    if let Some(ref request_id) = form.request_id {
        if state.recent.is_duplicate(request_id) {
            warn!(request_id = %request_id, "Duplicate request rejected");
            return Err(ApiError::TooManyRequests);
        }
    }

    let request = SearchRequest {
        message: form.message,
        image: form.image,
    };

    let response = state.pipeline.handle(&request).await?;
    Ok(Json(response))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// STARTUP
// =============================================================================

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logging. Environment variables:
    //   LOG_FORMAT - "json" or "text" (default: "text")
    //   LOG_ANSI   - "true"/"false" override ANSI colors
    //   RUST_LOG   - standard env filter
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "concierge_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        let mut layer = tracing_subscriber::fmt::layer();
        if let Some(ansi) = log_ansi {
            layer = layer.with_ansi(ansi);
        }
        registry.with(layer).init();
    }

    let database_url = std::env::var(defaults::ENV_DATABASE_URL)
        .unwrap_or_else(|_| "postgres://localhost/concierge".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var(defaults::ENV_PORT)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);

    let pool = create_pool(&database_url).await?;

    let openai = Arc::new(OpenAIBackend::from_env()?);
    let vision = Arc::new(ClipVisionBackend::from_env());
    let fetcher = Arc::new(HttpImageFetcher::new()?);
    let catalog = Arc::new(PgCatalogRepository::new(pool));

    let pipeline = SearchPipeline::new(
        IntentClassifier::new(openai.clone()),
        openai,
        vision,
        catalog,
        fetcher,
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
        recent: Arc::new(RecentRequests::default()),
    };

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
