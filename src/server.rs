//! HTTP boundary: axum routes over a shared [`PortfolioAssistant`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, warn};

use crate::assembler::{ChatTurn, Language};
use crate::assistant::{ChatError, PortfolioAssistant};
use crate::cv::CvRecord;
use crate::tools::{CompatibilityReport, ToolError};

/// Origins allowed by default.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "https://portfoli-chatbot.vercel.app",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
];

/// Host suffix accepted for any https origin.
pub const DEFAULT_ORIGIN_SUFFIX: &str = ".vercel.app";

/// Cross-origin policy.
#[derive(Debug, Clone)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
    /// Host suffixes accepted over https, e.g. `.vercel.app`.
    pub allowed_suffixes: Vec<String>,
    pub max_age: Duration,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
            allowed_suffixes: vec![DEFAULT_ORIGIN_SUFFIX.to_string()],
            max_age: Duration::from_secs(86_400),
        }
    }
}

impl CorsSettings {
    pub fn allows(&self, origin: &str) -> bool {
        if self.allowed_origins.iter().any(|allowed| allowed == origin) {
            return true;
        }
        let Some(host) = origin.strip_prefix("https://") else {
            return false;
        };
        !host.contains('/')
            && self
                .allowed_suffixes
                .iter()
                .any(|suffix| host.len() > suffix.len() && host.ends_with(suffix.as_str()))
    }

    fn layer(self) -> CorsLayer {
        let settings = Arc::new(self);
        let max_age = settings.max_age;
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _parts: &Parts| {
                    origin
                        .to_str()
                        .map(|origin| settings.allows(origin))
                        .unwrap_or(false)
                },
            ))
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(max_age)
    }
}

/// Token bucket shared by the POST endpoints.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<RateState>>,
    capacity: f64,
    refill_per_sec: f64,
}

struct RateState {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// `None` when either knob is zero (limiting disabled).
    pub fn new(max_per_minute: u32, burst: u32) -> Option<Self> {
        if max_per_minute == 0 || burst == 0 {
            return None;
        }
        let capacity = f64::from(burst);
        Some(Self {
            state: Arc::new(Mutex::new(RateState {
                tokens: capacity,
                last_refill: Instant::now(),
            })),
            capacity,
            refill_per_sec: f64::from(max_per_minute) / 60.0,
        })
    }

    pub async fn acquire(&self) -> bool {
        let mut guard = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(guard.last_refill).as_secs_f64();
        guard.last_refill = now;
        guard.tokens = (guard.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if guard.tokens >= 1.0 {
            guard.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    assistant: Arc<PortfolioAssistant>,
    rate_limiter: Option<RateLimiter>,
}

impl AppState {
    pub fn new(assistant: Arc<PortfolioAssistant>) -> Self {
        Self {
            assistant,
            rate_limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Option<RateLimiter>) -> Self {
        self.rate_limiter = limiter;
        self
    }
}

/// Builds the application router.
pub fn router(state: AppState, cors: CorsSettings) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/cv", get(cv_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/cover-letter", post(cover_letter_handler))
        .route("/api/compatibility", post(compatibility_handler))
        .layer(cors.layer())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    history: Vec<ChatTurn>,
    #[serde(default)]
    lang: Language,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
}

#[derive(Debug, Deserialize)]
struct JobRequest {
    job_description: String,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    lang: Language,
}

#[derive(Debug, Serialize)]
struct LetterResponse {
    text: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn cv_handler(State(state): State<AppState>) -> Json<CvRecord> {
    Json(state.assistant.knowledge().cv().clone())
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(unprocessable(ChatError::EmptyMessage.to_string()));
    }
    throttle(&state).await?;
    let assistant = Arc::clone(&state.assistant);
    let reply = tokio::task::spawn_blocking(move || {
        assistant.chat(&request.message, &request.history, request.lang)
    })
    .await
    .map_err(join_error)?
    .map_err(|err| unprocessable(err.to_string()))?;
    debug!(chars = reply.len(), "chat reply sent");
    Ok(Json(ChatResponse { reply }))
}

async fn cover_letter_handler(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> Result<Json<LetterResponse>, ApiError> {
    if request.job_description.trim().is_empty() {
        return Err(unprocessable(ToolError::EmptyJobDescription.to_string()));
    }
    throttle(&state).await?;
    let assistant = Arc::clone(&state.assistant);
    let text = tokio::task::spawn_blocking(move || {
        assistant.cover_letter(
            &request.job_description,
            request.company_name.as_deref(),
            request.lang,
        )
    })
    .await
    .map_err(join_error)?
    .map_err(tool_error)?;
    Ok(Json(LetterResponse { text }))
}

async fn compatibility_handler(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> Result<Json<CompatibilityReport>, ApiError> {
    if request.job_description.trim().is_empty() {
        return Err(unprocessable(ToolError::EmptyJobDescription.to_string()));
    }
    throttle(&state).await?;
    let assistant = Arc::clone(&state.assistant);
    let report = tokio::task::spawn_blocking(move || {
        assistant.compatibility(
            &request.job_description,
            request.company_name.as_deref(),
            request.lang,
        )
    })
    .await
    .map_err(join_error)?
    .map_err(tool_error)?;
    Ok(Json(report))
}

async fn throttle(state: &AppState) -> Result<(), ApiError> {
    if let Some(limiter) = &state.rate_limiter {
        if !limiter.acquire().await {
            return Err(error_body(
                StatusCode::TOO_MANY_REQUESTS,
                "rate limit exceeded",
            ));
        }
    }
    Ok(())
}

fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
}

fn unprocessable(message: impl Into<String>) -> ApiError {
    error_body(StatusCode::UNPROCESSABLE_ENTITY, message)
}

fn tool_error(err: ToolError) -> ApiError {
    let status = match &err {
        ToolError::EmptyJobDescription => StatusCode::UNPROCESSABLE_ENTITY,
        ToolError::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
        ToolError::Generation(_) => StatusCode::BAD_GATEWAY,
    };
    warn!(error = %err, status = status.as_u16(), "tool request failed");
    error_body(status, err.to_string())
}

fn join_error(err: tokio::task::JoinError) -> ApiError {
    warn!(error = %err, "worker task failed");
    error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}
