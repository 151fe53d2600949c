mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::{sample_cv, ScriptedGenerator};
use portfolio_rag::assistant::unavailable_reply;
use portfolio_rag::server::{router, AppState, CorsSettings, RateLimiter};
use portfolio_rag::{
    ContextAssembler, Embedder, KnowledgeBase, Language, PortfolioAssistant, RetrievalConfig,
    TextGenerator,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

fn assistant(generator: Option<Arc<dyn TextGenerator>>) -> Arc<PortfolioAssistant> {
    Arc::new(PortfolioAssistant::new(
        KnowledgeBase::new(sample_cv(), Arc::new(Embedder::disabled(4))),
        generator,
        RetrievalConfig::default(),
        ContextAssembler::default(),
    ))
}

fn app(generator: Option<Arc<dyn TextGenerator>>) -> Router {
    router(AppState::new(assistant(generator)), CorsSettings::default())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = send(app(None), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn cv_endpoint_returns_the_document() {
    let (status, body) = send(app(None), get("/api/cv")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Deniz Kaya");
    assert_eq!(body["certifications"], json!(["AWS Developer"]));
}

#[tokio::test]
async fn blank_message_is_unprocessable() {
    let (status, body) = send(
        app(None),
        post_json("/api/chat", json!({"message": "   ", "history": [], "lang": "en"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body, json!({"message": "message must not be empty"}));
}

#[tokio::test]
async fn missing_message_field_is_rejected() {
    let response = app(None)
        .oneshot(post_json("/api/chat", json!({"lang": "en"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn chat_without_key_returns_fixed_reply() {
    let (status, body) = send(
        app(None),
        post_json("/api/chat", json!({"message": "Which languages?", "lang": "en"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"reply": unavailable_reply(Language::En)}));
}

#[tokio::test]
async fn chat_defaults_to_turkish_and_passes_history() {
    let generator = Arc::new(ScriptedGenerator::new(vec![Ok("Merhaba!".into())]));
    let app = app(Some(generator.clone() as Arc<dyn TextGenerator>));
    let (status, body) = send(
        app,
        post_json(
            "/api/chat",
            json!({
                "message": "python deneyimi var mı?",
                "history": [
                    {"role": "user", "content": "selam"},
                    {"role": "assistant", "content": "merhaba"}
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"reply": "Merhaba!"}));

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Kullanıcı Sorusu:\npython deneyimi var mı?"));
    assert!(prompts[0].contains("user: selam\nassistant: merhaba"));
    assert!(prompts[0].contains("Python APIs and ETL pipelines"));
}

#[tokio::test]
async fn cover_letter_needs_a_generator() {
    let (status, _) = send(
        app(None),
        post_json(
            "/api/cover-letter",
            json!({"job_description": "Rust backend engineer", "lang": "en"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn cover_letter_is_signed() {
    let generator = Arc::new(ScriptedGenerator::new(vec![Ok(
        "Dear team,\nI would love to join.\nThank you for your time and consideration.".into(),
    )]));
    let (status, body) = send(
        app(Some(generator as Arc<dyn TextGenerator>)),
        post_json(
            "/api/cover-letter",
            json!({"job_description": "Rust backend engineer", "company_name": "Initech", "lang": "en"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let text = body["text"].as_str().unwrap();
    assert!(text.starts_with("Dear team,"));
    assert!(text.trim_end().ends_with("Deniz Kaya"));
}

#[tokio::test]
async fn compatibility_falls_back_without_generator() {
    let (status, body) = send(
        app(None),
        post_json(
            "/api/compatibility",
            json!({"job_description": "Senior Rust engineer, Python a plus", "lang": "en"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["used_fallback"], json!(true));
    assert_eq!(body["candidate_name"], "Deniz Kaya");
    assert_eq!(body["language"], "en");
    assert!(body["report_text"].as_str().unwrap().len() > 300);
}

#[tokio::test]
async fn empty_job_description_is_unprocessable() {
    let (status, _) = send(
        app(None),
        post_json("/api/compatibility", json!({"job_description": " "})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn rate_limiter_rejects_bursts() {
    let state = AppState::new(assistant(None)).with_rate_limiter(RateLimiter::new(1, 1));
    let app = router(state, CorsSettings::default());
    let request = || post_json("/api/chat", json!({"message": "hi", "lang": "en"}));

    let (first, _) = send(app.clone(), request()).await;
    let (second, body) = send(app, request()).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, json!({"message": "rate limit exceeded"}));
}

#[tokio::test]
async fn cors_preflight_allows_vercel_previews_only() {
    let preflight = |origin: &str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/chat")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    };

    let allowed = app(None)
        .oneshot(preflight("https://feature-x.vercel.app"))
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://feature-x.vercel.app"
    );
    assert_eq!(allowed.headers()[header::ACCESS_CONTROL_MAX_AGE], "86400");

    let denied = app(None)
        .oneshot(preflight("https://attacker.example"))
        .await
        .unwrap();
    assert!(denied
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
