//! Comprehensive unit tests for the HTTP surface

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use mailsift::config::DatabaseConfig;
use mailsift::emotion::LexiconEmotionClassifier;
use mailsift::language::LanguageDetector;
use mailsift::server::router;
use mailsift::spam_model::LinearSpamClassifier;
use mailsift::{Database, DetectedLanguage, InferenceOrchestrator, NormalizedText};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct EnglishOnly;

impl LanguageDetector for EnglishOnly {
    fn detect(&self, _text: &NormalizedText) -> DetectedLanguage {
        DetectedLanguage::english()
    }
}

fn app(dir: &TempDir) -> Router {
    let db = Database::open(&dir.path().join("feedback.db"), &DatabaseConfig::default())
        .expect("Failed to open database");
    let spam = LinearSpamClassifier::from_json(include_str!("../models/spam_model.json"))
        .expect("Failed to load spam model");

    let orchestrator = InferenceOrchestrator::builder()
        .detector(Arc::new(EnglishOnly))
        .emotion(Arc::new(LexiconEmotionClassifier::default()))
        .spam(Arc::new(spam))
        .feedback(Arc::new(db))
        .build()
        .expect("Failed to build orchestrator");
    router(orchestrator)
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("Failed to call router");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = serde_json::from_slice(&bytes).expect("Failed to parse body");
    (status, body)
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

fn feedback_body(real_emotion: &str) -> Value {
    json!({
        "message_id": 17,
        "user_id": 2,
        "text": "Claim your prize now",
        "initial_spam_prediction": 0.88,
        "initial_sentiment_prediction": "joy",
        "real_spam": true,
        "real_emotion": real_emotion
    })
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("Failed to build request");
    let (status, body) = call(app(&dir), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_predict() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let (status, body) = call(
        app(&dir),
        post("/predict", &json!({ "text": "I WON A FREE PRIZE!!! Click here now" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "I WON A FREE PRIZE!!! Click here now");
    assert_eq!(body["detected_language"], "en");
    assert!(body["translated_text"].is_null());
    assert_eq!(body["is_spam"], true);

    let scores = body["emotion_scores"].as_object().expect("scores object");
    let labels: Vec<&str> = scores.keys().map(String::as_str).collect();
    assert_eq!(labels, ["anger", "fear", "joy", "neutral", "sadness", "surprise"]);
    let total: f64 = scores.values().filter_map(Value::as_f64).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_feedback_created_then_updated() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let app = app(&dir);

    let (status, body) = call(app.clone(), post("/feedback", &feedback_body("joy"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["action"], "created");

    let (status, body) = call(app, post("/feedback", &feedback_body("neutral"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "updated");
    assert_eq!(body["message"], "Feedback updated successfully");
}

#[tokio::test]
async fn test_feedback_invalid_emotion_is_bad_request() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let (status, body) = call(app(&dir), post("/feedback", &feedback_body("happy"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "detail": "invalid emotion, expected one of: anger, fear, joy, neutral, sadness, surprise"
        })
    );
}

#[tokio::test]
async fn test_feedback_invalid_score_is_bad_request() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let mut body = feedback_body("joy");
    body["initial_spam_prediction"] = json!(1.5);
    let (status, body) = call(app(&dir), post("/feedback", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"]
        .as_str()
        .expect("detail string")
        .starts_with("invalid feedback"));
}
