//! Comprehensive unit tests for model artifact stores

use mailsift::artifacts::{HttpArtifactStore, LocalArtifactStore, ModelArtifactStore};
use mailsift::spam_model::LinearSpamClassifier;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_http_download_lands_in_model_dir() {
    let server = MockServer::start().await;
    let model = r#"{"intercept": -2.0, "token_weights": {"prize": 1.0}}"#;
    Mock::given(method("GET"))
        .and(path("/models/spam/v2.json"))
        .and(query_param("sig", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(model))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp directory");
    let store = HttpArtifactStore::new(
        format!("{}/models", server.uri()),
        Some("?sig=abc".to_string()),
        dir.path(),
    );
    let fetched = store.fetch("spam/v2.json").await.expect("Failed to fetch artifact");

    assert_eq!(fetched, dir.path().join("spam/v2.json"));
    assert_eq!(
        std::fs::read_to_string(&fetched).expect("Failed to read artifact"),
        model
    );
    assert!(!dir.path().join("spam/v2.json.part").exists());
    LinearSpamClassifier::from_path(&fetched).expect("Failed to parse downloaded model");
}

#[tokio::test]
async fn test_http_missing_artifact() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp directory");
    let store = HttpArtifactStore::new(server.uri(), None, dir.path());
    let err = store.fetch("missing.json").await.expect_err("Fetch should fail");
    assert_eq!(err.kind(), "ArtifactFailure");
    assert!(!dir.path().join("missing.json").exists());
}

#[tokio::test]
async fn test_traversal_is_refused_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp directory");
    let store = HttpArtifactStore::new(server.uri(), None, dir.path().join("models"));
    for identifier in ["../escape.json", "/etc/passwd", "a/../../b.json", "", "a\\b.json"] {
        let err = store
            .fetch(identifier)
            .await
            .expect_err("Identifier should be refused");
        assert_eq!(err.kind(), "ArtifactFailure", "{identifier:?}");
    }
}

#[tokio::test]
async fn test_local_store() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    std::fs::write(dir.path().join("lexicon.json"), "{}").expect("Failed to write artifact");
    std::fs::create_dir(dir.path().join("nested")).expect("Failed to create directory");

    let store = LocalArtifactStore::new(dir.path());
    assert_eq!(
        store.fetch("lexicon.json").await.expect("Failed to fetch artifact"),
        dir.path().join("lexicon.json")
    );
    assert!(store.fetch("absent.json").await.is_err());
    assert!(store.fetch("nested").await.is_err());
    assert!(store.fetch("../lexicon.json").await.is_err());
}
