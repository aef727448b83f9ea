//! Comprehensive unit tests for the emotion and spam classifiers

use std::time::Duration;

use mailsift::emotion::{EmotionClassifier, LexiconEmotionClassifier, RemoteEmotionClassifier};
use mailsift::spam_model::{LinearSpamClassifier, RemoteSpamClassifier, SpamClassifier};
use mailsift::{Emotion, EmotionScoreMap, PipelineError, SpamFeatureRecord};
use proptest::prelude::*;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(message: &str) -> SpamFeatureRecord {
    SpamFeatureRecord {
        cleaned_message: message.to_string(),
        keyword_count: 2,
        keyword_ratio: 0.5,
        promo_word_count: 2,
        promo_word_ratio: 0.5,
        uppercase_ratio: 0.1,
    }
}

fn assert_classification_failure(err: &PipelineError) {
    assert_eq!(err.kind(), "ClassificationFailure", "got {err:?}");
}

#[tokio::test]
async fn test_lexicon_scores_every_label() {
    let classifier = LexiconEmotionClassifier::default();
    let scores = classifier
        .score("i am so happy today")
        .await
        .expect("Failed to score text");

    assert_eq!(scores.len(), 6);
    for emotion in Emotion::ALL {
        assert!(scores.get(emotion) > 0.0);
    }
    assert_eq!(scores.top().0, Emotion::Joy);
}

#[tokio::test]
async fn test_lexicon_from_artifact() {
    let classifier = LexiconEmotionClassifier::from_json(
        r#"{"lexicon": {"fear": {"spider": 3.0}}, "neutral_bias": 0.0}"#,
    )
    .expect("Failed to load lexicon");
    let scores = classifier.score("a spider").await.expect("Failed to score text");
    assert_eq!(scores.top().0, Emotion::Fear);
}

#[test]
fn test_lexicon_rejects_unknown_label() {
    let err = LexiconEmotionClassifier::from_json(r#"{"lexicon": {"boredom": {"meh": 1.0}}}"#)
        .expect_err("Unknown label should be rejected");
    assert_eq!(err.kind(), "ArtifactFailure");
}

#[tokio::test]
async fn test_remote_emotion_accepts_logits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emotion"))
        .and(body_partial_json(serde_json::json!({ "text": "so sad" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "logits": [0.0, 0.0, 0.0, 0.0, 4.0, 0.0]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let classifier =
        RemoteEmotionClassifier::new(format!("{}/emotion", server.uri()), Duration::from_secs(5));
    let scores = classifier.score("so sad").await.expect("Failed to score text");
    assert_eq!(scores.top().0, Emotion::Sadness);
    let total: f64 = scores.iter().map(|(_, p)| p).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_remote_emotion_rejects_wrong_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "probabilities": [0.5, 0.5]
        })))
        .mount(&server)
        .await;

    let classifier = RemoteEmotionClassifier::new(server.uri(), Duration::from_secs(5));
    let err = classifier.score("anything").await.expect_err("Should fail");
    assert_classification_failure(&err);
}

#[tokio::test]
async fn test_remote_emotion_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&server)
        .await;

    let classifier = RemoteEmotionClassifier::new(server.uri(), Duration::from_secs(5));
    let err = classifier.score("anything").await.expect_err("Should fail");
    assert_classification_failure(&err);
}

#[tokio::test]
async fn test_linear_model_scores_in_range() {
    let model = LinearSpamClassifier::from_json(
        r#"{
            "intercept": -1.0,
            "feature_weights": {"keyword_count": 0.5, "uppercase_ratio": 2.0},
            "token_weights": {"prize": 1.5, "meeting": -2.0}
        }"#,
    )
    .expect("Failed to load model");

    let spammy = model.score(&record("claim prize prize")).await.expect("Failed to score");
    let hammy = model.score(&record("team meeting")).await.expect("Failed to score");
    assert!((0.0..=1.0).contains(&spammy));
    assert!((0.0..=1.0).contains(&hammy));
    assert!(spammy > hammy);

    let expected_z: f64 = -1.0 + 0.5 * 2.0 + 2.0 * 0.1 + 1.5 * 2.0;
    let expected = 1.0 / (1.0 + (-expected_z).exp());
    assert!((spammy - expected).abs() < 1e-12);
}

#[test]
fn test_linear_model_rejects_unknown_feature() {
    let err = LinearSpamClassifier::from_json(r#"{"feature_weights": {"message_length": 1.0}}"#)
        .expect_err("Unknown feature should be rejected");
    assert_eq!(err.kind(), "ArtifactFailure");
}

#[tokio::test]
async fn test_remote_spam_posts_feature_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/spam"))
        .and(body_partial_json(serde_json::json!({
            "cleaned_message": "claim prize",
            "keyword_count": 2
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "probability": 0.93 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let classifier =
        RemoteSpamClassifier::new(format!("{}/spam", server.uri()), Duration::from_secs(5));
    let probability = classifier
        .score(&record("claim prize"))
        .await
        .expect("Failed to score record");
    assert!((probability - 0.93).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_remote_spam_rejects_out_of_range() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "probability": 1.7 })),
        )
        .mount(&server)
        .await;

    let classifier = RemoteSpamClassifier::new(server.uri(), Duration::from_secs(5));
    let err = classifier.score(&record("x")).await.expect_err("Should fail");
    assert_classification_failure(&err);
}

#[tokio::test]
async fn test_remote_spam_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "probability": 0.1 }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let classifier = RemoteSpamClassifier::new(server.uri(), Duration::from_millis(50));
    let err = classifier.score(&record("x")).await.expect_err("Should time out");
    assert_classification_failure(&err);
}

proptest! {
    #[test]
    fn test_lexicon_distribution_sums_to_one(text in "[a-z ']{0,80}") {
        let classifier = LexiconEmotionClassifier::default();
        let scores = EmotionScoreMap::from_logits(&classifier.logits(&text))
            .expect("Failed to build distribution");
        prop_assert_eq!(scores.len(), 6);
        let total: f64 = scores.iter().map(|(_, p)| p).sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
        prop_assert!(scores.iter().all(|(_, p)| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_logits_always_give_a_distribution(logits in proptest::collection::vec(-50.0f64..50.0, 6)) {
        let scores = EmotionScoreMap::from_logits(&logits).expect("Failed to build distribution");
        let total: f64 = scores.iter().map(|(_, p)| p).sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
    }
}
