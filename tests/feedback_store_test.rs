//! Comprehensive unit tests for the feedback store

use std::collections::HashSet;

use mailsift::config::DatabaseConfig;
use mailsift::models::FeedbackRequest;
use mailsift::{Database, Emotion, FeedbackAction, FeedbackRecord, FeedbackStore};
use tempfile::TempDir;

fn open(dir: &TempDir) -> Database {
    Database::open(&dir.path().join("data").join("feedback.db"), &DatabaseConfig::default())
        .expect("Failed to open database")
}

fn request(message_id: i64, real_emotion: &str) -> FeedbackRequest {
    FeedbackRequest {
        message_id,
        user_id: 42,
        text: "You have won a free cruise".to_string(),
        initial_spam_prediction: 0.91,
        initial_sentiment_prediction: "joy".to_string(),
        real_spam: true,
        real_emotion: real_emotion.to_string(),
    }
}

fn record(message_id: i64, real_emotion: &str) -> FeedbackRecord {
    FeedbackRecord::try_from(request(message_id, real_emotion)).expect("Failed to validate feedback")
}

#[tokio::test]
async fn test_first_write_creates_second_updates() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let db = open(&dir);

    let action = db.upsert(&record(7, "joy")).await.expect("Failed to insert feedback");
    assert_eq!(action, FeedbackAction::Created);

    let action = db.upsert(&record(7, "anger")).await.expect("Failed to update feedback");
    assert_eq!(action, FeedbackAction::Updated);

    assert_eq!(db.count().expect("Failed to count rows"), 1);
    let stored = db
        .get(7)
        .await
        .expect("Failed to read feedback")
        .expect("Feedback should exist");
    assert_eq!(stored.record.real_emotion, Emotion::Anger);
    assert_eq!(stored.record.user_id, 42);
    assert!(stored.updated_at >= stored.created_at);
}

#[tokio::test]
async fn test_missing_record() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let db = open(&dir);
    assert!(db.get(99).await.expect("Failed to read feedback").is_none());
}

#[tokio::test]
async fn test_distinct_ids_are_separate_rows() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let db = open(&dir);
    for id in 1..=3 {
        let action = db.upsert(&record(id, "neutral")).await.expect("Failed to insert feedback");
        assert_eq!(action, FeedbackAction::Created);
    }
    assert_eq!(db.count().expect("Failed to count rows"), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_upserts_leave_one_row() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let db = open(&dir);

    let labels = ["anger", "fear", "joy", "neutral", "sadness", "surprise"];
    let mut handles = Vec::new();
    for label in labels {
        let db = db.clone();
        let record = record(11, label);
        handles.push(tokio::spawn(async move { db.upsert(&record).await }));
    }

    let mut created = 0;
    for handle in handles {
        let action = handle
            .await
            .expect("Failed to join upsert task")
            .expect("Failed to upsert feedback");
        if action == FeedbackAction::Created {
            created += 1;
        }
    }
    assert_eq!(created, 1);
    assert_eq!(db.count().expect("Failed to count rows"), 1);

    let stored = db
        .get(11)
        .await
        .expect("Failed to read feedback")
        .expect("Feedback should exist");
    let labels: HashSet<&str> = labels.into_iter().collect();
    assert!(labels.contains(stored.record.real_emotion.as_str()));
}

#[tokio::test]
async fn test_reopening_keeps_rows() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    {
        let db = open(&dir);
        db.upsert(&record(5, "fear")).await.expect("Failed to insert feedback");
    }
    let db = open(&dir);
    assert_eq!(db.count().expect("Failed to count rows"), 1);
}

#[test]
fn test_invalid_label_never_reaches_the_store() {
    let err = FeedbackRecord::try_from(request(1, "happy")).expect_err("Label should be rejected");
    assert_eq!(err.kind(), "InvalidLabel");
    assert!(err.is_client_error());
}
