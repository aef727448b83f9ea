//! Mailsift - emotion and spam classification for inbound messages
//!
//! Cleans arbitrary user text, detects its language, translates it to
//! English, and scores it on two independent axes: a six-way emotion
//! distribution and a spam probability. Human corrections are stored for
//! later retraining.
//!
//! # Features
//!
//! - Deterministic normalization (encoding recovery, markup, emoji, runs)
//! - Language detection with first-available translation
//! - Spam feature extraction against a fixed feature contract
//! - Local or remote classifiers behind async traits
//! - Transactional feedback upserts on SQLite
//! - HTTP API, CLI and offline feature regeneration

/// Model artifact materialization
pub mod artifacts;
/// Configuration management
pub mod config;
/// Feedback persistence and connection pooling
pub mod db;
/// Emotion classifiers
pub mod emotion;
/// Gazetteer entity recognition
pub mod entities;
/// Pipeline error taxonomy
pub mod error;
/// Language detection and translation
pub mod language;
/// Word lemmatization
pub mod lemmatizer;
/// Logging setup and utilities
pub mod logging;
/// Metrics recording
pub mod metrics;
/// Data models and request/response types
pub mod models;
/// Text normalization
pub mod normalize;
/// Offline feature regeneration
pub mod offline;
/// Database schema definitions
pub mod schema;
/// HTTP surface
pub mod server;
/// Inference orchestration
pub mod service;
/// Spam feature extraction
pub mod spam_features;
/// Spam classifiers
pub mod spam_model;
/// Telemetry sinks
pub mod telemetry;
/// Input validation
pub mod validation;
/// Shared keyword vocabularies
pub mod vocabulary;

// Re-export key components for easier access
pub use db::{Database, FeedbackStore};
pub use error::{PipelineError, Result};
pub use models::{
    DetectedLanguage, Emotion, EmotionScoreMap, FeedbackAction, FeedbackRecord, NormalizedText,
    PredictionResult, RawMessage, SpamFeatureRecord, TranslatedText,
};
pub use service::{bootstrap, InferenceOrchestrator};
