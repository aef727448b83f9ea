//! Error types for the mailsift pipeline.
//!
//! Every failure mode of the prediction and feedback paths is an explicit
//! variant here. Normalization and language detection failures are absorbed
//! where they happen; the remaining kinds are surfaced to the caller.

use thiserror::Error;

use crate::models::Emotion;

/// Errors that can occur while classifying a message or recording feedback.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Text cleaning hit an unexpected internal fault (never fatal)
    #[error("Encoding recovery failed: {0}")]
    EncodingRecovery(String),

    /// Language identification could not decide (never fatal)
    #[error("Language detection failed: {0}")]
    LanguageDetection(String),

    /// No translator could turn the text into English
    #[error("Translation from '{source_lang}' failed: {reason}")]
    Translation {
        /// Detected source language code
        source_lang: String,
        /// Last provider failure
        reason: String,
    },

    /// A classifier could not produce a trustworthy score
    #[error("Classification failed in {stage}: {reason}")]
    Classification {
        /// Which classifier or preprocessing branch failed
        stage: &'static str,
        /// Failure detail
        reason: String,
    },

    /// Corrected emotion label outside the six canonical labels
    #[error("Invalid emotion label: {0}")]
    InvalidLabel(String),

    /// Feedback payload failed field validation
    #[error("Invalid feedback: {0}")]
    InvalidFeedback(String),

    /// Feedback store read or write failed (writes are rolled back)
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Model artifact could not be fetched or parsed
    #[error("Model artifact error: {0}")]
    Artifact(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Regex compilation failed
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl PipelineError {
    /// Shorthand for a classifier failure at `stage`.
    pub fn classification(stage: &'static str, reason: impl ToString) -> Self {
        Self::Classification {
            stage,
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a translation failure from `source_lang`.
    pub fn translation(source_lang: impl Into<String>, reason: impl ToString) -> Self {
        Self::Translation {
            source_lang: source_lang.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable taxonomy name, used as a metric label and telemetry tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EncodingRecovery(_) => "EncodingRecoveryFailure",
            Self::LanguageDetection(_) => "LanguageDetectionFailure",
            Self::Translation { .. } => "TranslationFailure",
            Self::Classification { .. } => "ClassificationFailure",
            Self::InvalidLabel(_) => "InvalidLabel",
            Self::InvalidFeedback(_) => "InvalidFeedback",
            Self::Persistence(_) => "PersistenceFailure",
            Self::Artifact(_) => "ArtifactFailure",
            Self::InvalidConfig(_) => "ConfigurationFailure",
            Self::Pattern(_) => "PatternFailure",
        }
    }

    /// Message safe to hand back to an API caller.
    ///
    /// Client errors carry their detail; server-side failures only expose a
    /// fixed message so provider responses and internal paths never leak.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidLabel(_) => {
                let labels: Vec<&str> = Emotion::ALL.iter().map(|e| e.as_str()).collect();
                format!("invalid emotion, expected one of: {}", labels.join(", "))
            }
            Self::InvalidFeedback(detail) => format!("invalid feedback: {detail}"),
            Self::Translation { .. } => "translation error".to_string(),
            Self::Classification { .. } => "prediction error".to_string(),
            Self::Persistence(_) => "feedback storage error".to_string(),
            _ => "internal error".to_string(),
        }
    }

    /// True when the caller sent something we refuse to store.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidLabel(_) | Self::InvalidFeedback(_))
    }
}

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<r2d2::Error> for PipelineError {
    fn from(err: r2d2::Error) -> Self {
        Self::Persistence(format!("connection pool: {err}"))
    }
}

/// Convenience type alias for Result with `PipelineError`
pub type Result<T> = std::result::Result<T, PipelineError>;
