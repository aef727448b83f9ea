use std::path::{Component, Path};

use crate::error::{PipelineError, Result};
use crate::models::FeedbackRequest;

/// Longest accepted feedback text, in characters
pub const MAX_FEEDBACK_TEXT_CHARS: usize = 2000;

/// Longest accepted sentiment label, in characters
pub const MAX_SENTIMENT_CHARS: usize = 20;

/// Field checks for feedback submissions
#[derive(Debug, Copy, Clone)]
pub struct FeedbackValidator;

impl FeedbackValidator {
    /// Validate every field of a feedback request except the emotion label,
    /// which is checked by parsing it.
    pub fn validate(request: &FeedbackRequest) -> Result<()> {
        Self::validate_text(&request.text)?;
        Self::validate_spam_prediction(request.initial_spam_prediction)?;
        Self::validate_sentiment(&request.initial_sentiment_prediction)?;
        Ok(())
    }

    /// Validate message text
    pub fn validate_text(text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(PipelineError::InvalidFeedback(
                "text cannot be empty".to_string(),
            ));
        }

        let chars = text.chars().count();
        if chars > MAX_FEEDBACK_TEXT_CHARS {
            return Err(PipelineError::InvalidFeedback(format!(
                "text too long ({chars} characters, max {MAX_FEEDBACK_TEXT_CHARS})"
            )));
        }

        Ok(())
    }

    /// Validate the model's original spam score
    pub fn validate_spam_prediction(score: f64) -> Result<()> {
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(PipelineError::InvalidFeedback(format!(
                "initial_spam_prediction must be in [0, 1], got {score}"
            )));
        }
        Ok(())
    }

    /// Validate the model's original emotion label
    pub fn validate_sentiment(label: &str) -> Result<()> {
        if label.trim().is_empty() {
            return Err(PipelineError::InvalidFeedback(
                "initial_sentiment_prediction cannot be empty".to_string(),
            ));
        }

        if label.chars().count() > MAX_SENTIMENT_CHARS {
            return Err(PipelineError::InvalidFeedback(format!(
                "initial_sentiment_prediction too long (max {MAX_SENTIMENT_CHARS} characters)"
            )));
        }

        Ok(())
    }
}

/// Validate a model artifact identifier.
///
/// Identifiers are relative paths inside the artifact container; anything
/// that could escape `model_dir` is refused.
pub fn validate_artifact_id(identifier: &str) -> Result<()> {
    if identifier.trim().is_empty() {
        return Err(PipelineError::Artifact(
            "artifact identifier cannot be empty".to_string(),
        ));
    }

    if identifier.contains('\0') || identifier.contains('\\') {
        return Err(PipelineError::Artifact(format!(
            "artifact identifier contains invalid characters: {identifier:?}"
        )));
    }

    let safe = Path::new(identifier)
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !safe {
        return Err(PipelineError::Artifact(format!(
            "artifact identifier must be a relative path without traversal: {identifier:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> FeedbackRequest {
        FeedbackRequest {
            message_id: 1,
            user_id: 7,
            text: "hello".to_string(),
            initial_spam_prediction: 0.2,
            initial_sentiment_prediction: "joy".to_string(),
            real_spam: false,
            real_emotion: "joy".to_string(),
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(FeedbackValidator::validate(&request()).is_ok());
    }

    #[test]
    fn test_text_bounds() {
        assert!(FeedbackValidator::validate_text("   ").is_err());
        assert!(FeedbackValidator::validate_text(&"a".repeat(2000)).is_ok());
        assert!(FeedbackValidator::validate_text(&"a".repeat(2001)).is_err());
    }

    #[test]
    fn test_spam_prediction_bounds() {
        assert!(FeedbackValidator::validate_spam_prediction(0.0).is_ok());
        assert!(FeedbackValidator::validate_spam_prediction(1.0).is_ok());
        assert!(FeedbackValidator::validate_spam_prediction(-0.1).is_err());
        assert!(FeedbackValidator::validate_spam_prediction(f64::NAN).is_err());
    }

    #[test]
    fn test_sentiment_length() {
        assert!(FeedbackValidator::validate_sentiment("neutral").is_ok());
        assert!(FeedbackValidator::validate_sentiment(&"x".repeat(21)).is_err());
    }

    #[test]
    fn test_artifact_ids() {
        assert!(validate_artifact_id("spam_model.json").is_ok());
        assert!(validate_artifact_id("models/v2/spam.json").is_ok());
        assert!(validate_artifact_id("../etc/passwd").is_err());
        assert!(validate_artifact_id("/etc/passwd").is_err());
        assert!(validate_artifact_id("a/../../b").is_err());
        assert!(validate_artifact_id("").is_err());
    }
}
