//! Data models for the classification pipeline
//!
//! Text moves through a chain of newtypes (`RawMessage` -> `NormalizedText`
//! -> `TranslatedText`) so a stage cannot be handed text that skipped the
//! stage before it. The request/response DTOs of the HTTP surface live here
//! as well.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Inbound message as received: arbitrary bytes, possibly not valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage(Vec<u8>);

impl RawMessage {
    /// Wrap raw bytes
    #[must_use]
    pub const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Underlying bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode as UTF-8, silently dropping undecodable byte sequences.
    #[must_use]
    pub fn decode_lossy(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        for chunk in self.0.utf8_chunks() {
            out.push_str(chunk.valid());
        }
        out
    }
}

impl From<&str> for RawMessage {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl From<String> for RawMessage {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl From<Vec<u8>> for RawMessage {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Cleaned text: valid UTF-8, single spaces, emoji tagged, no run longer than 2.
///
/// Only the normalizer produces values of this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub(crate) const fn new(text: String) -> Self {
        Self(text)
    }

    /// Borrow the text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the text
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// True when nothing survived cleaning
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Two-letter (ISO-639-1 style) language code of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectedLanguage(String);

impl DetectedLanguage {
    /// Code for English, also the fallback when detection fails
    pub const ENGLISH: &'static str = "en";

    /// Wrap a language code, lowercased
    #[must_use]
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_lowercase())
    }

    /// The fallback language
    #[must_use]
    pub fn english() -> Self {
        Self(Self::ENGLISH.to_string())
    }

    /// Language code
    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }

    /// True when no translation is needed
    #[must_use]
    pub fn is_english(&self) -> bool {
        self.0 == Self::ENGLISH
    }
}

impl Default for DetectedLanguage {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Display for DetectedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// English text ready for both preprocessing branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedText {
    text: String,
    translated: bool,
}

impl TranslatedText {
    /// English input passed through untouched
    #[must_use]
    pub fn untouched(text: &NormalizedText) -> Self {
        Self {
            text: text.as_str().to_string(),
            translated: false,
        }
    }

    /// Output of a translator
    #[must_use]
    pub const fn translated(text: String) -> Self {
        Self {
            text,
            translated: true,
        }
    }

    /// Borrow the text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// True when a translator produced this text
    #[must_use]
    pub const fn was_translated(&self) -> bool {
        self.translated
    }
}

/// Feature record handed to the spam classifier.
///
/// Field names and order are the contract the classifier was fit on; the
/// derived `Serialize` keeps declaration order, and `FIELD_NAMES` mirrors it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpamFeatureRecord {
    /// Lemmatized, entity-stripped text
    pub cleaned_message: String,
    /// Spam vocabulary phrases present in the text
    pub keyword_count: usize,
    /// `keyword_count / word_count`, 0 for empty text
    pub keyword_ratio: f64,
    /// Promotional phrase count (see `PromoVocabulary`)
    pub promo_word_count: usize,
    /// `promo_word_count / word_count`, 0 for empty text
    pub promo_word_ratio: f64,
    /// Uppercase letters over total characters of the un-lowercased text
    pub uppercase_ratio: f64,
}

impl SpamFeatureRecord {
    /// Column names in contract order
    pub const FIELD_NAMES: [&'static str; 6] = [
        "cleaned_message",
        "keyword_count",
        "keyword_ratio",
        "promo_word_count",
        "promo_word_ratio",
        "uppercase_ratio",
    ];

    /// Numeric columns, the ones a linear model can weight
    pub const NUMERIC_FIELDS: [&'static str; 5] = [
        "keyword_count",
        "keyword_ratio",
        "promo_word_count",
        "promo_word_ratio",
        "uppercase_ratio",
    ];

    /// Value of a numeric column by name
    #[must_use]
    pub fn numeric(&self, field: &str) -> Option<f64> {
        match field {
            "keyword_count" => Some(self.keyword_count as f64),
            "keyword_ratio" => Some(self.keyword_ratio),
            "promo_word_count" => Some(self.promo_word_count as f64),
            "promo_word_ratio" => Some(self.promo_word_ratio),
            "uppercase_ratio" => Some(self.uppercase_ratio),
            _ => None,
        }
    }
}

/// The six emotion labels, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    /// Anger
    Anger,
    /// Fear
    Fear,
    /// Joy
    Joy,
    /// Neutral
    Neutral,
    /// Sadness
    Sadness,
    /// Surprise
    Surprise,
}

impl Emotion {
    /// All labels in classifier output order
    pub const ALL: [Self; 6] = [
        Self::Anger,
        Self::Fear,
        Self::Joy,
        Self::Neutral,
        Self::Sadness,
        Self::Surprise,
    ];

    /// Lowercase label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anger => "anger",
            Self::Fear => "fear",
            Self::Joy => "joy",
            Self::Neutral => "neutral",
            Self::Sadness => "sadness",
            Self::Surprise => "surprise",
        }
    }

    /// Position in `ALL`
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|emotion| emotion.as_str() == s)
            .ok_or_else(|| {
                PipelineError::InvalidLabel(format!(
                    "'{s}', expected one of: anger, fear, joy, neutral, sadness, surprise"
                ))
            })
    }
}

/// Probability for each of the six labels; always complete, always sums to 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EmotionScoreMap(BTreeMap<Emotion, f64>);

impl EmotionScoreMap {
    /// Softmax over raw scores given in `Emotion::ALL` order.
    pub fn from_logits(logits: &[f64]) -> Result<Self> {
        let logits = Self::six(logits, "logits")?;
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f64 = exps.iter().sum();

        Ok(Self(
            Emotion::ALL
                .into_iter()
                .zip(exps)
                .map(|(emotion, e)| (emotion, e / total))
                .collect(),
        ))
    }

    /// Accept probabilities in `Emotion::ALL` order, renormalizing float drift.
    pub fn from_probabilities(probabilities: &[f64]) -> Result<Self> {
        let probabilities = Self::six(probabilities, "probabilities")?;
        if probabilities.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(PipelineError::classification(
                "emotion",
                "probability outside [0, 1]",
            ));
        }
        let total: f64 = probabilities.iter().sum();
        if total <= 0.0 {
            return Err(PipelineError::classification(
                "emotion",
                "probabilities sum to zero",
            ));
        }

        Ok(Self(
            Emotion::ALL
                .into_iter()
                .zip(probabilities.iter())
                .map(|(emotion, p)| (emotion, p / total))
                .collect(),
        ))
    }

    fn six<'a>(values: &'a [f64], what: &str) -> Result<&'a [f64]> {
        if values.len() != Emotion::ALL.len() {
            return Err(PipelineError::classification(
                "emotion",
                format!("expected 6 {what}, got {}", values.len()),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::classification(
                "emotion",
                format!("non-finite {what}"),
            ));
        }
        Ok(values)
    }

    /// Winning label; ties go to the label earliest in `Emotion::ALL`.
    #[must_use]
    pub fn top(&self) -> (Emotion, f64) {
        let mut best = (Emotion::Anger, f64::NEG_INFINITY);
        for (&emotion, &score) in &self.0 {
            if score > best.1 {
                best = (emotion, score);
            }
        }
        best
    }

    /// Score of one label
    #[must_use]
    pub fn get(&self, emotion: Emotion) -> f64 {
        self.0.get(&emotion).copied().unwrap_or(0.0)
    }

    /// Iterate in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        self.0.iter().map(|(&e, &s)| (e, s))
    }

    /// Number of labels, always 6
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true; present for API symmetry with `len`
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Unified answer for one message
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    /// Original input text
    pub text: String,
    /// Detected source language
    pub detected_language: DetectedLanguage,
    /// English translation, `None` when the source was English
    pub translated_text: Option<String>,
    /// Winning emotion label
    pub emotion: Emotion,
    /// Full six-label distribution
    pub emotion_scores: EmotionScoreMap,
    /// Spam probability in [0, 1]
    pub spam_score: f64,
    /// `spam_score > 0.75`
    pub is_spam: bool,
}

/// Prediction request body
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    /// Message to classify
    pub text: String,
}

/// Human correction as submitted by a client, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// Message identifier, the upsert key
    pub message_id: i64,
    /// Submitting user
    pub user_id: i64,
    /// Message text
    pub text: String,
    /// Spam score the model gave
    pub initial_spam_prediction: f64,
    /// Emotion label the model gave
    pub initial_sentiment_prediction: String,
    /// Ground-truth spam flag
    pub real_spam: bool,
    /// Ground-truth emotion label
    pub real_emotion: String,
}

/// Validated correction, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    /// Message identifier, the upsert key
    pub message_id: i64,
    /// Submitting user
    pub user_id: i64,
    /// Message text
    pub text: String,
    /// Spam score the model gave
    pub initial_spam_prediction: f64,
    /// Emotion label the model gave
    pub initial_sentiment_prediction: String,
    /// Ground-truth spam flag
    pub real_spam: bool,
    /// Ground-truth emotion label
    pub real_emotion: Emotion,
}

impl TryFrom<FeedbackRequest> for FeedbackRecord {
    type Error = PipelineError;

    fn try_from(request: FeedbackRequest) -> Result<Self> {
        let real_emotion = request.real_emotion.parse::<Emotion>()?;
        crate::validation::FeedbackValidator::validate(&request)?;

        Ok(Self {
            message_id: request.message_id,
            user_id: request.user_id,
            text: request.text,
            initial_spam_prediction: request.initial_spam_prediction,
            initial_sentiment_prediction: request.initial_sentiment_prediction,
            real_spam: request.real_spam,
            real_emotion,
        })
    }
}

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackAction {
    /// First submission for this message id
    Created,
    /// Existing record replaced
    Updated,
}

impl FeedbackAction {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }
}

impl fmt::Display for FeedbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feedback endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    /// Always "success"
    pub status: String,
    /// Human-readable summary
    pub message: String,
    /// Created or updated
    pub action: FeedbackAction,
}

impl From<FeedbackAction> for FeedbackResponse {
    fn from(action: FeedbackAction) -> Self {
        Self {
            status: "success".to_string(),
            message: format!("Feedback {action} successfully"),
            action,
        }
    }
}

/// Feedback row as read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFeedback {
    /// The persisted correction
    pub record: FeedbackRecord,
    /// First insert time (UTC)
    pub created_at: NaiveDateTime,
    /// Last write time (UTC)
    pub updated_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_lossy_drops_invalid_bytes() {
        let raw = RawMessage::from_bytes(vec![b'h', b'i', 0xff, 0xfe, b'!', 0xc3]);
        assert_eq!(raw.decode_lossy(), "hi!");
    }

    #[test]
    fn test_emotion_parse() {
        assert_eq!("joy".parse::<Emotion>().ok(), Some(Emotion::Joy));
        assert!(matches!(
            "Joy".parse::<Emotion>(),
            Err(PipelineError::InvalidLabel(_))
        ));
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let scores = EmotionScoreMap::from_logits(&[1.0, 2.0, 3.0, 0.5, -1.0, 0.0])
            .expect("six logits");
        let total: f64 = scores.iter().map(|(_, s)| s).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(scores.len(), 6);
        assert_eq!(scores.top().0, Emotion::Joy);
    }

    #[test]
    fn test_softmax_handles_huge_logits() {
        let scores = EmotionScoreMap::from_logits(&[1000.0, 999.0, 0.0, 0.0, 0.0, 0.0])
            .expect("six logits");
        assert!(scores.iter().all(|(_, s)| s.is_finite()));
        assert_eq!(scores.top().0, Emotion::Anger);
    }

    #[test]
    fn test_top_ties_resolve_to_first_label() {
        let scores = EmotionScoreMap::from_logits(&[0.0; 6]).expect("six logits");
        assert_eq!(scores.top().0, Emotion::Anger);
    }

    #[test]
    fn test_wrong_arity_is_classification_failure() {
        let err = EmotionScoreMap::from_logits(&[1.0, 2.0]).unwrap_err();
        assert_eq!(err.kind(), "ClassificationFailure");
    }

    #[test]
    fn test_score_map_serializes_six_lowercase_keys() {
        let scores = EmotionScoreMap::from_probabilities(&[0.1, 0.1, 0.5, 0.1, 0.1, 0.1])
            .expect("valid probabilities");
        let json = serde_json::to_value(&scores).expect("serialize");
        let object = json.as_object().expect("object");
        assert_eq!(object.len(), 6);
        for emotion in Emotion::ALL {
            assert!(object.contains_key(emotion.as_str()));
        }
    }

    #[test]
    fn test_feature_record_serializes_in_contract_order() {
        let record = SpamFeatureRecord {
            cleaned_message: "win prize".into(),
            keyword_count: 2,
            keyword_ratio: 0.5,
            promo_word_count: 2,
            promo_word_ratio: 0.5,
            uppercase_ratio: 0.1,
        };
        let json = serde_json::to_string(&record).expect("serialize");
        let mut last = 0;
        for name in SpamFeatureRecord::FIELD_NAMES {
            let pos = json.find(&format!("\"{name}\"")).expect("field present");
            assert!(pos >= last, "{name} out of order");
            last = pos;
        }
    }

    #[test]
    fn test_feedback_response_message() {
        let response = FeedbackResponse::from(FeedbackAction::Updated);
        assert_eq!(response.status, "success");
        assert_eq!(response.message, "Feedback updated successfully");
    }
}
