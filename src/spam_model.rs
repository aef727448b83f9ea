//! Spam classifiers
//!
//! A classifier maps a `SpamFeatureRecord` to a probability in [0, 1]. The
//! decision threshold is fixed here and applied by callers via `is_spam`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::models::SpamFeatureRecord;

/// Probabilities strictly above this are spam.
pub const SPAM_THRESHOLD: f64 = 0.75;

/// Binary spam decision for a probability
#[must_use]
pub fn is_spam(probability: f64) -> bool {
    probability > SPAM_THRESHOLD
}

/// Reject anything that is not a probability.
pub fn check_probability(probability: f64) -> Result<f64> {
    if probability.is_finite() && (0.0..=1.0).contains(&probability) {
        Ok(probability)
    } else {
        Err(PipelineError::classification(
            "spam",
            format!("probability {probability} outside [0, 1]"),
        ))
    }
}

/// Scores a feature record.
#[async_trait]
pub trait SpamClassifier: Send + Sync {
    /// Spam probability in [0, 1]
    async fn score(&self, record: &SpamFeatureRecord) -> Result<f64>;

    /// Classifier name for logs
    fn name(&self) -> &'static str;
}

/// Logistic regression over the numeric columns plus bag-of-words weights
/// on `cleaned_message`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinearSpamClassifier {
    /// Bias term
    #[serde(default)]
    pub intercept: f64,
    /// Weights keyed by numeric column name
    #[serde(default)]
    pub feature_weights: BTreeMap<String, f64>,
    /// Weights per cleaned token occurrence
    #[serde(default)]
    pub token_weights: HashMap<String, f64>,
}

impl LinearSpamClassifier {
    /// Parse a JSON model artifact
    pub fn from_json(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)
            .map_err(|e| PipelineError::Artifact(format!("spam model: {e}")))?;
        model.check()?;
        Ok(model)
    }

    /// Load a JSON model artifact from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Artifact(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    fn check(&self) -> Result<()> {
        if let Some(unknown) = self
            .feature_weights
            .keys()
            .find(|name| !SpamFeatureRecord::NUMERIC_FIELDS.contains(&name.as_str()))
        {
            return Err(PipelineError::Artifact(format!(
                "spam model weights unknown feature '{unknown}'"
            )));
        }
        let finite = self.intercept.is_finite()
            && self.feature_weights.values().all(|w| w.is_finite())
            && self.token_weights.values().all(|w| w.is_finite());
        if !finite {
            return Err(PipelineError::Artifact(
                "spam model has non-finite weights".to_string(),
            ));
        }
        Ok(())
    }

    /// Linear score before the sigmoid
    #[must_use]
    pub fn decision(&self, record: &SpamFeatureRecord) -> f64 {
        let numeric: f64 = self
            .feature_weights
            .iter()
            .filter_map(|(name, weight)| record.numeric(name).map(|x| weight * x))
            .sum();
        let tokens: f64 = record
            .cleaned_message
            .split_whitespace()
            .filter_map(|token| self.token_weights.get(token))
            .sum();
        self.intercept + numeric + tokens
    }

    /// Spam probability, computed synchronously
    #[must_use]
    pub fn probability(&self, record: &SpamFeatureRecord) -> f64 {
        sigmoid(self.decision(record))
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[async_trait]
impl SpamClassifier for LinearSpamClassifier {
    async fn score(&self, record: &SpamFeatureRecord) -> Result<f64> {
        check_probability(self.probability(record))
    }

    fn name(&self) -> &'static str {
        "linear"
    }
}

/// Spam model served over HTTP.
///
/// Posts the feature record as JSON and reads `{"probability": p}`.
pub struct RemoteSpamClassifier {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

#[derive(Deserialize)]
struct SpamResponse {
    probability: f64,
}

impl RemoteSpamClassifier {
    /// Client posting to `endpoint`
    #[must_use]
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl SpamClassifier for RemoteSpamClassifier {
    async fn score(&self, record: &SpamFeatureRecord) -> Result<f64> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(record)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::classification("spam", format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::classification(
                "spam",
                format!("model server returned {status}: {body}"),
            ));
        }

        let parsed: SpamResponse = response.json().await.map_err(|e| {
            PipelineError::classification("spam", format!("unreadable response: {e}"))
        })?;
        check_probability(parsed.probability)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
