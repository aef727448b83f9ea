//! Emotion classifiers
//!
//! Everything behind `EmotionClassifier` returns a complete six-label
//! distribution. The lexicon classifier scores words locally; the remote
//! classifier delegates to a model server.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::models::{Emotion, EmotionScoreMap};

/// Scores prepared English text over the six emotion labels.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    /// Distribution over the six labels, summing to 1.
    async fn score(&self, prepared_text: &str) -> Result<EmotionScoreMap>;

    /// Classifier name for logs
    fn name(&self) -> &'static str;
}

/// Serialized lexicon, loadable from a model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionLexicon {
    /// Word weights per label
    pub lexicon: BTreeMap<Emotion, HashMap<String, f64>>,
    /// Multipliers applied to the next word
    #[serde(default)]
    pub intensifiers: HashMap<String, f64>,
    /// Words that flip the next two words
    #[serde(default)]
    pub negations: Vec<String>,
    /// Base logit of the neutral label
    #[serde(default = "default_neutral_bias")]
    pub neutral_bias: f64,
}

const fn default_neutral_bias() -> f64 {
    1.0
}

impl Default for EmotionLexicon {
    fn default() -> Self {
        let table = |words: &[(&str, f64)]| -> HashMap<String, f64> {
            words.iter().map(|(w, s)| ((*w).to_string(), *s)).collect()
        };

        let mut lexicon = BTreeMap::new();
        lexicon.insert(
            Emotion::Joy,
            table(&[
                ("good", 1.0),
                ("great", 1.5),
                ("excellent", 2.0),
                ("amazing", 2.0),
                ("wonderful", 1.8),
                ("fantastic", 1.8),
                ("happy", 1.5),
                ("joy", 1.5),
                ("love", 2.0),
                ("like", 0.8),
                ("best", 1.5),
                ("awesome", 1.8),
                ("perfect", 2.0),
                ("brilliant", 1.8),
                ("delightful", 1.5),
                ("pleased", 1.2),
                ("glad", 1.2),
                ("excited", 1.5),
                ("thrilled", 1.8),
                ("grateful", 1.5),
                ("thanks", 1.0),
                ("thank", 1.0),
                ("lucky", 1.0),
                ("win", 1.2),
                ("won", 1.2),
                ("smiling", 1.2),
                ("grinning", 1.2),
                ("laughing", 1.2),
                ("heart", 1.0),
            ]),
        );
        lexicon.insert(
            Emotion::Sadness,
            table(&[
                ("sad", 1.5),
                ("unhappy", 1.5),
                ("upset", 1.2),
                ("disappointed", 1.5),
                ("disappointing", 1.5),
                ("devastated", 2.0),
                ("depressed", 1.8),
                ("miserable", 1.8),
                ("hopeless", 1.8),
                ("lonely", 1.5),
                ("heartbroken", 2.0),
                ("cry", 1.5),
                ("crying", 1.5),
                ("tears", 1.2),
                ("sorry", 1.0),
                ("miss", 1.0),
                ("lost", 1.0),
                ("grief", 2.0),
                ("broken", 1.2),
            ]),
        );
        lexicon.insert(
            Emotion::Anger,
            table(&[
                ("angry", 1.8),
                ("hate", 2.0),
                ("furious", 2.0),
                ("frustrated", 1.5),
                ("annoyed", 1.2),
                ("irritated", 1.2),
                ("disgusted", 1.8),
                ("disgusting", 1.8),
                ("revolting", 1.8),
                ("pathetic", 1.5),
                ("useless", 1.5),
                ("worthless", 1.8),
                ("terrible", 1.5),
                ("awful", 1.5),
                ("horrible", 1.5),
                ("worst", 1.8),
                ("bad", 1.0),
                ("mad", 1.5),
                ("rage", 2.0),
                ("outraged", 2.0),
                ("pouting", 1.2),
            ]),
        );
        lexicon.insert(
            Emotion::Fear,
            table(&[
                ("scared", 1.8),
                ("afraid", 1.5),
                ("worried", 1.2),
                ("anxious", 1.2),
                ("desperate", 1.5),
                ("terrified", 2.0),
                ("nervous", 1.2),
                ("panic", 1.8),
                ("fear", 1.5),
                ("frightened", 1.8),
                ("danger", 1.5),
                ("threat", 1.5),
                ("fearful", 1.8),
                ("screaming", 1.5),
            ]),
        );
        lexicon.insert(
            Emotion::Surprise,
            table(&[
                ("wow", 1.8),
                ("surprised", 1.8),
                ("surprising", 1.5),
                ("surprise", 1.5),
                ("unexpected", 1.5),
                ("shocked", 1.8),
                ("shocking", 1.5),
                ("amazed", 1.5),
                ("astonished", 1.8),
                ("omg", 1.5),
                ("unbelievable", 1.5),
                ("suddenly", 1.0),
                ("whoa", 1.5),
                ("astonishing", 1.8),
            ]),
        );

        let intensifiers = table(&[
            ("very", 1.5),
            ("extremely", 2.0),
            ("incredibly", 2.0),
            ("absolutely", 2.0),
            ("completely", 1.8),
            ("totally", 1.8),
            ("really", 1.3),
            ("so", 1.2),
            ("quite", 1.2),
            ("rather", 1.1),
            ("somewhat", 0.8),
            ("slightly", 0.7),
            ("barely", 0.5),
            ("hardly", 0.5),
        ]);

        let negations = [
            "not", "no", "never", "none", "nothing", "nobody", "nowhere", "neither", "nor",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        Self {
            lexicon,
            intensifiers,
            negations,
            neutral_bias: default_neutral_bias(),
        }
    }
}

/// Local word-weight emotion classifier.
#[derive(Debug, Clone)]
pub struct LexiconEmotionClassifier {
    words: HashMap<String, Vec<(Emotion, f64)>>,
    intensifiers: HashMap<String, f64>,
    negations: HashSet<String>,
    neutral_bias: f64,
}

impl Default for LexiconEmotionClassifier {
    fn default() -> Self {
        Self::from_lexicon(EmotionLexicon::default())
    }
}

impl LexiconEmotionClassifier {
    /// Index a lexicon for scoring
    #[must_use]
    pub fn from_lexicon(lexicon: EmotionLexicon) -> Self {
        let mut words: HashMap<String, Vec<(Emotion, f64)>> = HashMap::new();
        for (emotion, table) in lexicon.lexicon {
            for (word, weight) in table {
                words
                    .entry(word.to_lowercase())
                    .or_default()
                    .push((emotion, weight));
            }
        }
        Self {
            words,
            intensifiers: lexicon.intensifiers,
            negations: lexicon.negations.into_iter().collect(),
            neutral_bias: lexicon.neutral_bias,
        }
    }

    /// Parse a JSON lexicon artifact
    pub fn from_json(json: &str) -> Result<Self> {
        let lexicon: EmotionLexicon = serde_json::from_str(json)
            .map_err(|e| PipelineError::Artifact(format!("emotion lexicon: {e}")))?;
        let weights_ok = lexicon
            .lexicon
            .values()
            .flat_map(HashMap::values)
            .chain(lexicon.intensifiers.values())
            .all(|w| w.is_finite());
        if !weights_ok || !lexicon.neutral_bias.is_finite() {
            return Err(PipelineError::Artifact(
                "emotion lexicon has non-finite weights".to_string(),
            ));
        }
        Ok(Self::from_lexicon(lexicon))
    }

    /// Load a JSON lexicon artifact from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Artifact(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    fn is_negation(&self, word: &str) -> bool {
        self.negations.contains(word) || word.ends_with("n't")
    }

    /// Raw per-label scores in `Emotion::ALL` order.
    #[must_use]
    pub fn logits(&self, text: &str) -> [f64; 6] {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|w| !w.is_empty())
            .collect();

        let mut logits = [0.0; 6];
        logits[Emotion::Neutral.index()] = self.neutral_bias;

        for (i, word) in words.iter().enumerate() {
            let Some(entries) = self.words.get(*word) else {
                continue;
            };

            let intensity = i
                .checked_sub(1)
                .and_then(|p| self.intensifiers.get(words[p]))
                .copied()
                .unwrap_or(1.0);
            let negated = (1..=2)
                .filter_map(|back| i.checked_sub(back))
                .any(|p| self.is_negation(words[p]));

            for &(emotion, weight) in entries {
                let value = weight * intensity;
                if negated {
                    // Flip and reduce intensity
                    let target = match emotion {
                        Emotion::Joy => Emotion::Sadness,
                        _ => Emotion::Neutral,
                    };
                    logits[target.index()] += value * 0.8;
                } else {
                    logits[emotion.index()] += value;
                }
            }
        }
        logits
    }
}

#[async_trait]
impl EmotionClassifier for LexiconEmotionClassifier {
    async fn score(&self, prepared_text: &str) -> Result<EmotionScoreMap> {
        EmotionScoreMap::from_logits(&self.logits(prepared_text))
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

/// Emotion model served over HTTP.
///
/// Sends `{"text": ...}` and accepts `{"logits": [6]}` or
/// `{"probabilities": [6]}` in `Emotion::ALL` order.
pub struct RemoteEmotionClassifier {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct EmotionRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmotionResponse {
    logits: Option<Vec<f64>>,
    probabilities: Option<Vec<f64>>,
}

impl RemoteEmotionClassifier {
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
impl EmotionClassifier for RemoteEmotionClassifier {
    async fn score(&self, prepared_text: &str) -> Result<EmotionScoreMap> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmotionRequest {
                text: prepared_text,
            })
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::classification("emotion", format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::classification(
                "emotion",
                format!("model server returned {status}: {body}"),
            ));
        }

        let parsed: EmotionResponse = response.json().await.map_err(|e| {
            PipelineError::classification("emotion", format!("unreadable response: {e}"))
        })?;

        match (parsed.logits, parsed.probabilities) {
            (Some(logits), _) => EmotionScoreMap::from_logits(&logits),
            (None, Some(probabilities)) => EmotionScoreMap::from_probabilities(&probabilities),
            (None, None) => Err(PipelineError::classification(
                "emotion",
                "response has neither logits nor probabilities",
            )),
        }
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn top(text: &str) -> Emotion {
        let classifier = LexiconEmotionClassifier::default();
        let logits = classifier.logits(text);
        EmotionScoreMap::from_logits(&logits)
            .expect("six logits")
            .top()
            .0
    }

    #[test]
    fn test_plain_text_is_neutral() {
        assert_eq!(top("The sky is blue and the grass is green"), Emotion::Neutral);
    }

    #[test]
    fn test_each_label_is_reachable() {
        assert_eq!(top("I love this, it is amazing"), Emotion::Joy);
        assert_eq!(top("I am so sad and lonely"), Emotion::Sadness);
        assert_eq!(top("I hate this, absolutely furious"), Emotion::Anger);
        assert_eq!(top("I am terrified and scared"), Emotion::Fear);
        assert_eq!(top("wow, totally unexpected"), Emotion::Surprise);
    }

    #[test]
    fn test_negated_joy_reads_as_sadness() {
        let classifier = LexiconEmotionClassifier::default();
        let logits = classifier.logits("I am not happy");
        assert_eq!(logits[Emotion::Joy.index()], 0.0);
        assert!(logits[Emotion::Sadness.index()] > 0.0);
    }

    #[test]
    fn test_emoji_tags_contribute() {
        assert_eq!(top(":smiling_face_with_heart_eyes: :grinning_face:"), Emotion::Joy);
    }

    #[test]
    fn test_lexicon_rejects_unknown_label() {
        let json = r#"{"lexicon": {"disgust": {"gross": 1.0}}}"#;
        assert!(matches!(
            LexiconEmotionClassifier::from_json(json),
            Err(PipelineError::Artifact(_))
        ));
    }

    #[test]
    fn test_lexicon_from_json() {
        let json = r#"{"lexicon": {"fear": {"spider": 3.0}}, "negations": ["not"]}"#;
        let classifier = LexiconEmotionClassifier::from_json(json).expect("valid lexicon");
        let scores = EmotionScoreMap::from_logits(&classifier.logits("a spider"))
            .expect("six logits");
        assert_eq!(scores.top().0, Emotion::Fear);
    }
}
