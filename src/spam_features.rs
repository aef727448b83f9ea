//! Spam feature extraction
//!
//! Produces the `SpamFeatureRecord` the spam classifier was fit on: an
//! aggressively cleaned message (lowercase, no digits/URLs/mentions, no
//! stopwords, punctuation, one-letter tokens or entities, lemmatized) plus
//! keyword, promo and uppercase ratios computed on the uncleaned text.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entities::EntityGazetteer;
use crate::error::Result;
use crate::lemmatizer::{Lemmatizer, LemmatizerMode};
use crate::models::{SpamFeatureRecord, TranslatedText};
use crate::vocabulary::{FeatureVocabulary, PromoVocabulary, STOP_WORDS};

/// Contraction tails split off by the tokenizer; all are stopwords.
const CLITICS: &[&str] = &["n't", "'s", "'re", "'ve", "'ll", "'d", "'m", "ca", "wo", "sha"];

/// Knobs that change the feature contract. Both must match the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureOptions {
    /// List feeding the promo columns
    pub promo_vocabulary: PromoVocabulary,
    /// Lemmatization strategy for `cleaned_message`
    pub lemmatizer: LemmatizerMode,
}

/// Turns English text into a `SpamFeatureRecord`.
#[derive(Debug)]
pub struct SpamFeatureExtractor {
    digits: Regex,
    urls: Regex,
    handles: Regex,
    token_pattern: Regex,
    stopwords: HashSet<String>,
    lemmatizer: Lemmatizer,
    entities: EntityGazetteer,
    spam_vocabulary: FeatureVocabulary,
    promo_vocabulary: FeatureVocabulary,
    options: FeatureOptions,
}

impl SpamFeatureExtractor {
    /// Create an extractor
    pub fn new(options: FeatureOptions) -> Result<Self> {
        let digits = Regex::new(r"\d+")?;
        let urls = Regex::new(r"http\S+")?;
        let handles = Regex::new(r"@\S+|#\S+")?;
        let token_pattern = Regex::new(r"\w+(?:['\u{2019}]\w+)*|[^\w\s]")?;

        let stopwords: HashSet<String> = STOP_WORDS
            .iter()
            .chain(CLITICS)
            .map(ToString::to_string)
            .collect();

        Ok(Self {
            digits,
            urls,
            handles,
            token_pattern,
            stopwords,
            lemmatizer: Lemmatizer::new(options.lemmatizer),
            entities: EntityGazetteer::new(),
            spam_vocabulary: FeatureVocabulary::spam(),
            promo_vocabulary: FeatureVocabulary::new(options.promo_vocabulary.phrases()),
            options,
        })
    }

    /// Options this extractor was built with
    #[must_use]
    pub const fn options(&self) -> FeatureOptions {
        self.options
    }

    /// Full feature record for translated text.
    #[must_use]
    pub fn extract(&self, text: &TranslatedText) -> SpamFeatureRecord {
        self.extract_str(text.as_str())
    }

    /// Full feature record for any English text.
    #[must_use]
    pub fn extract_str(&self, text: &str) -> SpamFeatureRecord {
        let word_count = text.split_whitespace().count();
        let keyword_count = self.spam_vocabulary.count_in(text);
        let promo_word_count = self.promo_vocabulary.count_in(text);

        SpamFeatureRecord {
            cleaned_message: self.clean(text),
            keyword_count,
            keyword_ratio: ratio(keyword_count, word_count),
            promo_word_count,
            promo_word_ratio: ratio(promo_word_count, word_count),
            uppercase_ratio: uppercase_ratio(text),
        }
    }

    /// The cleaning sub-pipeline alone.
    #[must_use]
    pub fn clean(&self, text: &str) -> String {
        let text = self.scrub(text);
        let tokens = self.tokenize(&text);
        let entity_flags = self.entities.mark(&tokens);

        tokens
            .iter()
            .zip(entity_flags)
            .filter(|(token, is_entity)| !is_entity && self.keeps(token))
            .map(|(token, _)| self.lemmatizer.lemma(token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Lowercase, then drop digits, URLs, mentions and hashtags.
    #[must_use]
    pub fn scrub(&self, text: &str) -> String {
        let text = text.to_lowercase();
        let text = self.digits.replace_all(&text, "");
        let text = self.urls.replace_all(&text, "");
        self.handles.replace_all(&text, "").into_owned()
    }

    /// Word and punctuation tokens with contractions split ("don't" ->
    /// "do", "n't").
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.token_pattern
            .find_iter(text)
            .flat_map(|m| split_clitics(m.as_str()))
            .collect()
    }

    fn keeps(&self, token: &str) -> bool {
        token.chars().count() > 1
            && token.chars().any(char::is_alphanumeric)
            && !self.stopwords.contains(token)
    }
}

fn split_clitics(token: &str) -> Vec<String> {
    let token = token.replace('\u{2019}', "'");
    if token.len() > 3 && token.ends_with("n't") {
        let cut = token.len() - 3;
        return vec![token[..cut].to_string(), token[cut..].to_string()];
    }
    match token.rfind('\'') {
        Some(pos) if pos > 0 => vec![token[..pos].to_string(), token[pos..].to_string()],
        _ => vec![token],
    }
}

/// `count / words`, defined as 0 when there are no words.
#[must_use]
pub fn ratio(count: usize, words: usize) -> f64 {
    if words == 0 {
        0.0
    } else {
        count as f64 / words as f64
    }
}

/// Share of characters that are uppercase letters; 0 for empty text.
#[must_use]
pub fn uppercase_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    let upper = text.chars().filter(|c| c.is_uppercase()).count();
    ratio(upper, total)
}
