//! Language identification and translation to English
//!
//! Detection never fails: anything short, ambiguous or unknown is treated
//! as English. Translation walks the configured providers in order and the
//! first success wins; if every provider fails the request is aborted with a
//! `TranslationFailure`, since the classifiers only understand English.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::models::{DetectedLanguage, NormalizedText, TranslatedText};

/// Identifies the language of cleaned text.
pub trait LanguageDetector: Send + Sync {
    /// Two-letter language code; `"en"` whenever detection is inconclusive.
    fn detect(&self, text: &NormalizedText) -> DetectedLanguage;
}

/// Statistical detector backed by `whatlang`.
#[derive(Debug, Clone)]
pub struct WhatlangDetector {
    min_confidence: f64,
    min_chars: usize,
    require_reliable: bool,
}

impl WhatlangDetector {
    /// Detector that trusts results at or above `min_confidence` for texts
    /// of at least `min_chars` characters. Results whatlang itself marks as
    /// unreliable are dropped too; see [`Self::requiring_reliable`].
    #[must_use]
    pub const fn new(min_confidence: f64, min_chars: usize) -> Self {
        Self {
            min_confidence,
            min_chars,
            require_reliable: true,
        }
    }

    /// Whether an unreliable whatlang result falls back to English. Short
    /// English messages ("Win cash today") often get weak Spanish or Latin
    /// hits.
    #[must_use]
    pub const fn requiring_reliable(mut self, require: bool) -> Self {
        self.require_reliable = require;
        self
    }

    fn try_detect(&self, text: &str) -> Result<DetectedLanguage> {
        let length = text.chars().filter(|c| c.is_alphabetic()).count();
        if length < self.min_chars {
            return Err(PipelineError::LanguageDetection(format!(
                "{length} letters, need {}",
                self.min_chars
            )));
        }
        let info = whatlang::detect(text).ok_or_else(|| {
            PipelineError::LanguageDetection("no language identified".to_string())
        })?;
        if info.confidence() < self.min_confidence
            || (self.require_reliable && !info.is_reliable())
        {
            return Err(PipelineError::LanguageDetection(format!(
                "{} at confidence {:.2}, reliable: {}",
                info.lang().code(),
                info.confidence(),
                info.is_reliable()
            )));
        }
        Ok(DetectedLanguage::new(iso_639_1(info.lang())))
    }
}

impl Default for WhatlangDetector {
    fn default() -> Self {
        Self::new(0.1, 3)
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &NormalizedText) -> DetectedLanguage {
        match self.try_detect(text.as_str()) {
            Ok(language) => language,
            Err(err) => {
                debug!(kind = err.kind(), error = %err, "Defaulting language to en");
                DetectedLanguage::english()
            }
        }
    }
}

/// Two-letter code for a whatlang language, or its three-letter code when
/// ISO 639-1 has none.
#[must_use]
pub fn iso_639_1(lang: whatlang::Lang) -> &'static str {
    match lang.code() {
        "afr" => "af",
        "aka" => "ak",
        "amh" => "am",
        "ara" => "ar",
        "aze" => "az",
        "bel" => "be",
        "ben" => "bn",
        "bul" => "bg",
        "cat" => "ca",
        "ces" => "cs",
        "cmn" => "zh",
        "dan" => "da",
        "deu" => "de",
        "ell" => "el",
        "eng" => "en",
        "epo" => "eo",
        "est" => "et",
        "fin" => "fi",
        "fra" => "fr",
        "guj" => "gu",
        "heb" => "he",
        "hin" => "hi",
        "hrv" => "hr",
        "hun" => "hu",
        "hye" => "hy",
        "ind" => "id",
        "ita" => "it",
        "jav" => "jv",
        "jpn" => "ja",
        "kan" => "kn",
        "kat" => "ka",
        "khm" => "km",
        "kor" => "ko",
        "lat" => "la",
        "lav" => "lv",
        "lit" => "lt",
        "mal" => "ml",
        "mar" => "mr",
        "mkd" => "mk",
        "mya" => "my",
        "nep" => "ne",
        "nld" => "nl",
        "nob" => "no",
        "ori" => "or",
        "pan" => "pa",
        "pes" => "fa",
        "pol" => "pl",
        "por" => "pt",
        "ron" => "ro",
        "rus" => "ru",
        "sin" => "si",
        "slk" => "sk",
        "slv" => "sl",
        "sna" => "sn",
        "spa" => "es",
        "srp" => "sr",
        "swe" => "sv",
        "tam" => "ta",
        "tel" => "te",
        "tgl" => "tl",
        "tha" => "th",
        "tuk" => "tk",
        "tur" => "tr",
        "ukr" => "uk",
        "urd" => "ur",
        "uzb" => "uz",
        "vie" => "vi",
        "yid" => "yi",
        "zul" => "zu",
        other => other,
    }
}

/// One external translation capability.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source_lang` into English.
    async fn translate(&self, text: &str, source_lang: &str) -> Result<String>;

    /// Provider name for logs and metrics
    fn name(&self) -> &'static str;

    /// Largest request the provider accepts, in characters
    fn max_chars(&self) -> Option<usize> {
        None
    }
}

/// Known translation providers, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    /// Public Google web endpoint
    Google,
    /// Self-hostable LibreTranslate API
    Libretranslate,
}

/// Google's keyless web translation endpoint.
pub struct GoogleTranslateBackend {
    base_url: String,
    client: reqwest::Client,
}

impl GoogleTranslateBackend {
    /// Request size limit of the web endpoint
    pub const MAX_CHARS: usize = 4500;

    /// Client for `base_url` (normally `https://translate.googleapis.com`)
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn provider_code(source_lang: &str) -> &str {
        match source_lang {
            "zh" => "zh-CN",
            other => other,
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslateBackend {
    async fn translate(&self, text: &str, source_lang: &str) -> Result<String> {
        let url = format!("{}/translate_a/single", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", Self::provider_code(source_lang)),
                ("tl", "en"),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| PipelineError::translation(source_lang, format!("google request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PipelineError::translation(
                source_lang,
                format!("google returned {}", response.status()),
            ));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            PipelineError::translation(source_lang, format!("google response unreadable: {e}"))
        })?;

        let sentences = body
            .get(0)
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| PipelineError::translation(source_lang, "google response has no sentences"))?;

        let translated: String = sentences
            .iter()
            .filter_map(|sentence| sentence.get(0).and_then(serde_json::Value::as_str))
            .collect();
        Ok(translated)
    }

    fn name(&self) -> &'static str {
        "google"
    }

    fn max_chars(&self) -> Option<usize> {
        Some(Self::MAX_CHARS)
    }
}

/// LibreTranslate-compatible `/translate` API.
pub struct LibreTranslateBackend {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct LibreRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct LibreResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl LibreTranslateBackend {
    /// Client for a LibreTranslate server
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Translator for LibreTranslateBackend {
    async fn translate(&self, text: &str, source_lang: &str) -> Result<String> {
        let url = format!("{}/translate", self.base_url);
        let request = LibreRequest {
            q: text,
            source: source_lang,
            target: "en",
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                PipelineError::translation(source_lang, format!("libretranslate request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::translation(
                source_lang,
                format!("libretranslate returned {status}: {body}"),
            ));
        }

        let parsed: LibreResponse = response.json().await.map_err(|e| {
            PipelineError::translation(source_lang, format!("libretranslate response unreadable: {e}"))
        })?;
        Ok(parsed.translated_text)
    }

    fn name(&self) -> &'static str {
        "libretranslate"
    }
}

/// First-available translation over an ordered provider list.
#[derive(Clone)]
pub struct TranslationService {
    backends: Vec<Arc<dyn Translator>>,
    timeout: Duration,
}

impl TranslationService {
    /// Try `backends` in order, bounding each attempt by `timeout`.
    #[must_use]
    pub fn new(backends: Vec<Arc<dyn Translator>>, timeout: Duration) -> Self {
        Self { backends, timeout }
    }

    /// Names of the configured providers, in order
    #[must_use]
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// English text for the classifiers.
    ///
    /// English input is returned unchanged without touching any provider.
    pub async fn translate(
        &self,
        text: &NormalizedText,
        language: &DetectedLanguage,
    ) -> Result<TranslatedText> {
        if language.is_english() {
            return Ok(TranslatedText::untouched(text));
        }
        if text.is_empty() {
            return Ok(TranslatedText::translated(String::new()));
        }

        let mut failures = Vec::new();
        for backend in &self.backends {
            match self.attempt(backend.as_ref(), text.as_str(), language.code()).await {
                Ok(translated) => {
                    info!(
                        provider = backend.name(),
                        language = language.code(),
                        "Text translated"
                    );
                    crate::metrics::record_translation(language.code(), backend.name());
                    return Ok(TranslatedText::translated(translated));
                }
                Err(err) => {
                    warn!(
                        provider = backend.name(),
                        language = language.code(),
                        error = %err,
                        "Translation provider failed"
                    );
                    failures.push(format!("{}: {err}", backend.name()));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no translation provider configured".to_string());
        }
        Err(PipelineError::translation(language.code(), failures.join("; ")))
    }

    async fn attempt(&self, backend: &dyn Translator, text: &str, source_lang: &str) -> Result<String> {
        let chunks = match backend.max_chars() {
            Some(limit) => split_chunks(text, limit),
            None => vec![text],
        };

        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let part = tokio::time::timeout(self.timeout, backend.translate(chunk, source_lang))
                .await
                .map_err(|_| {
                    PipelineError::translation(
                        source_lang,
                        format!("timed out after {}s", self.timeout.as_secs_f64()),
                    )
                })??;
            let part = part.trim().to_string();
            if part.is_empty() {
                return Err(PipelineError::translation(source_lang, "empty translation"));
            }
            parts.push(part);
        }
        Ok(parts.join(" "))
    }
}

/// Split `text` into pieces of at most `max_chars` characters, preferring
/// sentence ends, then whitespace, then a hard cut.
#[must_use]
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while rest.chars().count() > max_chars {
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(idx, _)| idx);
        let window = &rest[..limit];

        let sentence_end = window
            .char_indices()
            .filter(|&(i, c)| {
                matches!(c, '.' | '!' | '?')
                    && window[i + c.len_utf8()..].starts_with(char::is_whitespace)
            })
            .map(|(i, c)| i + c.len_utf8())
            .last();
        let cut = sentence_end
            .or_else(|| window.rfind(char::is_whitespace).filter(|&i| i > 0))
            .unwrap_or(limit);

        chunks.push(rest[..cut].trim_end());
        rest = rest[cut..].trim_start();
    }
    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_codes() {
        assert_eq!(iso_639_1(whatlang::Lang::Eng), "en");
        assert_eq!(iso_639_1(whatlang::Lang::Cmn), "zh");
        assert_eq!(iso_639_1(whatlang::Lang::Pes), "fa");
        assert_eq!(iso_639_1(whatlang::Lang::Nob), "no");
    }

    #[test]
    fn test_split_chunks_prefers_sentence_ends() {
        let text = "One two. Three four five. Six";
        let chunks = split_chunks(text, 12);
        assert_eq!(chunks, vec!["One two.", "Three four", "five. Six"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
    }

    #[test]
    fn test_split_chunks_hard_cut() {
        let chunks = split_chunks("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_chunks("hello there", 4500), vec!["hello there"]);
    }
}
