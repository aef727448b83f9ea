use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::language::TranslationProvider;
use crate::logging::LogFormat;
use crate::spam_features::FeatureOptions;

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// `[server]`
    pub server: ServerConfig,
    /// `[database]`
    pub database: DatabaseConfig,
    /// `[logging]`
    pub logging: LoggingConfig,
    /// `[pipeline]`
    pub pipeline: PipelineConfig,
    /// `[language]`
    pub language: LanguageConfig,
    /// `[translation]`
    pub translation: TranslationConfig,
    /// `[models]`
    pub models: ModelsConfig,
    /// `[features]`, the spam feature contract
    pub features: FeatureOptions,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `host:port` to listen on
    pub bind_address: String,
}

/// Feedback database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `sqlite:` URL or plain path
    pub url: String,
    /// Pool size
    pub max_connections: u32,
    /// Wait for a pooled connection
    pub connection_timeout_secs: u64,
    /// SQLite busy timeout while another writer holds the lock
    pub busy_timeout_ms: u64,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Daily-rolling JSON log file, if any
    pub file_path: Option<String>,
    /// Console format
    pub format: LogFormat,
}

/// Per-request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Deadline for each translation attempt
    pub translation_timeout_secs: u64,
    /// Deadline covering both classifier calls
    pub classifier_timeout_secs: u64,
    /// Characters of user text kept in telemetry context
    pub excerpt_chars: usize,
}

/// Language detection thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Lowest whatlang confidence accepted
    pub min_confidence: f64,
    /// Fewer letters than this is treated as English
    pub min_chars: usize,
    /// Fall back to English unless whatlang marks the result reliable
    pub require_reliable: bool,
}

/// Translation providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Tried in order; first success wins
    pub providers: Vec<TranslationProvider>,
    /// Google web translate endpoint
    pub google_url: String,
    /// LibreTranslate `/translate` endpoint
    pub libretranslate_url: String,
    /// LibreTranslate API key, if the instance needs one
    pub libretranslate_api_key: Option<String>,
}

/// Where model artifacts come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactSource {
    /// Already present in `model_dir`
    #[default]
    Local,
    /// Downloaded from `artifact_base_url`
    Http,
}

/// Spam classifier implementation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpamBackend {
    /// Local logistic model from `spam_model`
    #[default]
    Linear,
    /// HTTP service at `spam_endpoint`
    Remote,
}

/// Emotion classifier implementation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionBackend {
    /// Built-in or `emotion_lexicon` word lists
    #[default]
    Lexicon,
    /// HTTP service at `emotion_endpoint`
    Remote,
}

/// Classifier backends and their artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Where artifacts are read from
    pub artifact_source: ArtifactSource,
    /// Blob container URL for `http` artifacts
    pub artifact_base_url: Option<String>,
    /// Appended to every artifact URL, e.g. a SAS token
    pub artifact_query: Option<String>,
    /// Local directory holding the artifacts
    pub model_dir: String,
    /// Spam classifier implementation
    pub spam_backend: SpamBackend,
    /// Artifact identifier of the linear spam model
    pub spam_model: String,
    /// Remote spam scoring URL
    pub spam_endpoint: Option<String>,
    /// Emotion classifier implementation
    pub emotion_backend: EmotionBackend,
    /// Optional artifact identifier of a replacement emotion lexicon
    pub emotion_lexicon: Option<String>,
    /// Remote emotion scoring URL
    pub emotion_endpoint: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:data/feedback.db".to_string(),
            max_connections: 8,
            connection_timeout_secs: 30,
            busy_timeout_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            format: LogFormat::Pretty,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            translation_timeout_secs: 10,
            classifier_timeout_secs: 30,
            excerpt_chars: 200,
        }
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.1,
            min_chars: 3,
            require_reliable: true,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            providers: vec![TranslationProvider::Google, TranslationProvider::Libretranslate],
            google_url: "https://translate.googleapis.com".to_string(),
            libretranslate_url: "https://libretranslate.com".to_string(),
            libretranslate_api_key: None,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            artifact_source: ArtifactSource::Local,
            artifact_base_url: None,
            artifact_query: None,
            model_dir: "models".to_string(),
            spam_backend: SpamBackend::Linear,
            spam_model: "spam_model.json".to_string(),
            spam_endpoint: None,
            emotion_backend: EmotionBackend::Lexicon,
            emotion_lexicon: None,
            emotion_endpoint: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `config/` and the process environment
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config"), None)
    }

    /// Load with precedence: compiled defaults, `<dir>/default.*`,
    /// `<dir>/local.*`, then `MAILSIFT__SECTION__KEY` variables. `env`
    /// replaces the process environment when given.
    pub fn load_from(config_dir: &Path, env: Option<HashMap<String, String>>) -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .context("Failed to serialize default configuration")?;

        let config = Config::builder()
            .add_source(defaults)
            .add_source(File::from(config_dir.join("default")).required(false))
            .add_source(File::from(config_dir.join("local")).required(false))
            .add_source(
                Environment::with_prefix("MAILSIFT")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("translation.providers")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .context("Failed to load configuration")?;

        let app_config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> crate::error::Result<()> {
        let invalid = |message: String| Err(PipelineError::InvalidConfig(message));

        if self.database.max_connections == 0 {
            return invalid("database.max_connections must be greater than 0".into());
        }
        if self.database.connection_timeout_secs == 0 {
            return invalid("database.connection_timeout_secs must be greater than 0".into());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return invalid(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                self.logging.level
            ));
        }

        if self.pipeline.translation_timeout_secs == 0 {
            return invalid("pipeline.translation_timeout_secs must be greater than 0".into());
        }
        if self.pipeline.classifier_timeout_secs == 0 {
            return invalid("pipeline.classifier_timeout_secs must be greater than 0".into());
        }

        if !(0.0..=1.0).contains(&self.language.min_confidence) {
            return invalid(format!(
                "language.min_confidence must be in [0, 1], got {}",
                self.language.min_confidence
            ));
        }

        if self.translation.providers.is_empty() {
            return invalid("translation.providers cannot be empty".into());
        }

        let models = &self.models;
        if models.artifact_source == ArtifactSource::Http && models.artifact_base_url.is_none() {
            return invalid("models.artifact_base_url is required for http artifacts".into());
        }
        if models.spam_backend == SpamBackend::Remote && models.spam_endpoint.is_none() {
            return invalid("models.spam_endpoint is required for the remote spam backend".into());
        }
        if models.emotion_backend == EmotionBackend::Remote && models.emotion_endpoint.is_none() {
            return invalid(
                "models.emotion_endpoint is required for the remote emotion backend".into(),
            );
        }

        Ok(())
    }

    /// Filesystem path of the SQLite database
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        let url = &self.database.url;
        PathBuf::from(url.strip_prefix("sqlite:").unwrap_or(url))
    }

    /// Per-attempt translation deadline
    #[must_use]
    pub const fn translation_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.translation_timeout_secs)
    }

    /// Deadline for both classifiers together
    #[must_use]
    pub const fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.classifier_timeout_secs)
    }
}
