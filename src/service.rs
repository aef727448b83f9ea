//! Inference orchestration
//!
//! `InferenceOrchestrator` owns an immutable `ServiceContext` built once at
//! startup and shared by reference across requests. A prediction runs
//! normalize, detect, translate, then the two preprocessing branches
//! concurrently, then both classifiers concurrently under one timeout.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info};

use crate::artifacts::{HttpArtifactStore, LocalArtifactStore, ModelArtifactStore};
use crate::config::{AppConfig, ArtifactSource, EmotionBackend, SpamBackend};
use crate::db::{Database, FeedbackStore};
use crate::emotion::{EmotionClassifier, LexiconEmotionClassifier, RemoteEmotionClassifier};
use crate::error::{PipelineError, Result};
use crate::language::{
    GoogleTranslateBackend, LanguageDetector, LibreTranslateBackend, TranslationProvider,
    TranslationService, Translator, WhatlangDetector,
};
use crate::metrics::{self, PredictionTimer};
use crate::models::{
    DetectedLanguage, EmotionScoreMap, FeedbackAction, FeedbackRecord, FeedbackRequest,
    NormalizedText, PredictionResult, RawMessage, SpamFeatureRecord, TranslatedText,
};
use crate::normalize::{EmotionTextPreparer, TextNormalizer};
use crate::spam_features::{FeatureOptions, SpamFeatureExtractor};
use crate::spam_model::{check_probability, is_spam, LinearSpamClassifier, RemoteSpamClassifier, SpamClassifier};
use crate::telemetry::{TelemetryContext, TelemetryLevel, TelemetrySink, TracingTelemetry};

/// The classifier-free front of the pipeline: normalization, detection
/// and both preprocessing branches.
pub struct Preprocessor {
    normalizer: TextNormalizer,
    detector: Arc<dyn LanguageDetector>,
    preparer: EmotionTextPreparer,
    extractor: SpamFeatureExtractor,
}

impl Preprocessor {
    /// Build the normalizer, preparer and extractor around `detector`
    pub fn new(detector: Arc<dyn LanguageDetector>, features: FeatureOptions) -> Result<Self> {
        Ok(Self {
            normalizer: TextNormalizer::keeping_punctuation()?,
            detector,
            preparer: EmotionTextPreparer::new()?,
            extractor: SpamFeatureExtractor::new(features)?,
        })
    }

    /// Steps 1-3 and 5-7; punctuation is kept for the spam branch.
    #[must_use]
    pub fn normalize(&self, raw: &RawMessage) -> NormalizedText {
        self.normalizer.normalize(raw)
    }

    /// Language of normalized text; `"en"` when unsure
    #[must_use]
    pub fn detect(&self, text: &NormalizedText) -> DetectedLanguage {
        self.detector.detect(text)
    }

    /// Emotion classifier input
    #[must_use]
    pub fn prepare(&self, text: &TranslatedText) -> String {
        self.preparer.prepare(text)
    }

    /// Spam classifier input
    #[must_use]
    pub fn extract(&self, text: &TranslatedText) -> SpamFeatureRecord {
        self.extractor.extract(text)
    }

    /// Everything before translation and classification, treating the
    /// normalized text as if it were English.
    #[must_use]
    pub fn inspect(&self, raw: &RawMessage) -> Inspection {
        let normalized = self.normalize(raw);
        let language = self.detect(&normalized);
        let untouched = TranslatedText::untouched(&normalized);
        Inspection {
            prepared: self.prepare(&untouched),
            features: self.extract(&untouched),
            normalized,
            language,
        }
    }
}

/// Everything a request needs, loaded once and never mutated.
pub struct ServiceContext {
    preprocessor: Preprocessor,
    translation: TranslationService,
    emotion: Arc<dyn EmotionClassifier>,
    spam: Arc<dyn SpamClassifier>,
    feedback: Arc<dyn FeedbackStore>,
    telemetry: Arc<dyn TelemetrySink>,
    classifier_timeout: Duration,
    excerpt_chars: usize,
}

/// Pre-classifier view of a message, for diagnostics.
#[derive(Debug, Clone)]
pub struct Inspection {
    /// Shared normalizer output
    pub normalized: NormalizedText,
    /// Detected language
    pub language: DetectedLanguage,
    /// Emotion classifier input
    pub prepared: String,
    /// Spam classifier input
    pub features: SpamFeatureRecord,
}

/// Sequences the pipeline for predictions and feedback.
#[derive(Clone)]
pub struct InferenceOrchestrator {
    context: Arc<ServiceContext>,
}

/// Assembles an `InferenceOrchestrator`.
pub struct OrchestratorBuilder {
    detector: Arc<dyn LanguageDetector>,
    translation: TranslationService,
    emotion: Option<Arc<dyn EmotionClassifier>>,
    spam: Option<Arc<dyn SpamClassifier>>,
    feedback: Option<Arc<dyn FeedbackStore>>,
    telemetry: Arc<dyn TelemetrySink>,
    features: FeatureOptions,
    classifier_timeout: Duration,
    excerpt_chars: usize,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self {
            detector: Arc::new(WhatlangDetector::default()),
            translation: TranslationService::new(Vec::new(), Duration::from_secs(10)),
            emotion: None,
            spam: None,
            feedback: None,
            telemetry: Arc::new(TracingTelemetry),
            features: FeatureOptions::default(),
            classifier_timeout: Duration::from_secs(30),
            excerpt_chars: 200,
        }
    }
}

impl OrchestratorBuilder {
    /// Language detector (default: whatlang)
    #[must_use]
    pub fn detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Translation chain (default: no providers)
    #[must_use]
    pub fn translation(mut self, translation: TranslationService) -> Self {
        self.translation = translation;
        self
    }

    /// Emotion classifier. Required.
    #[must_use]
    pub fn emotion(mut self, classifier: Arc<dyn EmotionClassifier>) -> Self {
        self.emotion = Some(classifier);
        self
    }

    /// Spam classifier. Required.
    #[must_use]
    pub fn spam(mut self, classifier: Arc<dyn SpamClassifier>) -> Self {
        self.spam = Some(classifier);
        self
    }

    /// Feedback store. Required.
    #[must_use]
    pub fn feedback(mut self, store: Arc<dyn FeedbackStore>) -> Self {
        self.feedback = Some(store);
        self
    }

    /// Telemetry sink (default: tracing)
    #[must_use]
    pub fn telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = sink;
        self
    }

    /// Feature contract for the spam branch
    #[must_use]
    pub const fn features(mut self, options: FeatureOptions) -> Self {
        self.features = options;
        self
    }

    /// One deadline covering both classifier calls
    #[must_use]
    pub const fn classifier_timeout(mut self, timeout: Duration) -> Self {
        self.classifier_timeout = timeout;
        self
    }

    /// Characters of input kept in telemetry context
    #[must_use]
    pub const fn excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = chars;
        self
    }

    /// Fails when a classifier or the feedback store is missing.
    pub fn build(self) -> Result<InferenceOrchestrator> {
        let missing = |what: &str| PipelineError::InvalidConfig(format!("{what} is required"));

        let context = ServiceContext {
            preprocessor: Preprocessor::new(self.detector, self.features)?,
            translation: self.translation,
            emotion: self.emotion.ok_or_else(|| missing("emotion classifier"))?,
            spam: self.spam.ok_or_else(|| missing("spam classifier"))?,
            feedback: self.feedback.ok_or_else(|| missing("feedback store"))?,
            telemetry: self.telemetry,
            classifier_timeout: self.classifier_timeout,
            excerpt_chars: self.excerpt_chars,
        };

        Ok(InferenceOrchestrator {
            context: Arc::new(context),
        })
    }
}

impl InferenceOrchestrator {
    /// Start configuring an orchestrator
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Classify one message.
    ///
    /// Translation and classification failures abort the request after
    /// being reported to telemetry; normalization and detection never fail.
    pub async fn predict(&self, raw: &RawMessage) -> Result<PredictionResult> {
        let timer = PredictionTimer::start();
        let result = self.run_prediction(raw).await;
        let seconds = timer.finish();

        match &result {
            Ok(prediction) => {
                metrics::record_prediction(if prediction.is_spam { "spam" } else { "ham" });
                debug!(seconds, is_spam = prediction.is_spam, emotion = %prediction.emotion, "Prediction finished");
            }
            Err(_) => metrics::record_prediction("error"),
        }
        result
    }

    async fn run_prediction(&self, raw: &RawMessage) -> Result<PredictionResult> {
        let ctx = &self.context;
        let original = raw.decode_lossy();

        let normalized = ctx.preprocessor.normalize(raw);
        let language = ctx.preprocessor.detect(&normalized);
        debug!(stage = "detection", language = language.code(), "Language detected");

        let translated = ctx
            .translation
            .translate(&normalized, &language)
            .await
            .inspect_err(|err| {
                let context = TelemetryContext::stage("translation")
                    .with_language(language.code())
                    .with_excerpt(&original, ctx.excerpt_chars);
                ctx.telemetry.record_error(err, &context);
            })?;

        let (scores, spam_score) = self
            .classify(&translated)
            .await
            .inspect_err(|err| {
                let context = TelemetryContext::stage("classification")
                    .with_language(language.code())
                    .with_excerpt(&original, ctx.excerpt_chars);
                ctx.telemetry.record_error(err, &context);
            })?;

        let (emotion, _) = scores.top();
        let prediction = PredictionResult {
            text: original,
            translated_text: translated
                .was_translated()
                .then(|| translated.as_str().to_string()),
            detected_language: language,
            emotion,
            emotion_scores: scores,
            spam_score,
            is_spam: is_spam(spam_score),
        };

        ctx.telemetry.record_event(
            "prediction",
            TelemetryLevel::Info,
            &TelemetryContext::stage("prediction").with_language(prediction.detected_language.code()),
        );
        Ok(prediction)
    }

    /// Both preprocessing branches in parallel, then both classifiers in
    /// parallel. Every failure here is a `ClassificationFailure`.
    async fn classify(
        &self,
        translated: &TranslatedText,
    ) -> Result<(EmotionScoreMap, f64)> {
        let ctx = &self.context;

        let emotion_branch = {
            let context = Arc::clone(ctx);
            let text = translated.clone();
            tokio::task::spawn_blocking(move || context.preprocessor.prepare(&text))
        };
        let spam_branch = {
            let context = Arc::clone(ctx);
            let text = translated.clone();
            tokio::task::spawn_blocking(move || context.preprocessor.extract(&text))
        };
        let (prepared, features) = tokio::try_join!(emotion_branch, spam_branch)
            .map_err(|e| PipelineError::classification("preprocessing", e))?;

        let scoring = async {
            tokio::try_join!(ctx.emotion.score(&prepared), ctx.spam.score(&features))
        };
        let (scores, probability) = tokio::time::timeout(ctx.classifier_timeout, scoring)
            .await
            .map_err(|_| {
                PipelineError::classification(
                    "inference",
                    format!("timed out after {}s", ctx.classifier_timeout.as_secs_f64()),
                )
            })?
            .map_err(as_classification)?;

        Ok((scores, check_probability(probability)?))
    }

    /// Validate and upsert a human correction.
    pub async fn record_feedback(&self, request: FeedbackRequest) -> Result<FeedbackAction> {
        let ctx = &self.context;
        let message_id = request.message_id;
        let report = |err: &PipelineError| {
            let context = TelemetryContext::stage("feedback").with_message_id(message_id);
            ctx.telemetry.record_error(err, &context);
        };

        let record = FeedbackRecord::try_from(request).inspect_err(report)?;
        let action = ctx.feedback.upsert(&record).await.inspect_err(report)?;

        metrics::record_feedback(action.as_str());
        info!(message_id, action = %action, "Feedback recorded");
        Ok(action)
    }

    /// See `Preprocessor::inspect`
    #[must_use]
    pub fn inspect(&self, raw: &RawMessage) -> Inspection {
        self.context.preprocessor.inspect(raw)
    }

    /// Feedback store shared with the orchestrator
    #[must_use]
    pub fn feedback_store(&self) -> Arc<dyn FeedbackStore> {
        Arc::clone(&self.context.feedback)
    }
}

fn as_classification(err: PipelineError) -> PipelineError {
    match err {
        PipelineError::Classification { .. } => err,
        other => PipelineError::classification("inference", other),
    }
}

/// Build the orchestrator from configuration: open the feedback database,
/// fetch model artifacts and wire the translators. Any failure is fatal.
pub async fn bootstrap(config: &AppConfig) -> anyhow::Result<InferenceOrchestrator> {
    let models = &config.models;
    let classifier_timeout = config.classifier_timeout();

    let store: Box<dyn ModelArtifactStore> = match models.artifact_source {
        ArtifactSource::Local => Box::new(LocalArtifactStore::new(&models.model_dir)),
        ArtifactSource::Http => Box::new(HttpArtifactStore::new(
            models
                .artifact_base_url
                .clone()
                .context("models.artifact_base_url is not set")?,
            models.artifact_query.clone(),
            Path::new(&models.model_dir),
        )),
    };

    let spam: Arc<dyn SpamClassifier> = match models.spam_backend {
        SpamBackend::Linear => {
            let path = store
                .fetch(&models.spam_model)
                .await
                .with_context(|| format!("Failed to fetch spam model '{}'", models.spam_model))?;
            Arc::new(LinearSpamClassifier::from_path(&path)?)
        }
        SpamBackend::Remote => Arc::new(RemoteSpamClassifier::new(
            models
                .spam_endpoint
                .clone()
                .context("models.spam_endpoint is not set")?,
            classifier_timeout,
        )),
    };

    let emotion: Arc<dyn EmotionClassifier> = match models.emotion_backend {
        EmotionBackend::Lexicon => match &models.emotion_lexicon {
            Some(identifier) => {
                let path = store
                    .fetch(identifier)
                    .await
                    .with_context(|| format!("Failed to fetch emotion lexicon '{identifier}'"))?;
                Arc::new(LexiconEmotionClassifier::from_path(&path)?)
            }
            None => Arc::new(LexiconEmotionClassifier::default()),
        },
        EmotionBackend::Remote => Arc::new(RemoteEmotionClassifier::new(
            models
                .emotion_endpoint
                .clone()
                .context("models.emotion_endpoint is not set")?,
            classifier_timeout,
        )),
    };

    let translation = &config.translation;
    let backends: Vec<Arc<dyn Translator>> = translation
        .providers
        .iter()
        .map(|provider| -> Arc<dyn Translator> {
            match provider {
                TranslationProvider::Google => {
                    Arc::new(GoogleTranslateBackend::new(translation.google_url.clone()))
                }
                TranslationProvider::Libretranslate => Arc::new(LibreTranslateBackend::new(
                    translation.libretranslate_url.clone(),
                    translation.libretranslate_api_key.clone(),
                )),
            }
        })
        .collect();
    let translation = TranslationService::new(backends, config.translation_timeout());

    let database = Database::open(&config.database_path(), &config.database)
        .context("Failed to open feedback database")?;

    let orchestrator = InferenceOrchestrator::builder()
        .detector(Arc::new(WhatlangDetector::new(
            config.language.min_confidence,
            config.language.min_chars,
        )
        .requiring_reliable(config.language.require_reliable)))
        .translation(translation)
        .emotion(emotion)
        .spam(spam)
        .feedback(Arc::new(database))
        .features(config.features)
        .classifier_timeout(classifier_timeout)
        .excerpt_chars(config.pipeline.excerpt_chars)
        .build()?;

    info!(
        spam = ?models.spam_backend,
        emotion = ?models.emotion_backend,
        providers = ?orchestrator.context.translation.provider_names(),
        "Inference orchestrator ready"
    );
    Ok(orchestrator)
}
