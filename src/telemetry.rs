//! Fire-and-forget telemetry
//!
//! Sinks must never block or fail the calling request, so every method
//! returns `()`.

use std::fmt;

use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::metrics;

/// Severity of a telemetry event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryLevel {
    /// Normal operation
    Info,
    /// Degraded but recovered
    Warning,
    /// Request failed
    Error,
}

impl TelemetryLevel {
    /// Lowercase name used in log fields
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TelemetryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata attached to telemetry records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryContext {
    /// Pipeline stage that produced the record
    pub stage: Option<&'static str>,
    /// Detected source language
    pub language: Option<String>,
    /// Truncated input text
    pub excerpt: Option<String>,
    /// Feedback message id
    pub message_id: Option<i64>,
}

impl TelemetryContext {
    /// Context for `stage`
    #[must_use]
    pub fn stage(stage: &'static str) -> Self {
        Self {
            stage: Some(stage),
            ..Self::default()
        }
    }

    /// Attach the detected language
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Attach at most `max_chars` characters of `text`
    #[must_use]
    pub fn with_excerpt(mut self, text: &str, max_chars: usize) -> Self {
        self.excerpt = Some(excerpt(text, max_chars));
        self
    }

    /// Attach the feedback message id
    #[must_use]
    pub const fn with_message_id(mut self, message_id: i64) -> Self {
        self.message_id = Some(message_id);
        self
    }
}

/// First `max_chars` characters of `text`
#[must_use]
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Event and error reporting boundary
pub trait TelemetrySink: Send + Sync {
    /// Record a named event
    fn record_event(&self, name: &str, level: TelemetryLevel, context: &TelemetryContext);

    /// Record a failure before it is returned to the caller
    fn record_error(&self, error: &PipelineError, context: &TelemetryContext);
}

/// Sink writing to `tracing` and the metrics facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record_event(&self, name: &str, level: TelemetryLevel, context: &TelemetryContext) {
        let stage = context.stage.unwrap_or("-");
        let language = context.language.as_deref().unwrap_or("-");
        let excerpt = context.excerpt.as_deref().unwrap_or("");
        match level {
            TelemetryLevel::Info => {
                info!(event = name, stage, language, message_id = ?context.message_id, excerpt, "telemetry event");
            }
            TelemetryLevel::Warning => {
                warn!(event = name, stage, language, message_id = ?context.message_id, excerpt, "telemetry event");
            }
            TelemetryLevel::Error => {
                error!(event = name, stage, language, message_id = ?context.message_id, excerpt, "telemetry event");
            }
        }
        metrics::record_event(name, level.as_str());
    }

    fn record_error(&self, err: &PipelineError, context: &TelemetryContext) {
        error!(
            kind = err.kind(),
            stage = context.stage.unwrap_or("-"),
            language = context.language.as_deref().unwrap_or("-"),
            message_id = ?context.message_id,
            excerpt = context.excerpt.as_deref().unwrap_or(""),
            error = %err,
            "pipeline error"
        );
        metrics::record_error(err.kind());
    }
}
