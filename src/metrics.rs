//! Metric names and recording helpers
//!
//! Recorder installation belongs to the host process. Without a recorder
//! every call here is a no-op.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Counter, labelled by outcome
pub const PREDICTIONS_TOTAL: &str = "mailsift_predictions_total";
/// Histogram of end-to-end prediction time
pub const PREDICTION_DURATION: &str = "mailsift_prediction_duration_seconds";
/// Counter, labelled by created/updated
pub const FEEDBACK_TOTAL: &str = "mailsift_feedback_total";
/// Counter, labelled by error kind
pub const ERRORS_TOTAL: &str = "mailsift_errors_total";
/// Counter, labelled by event name and level
pub const TELEMETRY_EVENTS_TOTAL: &str = "mailsift_telemetry_events_total";
/// Counter, labelled by source language and provider
pub const TRANSLATIONS_TOTAL: &str = "mailsift_translations_total";

/// Register descriptions with whatever recorder is installed
pub fn describe_metrics() {
    describe_counter!(PREDICTIONS_TOTAL, "Prediction requests by outcome");
    describe_histogram!(
        PREDICTION_DURATION,
        Unit::Seconds,
        "End-to-end prediction latency"
    );
    describe_counter!(FEEDBACK_TOTAL, "Feedback upserts by action");
    describe_counter!(ERRORS_TOTAL, "Pipeline errors by kind");
    describe_counter!(TELEMETRY_EVENTS_TOTAL, "Telemetry events by name and level");
    describe_counter!(TRANSLATIONS_TOTAL, "Successful translations by source language");
}

/// Count one prediction; `outcome` is "spam", "ham" or "error"
pub fn record_prediction(outcome: &'static str) {
    counter!(PREDICTIONS_TOTAL, "outcome" => outcome).increment(1);
}

/// Count one feedback write
pub fn record_feedback(action: &'static str) {
    counter!(FEEDBACK_TOTAL, "action" => action).increment(1);
}

/// Count one pipeline error by taxonomy kind
pub fn record_error(kind: &'static str) {
    counter!(ERRORS_TOTAL, "kind" => kind).increment(1);
}

/// Count one telemetry event
pub fn record_event(name: &str, level: &'static str) {
    counter!(TELEMETRY_EVENTS_TOTAL, "name" => name.to_string(), "level" => level).increment(1);
}

/// Count one successful translation
pub fn record_translation(language: &str, provider: &'static str) {
    counter!(
        TRANSLATIONS_TOTAL,
        "language" => language.to_string(),
        "provider" => provider
    )
    .increment(1);
}

/// Records `mailsift_prediction_duration_seconds` when finished.
#[derive(Debug)]
pub struct PredictionTimer {
    start: Instant,
}

impl Default for PredictionTimer {
    fn default() -> Self {
        Self::start()
    }
}

impl PredictionTimer {
    /// Start the clock
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Record the elapsed time and return it in seconds
    pub fn finish(self) -> f64 {
        let seconds = self.start.elapsed().as_secs_f64();
        histogram!(PREDICTION_DURATION).record(seconds);
        seconds
    }
}
