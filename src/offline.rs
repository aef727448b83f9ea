//! Offline feature regeneration for training data
//!
//! Reads a CSV of messages and writes one feature row per message, using the
//! same vocabulary and extractor as the request path so training and serving
//! cannot drift apart.

use std::io::{Read, Write};

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, Writer};
use regex::Regex;
use tracing::{debug, info};

use crate::models::SpamFeatureRecord;
use crate::spam_features::{ratio, FeatureOptions, SpamFeatureExtractor};
use crate::vocabulary::FeatureVocabulary;

/// Mojibake left in the training export by a double-decoded replacement
/// character.
const MOJIBAKE: &str = "ï¿½ï¿";

/// Characters counted by `special_char_count`
const SPECIAL_CHARS: &str = "@#$%&*";

/// Training-only columns appended after the request-path record
pub const EXTRA_COLUMNS: [&str; 6] = [
    "message_length",
    "word_count",
    "special_char_count",
    "url_count",
    "letter_digit_ratio",
    "pronoun_count",
];

/// How to read the input file
#[derive(Debug, Clone)]
pub struct RegenerateOptions {
    /// Column holding message text
    pub text_column: String,
    /// Column copied through as `label`, if any
    pub label_column: Option<String>,
    /// Drop messages shorter than this many characters after scrubbing
    pub min_length: Option<usize>,
    /// Feature contract to generate
    pub features: FeatureOptions,
}

impl Default for RegenerateOptions {
    fn default() -> Self {
        Self {
            text_column: "message".to_string(),
            label_column: None,
            min_length: None,
            features: FeatureOptions::default(),
        }
    }
}

/// Row counts from one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegenerateSummary {
    /// Data rows read
    pub read: usize,
    /// Feature rows written
    pub written: usize,
    /// Rows dropped as empty or too short
    pub skipped: usize,
}

/// Columns only the training pipeline uses
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingFeatures {
    /// Characters in the cleaned message
    pub message_length: usize,
    /// Whitespace-separated words
    pub word_count: usize,
    /// Occurrences of `@ # $ % & *`
    pub special_char_count: usize,
    /// `http://` and `https://` occurrences
    pub url_count: usize,
    /// Letters per digit, 0 when there are no digits
    pub letter_digit_ratio: f64,
    /// Pronoun list entries found in the text
    pub pronoun_count: usize,
}

/// Computes the training-only columns.
#[derive(Debug)]
pub struct TrainingFeatureDeriver {
    url_pattern: Regex,
    pronouns: FeatureVocabulary,
}

impl TrainingFeatureDeriver {
    /// Create a deriver
    pub fn new() -> Result<Self> {
        Ok(Self {
            url_pattern: Regex::new(r"https?://")?,
            pronouns: FeatureVocabulary::pronouns(),
        })
    }

    /// Training-only columns for one cleaned message
    #[must_use]
    pub fn derive(&self, text: &str) -> TrainingFeatures {
        let letters = text.chars().filter(|c| c.is_alphabetic()).count();
        let digits = text.chars().filter(char::is_ascii_digit).count();
        TrainingFeatures {
            message_length: text.chars().count(),
            word_count: text.split_whitespace().count(),
            special_char_count: text.chars().filter(|c| SPECIAL_CHARS.contains(*c)).count(),
            url_count: self.url_pattern.find_iter(text).count(),
            letter_digit_ratio: ratio(letters, digits),
            pronoun_count: self.pronouns.count_in(text),
        }
    }
}

/// Remove the export mojibake and newlines, as the training pipeline did.
#[must_use]
pub fn scrub_export(text: &str) -> String {
    text.replace(MOJIBAKE, "").replace('\n', "")
}

/// Regenerate features for every row of `input`, writing CSV to `output`.
pub fn regenerate<R: Read, W: Write>(
    input: R,
    output: W,
    options: &RegenerateOptions,
) -> Result<RegenerateSummary> {
    let extractor = SpamFeatureExtractor::new(options.features)?;
    let deriver = TrainingFeatureDeriver::new()?;

    let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let text_index = column(&options.text_column)
        .ok_or_else(|| anyhow!("Column '{}' not found in input", options.text_column))?;
    let label_index = match &options.label_column {
        Some(name) => Some(column(name).ok_or_else(|| anyhow!("Column '{name}' not found in input"))?),
        None => None,
    };

    let mut writer = Writer::from_writer(output);
    let mut header: Vec<&str> = Vec::new();
    if label_index.is_some() {
        header.push("label");
    }
    header.extend(SpamFeatureRecord::FIELD_NAMES);
    header.extend(EXTRA_COLUMNS);
    writer.write_record(&header)?;

    let mut summary = RegenerateSummary::default();
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Failed to read CSV row {}", line + 1))?;
        summary.read += 1;

        let Some(raw) = row.get(text_index).filter(|t| !t.trim().is_empty()) else {
            summary.skipped += 1;
            continue;
        };
        let text = scrub_export(raw);
        if options.min_length.is_some_and(|min| text.chars().count() < min) {
            debug!(row = line + 1, "Skipping short message");
            summary.skipped += 1;
            continue;
        }

        let record = extractor.extract_str(&text);
        let extra = deriver.derive(&text);

        let mut fields: Vec<String> = Vec::with_capacity(header.len());
        if let Some(index) = label_index {
            fields.push(row.get(index).unwrap_or_default().to_string());
        }
        fields.extend([
            record.cleaned_message,
            record.keyword_count.to_string(),
            record.keyword_ratio.to_string(),
            record.promo_word_count.to_string(),
            record.promo_word_ratio.to_string(),
            record.uppercase_ratio.to_string(),
            extra.message_length.to_string(),
            extra.word_count.to_string(),
            extra.special_char_count.to_string(),
            extra.url_count.to_string(),
            extra.letter_digit_ratio.to_string(),
            extra.pronoun_count.to_string(),
        ]);
        writer.write_record(&fields)?;
        summary.written += 1;
    }

    writer.flush()?;
    info!(
        read = summary.read,
        written = summary.written,
        skipped = summary.skipped,
        "Feature regeneration finished"
    );
    Ok(summary)
}
