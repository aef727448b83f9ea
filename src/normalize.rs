//! Text normalization shared by both classifier branches
//!
//! `TextNormalizer` turns a `RawMessage` into `NormalizedText` in seven
//! steps: UTF-8 recovery, markup stripping, control character replacement,
//! symbol stripping (full mode only), emoji tagging, run collapsing and
//! whitespace collapsing. Every step is total, and the whole pipeline is a
//! projection: feeding its output back in returns the same text.

use std::panic::{self, AssertUnwindSafe};

use regex::Regex;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{PipelineError, Result};
use crate::models::{NormalizedText, RawMessage, TranslatedText};

/// Longest run of one character that survives normalization
pub const MAX_RUN: usize = 2;

/// Tags whose start and end read as a word break
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "td", "th", "title", "tr", "ul",
];

/// Tags whose content is never visible
const HIDDEN_TAGS: &[&str] = &["script", "style"];

/// Cleans raw message text.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    tag_pattern: Regex,
    strip_symbols: bool,
}

impl TextNormalizer {
    /// All seven steps, as required ahead of the emotion tokenizer.
    pub fn full() -> Result<Self> {
        Self::build(true)
    }

    /// Every step except symbol stripping; punctuation stays for keyword
    /// matching and language detection.
    pub fn keeping_punctuation() -> Result<Self> {
        Self::build(false)
    }

    fn build(strip_symbols: bool) -> Result<Self> {
        let tag_pattern = Regex::new(r":[a-z0-9]+(?:_[a-z0-9]+)*:")?;
        Ok(Self {
            tag_pattern,
            strip_symbols,
        })
    }

    /// Whether step 4 runs
    #[must_use]
    pub const fn strips_symbols(&self) -> bool {
        self.strip_symbols
    }

    /// Normalize a raw message. Never fails.
    #[must_use]
    pub fn normalize(&self, raw: &RawMessage) -> NormalizedText {
        NormalizedText::new(self.normalize_str(&raw.decode_lossy()))
    }

    /// Normalize already-decoded text. Never fails: if a step faults, the
    /// decoded input is returned as is.
    #[must_use]
    pub fn normalize_str(&self, decoded: &str) -> String {
        match panic::catch_unwind(AssertUnwindSafe(|| self.run(decoded))) {
            Ok(cleaned) => cleaned,
            Err(_) => {
                let err = PipelineError::EncodingRecovery(
                    "normalization step faulted, using decoded text".to_string(),
                );
                warn!(kind = err.kind(), error = %err, "Falling back to decoded text");
                decoded.to_string()
            }
        }
    }

    fn run(&self, decoded: &str) -> String {
        let text = strip_markup(decoded);
        let text = replace_controls(&text);
        let text = if self.strip_symbols {
            self.strip_disallowed(&text)
        } else {
            text
        };
        let text = self.tag_emoji(&text);
        let text = collapse_runs(&text, MAX_RUN);
        collapse_whitespace(&text)
    }

    /// Split into (segment, `is_tag`) pieces around existing `:emoji_tags:`.
    fn segments<'a>(&self, text: &'a str) -> Vec<(&'a str, bool)> {
        let mut pieces = Vec::new();
        let mut last = 0;
        for found in self.tag_pattern.find_iter(text) {
            if found.start() > last {
                pieces.push((&text[last..found.start()], false));
            }
            pieces.push((found.as_str(), true));
            last = found.end();
        }
        if last < text.len() {
            pieces.push((&text[last..], false));
        }
        pieces
    }

    /// Step 4: keep word characters, whitespace, `. , ! ? '`, emoji and tags.
    fn strip_disallowed(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for (piece, is_tag) in self.segments(text) {
            if is_tag {
                out.push_str(piece);
                continue;
            }
            for grapheme in piece.graphemes(true) {
                let allowed = grapheme.chars().next().is_some_and(is_allowed_char);
                if allowed || is_emoji(grapheme) {
                    out.push_str(grapheme);
                }
            }
        }
        out
    }

    /// Step 5: emoji glyphs become `:cldr_name:` tags.
    fn tag_emoji(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for (piece, is_tag) in self.segments(text) {
            if is_tag {
                out.push_str(piece);
                continue;
            }
            for grapheme in piece.graphemes(true) {
                match emoji_tag(grapheme) {
                    Some(tag) => out.push_str(&tag),
                    None => out.push_str(grapheme),
                }
            }
        }
        out
    }
}

/// Prepares English text for the emotion classifier: the full pipeline.
#[derive(Debug, Clone)]
pub struct EmotionTextPreparer {
    normalizer: TextNormalizer,
}

impl EmotionTextPreparer {
    /// Create a preparer
    pub fn new() -> Result<Self> {
        Ok(Self {
            normalizer: TextNormalizer::full()?,
        })
    }

    /// Run steps 1-7 over the translated text
    #[must_use]
    pub fn prepare(&self, text: &TranslatedText) -> String {
        self.normalizer.normalize_str(text.as_str())
    }
}

fn is_allowed_char(c: char) -> bool {
    c.is_alphanumeric()
        || c == '_'
        || c.is_whitespace()
        || matches!(c, '.' | ',' | '!' | '?' | '\'')
}

fn lookup_emoji(grapheme: &str) -> Option<&'static emojis::Emoji> {
    if grapheme.is_ascii() {
        return None;
    }
    emojis::get(grapheme).or_else(|| {
        let bare: String = grapheme.chars().filter(|&c| c != '\u{fe0f}').collect();
        emojis::get(&bare).or_else(|| emojis::get(&format!("{bare}\u{fe0f}")))
    })
}

fn is_emoji(grapheme: &str) -> bool {
    lookup_emoji(grapheme).is_some()
}

/// `:grinning_face:` style tag for an emoji grapheme.
#[must_use]
pub fn emoji_tag(grapheme: &str) -> Option<String> {
    let emoji = lookup_emoji(grapheme)?;
    let mut name = String::with_capacity(emoji.name().len());
    let mut pending_sep = false;
    for c in emoji.name().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !name.is_empty() {
                name.push('_');
            }
            pending_sep = false;
            name.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if name.is_empty() {
        return None;
    }
    Some(format!(":{name}:"))
}

/// Step 2: remove markup until none is left.
///
/// Decoding `&lt;b&gt;` can expose a new tag, so single passes repeat until
/// the text stops changing. Each changing pass shortens the text.
#[must_use]
pub fn strip_markup(text: &str) -> String {
    let mut current = strip_markup_once(text);
    loop {
        let next = strip_markup_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_markup_once(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(['<', '&']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if rest.starts_with('&') {
            match decode_entity(rest) {
                Some((decoded, consumed)) => {
                    if let Some(c) = decoded {
                        out.push(c);
                    }
                    rest = &rest[consumed..];
                }
                None => {
                    out.push('&');
                    rest = &rest[1..];
                }
            }
            continue;
        }

        match skip_tag(rest) {
            Some((consumed, separator)) => {
                if separator {
                    out.push(' ');
                }
                rest = &rest[consumed..];
            }
            None => {
                out.push('<');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Length of the markup construct at the start of `text` (which begins with
/// `<`) and whether it separates words. `None` means the `<` is literal.
fn skip_tag(text: &str) -> Option<(usize, bool)> {
    let after = &text[1..];
    let first = after.chars().next()?;

    if let Some(comment) = after.strip_prefix("!--") {
        let end = comment.find("-->")?;
        return Some((4 + end + 3, false));
    }
    let opens = first.is_ascii_alphabetic()
        || first == '!'
        || first == '?'
        || (first == '/' && after[1..].starts_with(|c: char| c.is_ascii_alphabetic()));
    if !opens {
        return None;
    }

    let close = after.find('>')?;
    let inner = &after[..close];
    let consumed = 1 + close + 1;

    let name: String = inner
        .trim_start_matches('/')
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    let is_closing = inner.starts_with('/');
    let self_closing = inner.ends_with('/');

    if !is_closing && !self_closing && HIDDEN_TAGS.contains(&name.as_str()) {
        let body = &text[consumed..];
        let end_marker = format!("</{name}");
        let lowered = body.to_ascii_lowercase();
        return Some(match lowered.find(&end_marker) {
            Some(end) => {
                let tail = &body[end..];
                let tail_len = tail.find('>').map_or(tail.len(), |gt| gt + 1);
                (consumed + end + tail_len, true)
            }
            None => (text.len(), true),
        });
    }

    Some((consumed, BLOCK_TAGS.contains(&name.as_str())))
}

/// Decode the entity at the start of `text` (which begins with `&`).
///
/// Returns the decoded char (if any) and bytes consumed; `None` means the
/// `&` is literal. Syntactically numeric entities are always consumed, and
/// ones naming no valid code point vanish.
fn decode_entity(text: &str) -> Option<(Option<char>, usize)> {
    let body = &text[1..];
    let semi = body.find(';')?;
    let name = &body[..semi];
    let consumed = 1 + semi + 1;

    if let Some(number) = name.strip_prefix('#') {
        let (digits, radix) = match number.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16),
            None => (number, 10),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        let decoded = u32::from_str_radix(digits, radix)
            .ok()
            .and_then(char::from_u32);
        return Some((decoded, consumed));
    }

    let decoded = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "euro" => '\u{20ac}',
        "pound" => '\u{a3}',
        _ => return None,
    };
    Some((Some(decoded), consumed))
}

/// Step 3: newline, tab, carriage return and other control characters
/// become spaces.
#[must_use]
pub fn replace_controls(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Step 6: shorten every run of one character to at most `max` copies.
#[must_use]
pub fn collapse_runs(text: &str, max: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous: Option<char> = None;
    let mut run = 0;
    for c in text.chars() {
        if previous == Some(c) {
            run += 1;
        } else {
            previous = Some(c);
            run = 1;
        }
        if run <= max {
            out.push(c);
        }
    }
    out
}

/// Step 7: single spaces between words, none at the ends.
///
/// Works on graphemes: a space carrying combining marks is still a space,
/// and the marks go with it.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for grapheme in text.graphemes(true) {
        if grapheme.starts_with(char::is_whitespace) {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push_str(grapheme);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> TextNormalizer {
        TextNormalizer::full().expect("Failed to create normalizer")
    }

    #[test]
    fn test_markup_is_stripped() {
        let cleaned = full().normalize_str("<p>Hello <b>there</b></p><p>friend</p>");
        assert_eq!(cleaned, "Hello there friend");
    }

    #[test]
    fn test_malformed_markup_does_not_fault() {
        let n = full();
        assert_eq!(n.normalize_str("a < b and c <d"), "a b and c d");
        assert_eq!(n.normalize_str("<div class=\"x\">unclosed"), "unclosed");
        assert_eq!(strip_markup("x <!-- never closed"), "x <!-- never closed");
    }

    #[test]
    fn test_script_content_is_hidden() {
        let cleaned = strip_markup("hi<script>alert('x')</SCRIPT> there<style>p{}</style>");
        assert_eq!(collapse_whitespace(&cleaned), "hi there");
    }

    #[test]
    fn test_entities_are_decoded() {
        assert_eq!(strip_markup("Tom &amp; Jerry &#65;&#x42;"), "Tom & Jerry AB");
        assert_eq!(strip_markup("&lt;b&gt;bold&lt;/b&gt;"), "bold");
        assert_eq!(strip_markup("&bogus; &#99999999999;x"), "&bogus; x");
    }

    #[test]
    fn test_controls_become_spaces() {
        assert_eq!(full().normalize_str("line\none\ttab\rret\u{7}bell"), "line one tab ret bell");
    }

    #[test]
    fn test_symbols_are_stripped_only_in_full_mode() {
        let text = "Save $50 @ shop #1 -- now!";
        assert_eq!(full().normalize_str(text), "Save 50 shop 1 now!");

        let spam_side = TextNormalizer::keeping_punctuation().expect("normalizer");
        assert_eq!(spam_side.normalize_str(text), "Save $50 @ shop #1 -- now!");
    }

    #[test]
    fn test_emoji_become_tags() {
        let cleaned = full().normalize_str("I love this \u{1f60d}");
        assert!(cleaned.starts_with("I love this :smiling_face"));
        assert!(cleaned.ends_with(':'));
        assert!(!cleaned.contains('\u{1f60d}'));
    }

    #[test]
    fn test_runs_collapse_to_two() {
        assert_eq!(full().normalize_str("soooo good!!!"), "soo good!!");
        assert_eq!(collapse_runs("bookkeeper", MAX_RUN), "bookkeeper");
    }

    #[test]
    fn test_whitespace_collapses() {
        assert_eq!(collapse_whitespace("  Too   many \u{a0}  spaces   "), "Too many spaces");
        assert_eq!(collapse_whitespace(" \u{301}abc d \u{301}e"), "abc d e");
        assert_eq!(collapse_whitespace("caf\u{65}\u{301} ok"), "caf\u{65}\u{301} ok");
    }

    #[test]
    fn test_marks_on_leading_space_settle_in_one_pass() {
        for n in [full(), TextNormalizer::keeping_punctuation().expect("normalizer")] {
            let once = n.normalize_str(" \u{301}abc");
            assert_eq!(once, "abc");
            assert_eq!(n.normalize_str(&once), once);
        }
    }

    #[test]
    fn test_invalid_bytes_are_dropped() {
        let raw = RawMessage::from_bytes(b"caf\xc3\xa9 \xff\xfebar".to_vec());
        assert_eq!(full().normalize(&raw).as_str(), "caf\u{e9} bar");
    }

    #[test]
    fn test_existing_tags_survive_a_second_pass() {
        let n = full();
        let once = n.normalize_str("party time \u{1f389}\u{1f389}\u{1f389}");
        assert_eq!(n.normalize_str(&once), once);
    }

    #[test]
    fn test_preparer_runs_full_pipeline() {
        let preparer = EmotionTextPreparer::new().expect("preparer");
        let text = TranslatedText::translated("<i>Whaaaat?!</i> #wow".to_string());
        assert_eq!(preparer.prepare(&text), "Whaat?! wow");
    }
}
