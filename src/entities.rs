//! Gazetteer entity recognition for lowercased English
//!
//! The spam branch lowercases before tokenizing, so capitalization cannot
//! signal proper nouns. What remains recognizable are closed classes: dates,
//! numbers written as words, ordinals, places and nationalities. Tokens
//! inside such a span are dropped from the cleaned message.

use std::collections::HashSet;

/// Entity class of a matched span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Days, months, holidays, relative days
    Date,
    /// Numbers written as words
    Cardinal,
    /// Ordinal words
    Ordinal,
    /// Countries and cities
    Place,
    /// Nationalities and languages
    Group,
}

const DATES: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
    "january", "february", "march", "april", "june", "july", "august", "september",
    "october", "november", "december", "today", "tomorrow", "yesterday", "tonight",
    "christmas", "easter", "thanksgiving", "halloween", "black friday", "cyber monday",
    "boxing day", "new year", "new year's eve", "valentine's day", "this week", "next week",
    "last week", "this weekend", "next month", "last month",
];

const CARDINALS: &[&str] = &[
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen",
    "eighteen", "nineteen", "twenty", "thirty", "forty", "fifty", "sixty", "seventy",
    "eighty", "ninety", "hundred", "thousand", "million", "billion", "dozen",
];

const ORDINALS: &[&str] = &[
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
    "tenth", "twentieth", "hundredth", "thousandth", "millionth",
];

const PLACES: &[&str] = &[
    "america", "usa", "uk", "england", "britain", "france", "germany", "spain",
    "italy", "canada", "mexico", "brazil", "china", "india", "japan", "russia", "nigeria",
    "australia", "london", "paris", "berlin", "madrid", "rome", "tokyo", "dubai", "toronto",
    "new york", "los angeles", "san francisco", "hong kong", "las vegas", "united states",
    "united kingdom", "south africa", "european union",
];

const GROUPS: &[&str] = &[
    "american", "british", "english", "french", "german", "spanish", "italian", "canadian",
    "mexican", "brazilian", "chinese", "indian", "japanese", "russian", "nigerian",
    "australian", "european", "african", "asian",
];

/// Closed-class entity matcher over token sequences.
#[derive(Debug, Clone)]
pub struct EntityGazetteer {
    entries: Vec<(Vec<String>, EntityKind)>,
    longest: usize,
    first_words: HashSet<String>,
}

impl Default for EntityGazetteer {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityGazetteer {
    /// Build the built-in gazetteer
    #[must_use]
    pub fn new() -> Self {
        let tables: [(&[&str], EntityKind); 5] = [
            (DATES, EntityKind::Date),
            (CARDINALS, EntityKind::Cardinal),
            (ORDINALS, EntityKind::Ordinal),
            (PLACES, EntityKind::Place),
            (GROUPS, EntityKind::Group),
        ];

        let mut entries: Vec<(Vec<String>, EntityKind)> = tables
            .iter()
            .flat_map(|(names, kind)| {
                names.iter().map(move |name| (phrase_tokens(name), *kind))
            })
            .collect();
        // Longest phrases first so "new year's eve" beats "new year".
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let longest = entries.first().map_or(0, |(words, _)| words.len());
        let first_words = entries
            .iter()
            .filter_map(|(words, _)| words.first().cloned())
            .collect();

        Self {
            entries,
            longest,
            first_words,
        }
    }

    /// Flag every token that is part of an entity span.
    #[must_use]
    pub fn mark<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<bool> {
        let mut marked = vec![false; tokens.len()];
        let mut i = 0;
        while i < tokens.len() {
            match self.match_at(tokens, i) {
                Some((len, _)) => {
                    for flag in &mut marked[i..i + len] {
                        *flag = true;
                    }
                    i += len;
                }
                None => i += 1,
            }
        }
        marked
    }

    /// Longest entity starting at `start`, as (token count, kind).
    #[must_use]
    pub fn match_at<S: AsRef<str>>(&self, tokens: &[S], start: usize) -> Option<(usize, EntityKind)> {
        let first = tokens.get(start)?.as_ref();
        if !self.first_words.contains(first) {
            return None;
        }
        let window = &tokens[start..tokens.len().min(start + self.longest)];
        self.entries.iter().find_map(|(words, kind)| {
            let matches = words.len() <= window.len()
                && words
                    .iter()
                    .zip(window)
                    .all(|(w, t)| w.as_str() == t.as_ref());
            matches.then_some((words.len(), *kind))
        })
    }
}

/// Tokenize a gazetteer phrase the same way message text is tokenized, so
/// "new year's eve" becomes ["new", "year", "'s", "eve"].
fn phrase_tokens(phrase: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in phrase.split_whitespace() {
        match word.find('\'') {
            Some(pos) if pos > 0 => {
                tokens.push(word[..pos].to_string());
                tokens.push(word[pos..].to_string());
            }
            _ => tokens.push(word.to_string()),
        }
    }
    tokens
}
