//! Reduce English word forms to a base form
//!
//! `Rules` approximates dictionary lemmatization with an irregular-form
//! table and suffix rules ("winning" -> "win", "prizes" -> "prize").
//! `Snowball` uses the Porter2 stemmer, which is cruder but predictable.

use std::collections::HashMap;
use std::fmt;

use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};

/// Which reduction strategy to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LemmatizerMode {
    /// Irregular table plus suffix rules
    #[default]
    Rules,
    /// Snowball English stemmer
    Snowball,
}

const IRREGULAR: &[(&str, &str)] = &[
    ("won", "win"),
    ("paid", "pay"),
    ("got", "get"),
    ("gotten", "get"),
    ("made", "make"),
    ("sent", "send"),
    ("bought", "buy"),
    ("sold", "sell"),
    ("gave", "give"),
    ("given", "give"),
    ("took", "take"),
    ("taken", "take"),
    ("went", "go"),
    ("gone", "go"),
    ("came", "come"),
    ("saw", "see"),
    ("seen", "see"),
    ("told", "tell"),
    ("said", "say"),
    ("found", "find"),
    ("felt", "feel"),
    ("kept", "keep"),
    ("brought", "bring"),
    ("thought", "think"),
    ("lost", "lose"),
    ("ran", "run"),
    ("wrote", "write"),
    ("written", "write"),
    ("ate", "eat"),
    ("eaten", "eat"),
    ("knew", "know"),
    ("known", "know"),
    ("chose", "choose"),
    ("chosen", "choose"),
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("mice", "mouse"),
];

/// Word-to-lemma reducer.
pub struct Lemmatizer {
    mode: LemmatizerMode,
    irregular: HashMap<&'static str, &'static str>,
    stemmer: Stemmer,
}

impl fmt::Debug for Lemmatizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lemmatizer").field("mode", &self.mode).finish_non_exhaustive()
    }
}

impl Lemmatizer {
    /// Create a lemmatizer for `mode`
    #[must_use]
    pub fn new(mode: LemmatizerMode) -> Self {
        Self {
            mode,
            irregular: IRREGULAR.iter().copied().collect(),
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Active mode
    #[must_use]
    pub const fn mode(&self) -> LemmatizerMode {
        self.mode
    }

    /// Base form of a lowercase token. Tokens containing anything but
    /// letters are returned unchanged.
    #[must_use]
    pub fn lemma(&self, token: &str) -> String {
        if !token.chars().all(char::is_alphabetic) {
            return token.to_string();
        }
        match self.mode {
            LemmatizerMode::Snowball => self.stemmer.stem(token).into_owned(),
            LemmatizerMode::Rules => self.by_rules(token),
        }
    }

    fn by_rules(&self, word: &str) -> String {
        if let Some(lemma) = self.irregular.get(word) {
            return (*lemma).to_string();
        }
        let len = word.chars().count();

        if len > 4 {
            if let Some(stem) = word.strip_suffix("ies") {
                return format!("{stem}y");
            }
            if let Some(stem) = word.strip_suffix("ied") {
                return format!("{stem}y");
            }
        }
        if let Some(stem) = word.strip_suffix("sses") {
            return format!("{stem}ss");
        }
        for suffix in ["xes", "ches", "shes", "zzes"] {
            if let Some(stem) = word.strip_suffix(suffix) {
                if !stem.is_empty() {
                    return format!("{stem}{}", &suffix[..suffix.len() - 2]);
                }
            }
        }
        if len > 5 {
            if let Some(stem) = word.strip_suffix("ing") {
                if has_vowel(stem) {
                    return restore_stem(stem);
                }
            }
        }
        if len > 4 && !word.ends_with("eed") {
            if let Some(stem) = word.strip_suffix("ed") {
                if has_vowel(stem) {
                    return restore_stem(stem);
                }
            }
        }
        if len > 3
            && word.ends_with('s')
            && !["ss", "us", "is", "ous"].iter().any(|s| word.ends_with(s))
        {
            return word[..word.len() - 1].to_string();
        }
        word.to_string()
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn has_vowel(stem: &str) -> bool {
    stem.chars().any(|c| is_vowel(c) || c == 'y')
}

/// Undo the spelling changes English makes before -ing/-ed:
/// "winn" -> "win", "mak" -> "make", "approv" -> "approve".
fn restore_stem(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let n = chars.len();

    if n >= 2 {
        let (a, b) = (chars[n - 2], chars[n - 1]);
        if a == b && !is_vowel(b) && !matches!(b, 'l' | 's' | 'z') {
            return chars[..n - 1].iter().collect();
        }
    }
    if let Some(&last) = chars.last() {
        if matches!(last, 'v' | 'z' | 'c' | 'u') {
            return format!("{stem}e");
        }
    }
    if n == 3
        && !is_vowel(chars[0])
        && is_vowel(chars[1])
        && !is_vowel(chars[2])
        && !matches!(chars[2], 'w' | 'x' | 'y')
    {
        return format!("{stem}e");
    }
    stem.to_string()
}
