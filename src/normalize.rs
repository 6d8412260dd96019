//! # Text normalization
//!
//! Review text is made uniform before it is combined and embedded:
//!
//! 1. lowercase,
//! 2. drop every character outside `[a-z0-9]` and whitespace,
//! 3. *(optional)* reduce each token to its dictionary form and drop stopwords.
//!
//! Step 3 needs a [`LanguagePack`]. Which steps run is an explicit strategy,
//! [`TextNormalizer`], chosen once from configuration by
//! [`TextNormalizer::from_setting`]. When the configured pack file is missing
//! the normalizer degrades to [`TextNormalizer::Basic`] and logs a warning.
//!
//! ```rust
//! use game_scout::normalize::{LanguagePack, TextNormalizer};
//!
//! let basic = TextNormalizer::Basic;
//! assert_eq!(basic.normalize("Cute Animals!!"), "cute animals");
//!
//! let full = TextNormalizer::Lemmatized(LanguagePack::english());
//! assert_eq!(full.normalize("The stories of cute animals"), "story cute animal");
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::LanguageMode;
use crate::error::{Result, ScoutError};

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));

const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "almost", "alone", "along",
    "already", "also", "although", "always", "am", "among", "an", "and", "another", "any",
    "anyone", "anything", "are", "around", "as", "at", "be", "became", "because", "become",
    "been", "before", "being", "below", "between", "both", "but", "by", "can", "could", "did",
    "do", "does", "doing", "done", "down", "during", "each", "either", "else", "enough", "even",
    "ever", "every", "few", "for", "from", "further", "get", "give", "go", "had", "has", "have",
    "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "however",
    "i", "if", "in", "into", "is", "it", "its", "itself", "just", "least", "less", "made",
    "make", "many", "may", "me", "might", "more", "most", "much", "must", "my", "myself",
    "neither", "never", "no", "nor", "not", "nothing", "now", "of", "off", "often", "on",
    "once", "one", "only", "or", "other", "others", "our", "ours", "ourselves", "out", "over",
    "own", "per", "perhaps", "quite", "rather", "really", "same", "see", "seem", "seemed",
    "several", "she", "should", "show", "since", "so", "some", "something", "still", "such",
    "take", "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
    "these", "they", "this", "those", "though", "through", "thus", "to", "together", "too",
    "toward", "under", "until", "up", "upon", "us", "used", "using", "very", "via", "was",
    "we", "well", "were", "what", "whatever", "when", "where", "whether", "which", "while",
    "who", "whole", "whom", "whose", "why", "will", "with", "within", "without", "would",
    "yet", "you", "your", "yours", "yourself", "yourselves",
];

const ENGLISH_LEMMAS: &[(&str, &str)] = &[
    ("children", "child"),
    ("feet", "foot"),
    ("geese", "goose"),
    ("men", "man"),
    ("mice", "mouse"),
    ("people", "person"),
    ("teeth", "tooth"),
    ("women", "woman"),
    ("better", "good"),
    ("best", "good"),
    ("worse", "bad"),
    ("worst", "bad"),
    ("was", "be"),
    ("were", "be"),
    ("is", "be"),
    ("are", "be"),
    ("has", "have"),
    ("had", "have"),
    ("made", "make"),
    ("played", "play"),
    ("playing", "play"),
    ("loved", "love"),
    ("enjoyed", "enjoy"),
    ("graphics", "graphic"),
    ("series", "series"),
    ("species", "species"),
    ("visuals", "visual"),
];

/// Word lists backing the lemmatizing normalizer.
///
/// A pack file is YAML:
///
/// ```yaml
/// stopwords: [the, a, of]
/// lemmas:
///   mice: mouse
///   played: play
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LanguagePack {
    #[serde(default)]
    pub stopwords: HashSet<String>,
    #[serde(default)]
    pub lemmas: HashMap<String, String>,
}

impl LanguagePack {
    /// The built-in English resource.
    pub fn english() -> Self {
        Self {
            stopwords: ENGLISH_STOPWORDS.iter().map(|s| s.to_string()).collect(),
            lemmas: ENGLISH_LEMMAS
                .iter()
                .map(|(w, l)| (w.to_string(), l.to_string()))
                .collect(),
        }
    }

    /// Read a pack from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| ScoutError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Dictionary form of `token`: the explicit lemma table first, then
    /// regular English plural endings.
    pub fn lemmatize(&self, token: &str) -> String {
        if let Some(lemma) = self.lemmas.get(token) {
            return lemma.clone();
        }
        if token.len() <= 3 {
            return token.to_string();
        }
        if let Some(stem) = token.strip_suffix("ies") {
            if stem.len() >= 2 {
                return format!("{stem}y");
            }
        }
        if let Some(stem) = token.strip_suffix("sses") {
            return format!("{stem}ss");
        }
        if token.ends_with("ss") || token.ends_with("us") || token.ends_with("is") {
            return token.to_string();
        }
        token.strip_suffix('s').unwrap_or(token).to_string()
    }

    /// Stable digest of the pack contents, independent of hash-map order.
    pub fn fingerprint(&self) -> String {
        let mut stop: Vec<&String> = self.stopwords.iter().collect();
        stop.sort();
        let mut lemmas: Vec<(&String, &String)> = self.lemmas.iter().collect();
        lemmas.sort();

        let mut hasher = blake3::Hasher::new();
        for s in stop {
            hasher.update(s.as_bytes()).update(b"\n");
        }
        hasher.update(b"--");
        for (w, l) in lemmas {
            hasher.update(w.as_bytes()).update(b"=").update(l.as_bytes()).update(b"\n");
        }
        hasher.finalize().to_hex()[..16].to_string()
    }
}

/// What a normalizer is able to do, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Lowercase and strip only.
    Basic,
    /// Lowercase, strip, lemmatize and drop stopwords.
    Lemmatized,
}

/// Normalization strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum TextNormalizer {
    Basic,
    Lemmatized(LanguagePack),
}

impl TextNormalizer {
    /// Select a strategy from configuration.
    ///
    /// `LanguageMode::File` with a missing or unreadable pack degrades to
    /// [`TextNormalizer::Basic`]; that is reported with `warn!`, never as an
    /// error.
    pub fn from_setting(mode: LanguageMode, pack_path: Option<&Path>) -> Self {
        match mode {
            LanguageMode::None => TextNormalizer::Basic,
            LanguageMode::Builtin => TextNormalizer::Lemmatized(LanguagePack::english()),
            LanguageMode::File => {
                let Some(path) = pack_path else {
                    warn!("language mode 'file' set without language_pack; lemmatization disabled");
                    return TextNormalizer::Basic;
                };
                match LanguagePack::load(path) {
                    Ok(pack) => {
                        debug!("Loaded language pack from {}", path.display());
                        TextNormalizer::Lemmatized(pack)
                    }
                    Err(e) => {
                        warn!(
                            "language pack {} unavailable ({e}); lemmatization disabled",
                            path.display()
                        );
                        TextNormalizer::Basic
                    }
                }
            }
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            TextNormalizer::Basic => Capability::Basic,
            TextNormalizer::Lemmatized(_) => Capability::Lemmatized,
        }
    }

    /// Identifies the exact transformation, so cached embeddings built under a
    /// different normalizer are never reused.
    pub fn fingerprint(&self) -> String {
        match self {
            TextNormalizer::Basic => "basic".to_string(),
            TextNormalizer::Lemmatized(pack) => format!("lemma:{}", pack.fingerprint()),
        }
    }

    pub fn normalize(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let stripped = NON_ALNUM.replace_all(&lowered, "");

        match self {
            TextNormalizer::Basic => stripped.into_owned(),
            TextNormalizer::Lemmatized(pack) => stripped
                .split_whitespace()
                .filter(|t| !pack.is_stopword(t))
                .map(|t| pack.lemmatize(t))
                .filter(|l| !pack.is_stopword(l))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Normalize many texts in parallel, preserving order.
    pub fn normalize_all<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<String> {
        texts.par_iter().map(|t| self.normalize(t.as_ref())).collect()
    }
}
