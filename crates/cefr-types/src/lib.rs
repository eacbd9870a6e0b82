//! Shared types for CEFR vocabulary analysis.
//!
//! Everything that crosses a crate boundary lives here: the six-step
//! [`CefrLevel`] scale, the [`Level`] a token is classified at (a CEFR level
//! or `Unknown`), the [`CoarsePos`] tag produced once by the tagger and
//! compared by value everywhere else, and the typed result structs that are
//! serialized at the API boundary with fixed field names.
//!
//! ```rust
//! use cefr_types::{CefrLevel, CoarsePos, Level};
//!
//! let level: CefrLevel = "b2".parse().unwrap();
//! assert_eq!(level.ordinal(), 4);
//! assert_eq!(CoarsePos::from_tag("adjective"), CoarsePos::Adj);
//! assert_eq!(Level::Unknown.to_string(), "Unknown");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Six-step CEFR scale, A1 (easiest) to C2.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub const ALL: [CefrLevel; 6] = [
        CefrLevel::A1,
        CefrLevel::A2,
        CefrLevel::B1,
        CefrLevel::B2,
        CefrLevel::C1,
        CefrLevel::C2,
    ];

    /// Ordinal used for scoring: A1 = 1 … C2 = 6.
    pub fn ordinal(self) -> u8 {
        match self {
            CefrLevel::A1 => 1,
            CefrLevel::A2 => 2,
            CefrLevel::B1 => 3,
            CefrLevel::B2 => 4,
            CefrLevel::C1 => 5,
            CefrLevel::C2 => 6,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(usize::from(ordinal).checked_sub(1)?).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
#[error("unrecognised CEFR level: {0:?}")]
pub struct ParseLevelError(pub String);

impl FromStr for CefrLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A1" => Ok(CefrLevel::A1),
            "A2" => Ok(CefrLevel::A2),
            "B1" => Ok(CefrLevel::B1),
            "B2" => Ok(CefrLevel::B2),
            "C1" => Ok(CefrLevel::C1),
            "C2" => Ok(CefrLevel::C2),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Classification of a single token: a CEFR level, or `Unknown` when the
/// lexicon has nothing for it.
///
/// Serializes as `"A1"` … `"C2"` / `"Unknown"`. Orders all CEFR levels before
/// `Unknown`, which keeps level-keyed maps in reading order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Level {
    Cefr(CefrLevel),
    Unknown,
}

impl Level {
    pub const ALL: [Level; 7] = [
        Level::Cefr(CefrLevel::A1),
        Level::Cefr(CefrLevel::A2),
        Level::Cefr(CefrLevel::B1),
        Level::Cefr(CefrLevel::B2),
        Level::Cefr(CefrLevel::C1),
        Level::Cefr(CefrLevel::C2),
        Level::Unknown,
    ];

    pub fn cefr(self) -> Option<CefrLevel> {
        match self {
            Level::Cefr(level) => Some(level),
            Level::Unknown => None,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, Level::Cefr(_))
    }
}

impl From<CefrLevel> for Level {
    fn from(level: CefrLevel) -> Self {
        Level::Cefr(level)
    }
}

impl From<Option<CefrLevel>> for Level {
    fn from(level: Option<CefrLevel>) -> Self {
        level.map_or(Level::Unknown, Level::Cefr)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Cefr(level) => f.write_str(level.as_str()),
            Level::Unknown => f.write_str("Unknown"),
        }
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("unknown") {
            return Ok(Level::Unknown);
        }
        s.parse().map(Level::Cefr)
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Coarse part-of-speech marker used for lexicon matching.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoarsePos {
    Noun,
    Verb,
    Adj,
    Adv,
    Other,
}

impl CoarsePos {
    /// Open word classes, in the order the tagger breaks ties.
    pub const OPEN: [CoarsePos; 4] = [
        CoarsePos::Noun,
        CoarsePos::Verb,
        CoarsePos::Adj,
        CoarsePos::Adv,
    ];

    /// Parse a lexicon POS cell. Total: anything unrecognised is `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "n" | "noun" => CoarsePos::Noun,
            "v" | "verb" => CoarsePos::Verb,
            "a" | "j" | "s" | "adj" | "adjective" => CoarsePos::Adj,
            "r" | "adv" | "adverb" => CoarsePos::Adv,
            _ => CoarsePos::Other,
        }
    }

    pub fn is_open(self) -> bool {
        !matches!(self, CoarsePos::Other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CoarsePos::Noun => "noun",
            CoarsePos::Verb => "verb",
            CoarsePos::Adj => "adj",
            CoarsePos::Adv => "adv",
            CoarsePos::Other => "other",
        }
    }
}

impl fmt::Display for CoarsePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the leveled vocabulary lexicon.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LexiconEntry {
    pub lemma: String,
    pub pos: CoarsePos,
    pub level: CefrLevel,
    pub is_abstract: bool,
}

/// A word (or merged phrase) as seen by the analysis pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub lemma: String,
    pub pos: CoarsePos,
    pub level: Level,
    pub is_phrase: bool,
    /// Abstractness flag of the lexicon entry the token matched.
    #[serde(skip)]
    pub is_abstract: bool,
    #[serde(skip)]
    pub sentence_initial: bool,
}

impl Token {
    /// A fresh, not yet classified token.
    pub fn new(text: impl Into<String>, lemma: impl Into<String>, pos: CoarsePos) -> Self {
        Self {
            text: text.into(),
            lemma: lemma.into(),
            pos,
            level: Level::Unknown,
            is_phrase: false,
            is_abstract: false,
            sentence_initial: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SentenceMetrics {
    pub token_count: usize,
    pub clause_count: usize,
    pub tree_depth_proxy: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyntaxMetrics {
    pub clause_density: f64,
    /// Mean per-sentence nesting estimate from punctuation and clause markers.
    /// An approximation; no parse tree is built.
    pub avg_tree_depth: f64,
    pub passive_ratio: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscourseMetrics {
    pub abstract_noun_ratio: f64,
    pub connective_sophistication: f64,
    pub entity_density: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetrics {
    pub sentence_count: usize,
    pub word_count: usize,
    pub unique_word_count: usize,
    pub avg_sentence_length: f64,
    pub syntax: SyntaxMetrics,
    pub discourse: DiscourseMetrics,
}

/// Occurrence statistics for one level bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelShare {
    pub count: usize,
    /// Share of all tokens, 0–100, rounded to two decimals.
    pub percentage: f64,
    pub unique_words: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularyProfile {
    pub known_word_count: usize,
    pub unknown_word_count: usize,
    /// Unknown tokens over all tokens, 0.0–1.0.
    pub unknown_words_ratio: f64,
    pub distribution: BTreeMap<Level, LevelShare>,
    pub sample_unknown_words: Vec<String>,
}

/// Full result of one document analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub cefr_level: CefrLevel,
    pub lexical_score: f64,
    pub adjusted_score: f64,
    pub metrics: DocumentMetrics,
    pub details: Vec<Token>,
    pub vocabulary: VocabularyProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!("a1".parse::<CefrLevel>().unwrap(), CefrLevel::A1);
        assert_eq!(" C2 ".parse::<CefrLevel>().unwrap(), CefrLevel::C2);
        assert!("D1".parse::<CefrLevel>().is_err());
        assert_eq!("unknown".parse::<Level>().unwrap(), Level::Unknown);
    }

    #[test]
    fn ordinals_round_trip() {
        for level in CefrLevel::ALL {
            assert_eq!(CefrLevel::from_ordinal(level.ordinal()), Some(level));
        }
        assert_eq!(CefrLevel::from_ordinal(0), None);
        assert_eq!(CefrLevel::from_ordinal(7), None);
    }

    #[test]
    fn coarse_pos_from_lexicon_cells() {
        assert_eq!(CoarsePos::from_tag("noun"), CoarsePos::Noun);
        assert_eq!(CoarsePos::from_tag("Verb"), CoarsePos::Verb);
        assert_eq!(CoarsePos::from_tag("adjective"), CoarsePos::Adj);
        assert_eq!(CoarsePos::from_tag("adv"), CoarsePos::Adv);
        assert_eq!(CoarsePos::from_tag("prep"), CoarsePos::Other);
        assert_eq!(CoarsePos::from_tag(""), CoarsePos::Other);
    }

    #[test]
    fn unknown_sorts_after_every_cefr_level() {
        let mut levels = vec![
            Level::Unknown,
            Level::Cefr(CefrLevel::B1),
            Level::Cefr(CefrLevel::A1),
        ];
        levels.sort();
        assert_eq!(
            levels,
            vec![
                Level::Cefr(CefrLevel::A1),
                Level::Cefr(CefrLevel::B1),
                Level::Unknown
            ]
        );
    }

    #[test]
    fn token_serializes_with_public_field_names_only() {
        let mut token = Token::new("Dogs", "dog", CoarsePos::Noun);
        token.level = Level::Cefr(CefrLevel::A1);
        token.is_abstract = true;
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "text": "Dogs",
                "lemma": "dog",
                "pos": "noun",
                "level": "A1",
                "is_phrase": false,
            })
        );
    }

    #[test]
    fn distribution_keys_serialize_as_level_names() {
        let mut distribution = BTreeMap::new();
        distribution.insert(Level::Unknown, LevelShare::default());
        distribution.insert(Level::Cefr(CefrLevel::A2), LevelShare::default());
        let json = serde_json::to_string(&distribution).unwrap();
        assert!(json.starts_with("{\"A2\""));
        assert!(json.contains("\"Unknown\""));
    }
}
