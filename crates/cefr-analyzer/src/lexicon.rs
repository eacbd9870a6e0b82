//! Leveled vocabulary lexicon loaded from `lemma,pos,level,is_abstract` CSV.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;

use cefr_types::{CefrLevel, CoarsePos, LexiconEntry};
use csv::StringRecord;
use tracing::info;

use crate::error::LexiconError;

const EMBEDDED_LEXICON: &str = include_str!("../assets/lexicon.csv");

/// A multi-word lexicon entry, split into the words it must match.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Phrase {
    /// Lemma as written in the lexicon (`give up`, `well-known`).
    pub key: String,
    pub words: Vec<String>,
    pub pos: CoarsePos,
}

/// Read-only lemma → entries map plus a first-word phrase index.
#[derive(Clone, Debug, Default)]
pub struct LexiconStore {
    entries: HashMap<String, Vec<LexiconEntry>>,
    phrases: HashMap<String, Vec<Phrase>>,
    rows: usize,
}

impl LexiconStore {
    /// The lexicon compiled into the crate.
    pub fn embedded() -> Result<Self, LexiconError> {
        Self::load(EMBEDDED_LEXICON.as_bytes())
    }

    pub fn load_path(path: impl AsRef<Path>) -> Result<Self, LexiconError> {
        let path = path.as_ref();
        let start = Instant::now();
        let bytes = fs::read(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => LexiconError::Missing(path.to_path_buf()),
            _ => LexiconError::Io(err),
        })?;
        let store = Self::load(&bytes)?;
        info!(
            path = %path.display(),
            entries = store.len(),
            phrases = store.phrase_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded lexicon"
        );
        Ok(store)
    }

    /// Parse CSV bytes. The first record is the header; every row must have
    /// as many fields as the header.
    pub fn load(bytes: &[u8]) -> Result<Self, LexiconError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let mut store = Self::default();
        for result in reader.records() {
            let record = result.map_err(csv_error)?;
            let line = record.position().map_or(0, |pos| pos.line() as usize);
            store.insert_row(line, &record)?;
        }
        if store.is_empty() {
            return Err(LexiconError::Empty);
        }

        for phrases in store.phrases.values_mut() {
            phrases.sort_by(|a, b| b.words.len().cmp(&a.words.len()));
        }
        Ok(store)
    }

    fn insert_row(&mut self, line: usize, row: &StringRecord) -> Result<(), LexiconError> {
        let malformed = |reason: String| LexiconError::Malformed { line, reason };
        let fields: Vec<&str> = row.iter().collect();
        let [lemmas, pos, level, is_abstract] = fields.as_slice() else {
            return Err(malformed(format!("expected 4 fields, found {}", fields.len())));
        };

        let level: CefrLevel = level.parse().map_err(|err| malformed(format!("{err}")))?;
        let is_abstract = match is_abstract.to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            other => {
                return Err(malformed(format!(
                    "is_abstract must be true or false, got {other:?}"
                )));
            }
        };
        let pos = CoarsePos::from_tag(pos);

        for lemma in lemmas.split('/').map(normalize).filter(|l| !l.is_empty()) {
            let words: Vec<String> = lemma
                .split([' ', '-', ','])
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect();
            if words.len() > 1 {
                let phrase = Phrase {
                    key: lemma.clone(),
                    words,
                    pos,
                };
                let first = phrase.words[0].clone();
                let bucket = self.phrases.entry(first).or_default();
                if !bucket.iter().any(|p| p.key == phrase.key) {
                    bucket.push(phrase);
                }
            }
            self.entries.entry(lemma.clone()).or_default().push(LexiconEntry {
                lemma,
                pos,
                level,
                is_abstract,
            });
            self.rows += 1;
        }
        Ok(())
    }

    /// Level and abstractness for `lemma`.
    ///
    /// Entries with the requested POS win (lowest level among them); otherwise
    /// the lowest level across every POS of the lemma.
    pub fn lookup(&self, lemma: &str, pos: CoarsePos) -> Option<(CefrLevel, bool)> {
        let entries = self.entries.get(lemma)?;
        entries
            .iter()
            .filter(|e| e.pos == pos)
            .min_by_key(|e| e.level)
            .or_else(|| entries.iter().min_by_key(|e| e.level))
            .map(|e| (e.level, e.is_abstract))
    }

    pub fn entries(&self, lemma: &str) -> &[LexiconEntry] {
        self.entries.get(lemma).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, lemma: &str) -> bool {
        self.entries.contains_key(lemma)
    }

    pub fn has_pos(&self, lemma: &str, pos: CoarsePos) -> bool {
        self.entries(lemma).iter().any(|e| e.pos == pos)
    }

    /// Phrases whose first word is `word`, longest first.
    pub fn phrases_starting_with(&self, word: &str) -> &[Phrase] {
        self.phrases.get(word).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn phrase_count(&self) -> usize {
        self.phrases.values().map(Vec::len).sum()
    }

    /// Number of entries (one per lemma variant and row).
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

fn normalize(lemma: &str) -> String {
    lemma.trim().to_lowercase()
}

fn csv_error(err: csv::Error) -> LexiconError {
    let line = err.position().map_or(0, |pos| pos.line() as usize);
    let reason = match err.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("expected {expected_len} fields, found {len}"),
        csv::ErrorKind::Utf8 { .. } => "invalid UTF-8".to_string(),
        _ => err.to_string(),
    };
    match err.into_kind() {
        csv::ErrorKind::Io(err) => LexiconError::Io(err),
        _ => LexiconError::Malformed { line, reason },
    }
}
