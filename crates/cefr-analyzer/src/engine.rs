use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use cefr_dict::{
    DATA_FILE, DictError, DictionaryRecord, FstIndex, INDEX_FILE, LoadMode, LookupOutcome,
    RecordBlob, normalize_key,
};
use cefr_morphy::Morphy;
use cefr_types::{AnalysisResult, DocumentMetrics, Token};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::error::AnalysisError;
use crate::lexicon::LexiconStore;
use crate::metrics::{self, AnalyzedSentence};
use crate::scorer::{self, ScoringConfig};
use crate::tagger::Tagger;
use crate::tokenizer;
use crate::vocabulary::vocabulary_profile;

/// Where the engine finds its assets. `None` paths use the built-in lexicon
/// and exception lists; without `dict_dir` no dictionary is loaded up front.
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub lexicon_path: Option<PathBuf>,
    pub exceptions_dir: Option<PathBuf>,
    pub dict_dir: Option<PathBuf>,
    pub load_mode: LoadMode,
    pub scoring: ScoringConfig,
}

/// Owns the lexicon, lemmatizer tables and the optional dictionary.
///
/// Everything is read-only after construction except the index and record
/// blob, which are loaded at most once; concurrent loaders block on the
/// in-flight load and later loads are no-ops.
pub struct DictionaryEngine {
    lexicon: LexiconStore,
    morphy: Morphy,
    scoring: ScoringConfig,
    index: OnceCell<FstIndex>,
    records: OnceCell<RecordBlob>,
}

impl DictionaryEngine {
    pub fn initialize(config: EngineConfig) -> Result<Self, AnalysisError> {
        let start = Instant::now();
        let lexicon = match &config.lexicon_path {
            Some(path) => LexiconStore::load_path(path)?,
            None => LexiconStore::embedded()?,
        };
        let morphy = match &config.exceptions_dir {
            Some(dir) => Morphy::load(dir).map_err(|err| AnalysisError::Exceptions {
                path: dir.clone(),
                reason: format!("{err:#}"),
            })?,
            None => Morphy::english(),
        };

        let engine = Self::from_parts(lexicon, morphy, config.scoring);
        if let Some(dir) = &config.dict_dir {
            engine.load_dictionary_dir(dir, config.load_mode)?;
        }

        info!(
            lexicon_entries = engine.lexicon.len(),
            exception_forms = engine.morphy.exception_count(),
            dictionary = engine.has_dictionary(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "analysis engine ready"
        );
        Ok(engine)
    }

    pub fn from_parts(lexicon: LexiconStore, morphy: Morphy, scoring: ScoringConfig) -> Self {
        Self {
            lexicon,
            morphy,
            scoring,
            index: OnceCell::new(),
            records: OnceCell::new(),
        }
    }

    pub fn lexicon(&self) -> &LexiconStore {
        &self.lexicon
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// Analyse a document. Never fails: empty or wordless input gives a
    /// zeroed A1 result.
    #[tracing::instrument(skip_all, fields(bytes = text.len()))]
    pub fn analyze(&self, text: &str) -> AnalysisResult {
        let tagger = Tagger::new(&self.lexicon, &self.morphy);
        let classifier = Classifier::new(&self.lexicon);

        let sentences: Vec<AnalyzedSentence> = tokenizer::tokenize(text)
            .into_iter()
            .map(|sentence| {
                let tags = tagger.tag(&sentence.words);
                let tokens: Vec<Token> = sentence
                    .words
                    .iter()
                    .zip(tags)
                    .enumerate()
                    .map(|(i, (word, pos))| {
                        let lemma = self.morphy.lemmatize_with(word, pos, |p, lemma| {
                            self.lexicon.has_pos(lemma, p)
                        });
                        let mut token = Token::new(word.as_str(), lemma, pos);
                        token.sentence_initial = i == 0;
                        token
                    })
                    .collect();
                let mut tokens = classifier.group_phrases(tokens);
                classifier.classify_all(&mut tokens);
                AnalyzedSentence {
                    tokens,
                    word_count: sentence.words.len(),
                    punctuation: sentence.punctuation,
                }
            })
            .collect();

        let syntax = metrics::compute_syntax(&sentences);
        let discourse = metrics::compute_discourse(&sentences);

        let sentence_count = sentences.len();
        let word_count: usize = sentences.iter().map(|s| s.word_count).sum();
        let details: Vec<Token> = sentences.into_iter().flat_map(|s| s.tokens).collect();
        let unique_word_count = details
            .iter()
            .map(|t| t.lemma.to_lowercase())
            .collect::<HashSet<_>>()
            .len();

        let score = scorer::score(&details, &syntax, &discourse, &self.scoring);
        let vocabulary = vocabulary_profile(&details);
        debug!(
            sentences = sentence_count,
            words = word_count,
            level = %score.level,
            adjusted = score.adjusted,
            "analyzed text"
        );

        AnalysisResult {
            cefr_level: score.level,
            lexical_score: score.lexical,
            adjusted_score: score.adjusted,
            metrics: DocumentMetrics {
                sentence_count,
                word_count,
                unique_word_count,
                avg_sentence_length: if sentence_count == 0 {
                    0.0
                } else {
                    word_count as f64 / sentence_count as f64
                },
                syntax,
                discourse,
            },
            details,
            vocabulary,
        }
    }

    /// Install the word index from serialized bytes. Only the first
    /// successful call has any effect; an index from a different build than
    /// the attached record blob is refused.
    pub fn load_fst_index(&self, bytes: &[u8]) -> Result<(), DictError> {
        self.index
            .get_or_try_init(|| self.paired_index(FstIndex::from_bytes(bytes.to_vec())?))
            .map(|_| ())
    }

    pub fn load_fst_index_from(
        &self,
        path: impl AsRef<Path>,
        mode: LoadMode,
    ) -> Result<(), DictError> {
        self.index
            .get_or_try_init(|| self.paired_index(FstIndex::open(path, mode)?))
            .map(|_| ())
    }

    pub fn attach_records(&self, path: impl AsRef<Path>, mode: LoadMode) -> Result<(), DictError> {
        self.records
            .get_or_try_init(|| self.paired_records(RecordBlob::open(path, mode)?))
            .map(|_| ())
    }

    /// Same as [`attach_records`](Self::attach_records) for an in-memory
    /// blob. Once a blob is attached, later calls return `Ok` without
    /// inspecting `bytes`.
    pub fn attach_record_bytes(&self, bytes: Vec<u8>) -> Result<(), DictError> {
        self.records
            .get_or_try_init(|| self.paired_records(RecordBlob::from_bytes(bytes)?))
            .map(|_| ())
    }

    fn paired_index(&self, index: FstIndex) -> Result<FstIndex, DictError> {
        if let Some(records) = self.records.get() {
            index.check_records(records)?;
        }
        Ok(index)
    }

    fn paired_records(&self, records: RecordBlob) -> Result<RecordBlob, DictError> {
        if let Some(index) = self.index.get() {
            index.check_records(&records)?;
        }
        Ok(records)
    }

    /// Load `dict.fst` and `dict.data` from one directory.
    pub fn load_dictionary_dir(
        &self,
        dir: impl AsRef<Path>,
        mode: LoadMode,
    ) -> Result<(), DictError> {
        let dir = dir.as_ref();
        self.load_fst_index_from(dir.join(INDEX_FILE), mode)?;
        self.attach_records(dir.join(DATA_FILE), mode)
    }

    pub fn has_index(&self) -> bool {
        self.index.get().is_some()
    }

    pub fn has_dictionary(&self) -> bool {
        self.has_index() && self.records.get().is_some()
    }

    /// Record offset for `word` (trimmed and lowercased).
    pub fn lookup_fst_offset(&self, word: &str) -> Result<Option<u64>, DictError> {
        let index = self.index.get().ok_or(DictError::IndexNotLoaded)?;
        Ok(index.lookup_offset(&normalize_key(word)))
    }

    pub fn read_record(&self, offset: u64) -> Result<DictionaryRecord, DictError> {
        self.records
            .get()
            .ok_or(DictError::RecordsNotLoaded)?
            .read_record(offset)
    }

    pub fn lookup_word(&self, word: &str) -> Result<Option<DictionaryRecord>, DictError> {
        let (index, records) = self.dictionary()?;
        match index.lookup_offset(&normalize_key(word)) {
            Some(offset) => records.read_record(offset).map(Some),
            None => Ok(None),
        }
    }

    // Index and blob attached on racing threads skip the load-time check.
    fn dictionary(&self) -> Result<(&FstIndex, &RecordBlob), DictError> {
        let index = self.index.get().ok_or(DictError::IndexNotLoaded)?;
        let records = self.records.get().ok_or(DictError::RecordsNotLoaded)?;
        index.check_records(records)?;
        Ok((index, records))
    }

    /// Per-word outcomes. Only a missing index or blob fails the whole batch.
    pub fn lookup_words<S: AsRef<str>>(
        &self,
        words: &[S],
    ) -> Result<Vec<(String, LookupOutcome)>, DictError> {
        let (index, records) = self.dictionary()?;
        Ok(words
            .iter()
            .map(|word| {
                let word = word.as_ref();
                let outcome = match index.lookup_offset(&normalize_key(word)) {
                    None => LookupOutcome::NotFound,
                    Some(offset) => match records.read_record(offset) {
                        Ok(record) => LookupOutcome::Found(record),
                        Err(err) => {
                            warn!(word, offset, error = %err, "corrupt dictionary record");
                            LookupOutcome::Corrupt {
                                reason: err.to_string(),
                            }
                        }
                    },
                };
                (word.to_string(), outcome)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cefr_dict::DictBuilder;

    fn engine() -> DictionaryEngine {
        DictionaryEngine::initialize(EngineConfig::default()).expect("engine")
    }

    fn tiny_dictionary() -> (Vec<u8>, Vec<u8>) {
        let mut builder = DictBuilder::memory();
        for word in ["cat", "dog"] {
            let record = DictionaryRecord {
                definition: Some(format!("a {word}")),
                ..DictionaryRecord::default()
            };
            builder.insert(word, &record).expect("insert");
        }
        builder.finish().expect("finish")
    }

    #[test]
    fn lookups_before_load_report_missing_assets() {
        let engine = engine();
        assert!(matches!(
            engine.lookup_fst_offset("cat"),
            Err(DictError::IndexNotLoaded)
        ));
        let (index, _) = tiny_dictionary();
        engine.load_fst_index(&index).expect("load index");
        assert!(matches!(
            engine.read_record(0),
            Err(DictError::RecordsNotLoaded)
        ));
        assert!(matches!(
            engine.lookup_words(&["cat"]),
            Err(DictError::RecordsNotLoaded)
        ));
    }

    #[test]
    fn repeated_loads_are_no_ops() {
        let engine = engine();
        let (index, data) = tiny_dictionary();
        assert!(engine.load_fst_index(b"garbage").is_err());
        assert!(!engine.has_index());

        engine.load_fst_index(&index).expect("first load");
        engine.load_fst_index(b"garbage").expect("later loads are no-ops");
        engine.attach_record_bytes(data).expect("attach");
        engine
            .attach_record_bytes(b"garbage".to_vec())
            .expect("later attaches are no-ops");

        assert_eq!(engine.lookup_fst_offset("CAT ").expect("offset"), Some(0));
        let record = engine.lookup_word("dog").expect("lookup").expect("dog");
        assert_eq!(record.definition.as_deref(), Some("a dog"));
        assert_eq!(engine.lookup_word("emu").expect("lookup"), None);
    }

    #[test]
    fn blob_from_another_build_is_refused() {
        let (index, data) = tiny_dictionary();
        let mut builder = DictBuilder::memory();
        let zebra = DictionaryRecord {
            definition: Some("a striped animal".into()),
            ..DictionaryRecord::default()
        };
        builder.insert("zebra", &zebra).expect("insert");
        let (other_index, other_data) = builder.finish().expect("finish");

        let index_first = engine();
        index_first.load_fst_index(&index).expect("load index");
        assert!(matches!(
            index_first.attach_record_bytes(other_data.clone()),
            Err(DictError::VersionMismatch { .. })
        ));
        assert!(!index_first.has_dictionary());
        index_first.attach_record_bytes(data).expect("matching blob");
        assert!(index_first.has_dictionary());

        let blob_first = engine();
        blob_first.attach_record_bytes(other_data).expect("attach blob");
        assert!(matches!(
            blob_first.load_fst_index(&index),
            Err(DictError::VersionMismatch { .. })
        ));
        blob_first.load_fst_index(&other_index).expect("matching index");
        let record = blob_first.lookup_word("zebra").expect("lookup").expect("zebra");
        assert_eq!(record.definition.as_deref(), Some("a striped animal"));
        assert_eq!(blob_first.lookup_word("cat").expect("lookup"), None);
    }

    #[test]
    fn missing_lexicon_path_fails_clearly() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = DictionaryEngine::initialize(EngineConfig {
            lexicon_path: Some(dir.path().join("missing.csv")),
            ..EngineConfig::default()
        })
        .err()
        .expect("missing lexicon is an error");
        assert!(matches!(
            err,
            AnalysisError::Lexicon(crate::error::LexiconError::Missing(_))
        ));
    }
}
