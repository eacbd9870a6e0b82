//! Estimate the CEFR difficulty of English text.
//!
//! The pipeline splits text into sentences, tags and lemmatizes each word,
//! merges multi-word lexicon phrases, classifies every token against a
//! leveled lexicon, and combines the mean vocabulary level with clause and
//! connective bonuses into a final A1–C2 bucket.
//!
//! # Example
//! ```
//! use cefr_analyzer::{DictionaryEngine, EngineConfig};
//! use cefr_types::CefrLevel;
//!
//! # fn main() -> Result<(), cefr_analyzer::AnalysisError> {
//! let engine = DictionaryEngine::initialize(EngineConfig::default())?;
//! let result = engine.analyze("The cat sat on the mat.");
//! assert_eq!(result.metrics.sentence_count, 1);
//! assert_eq!(result.cefr_level, CefrLevel::A1);
//! # Ok(()) }
//! ```

pub mod classifier;
pub mod engine;
pub mod error;
pub mod lexicon;
pub mod metrics;
pub mod scorer;
pub mod tagger;
pub mod tokenizer;
pub mod vocabulary;

pub use engine::{DictionaryEngine, EngineConfig};
pub use error::{AnalysisError, LexiconError};
pub use lexicon::LexiconStore;
pub use scorer::ScoringConfig;
