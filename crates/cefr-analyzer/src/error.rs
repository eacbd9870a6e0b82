use std::io;
use std::path::PathBuf;

use cefr_dict::DictError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("lexicon not found at {0}")]
    Missing(PathBuf),
    #[error("failed to read lexicon: {0}")]
    Io(#[from] io::Error),
    #[error("malformed lexicon row at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("lexicon has no entries")]
    Empty,
}

/// Failures while building a [`crate::DictionaryEngine`] or touching its
/// dictionary assets.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Lexicon(#[from] LexiconError),
    #[error(transparent)]
    Dict(#[from] DictError),
    #[error("failed to load exception lists from {path}: {reason}")]
    Exceptions { path: PathBuf, reason: String },
}
