//! Read prebuilt dictionary files: an FST word index plus a record blob.
//!
//! `dict.fst` maps lowercased words to byte offsets into `dict.data`. Each
//! record in the blob is a little-endian `u32` length followed by that many
//! bytes of raw DEFLATE data; the decompressed payload is a five-element JSON
//! array `[phonetic, definition, translation, tag, exchange]`.
//!
//! The builder seals each pair with a build id: the index carries it under a
//! reserved key and the blob ends with a 16-byte footer holding it. Loading
//! an index next to a blob from another build fails with
//! [`DictError::VersionMismatch`].
//!
//! Callers choose between memory-mapped files or owned buffers at runtime via
//! [`LoadMode`]. Both structures are read-only after load, so a single
//! [`Dictionary`] can be shared across threads without locking.
//!
//! # Example
//! ```no_run
//! use cefr_dict::{Dictionary, LoadMode};
//!
//! # fn main() -> Result<(), cefr_dict::DictError> {
//! let dict = Dictionary::open("/path/to/dict", LoadMode::Mmap)?;
//! if let Some(record) = dict.lookup("went")? {
//!     println!("base form: {:?}", record.base_form());
//! }
//! # Ok(()) }
//! ```
//!
//! To produce a dictionary from JSONL, see
//! `cargo run -p cefr-dict --example build_dict -- <input.jsonl> <out-dir>`.

mod builder;
mod record;

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::DeflateDecoder;
use fst::Map;
use memmap2::Mmap;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

pub use builder::{BuildSummary, DictBuilder, build_from_jsonl};
pub use record::DictionaryRecord;

/// File name of the word index inside a dictionary directory.
pub const INDEX_FILE: &str = "dict.fst";
/// File name of the record blob inside a dictionary directory.
pub const DATA_FILE: &str = "dict.data";

const LENGTH_PREFIX: usize = 4;

const BLOB_MAGIC: &[u8; 8] = b"CEFRDATA";
const FOOTER_LEN: usize = 16;

// Reserved index keys. 0xFF never occurs in UTF-8, so these cannot collide
// with a word and sort after all of them.
const BUILD_ID_KEY: &[u8] = b"\xff\xffbuild-id";
const DATA_LEN_KEY: &[u8] = b"\xff\xffdata-len";
const META_KEYS: usize = 2;

#[derive(Debug, Error)]
pub enum DictError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt word index: {0}")]
    CorruptIndex(String),
    #[error("corrupt record blob: {0}")]
    CorruptBlob(String),
    #[error(
        "word index build {index_build:016x} ({index_bytes} bytes) does not match \
         record blob build {blob_build:016x} ({blob_bytes} bytes)"
    )]
    VersionMismatch {
        index_build: u64,
        blob_build: u64,
        index_bytes: u64,
        blob_bytes: u64,
    },
    #[error("word index not loaded")]
    IndexNotLoaded,
    #[error("record blob not loaded")]
    RecordsNotLoaded,
    #[error("truncated record at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedRecord {
        offset: u64,
        needed: u64,
        available: u64,
    },
    #[error("corrupt record at offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },
    #[error("keys must be inserted in ascending order: {key:?} after {previous:?}")]
    OutOfOrder { previous: String, key: String },
    #[error("dictionary build failed: {0}")]
    Build(String),
}

/// Strategy for loading dictionary files.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map each file (fast, zero-copy).
    #[default]
    Mmap,
    /// Read each file into an owned buffer (portable fallback).
    Owned,
}

impl std::str::FromStr for LoadMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mmap" => Ok(LoadMode::Mmap),
            "owned" | "memory" => Ok(LoadMode::Owned),
            other => Err(format!("unknown load mode {other:?} (expected mmap or owned)")),
        }
    }
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

fn load_file(path: &Path, mode: LoadMode) -> Result<Buffer, DictError> {
    let open_err = |source| DictError::Open {
        path: path.to_path_buf(),
        source,
    };
    match mode {
        LoadMode::Mmap => {
            let file = File::open(path).map_err(open_err)?;
            unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .map_err(open_err)
        }
        LoadMode::Owned => {
            let mut file = File::open(path).map_err(open_err)?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf).map_err(open_err)?;
            Ok(Buffer::Owned(buf))
        }
    }
}

/// Immutable minimal automaton mapping words to record offsets.
pub struct FstIndex {
    map: Map<Buffer>,
    build_id: u64,
    data_len: u64,
}

impl FstIndex {
    /// Validate and take ownership of serialized index bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DictError> {
        Self::from_buffer(Buffer::Owned(bytes))
    }

    pub fn open(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self, DictError> {
        let path = path.as_ref();
        let index = Self::from_buffer(load_file(path, mode)?)?;
        info!(path = %path.display(), words = index.len(), ?mode, "loaded word index");
        Ok(index)
    }

    fn from_buffer(buffer: Buffer) -> Result<Self, DictError> {
        let map = Map::new(buffer).map_err(|e| DictError::CorruptIndex(e.to_string()))?;
        map.as_fst()
            .verify()
            .map_err(|e| DictError::CorruptIndex(e.to_string()))?;
        let build_id = map
            .get(BUILD_ID_KEY)
            .ok_or_else(|| DictError::CorruptIndex("missing build id".into()))?;
        let data_len = map
            .get(DATA_LEN_KEY)
            .ok_or_else(|| DictError::CorruptIndex("missing record blob length".into()))?;
        Ok(Self {
            map,
            build_id,
            data_len,
        })
    }

    /// Exact byte-for-byte lookup; callers normalise case.
    pub fn lookup_offset(&self, word: &str) -> Option<u64> {
        self.map.get(word)
    }

    /// Number of words, not counting the reserved build keys.
    pub fn len(&self) -> usize {
        self.map.len().saturating_sub(META_KEYS)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn build_id(&self) -> u64 {
        self.build_id
    }

    /// Size of the record section the index was built against.
    pub fn data_len(&self) -> u64 {
        self.data_len
    }

    /// Fail unless `records` was written by the same build as this index.
    pub fn check_records(&self, records: &RecordBlob) -> Result<(), DictError> {
        let blob_bytes = records.len() as u64;
        if self.build_id == records.build_id && self.data_len == blob_bytes {
            return Ok(());
        }
        Err(DictError::VersionMismatch {
            index_build: self.build_id,
            blob_build: records.build_id,
            index_bytes: self.data_len,
            blob_bytes,
        })
    }
}

impl fmt::Debug for FstIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FstIndex")
            .field("len", &self.len())
            .field("build_id", &format_args!("{:016x}", self.build_id))
            .finish()
    }
}

/// Length-prefixed, DEFLATE-compressed records addressed by byte offset,
/// followed by the build footer.
pub struct RecordBlob {
    data: Buffer,
    build_id: u64,
}

impl RecordBlob {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DictError> {
        Self::from_buffer(Buffer::Owned(bytes))
    }

    pub fn open(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self, DictError> {
        let path = path.as_ref();
        let blob = Self::from_buffer(load_file(path, mode)?)?;
        info!(path = %path.display(), bytes = blob.len(), ?mode, "attached record blob");
        Ok(blob)
    }

    fn from_buffer(data: Buffer) -> Result<Self, DictError> {
        let bytes = data.as_slice();
        let Some(split) = bytes.len().checked_sub(FOOTER_LEN) else {
            return Err(DictError::CorruptBlob(format!(
                "{} bytes is too short for the build footer",
                bytes.len()
            )));
        };
        let footer = &bytes[split..];
        if footer[..BLOB_MAGIC.len()] != BLOB_MAGIC[..] {
            return Err(DictError::CorruptBlob("missing build footer".into()));
        }
        let build_id = LittleEndian::read_u64(&footer[BLOB_MAGIC.len()..]);
        Ok(Self { data, build_id })
    }

    fn records(&self) -> &[u8] {
        let data = self.data.as_slice();
        &data[..data.len() - FOOTER_LEN]
    }

    pub fn build_id(&self) -> u64 {
        self.build_id
    }

    /// Size of the record section, excluding the footer.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the record starting at `offset`.
    pub fn read_record(&self, offset: u64) -> Result<DictionaryRecord, DictError> {
        let data = self.records();
        let start = usize::try_from(offset)
            .ok()
            .filter(|start| *start <= data.len())
            .unwrap_or(data.len());
        let rest = &data[start..];
        if rest.len() < LENGTH_PREFIX {
            return Err(DictError::TruncatedRecord {
                offset,
                needed: LENGTH_PREFIX as u64,
                available: rest.len() as u64,
            });
        }

        let len = LittleEndian::read_u32(&rest[..LENGTH_PREFIX]) as usize;
        let body = &rest[LENGTH_PREFIX..];
        if body.len() < len {
            return Err(DictError::TruncatedRecord {
                offset,
                needed: (LENGTH_PREFIX + len) as u64,
                available: rest.len() as u64,
            });
        }

        let mut payload = Vec::with_capacity(len * 3);
        DeflateDecoder::new(&body[..len])
            .read_to_end(&mut payload)
            .map_err(|e| DictError::CorruptRecord {
                offset,
                reason: format!("inflate: {e}"),
            })?;
        DictionaryRecord::from_json_slice(&payload).map_err(|e| DictError::CorruptRecord {
            offset,
            reason: e.to_string(),
        })
    }
}

impl fmt::Debug for RecordBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordBlob").field("bytes", &self.len()).finish()
    }
}

/// Per-word result of a batch lookup.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupOutcome {
    Found(DictionaryRecord),
    NotFound,
    Corrupt { reason: String },
}

/// A word index paired with the record blob it was built against.
#[derive(Debug)]
pub struct Dictionary {
    index: FstIndex,
    records: RecordBlob,
}

impl Dictionary {
    /// Open `dict.fst` and `dict.data` from a directory.
    pub fn open(dir: impl AsRef<Path>, mode: LoadMode) -> Result<Self, DictError> {
        let dir = dir.as_ref();
        let index = FstIndex::open(dir.join(INDEX_FILE), mode)?;
        let records = RecordBlob::open(dir.join(DATA_FILE), mode)?;
        Self::from_parts(index, records)
    }

    pub fn from_parts(index: FstIndex, records: RecordBlob) -> Result<Self, DictError> {
        index.check_records(&records)?;
        Ok(Self { index, records })
    }

    pub fn index(&self) -> &FstIndex {
        &self.index
    }

    pub fn records(&self) -> &RecordBlob {
        &self.records
    }

    /// Look up a word after trimming and lowercasing it.
    pub fn lookup(&self, word: &str) -> Result<Option<DictionaryRecord>, DictError> {
        let key = normalize_key(word);
        match self.index.lookup_offset(&key) {
            Some(offset) => self.records.read_record(offset).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve several words; a corrupt record only affects its own entry.
    pub fn lookup_many<S: AsRef<str>>(&self, words: &[S]) -> Vec<(String, LookupOutcome)> {
        words
            .iter()
            .map(|word| {
                let word = word.as_ref();
                let outcome = match self.lookup(word) {
                    Ok(Some(record)) => LookupOutcome::Found(record),
                    Ok(None) => LookupOutcome::NotFound,
                    Err(err) => {
                        tracing::warn!(word, error = %err, "failed to decode dictionary record");
                        LookupOutcome::Corrupt {
                            reason: err.to_string(),
                        }
                    }
                };
                (word.to_string(), outcome)
            })
            .collect()
    }
}

/// Key normalisation applied on both the build and lookup side.
pub fn normalize_key(word: &str) -> String {
    word.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_index_bytes() {
        let err = FstIndex::from_bytes(b"definitely not an fst".to_vec()).unwrap_err();
        assert!(matches!(err, DictError::CorruptIndex(_)));
    }

    fn sealed(mut bytes: Vec<u8>) -> RecordBlob {
        bytes.extend_from_slice(BLOB_MAGIC);
        bytes.extend_from_slice(&7u64.to_le_bytes());
        RecordBlob::from_bytes(bytes).expect("blob")
    }

    #[test]
    fn blob_without_footer_is_rejected() {
        let err = RecordBlob::from_bytes(vec![0x10, 0x00]).unwrap_err();
        assert!(matches!(err, DictError::CorruptBlob(_)));
        let err = RecordBlob::from_bytes(vec![0u8; FOOTER_LEN]).unwrap_err();
        assert!(matches!(err, DictError::CorruptBlob(_)));

        let blob = sealed(Vec::new());
        assert!(blob.is_empty());
        assert_eq!(blob.build_id(), 7);
    }

    #[test]
    fn short_blob_reports_truncation() {
        let blob = sealed(vec![0x10, 0x00]);
        let err = blob.read_record(0).unwrap_err();
        assert!(matches!(
            err,
            DictError::TruncatedRecord {
                needed: 4,
                available: 2,
                ..
            }
        ));

        let err = blob.read_record(99).unwrap_err();
        assert!(matches!(err, DictError::TruncatedRecord { available: 0, .. }));
    }

    #[test]
    fn length_past_end_reports_truncation() {
        let mut bytes = 50u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[1, 2, 3]);
        let blob = sealed(bytes);
        let err = blob.read_record(0).unwrap_err();
        assert!(matches!(
            err,
            DictError::TruncatedRecord {
                needed: 54,
                available: 7,
                ..
            }
        ));
    }

    #[test]
    fn undecodable_payload_is_corrupt() {
        let mut bytes = 3u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xff, 0xff, 0xff]);
        let blob = sealed(bytes);
        let err = blob.read_record(0).unwrap_err();
        assert!(matches!(err, DictError::CorruptRecord { offset: 0, .. }));
    }

    #[test]
    fn parses_load_mode_names() {
        assert_eq!("mmap".parse::<LoadMode>(), Ok(LoadMode::Mmap));
        assert_eq!(" Owned ".parse::<LoadMode>(), Ok(LoadMode::Owned));
        assert!("disk".parse::<LoadMode>().is_err());
    }
}
