use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use crc32fast::Hasher as Crc32Hasher;
use flate2::Compression;
use flate2::write::DeflateEncoder;
use fst::MapBuilder;
use serde::Deserialize;
use tracing::info;

use crate::{
    BLOB_MAGIC, BUILD_ID_KEY, DATA_FILE, DATA_LEN_KEY, DictError, DictionaryRecord, INDEX_FILE,
    normalize_key,
};

/// Streams a matching index/blob pair to two writers.
///
/// Keys must arrive in strictly ascending byte order; the offset stored for
/// each key is the position of its length prefix in the blob. `finish` seals
/// both outputs with the same build id.
pub struct DictBuilder<F: Write, D: Write> {
    index: MapBuilder<F>,
    data: D,
    offset: u64,
    words: u64,
    crc: Crc32Hasher,
    last_key: Option<String>,
}

impl DictBuilder<Vec<u8>, Vec<u8>> {
    pub fn memory() -> Self {
        Self::with_index(MapBuilder::memory(), Vec::new())
    }
}

impl<F: Write, D: Write> DictBuilder<F, D> {
    pub fn new(index_writer: F, data_writer: D) -> Result<Self, DictError> {
        let index = MapBuilder::new(index_writer).map_err(build_err)?;
        Ok(Self::with_index(index, data_writer))
    }

    fn with_index(index: MapBuilder<F>, data: D) -> Self {
        Self {
            index,
            data,
            offset: 0,
            words: 0,
            crc: Crc32Hasher::new(),
            last_key: None,
        }
    }

    /// Append one record and return the offset it was written at.
    pub fn insert(&mut self, key: &str, record: &DictionaryRecord) -> Result<u64, DictError> {
        if let Some(previous) = &self.last_key
            && key.as_bytes() <= previous.as_bytes()
        {
            return Err(DictError::OutOfOrder {
                previous: previous.clone(),
                key: key.to_string(),
            });
        }

        let payload = record.to_json_vec().map_err(build_err)?;
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&payload)?;
        let compressed = encoder.finish()?;
        let len = u32::try_from(compressed.len())
            .map_err(|_| DictError::Build(format!("record for {key:?} exceeds 4 GiB")))?;

        let offset = self.offset;
        self.data.write_u32::<LittleEndian>(len)?;
        self.data.write_all(&compressed)?;
        self.index.insert(key, offset).map_err(build_err)?;

        self.crc.update(key.as_bytes());
        self.crc.update(&len.to_le_bytes());
        self.crc.update(&compressed);
        self.offset += 4 + u64::from(len);
        self.words += 1;
        self.last_key = Some(key.to_string());
        Ok(offset)
    }

    /// Build id the outputs will be sealed with: the CRC-32 of every key and
    /// record in the high half, the word count in the low half.
    pub fn build_id(&self) -> u64 {
        (u64::from(self.crc.clone().finalize()) << 32) | (self.words & 0xffff_ffff)
    }

    /// Seal both outputs with the build id, flush them and hand the writers
    /// back.
    pub fn finish(self) -> Result<(F, D), DictError> {
        let build_id = self.build_id();
        let Self {
            mut index,
            mut data,
            offset,
            ..
        } = self;
        index.insert(BUILD_ID_KEY, build_id).map_err(build_err)?;
        index.insert(DATA_LEN_KEY, offset).map_err(build_err)?;
        data.write_all(BLOB_MAGIC)?;
        data.write_u64::<LittleEndian>(build_id)?;

        let mut index = index.into_inner().map_err(build_err)?;
        index.flush()?;
        data.flush()?;
        Ok((index, data))
    }
}

fn build_err(err: impl std::fmt::Display) -> DictError {
    DictError::Build(err.to_string())
}

#[derive(Deserialize)]
struct JsonlEntry {
    word: String,
    #[serde(default)]
    phonetic: Option<String>,
    #[serde(default)]
    definition: Option<String>,
    #[serde(default)]
    translation: Option<String>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    exchange: Option<String>,
}

/// Counts reported after a JSONL build.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BuildSummary {
    pub lines: usize,
    pub words: usize,
    pub duplicates: usize,
    pub data_bytes: u64,
}

/// Build `dict.fst` and `dict.data` in `out_dir` from JSONL lines of
/// `{word, phonetic, definition, translation, tag, exchange}`.
///
/// Keys are normalised the same way lookups are; the first line wins when
/// several normalise to the same key.
pub fn build_from_jsonl<R: BufRead>(
    reader: R,
    out_dir: impl AsRef<Path>,
) -> Result<BuildSummary, DictError> {
    let out_dir = out_dir.as_ref();
    let mut summary = BuildSummary::default();
    let mut entries: Vec<(String, DictionaryRecord)> = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        summary.lines += 1;
        let entry: JsonlEntry = serde_json::from_str(&line)
            .map_err(|e| DictError::Build(format!("line {}: {e}", lineno + 1)))?;
        let key = normalize_key(&entry.word);
        if key.is_empty() {
            continue;
        }
        entries.push((
            key,
            DictionaryRecord {
                phonetic: entry.phonetic,
                definition: entry.definition,
                translation: entry.translation,
                tag: entry.tag,
                exchange: entry.exchange,
            },
        ));
    }

    // Stable sort keeps source order among equal keys, so dedup retains the first.
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    let before = entries.len();
    entries.dedup_by(|later, earlier| later.0 == earlier.0);
    summary.duplicates = before - entries.len();

    let create = |name: &str| {
        let path = out_dir.join(name);
        File::create(&path)
            .map(BufWriter::new)
            .map_err(|source| DictError::Open { path, source })
    };
    let mut builder = DictBuilder::new(create(INDEX_FILE)?, create(DATA_FILE)?)?;
    for (key, record) in &entries {
        builder.insert(key, record)?;
    }
    summary.words = entries.len();
    summary.data_bytes = builder.offset;
    builder.finish()?;

    info!(
        dir = %out_dir.display(),
        words = summary.words,
        duplicates = summary.duplicates,
        bytes = summary.data_bytes,
        "built dictionary"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FstIndex, RecordBlob};

    fn record(definition: &str) -> DictionaryRecord {
        DictionaryRecord {
            definition: Some(definition.to_string()),
            ..DictionaryRecord::default()
        }
    }

    #[test]
    fn offsets_point_at_length_prefixes() {
        let mut builder = DictBuilder::memory();
        let first = builder.insert("apple", &record("fruit")).expect("insert");
        let second = builder.insert("banana", &record("yellow fruit")).expect("insert");
        assert_eq!(first, 0);
        assert!(second > 4);

        let (index, data) = builder.finish().expect("finish");
        let index = FstIndex::from_bytes(index).expect("index");
        let blob = RecordBlob::from_bytes(data).expect("blob");
        index.check_records(&blob).expect("same build");
        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup_offset("banana"), Some(second));
        assert_eq!(
            blob.read_record(second).expect("read"),
            record("yellow fruit")
        );
    }

    #[test]
    fn build_id_tracks_contents() {
        let mut first = DictBuilder::memory();
        first.insert("apple", &record("fruit")).expect("insert");
        let mut same = DictBuilder::memory();
        same.insert("apple", &record("fruit")).expect("insert");
        let mut other = DictBuilder::memory();
        other.insert("apple", &record("tree")).expect("insert");

        assert_eq!(first.build_id(), same.build_id());
        assert_ne!(first.build_id(), other.build_id());
        assert_eq!(first.build_id() & 0xffff_ffff, 1);
    }

    #[test]
    fn rejects_out_of_order_and_duplicate_keys() {
        let mut builder = DictBuilder::memory();
        builder.insert("mango", &record("m")).expect("insert");
        let err = builder.insert("apple", &record("a")).unwrap_err();
        assert!(matches!(err, DictError::OutOfOrder { .. }));
        let err = builder.insert("mango", &record("again")).unwrap_err();
        assert!(matches!(err, DictError::OutOfOrder { .. }));
    }

    #[test]
    fn malformed_jsonl_names_the_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = "{\"word\": \"ok\"}\n\nnot json\n";
        let err = build_from_jsonl(input.as_bytes(), dir.path()).unwrap_err();
        match err {
            DictError::Build(msg) => assert!(msg.starts_with("line 3:"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
