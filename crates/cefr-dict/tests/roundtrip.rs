use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use cefr_dict::{
    DATA_FILE, DictBuilder, DictError, Dictionary, DictionaryRecord, FstIndex, INDEX_FILE,
    LoadMode, LookupOutcome, RecordBlob, build_from_jsonl,
};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("dict.jsonl")
}

fn build_fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let reader = BufReader::new(File::open(fixture()).expect("open fixture"));
    let summary = build_from_jsonl(reader, dir.path()).expect("build");
    assert_eq!(summary.lines, 6);
    assert_eq!(summary.words, 5);
    assert_eq!(summary.duplicates, 1);
    dir
}

#[test]
fn built_words_resolve_in_both_load_modes() {
    let dir = build_fixture();
    for mode in [LoadMode::Mmap, LoadMode::Owned] {
        let dict = Dictionary::open(dir.path(), mode).expect("open");
        assert_eq!(dict.index().len(), 5);

        let went = dict.lookup("Went ").expect("lookup").expect("went present");
        assert_eq!(went.base_form(), Some("go"));

        let cat = dict.lookup("cat").expect("lookup").expect("cat present");
        assert_eq!(cat.phonetic.as_deref(), Some("kæt"));

        let phrase = dict.lookup("give up").expect("lookup").expect("phrase");
        assert_eq!(phrase.phonetic, None);
        assert_eq!(phrase.translations(), vec!["放弃"]);

        assert_eq!(dict.lookup("zebra").expect("lookup"), None);
    }
}

#[test]
fn every_offset_reads_back_its_record() {
    let words = ["alpha", "beta", "delta", "gamma"];
    let mut builder = DictBuilder::memory();
    let mut written = Vec::new();
    for (i, word) in words.iter().enumerate() {
        let record = DictionaryRecord {
            phonetic: Some(format!("/{word}/")),
            definition: Some(format!("definition {i}")),
            translation: (i % 2 == 0).then(|| format!("译 {i}")),
            tag: None,
            exchange: Some(format!("s:{word}s")),
        };
        let offset = builder.insert(word, &record).expect("insert");
        written.push((word, offset, record));
    }
    let (index, data) = builder.finish().expect("finish");

    let index = FstIndex::from_bytes(index).expect("index");
    let blob = RecordBlob::from_bytes(data).expect("blob");
    for (word, offset, record) in written {
        assert_eq!(index.lookup_offset(word), Some(offset));
        assert_eq!(blob.read_record(offset).expect("read"), record);
    }
    assert_eq!(index.lookup_offset("alph"), None);
    assert_eq!(index.lookup_offset("ALPHA"), None);
}

#[test]
fn corrupt_record_does_not_abort_batch() {
    let dir = build_fixture();
    let index = FstIndex::open(dir.path().join(INDEX_FILE), LoadMode::Owned).expect("index");
    let cat_offset = index.lookup_offset("cat").expect("cat offset") as usize;

    let mut data = fs::read(dir.path().join(DATA_FILE)).expect("read data");
    // Flip the first compressed byte to a reserved DEFLATE block type.
    data[cat_offset + 4] = 0xff;
    let records = RecordBlob::from_bytes(data).expect("blob");
    let dict = Dictionary::from_parts(index, records).expect("same build");

    let outcomes = dict.lookup_many(&["go", "cat", "nope"]);
    assert!(matches!(outcomes[0].1, LookupOutcome::Found(_)));
    assert!(matches!(outcomes[1].1, LookupOutcome::Corrupt { .. }));
    assert_eq!(outcomes[2].1, LookupOutcome::NotFound);
    assert!(matches!(
        dict.lookup("cat"),
        Err(DictError::CorruptRecord { .. })
    ));
}

#[test]
fn truncated_index_file_is_rejected() {
    let dir = build_fixture();
    let path = dir.path().join(INDEX_FILE);
    let mut bytes = fs::read(&path).expect("read index");
    bytes.truncate(bytes.len() / 2);
    assert!(matches!(
        FstIndex::from_bytes(bytes),
        Err(DictError::CorruptIndex(_))
    ));

    let err = Dictionary::open(dir.path().join("missing"), LoadMode::Owned).unwrap_err();
    assert!(matches!(err, DictError::Open { .. }));
}

fn single_word_dictionary(dir: &Path, word: &str, definition: &str) {
    let mut builder = DictBuilder::new(
        File::create(dir.join(INDEX_FILE)).expect("create index"),
        File::create(dir.join(DATA_FILE)).expect("create data"),
    )
    .expect("builder");
    let record = DictionaryRecord {
        definition: Some(definition.to_string()),
        ..DictionaryRecord::default()
    };
    builder.insert(word, &record).expect("insert");
    builder.finish().expect("finish");
}

#[test]
fn index_from_another_build_is_rejected() {
    let fruit = tempfile::tempdir().expect("tempdir");
    let animal = tempfile::tempdir().expect("tempdir");
    single_word_dictionary(fruit.path(), "apple", "a fruit");
    single_word_dictionary(animal.path(), "zebra", "a striped animal");
    let swapped = fruit.path().join(DATA_FILE);
    fs::copy(animal.path().join(DATA_FILE), swapped).expect("swap blob");

    for mode in [LoadMode::Mmap, LoadMode::Owned] {
        let err = Dictionary::open(fruit.path(), mode).unwrap_err();
        assert!(matches!(err, DictError::VersionMismatch { .. }), "{err}");
    }

    let index = FstIndex::open(fruit.path().join(INDEX_FILE), LoadMode::Owned).expect("index");
    let records = RecordBlob::open(animal.path().join(DATA_FILE), LoadMode::Owned).expect("blob");
    assert_ne!(index.build_id(), records.build_id());
    assert!(matches!(
        Dictionary::from_parts(index, records),
        Err(DictError::VersionMismatch { .. })
    ));

    let dict = Dictionary::open(animal.path(), LoadMode::Owned).expect("matching pair");
    let zebra = dict.lookup("zebra").expect("lookup").expect("zebra");
    assert_eq!(zebra.definition.as_deref(), Some("a striped animal"));
}

#[test]
fn outcomes_serialize_with_status_tag() {
    let found = LookupOutcome::Found(DictionaryRecord {
        definition: Some("x".into()),
        ..DictionaryRecord::default()
    });
    let json = serde_json::to_value(&found).expect("json");
    assert_eq!(json["status"], "found");
    assert_eq!(json["definition"], "x");
    assert_eq!(
        serde_json::to_value(LookupOutcome::NotFound).expect("json")["status"],
        "not_found"
    );
}
