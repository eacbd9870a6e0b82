use std::fs;

use cefr_morphy::{CandidateSource, Morphy};
use cefr_types::CoarsePos;

#[test]
fn builtin_tables_cover_common_irregulars() {
    let morph = Morphy::english();
    assert!(morph.exception_count() > 200);

    assert_eq!(morph.lemmatize("was", CoarsePos::Verb), "be");
    assert_eq!(morph.lemmatize("sat", CoarsePos::Verb), "sit");
    assert_eq!(morph.lemmatize("left", CoarsePos::Verb), "leave");
    assert_eq!(morph.lemmatize("people", CoarsePos::Noun), "person");
    assert_eq!(morph.lemmatize("worse", CoarsePos::Adj), "bad");
}

#[test]
fn lexicon_predicate_steers_rule_choice() {
    let morph = Morphy::english();
    let known = ["decide", "hope", "hop", "analysis"];
    let exists = |_: CoarsePos, lemma: &str| known.contains(&lemma);

    assert_eq!(morph.lemmatize_with("decided", CoarsePos::Verb, &exists), "decide");
    assert_eq!(morph.lemmatize_with("hoped", CoarsePos::Verb, &exists), "hope");
    assert_eq!(morph.lemmatize_with("hopped", CoarsePos::Verb, &exists), "hop");

    let hopped = morph.lemmas_for(CoarsePos::Verb, "hopped", &exists);
    assert_eq!(hopped.len(), 1);
    assert!(matches!(
        hopped[0].source,
        CandidateSource::Rule { suffix: "ed", replacement: "" }
    ));
}

#[test]
fn loads_exception_files_from_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("verb.exc"), "fared fare\nsnuck sneak\n").expect("write verb.exc");

    let morph = Morphy::load(dir.path()).expect("load");
    assert_eq!(morph.exception_count(), 2);
    assert_eq!(morph.lemmatize("snuck", CoarsePos::Verb), "sneak");
    assert_eq!(
        morph.exceptions_for(CoarsePos::Verb, "Fared"),
        Some(&["fare".to_string()][..])
    );
    // Missing tables load as empty.
    assert_eq!(morph.exceptions_for(CoarsePos::Noun, "mice"), None);
}
