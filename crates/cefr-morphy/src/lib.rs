//! Morphy-style lemmatization for English surface forms.
//!
//! Follows the classic morphy shape: consult the irregular-form exception
//! lists, apply POS-specific suffix rules, and verify candidates via a
//! caller-provided lemma existence predicate. Unlike WordNet's morphy, the
//! [`Morphy::lemmatize_with`] entry point is total: when no candidate is
//! confirmed by the predicate it falls back to a guarded heuristic guess, and
//! when nothing applies it returns the lowercased surface form.
//!
//! # How it works
//! 1. Exceptions (`*.exc` tables) win outright.
//! 2. The surface form is kept if the predicate knows it.
//! 3. POS-specific suffix rules are tried in order; the first candidate the
//!    predicate confirms wins. Rules that strip to a doubled consonant also
//!    try the undoubled stem (`running` → `runn`, `run`).
//! 4. Otherwise a heuristic guess restores `e`/`y` and undoubles stems.
//!
//! # Example
//! ```
//! use cefr_morphy::Morphy;
//! use cefr_types::CoarsePos;
//!
//! let morph = Morphy::english();
//! assert_eq!(morph.lemmatize("went", CoarsePos::Verb), "go");
//! assert_eq!(morph.lemmatize("Children", CoarsePos::Noun), "child");
//! assert_eq!(morph.lemmatize("running", CoarsePos::Verb), "run");
//!
//! let known = |_: CoarsePos, lemma: &str| lemma == "large";
//! assert_eq!(morph.lemmatize_with("larger", CoarsePos::Adj, known), "large");
//! ```
//!
//! For a runnable demo, see `cargo run -p cefr-morphy --example lemmatize -- <word>...`.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cefr_types::CoarsePos;

const NOUN_EXC: &str = include_str!("../assets/noun.exc");
const VERB_EXC: &str = include_str!("../assets/verb.exc");
const ADJ_EXC: &str = include_str!("../assets/adj.exc");
const ADV_EXC: &str = include_str!("../assets/adv.exc");

/// Where a candidate lemma originated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CandidateSource {
    Surface,
    Exception,
    Rule {
        suffix: &'static str,
        replacement: &'static str,
    },
}

/// A lemma candidate paired with its POS and provenance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LemmaCandidate<'a> {
    pub pos: CoarsePos,
    pub lemma: Cow<'a, str>,
    pub source: CandidateSource,
}

type ExceptionMap = HashMap<String, Vec<String>>;

/// Exception tables plus suffix rules, keyed by coarse POS.
#[derive(Clone, Debug, Default)]
pub struct Morphy {
    exceptions: HashMap<CoarsePos, ExceptionMap>,
}

impl Morphy {
    /// Built-in English exception lists (irregular verbs, plurals, comparatives).
    pub fn english() -> Self {
        Self {
            exceptions: HashMap::from([
                (CoarsePos::Noun, parse_exc(NOUN_EXC)),
                (CoarsePos::Verb, parse_exc(VERB_EXC)),
                (CoarsePos::Adj, parse_exc(ADJ_EXC)),
                (CoarsePos::Adv, parse_exc(ADV_EXC)),
            ]),
        }
    }

    /// Load exception lists (`noun.exc`, `verb.exc`, `adj.exc`, `adv.exc`) from
    /// a directory.
    ///
    /// Files are optional; missing ones are treated as empty.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            exceptions: HashMap::from([
                (CoarsePos::Noun, load_exc(dir.join("noun.exc"))?),
                (CoarsePos::Verb, load_exc(dir.join("verb.exc"))?),
                (CoarsePos::Adj, load_exc(dir.join("adj.exc"))?),
                (CoarsePos::Adv, load_exc(dir.join("adv.exc"))?),
            ]),
        })
    }

    /// Irregular base forms recorded for `surface` under `pos`.
    pub fn exceptions_for(&self, pos: CoarsePos, surface: &str) -> Option<&[String]> {
        self.exceptions
            .get(&pos)
            .and_then(|map| map.get(&normalize(surface)))
            .map(Vec::as_slice)
    }

    /// Number of surface forms across all exception tables.
    pub fn exception_count(&self) -> usize {
        self.exceptions.values().map(HashMap::len).sum()
    }

    /// Generate lemmas for a surface form, returning enriched provenance.
    ///
    /// Only candidates confirmed by `lemma_exists` are returned, so an empty
    /// result means "no known base form for this POS".
    pub fn lemmas_for<'a, F>(
        &'a self,
        pos: CoarsePos,
        surface: &str,
        lemma_exists: F,
    ) -> Vec<LemmaCandidate<'a>>
    where
        F: Fn(CoarsePos, &str) -> bool,
    {
        let mut seen: HashSet<Cow<'a, str>> = HashSet::new();
        let mut out: Vec<LemmaCandidate<'a>> = Vec::new();
        let norm_surface = normalize(surface);

        if lemma_exists(pos, &norm_surface) {
            push_unique(
                &mut out,
                &mut seen,
                LemmaCandidate {
                    pos,
                    lemma: Cow::Owned(norm_surface.clone()),
                    source: CandidateSource::Surface,
                },
            );
        }

        if let Some(exc_map) = self.exceptions.get(&pos)
            && let Some(entries) = exc_map.get(&norm_surface)
        {
            for lemma in entries {
                if lemma_exists(pos, lemma) {
                    push_unique(
                        &mut out,
                        &mut seen,
                        LemmaCandidate {
                            pos,
                            lemma: Cow::Borrowed(lemma.as_str()),
                            source: CandidateSource::Exception,
                        },
                    );
                }
            }
        }

        for (suffix, replacement) in rules_for(pos) {
            for candidate in apply_rule(&norm_surface, suffix, replacement) {
                if lemma_exists(pos, &candidate) {
                    push_unique(
                        &mut out,
                        &mut seen,
                        LemmaCandidate {
                            pos,
                            lemma: Cow::Owned(candidate),
                            source: CandidateSource::Rule {
                                suffix,
                                replacement,
                            },
                        },
                    );
                }
            }
        }

        out
    }

    /// Reduce `surface` to a base form using exceptions and heuristic rules only.
    pub fn lemmatize(&self, surface: &str, pos: CoarsePos) -> String {
        self.lemmatize_with(surface, pos, |_, _| false)
    }

    /// Reduce `surface` to a base form, preferring candidates `lemma_exists`
    /// confirms. Never fails; worst case is the lowercased input.
    pub fn lemmatize_with<F>(&self, surface: &str, pos: CoarsePos, lemma_exists: F) -> String
    where
        F: Fn(CoarsePos, &str) -> bool,
    {
        let norm = normalize(surface);
        if !pos.is_open() || norm.is_empty() {
            return norm;
        }

        if pos == CoarsePos::Noun
            && let Some(stem) = norm.strip_suffix("'s")
            && !stem.is_empty()
        {
            return self.lemmatize_with(stem, pos, lemma_exists);
        }

        if let Some(lemma) = self
            .exceptions
            .get(&pos)
            .and_then(|map| map.get(&norm))
            .and_then(|lemmas| lemmas.first())
        {
            return lemma.clone();
        }

        if lemma_exists(pos, &norm) {
            return norm;
        }

        for (suffix, replacement) in rules_for(pos) {
            for candidate in apply_rule(&norm, suffix, replacement) {
                if lemma_exists(pos, &candidate) {
                    return candidate;
                }
            }
        }

        guess(&norm, pos).unwrap_or(norm)
    }
}

fn parse_exc(text: &str) -> ExceptionMap {
    let mut map = HashMap::new();
    for line in text.lines() {
        insert_exc_line(&mut map, line);
    }
    map
}

fn load_exc(path: PathBuf) -> Result<ExceptionMap> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let file =
        File::open(&path).with_context(|| format!("open exception file {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut map = HashMap::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line =
            line.with_context(|| format!("read line {} in {}", lineno + 1, path.display()))?;
        insert_exc_line(&mut map, &line);
    }
    Ok(map)
}

fn insert_exc_line(map: &mut ExceptionMap, line: &str) {
    let mut parts = line.split_whitespace();
    let Some(surface) = parts.next().map(normalize) else {
        return;
    };
    let lemmas: Vec<String> = parts.map(normalize).collect();
    if !lemmas.is_empty() {
        map.insert(surface, lemmas);
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase().replace('\u{2019}', "'")
}

fn push_unique<'a>(
    out: &mut Vec<LemmaCandidate<'a>>,
    seen: &mut HashSet<Cow<'a, str>>,
    candidate: LemmaCandidate<'a>,
) {
    if seen.insert(candidate.lemma.clone()) {
        out.push(candidate);
    }
}

/// Candidates for one rule: the plain replacement, then the undoubled stem
/// when stripping left a doubled consonant (`stopped` → `stopp`, `stop`).
fn apply_rule(surface: &str, suffix: &str, replacement: &str) -> Vec<String> {
    let Some(stem) = surface.strip_suffix(suffix) else {
        return Vec::new();
    };
    if stem.is_empty() {
        return Vec::new();
    }
    let mut out = vec![format!("{stem}{replacement}")];
    if replacement.is_empty()
        && let Some(undoubled) = undouble(stem)
    {
        out.push(undoubled.to_string());
    }
    out
}

fn undouble(stem: &str) -> Option<&str> {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    if n >= 3 && bytes[n - 1] == bytes[n - 2] && is_consonant(bytes[n - 1]) {
        Some(&stem[..n - 1])
    } else {
        None
    }
}

fn rules_for(pos: CoarsePos) -> &'static [(&'static str, &'static str)] {
    match pos {
        CoarsePos::Noun => &[
            ("'s", ""),
            ("s", ""),
            ("ses", "s"),
            ("xes", "x"),
            ("zes", "z"),
            ("ches", "ch"),
            ("shes", "sh"),
            ("men", "man"),
            ("ies", "y"),
        ],
        CoarsePos::Verb => &[
            ("s", ""),
            ("ies", "y"),
            ("es", "e"),
            ("es", ""),
            ("ed", "e"),
            ("ed", ""),
            ("ied", "y"),
            ("ing", "e"),
            ("ing", ""),
        ],
        CoarsePos::Adj => &[
            ("er", ""),
            ("er", "e"),
            ("est", ""),
            ("est", "e"),
            ("ier", "y"),
            ("iest", "y"),
        ],
        CoarsePos::Adv => &[
            ("ly", ""),
            ("ily", "y"),
            ("ically", "ic"),
            ("bly", "ble"),
            ("er", ""),
            ("er", "e"),
            ("est", ""),
            ("est", "e"),
        ],
        CoarsePos::Other => &[],
    }
}

/// Heuristic base form when the predicate confirmed nothing.
///
/// Words of three letters or fewer are never stripped.
fn guess(word: &str, pos: CoarsePos) -> Option<String> {
    if word.len() <= 3 || !word.is_ascii() {
        return None;
    }
    match pos {
        CoarsePos::Noun => guess_noun(word),
        CoarsePos::Verb => guess_verb(word),
        CoarsePos::Adj => guess_comparative(word),
        CoarsePos::Adv => guess_adverb(word).or_else(|| guess_comparative(word)),
        CoarsePos::Other => None,
    }
}

fn guess_noun(word: &str) -> Option<String> {
    if let Some(stem) = word.strip_suffix("ies")
        && stem.len() >= 2
    {
        return Some(format!("{stem}y"));
    }
    for sibilant in ["sses", "ches", "shes", "xes", "zes"] {
        if word.ends_with(sibilant) {
            return Some(word[..word.len() - 2].to_string());
        }
    }
    if word.ends_with('s') && !["ss", "us", "is"].iter().any(|end| word.ends_with(end)) {
        return Some(word[..word.len() - 1].to_string());
    }
    None
}

fn guess_verb(word: &str) -> Option<String> {
    if let Some(stem) = word.strip_suffix("ies").or_else(|| word.strip_suffix("ied"))
        && stem.len() >= 2
    {
        return Some(format!("{stem}y"));
    }
    if let Some(stem) = word.strip_suffix("ing") {
        return has_vowel(stem).then(|| restore_stem(stem));
    }
    if word.ends_with("eed") {
        return None;
    }
    if let Some(stem) = word.strip_suffix("ed") {
        return has_vowel(stem).then(|| restore_stem(stem));
    }
    if let Some(stem) = word.strip_suffix("es")
        && ["ch", "sh", "ss", "x", "z", "o"].iter().any(|end| stem.ends_with(end))
    {
        return Some(stem.to_string());
    }
    if word.ends_with('s') && !["ss", "us", "is"].iter().any(|end| word.ends_with(end)) {
        return Some(word[..word.len() - 1].to_string());
    }
    None
}

fn guess_comparative(word: &str) -> Option<String> {
    if let Some(stem) = word.strip_suffix("iest").or_else(|| word.strip_suffix("ier"))
        && stem.len() >= 2
    {
        return Some(format!("{stem}y"));
    }
    let stem = word
        .strip_suffix("est")
        .or_else(|| word.strip_suffix("er"))?;
    if stem.len() < 3 || !has_vowel(stem) {
        return None;
    }
    Some(undouble(stem).unwrap_or(stem).to_string())
}

fn guess_adverb(word: &str) -> Option<String> {
    if let Some(stem) = word.strip_suffix("ically") {
        return Some(format!("{stem}ic"));
    }
    if let Some(stem) = word.strip_suffix("ily")
        && stem.len() >= 2
    {
        return Some(format!("{stem}y"));
    }
    if let Some(stem) = word.strip_suffix("bly") {
        return Some(format!("{stem}ble"));
    }
    match word.strip_suffix("ly") {
        Some(stem) if stem.len() >= 3 => Some(stem.to_string()),
        _ => None,
    }
}

/// Undo spelling changes made when `-ing`/`-ed` was attached.
fn restore_stem(stem: &str) -> String {
    if let Some(undoubled) = undouble(stem)
        && !matches!(stem.as_bytes()[stem.len() - 1], b'l' | b's' | b'z' | b'f')
    {
        return undoubled.to_string();
    }
    if needs_silent_e(stem) {
        return format!("{stem}e");
    }
    stem.to_string()
}

fn needs_silent_e(stem: &str) -> bool {
    let bytes = stem.as_bytes();
    let Some(&last) = bytes.last() else {
        return false;
    };
    if matches!(last, b'v' | b'u') || (last == b'c' && !stem.ends_with("ck")) {
        return true;
    }
    if ["at", "bl", "iz", "dg"].iter().any(|end| stem.ends_with(end)) && bytes.len() > 3 {
        return true;
    }
    // Short consonant-vowel-consonant stems (`mak`, `hop`) and vowel-consonant
    // pairs (`us`) lost a silent e.
    match bytes {
        [c1, v, c2] => {
            is_consonant(*c1)
                && is_vowel(*v)
                && is_consonant(*c2)
                && !matches!(c2, b'w' | b'x' | b'y')
        }
        [v, c] => is_vowel(*v) && is_consonant(*c),
        _ => false,
    }
}

fn is_vowel(b: u8) -> bool {
    matches!(b, b'a' | b'e' | b'i' | b'o' | b'u')
}

fn is_consonant(b: u8) -> bool {
    b.is_ascii_lowercase() && !is_vowel(b)
}

fn has_vowel(stem: &str) -> bool {
    stem.bytes().any(|b| is_vowel(b) || b == b'y')
}
