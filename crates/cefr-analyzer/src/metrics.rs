//! Syntax and discourse heuristics over classified sentences.
//!
//! Nothing here builds a parse tree. Clause density and the depth proxy count
//! surface markers; passive detection looks for a be-auxiliary followed by a
//! participle. Every ratio is 0.0 when its denominator is zero.

use std::collections::HashMap;

use cefr_types::{CoarsePos, DiscourseMetrics, Level, SentenceMetrics, SyntaxMetrics, Token};
use once_cell::sync::Lazy;

use crate::tokenizer::PunctuationCounts;

/// Subordinating and coordinating conjunctions plus relative pronouns.
const CLAUSE_MARKERS: &[&str] = &[
    "and", "but", "or", "nor", "yet", "because", "although", "though", "if", "unless", "while",
    "whereas", "whether", "since", "after", "before", "until", "when", "whenever", "where",
    "wherever", "who", "whom", "whose", "which", "that",
];

/// Discourse connectives weighted by how advanced they read, 0..=1.
const CONNECTIVES: &[(&str, f64)] = &[
    ("and", 0.1),
    ("but", 0.2),
    ("or", 0.1),
    ("so", 0.2),
    ("because", 0.2),
    ("then", 0.2),
    ("also", 0.2),
    ("first", 0.3),
    ("finally", 0.3),
    ("so that", 0.4),
    ("for example", 0.4),
    ("for instance", 0.5),
    ("however", 0.5),
    ("therefore", 0.5),
    ("although", 0.5),
    ("though", 0.5),
    ("even though", 0.5),
    ("unless", 0.5),
    ("instead", 0.5),
    ("meanwhile", 0.5),
    ("otherwise", 0.5),
    ("in fact", 0.5),
    ("as a result", 0.5),
    ("in addition", 0.6),
    ("moreover", 0.6),
    ("furthermore", 0.6),
    ("whereas", 0.6),
    ("consequently", 0.6),
    ("on the other hand", 0.6),
    ("in contrast", 0.6),
    ("despite", 0.6),
    ("thus", 0.7),
    ("in spite of", 0.7),
    ("by contrast", 0.7),
    ("hence", 0.8),
    ("accordingly", 0.8),
    ("conversely", 0.8),
    ("nevertheless", 0.9),
    ("nonetheless", 0.9),
    ("whereby", 0.9),
    ("henceforth", 0.9),
    ("notwithstanding", 1.0),
    ("albeit", 1.0),
    ("insofar as", 1.0),
];

const MAX_CONNECTIVE_WORDS: usize = 4;

static CONNECTIVE_WEIGHTS: Lazy<HashMap<&'static str, f64>> =
    Lazy::new(|| CONNECTIVES.iter().copied().collect());

const ABSTRACT_SUFFIXES: &[&str] = &[
    "tion", "sion", "ment", "ness", "ity", "ism", "ance", "ence", "hood", "ship",
];

const IRREGULAR_PARTICIPLES: &[&str] = &[
    "known", "given", "taken", "written", "made", "done", "seen", "found", "built", "sold", "told",
    "held", "kept", "left", "lost", "paid", "sent", "spent", "thought", "brought", "bought",
    "caught", "taught", "put", "set", "cut", "read", "shown", "born", "chosen", "driven", "eaten",
    "forgotten", "broken", "spoken", "stolen", "hidden", "beaten", "drawn", "grown", "thrown",
    "worn", "torn", "understood", "hit", "hurt", "won", "heard", "felt", "meant", "led", "fed",
];

/// One sentence after tagging, lemmatization, phrase grouping and
/// classification.
#[derive(Clone, Debug, Default)]
pub struct AnalyzedSentence {
    pub tokens: Vec<Token>,
    /// Word tokens before phrase grouping.
    pub word_count: usize,
    pub punctuation: PunctuationCounts,
}

impl AnalyzedSentence {
    /// Lowercased words in order, with phrase tokens split back apart.
    fn words(&self) -> Vec<String> {
        self.tokens
            .iter()
            .flat_map(|t| t.text.split_whitespace())
            .map(str::to_lowercase)
            .collect()
    }
}

pub fn clause_markers(sentence: &AnalyzedSentence) -> usize {
    sentence
        .words()
        .iter()
        .filter(|w| CLAUSE_MARKERS.contains(&w.as_str()))
        .count()
}

pub fn sentence_metrics(sentence: &AnalyzedSentence) -> SentenceMetrics {
    let clause_count = clause_markers(sentence);
    SentenceMetrics {
        token_count: sentence.word_count,
        clause_count,
        tree_depth_proxy: 1.0 + 0.5 * (sentence.punctuation.depth_marks() + clause_count) as f64,
    }
}

/// A be-auxiliary followed, optionally after one adverb, by a past participle.
pub fn is_passive(sentence: &AnalyzedSentence) -> bool {
    let tokens = &sentence.tokens;
    tokens.iter().enumerate().any(|(i, token)| {
        if token.is_phrase || token.pos != CoarsePos::Verb || token.lemma != "be" {
            return false;
        }
        let mut next = i + 1;
        if tokens.get(next).is_some_and(|t| t.pos == CoarsePos::Adv) {
            next += 1;
        }
        tokens.get(next).is_some_and(is_participle)
    })
}

fn is_participle(token: &Token) -> bool {
    if token.is_phrase || token.pos == CoarsePos::Other {
        return false;
    }
    let word = token.text.to_lowercase();
    (word.len() > 3 && word.ends_with("ed"))
        || IRREGULAR_PARTICIPLES.contains(&word.as_str())
        || (token.pos == CoarsePos::Verb && word.len() > 4 && word.ends_with("en"))
}

pub fn compute_syntax(sentences: &[AnalyzedSentence]) -> SyntaxMetrics {
    if sentences.is_empty() {
        return SyntaxMetrics::default();
    }
    let count = sentences.len() as f64;
    let per_sentence: Vec<SentenceMetrics> = sentences.iter().map(sentence_metrics).collect();
    let markers: usize = per_sentence.iter().map(|m| m.clause_count).sum();
    let depth: f64 = per_sentence.iter().map(|m| m.tree_depth_proxy).sum();
    let passive = sentences.iter().filter(|s| is_passive(s)).count();

    SyntaxMetrics {
        clause_density: markers as f64 / count,
        avg_tree_depth: depth / count,
        passive_ratio: passive as f64 / count,
    }
}

/// Weights of the connectives in a sentence, longest match first.
pub fn connective_weights(sentence: &AnalyzedSentence) -> Vec<f64> {
    let words = sentence.words();
    let mut weights = Vec::new();
    let mut i = 0;
    while i < words.len() {
        let longest = (1..=MAX_CONNECTIVE_WORDS.min(words.len() - i))
            .rev()
            .find_map(|len| {
                let key = words[i..i + len].join(" ");
                CONNECTIVE_WEIGHTS.get(key.as_str()).map(|w| (len, *w))
            });
        match longest {
            Some((len, weight)) => {
                weights.push(weight);
                i += len;
            }
            None => i += 1,
        }
    }
    weights
}

pub fn compute_discourse(sentences: &[AnalyzedSentence]) -> DiscourseMetrics {
    let tokens: Vec<&Token> = sentences.iter().flat_map(|s| &s.tokens).collect();
    if tokens.is_empty() {
        return DiscourseMetrics::default();
    }

    let nouns: Vec<&&Token> = tokens.iter().filter(|t| t.pos == CoarsePos::Noun).collect();
    let abstract_nouns = nouns.iter().filter(|t| is_abstract_noun(t)).count();

    let weights: Vec<f64> = sentences.iter().flat_map(connective_weights).collect();
    let entities = tokens.iter().filter(|t| is_entity(t)).count();

    DiscourseMetrics {
        abstract_noun_ratio: ratio(abstract_nouns, nouns.len()),
        connective_sophistication: if weights.is_empty() {
            0.0
        } else {
            weights.iter().sum::<f64>() / weights.len() as f64
        },
        entity_density: ratio(entities, tokens.len()),
    }
}

fn is_abstract_noun(token: &Token) -> bool {
    token.is_abstract
        || (token.level == Level::Unknown
            && ABSTRACT_SUFFIXES
                .iter()
                .any(|s| token.lemma.len() > s.len() + 2 && token.lemma.ends_with(s)))
}

/// Capitalised, not sentence-initial, and absent from the lexicon.
fn is_entity(token: &Token) -> bool {
    !token.is_phrase
        && !token.sentence_initial
        && token.level == Level::Unknown
        && token.text.chars().next().is_some_and(char::is_uppercase)
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
