use std::collections::{BTreeMap, BTreeSet, HashSet};

use cefr_types::{Level, LevelShare, Token, VocabularyProfile};

/// Upper bound on `sample_unknown_words`.
pub const UNKNOWN_SAMPLE_LIMIT: usize = 50;

/// Per-level counts, shares and an alphabetical sample of unknown lemmas.
pub fn vocabulary_profile(tokens: &[Token]) -> VocabularyProfile {
    let total = tokens.len();
    let mut counts: BTreeMap<Level, usize> = BTreeMap::new();
    let mut unique: BTreeMap<Level, HashSet<String>> = BTreeMap::new();
    let mut unknown_words: BTreeSet<String> = BTreeSet::new();

    for token in tokens {
        let lemma = token.lemma.to_lowercase();
        *counts.entry(token.level).or_default() += 1;
        if token.level == Level::Unknown {
            unknown_words.insert(lemma.clone());
        }
        unique.entry(token.level).or_default().insert(lemma);
    }

    let distribution = Level::ALL
        .into_iter()
        .map(|level| {
            let count = counts.get(&level).copied().unwrap_or(0);
            let share = LevelShare {
                count,
                percentage: percentage(count, total),
                unique_words: unique.get(&level).map_or(0, HashSet::len),
            };
            (level, share)
        })
        .collect();

    let unknown_word_count = counts.get(&Level::Unknown).copied().unwrap_or(0);
    VocabularyProfile {
        known_word_count: total - unknown_word_count,
        unknown_word_count,
        unknown_words_ratio: if total == 0 {
            0.0
        } else {
            unknown_word_count as f64 / total as f64
        },
        distribution,
        sample_unknown_words: unknown_words.into_iter().take(UNKNOWN_SAMPLE_LIMIT).collect(),
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 10_000.0 / total as f64).round() / 100.0
}
