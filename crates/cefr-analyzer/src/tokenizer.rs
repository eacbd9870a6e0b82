//! Sentence splitting and word tokenization.

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z'\u{2019}]+").expect("word pattern is valid"));

/// Lowercased, without the trailing period.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "inc", "ltd",
    "co", "mt", "approx", "dept", "fig", "gen", "capt", "col", "lt", "sgt", "rev",
];

/// Punctuation seen inside one sentence.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PunctuationCounts {
    pub commas: usize,
    pub semicolons: usize,
    pub colons: usize,
    pub dashes: usize,
}

impl PunctuationCounts {
    fn scan(text: &str) -> Self {
        let mut counts = Self::default();
        let chars: Vec<char> = text.chars().collect();
        for (i, &c) in chars.iter().enumerate() {
            match c {
                ',' => counts.commas += 1,
                ';' => counts.semicolons += 1,
                ':' => counts.colons += 1,
                '\u{2014}' | '\u{2013}' => counts.dashes += 1,
                '-' => {
                    // Hyphens inside words (`well-known`) are not dashes.
                    let joined = i > 0
                        && i + 1 < chars.len()
                        && chars[i - 1].is_alphanumeric()
                        && chars[i + 1].is_alphanumeric();
                    if !joined {
                        counts.dashes += 1;
                    }
                }
                _ => {}
            }
        }
        counts
    }

    /// Marks that deepen the nesting estimate.
    pub fn depth_marks(&self) -> usize {
        self.commas + self.semicolons + self.colons + self.dashes
    }
}

/// One sentence's words in reading order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Sentence {
    pub words: Vec<String>,
    pub punctuation: PunctuationCounts,
}

/// Split `text` into sentences of word tokens. Sentences without words are
/// dropped, so empty or punctuation-only input yields nothing.
pub fn tokenize(text: &str) -> Vec<Sentence> {
    split_sentences(text)
        .into_iter()
        .filter_map(|span| {
            let words = words(span);
            (!words.is_empty()).then(|| Sentence {
                words,
                punctuation: PunctuationCounts::scan(span),
            })
        })
        .collect()
}

/// Maximal runs of letters and apostrophes, with edge apostrophes trimmed.
pub fn words(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .filter_map(|m| {
            let word = m.as_str().replace('\u{2019}', "'");
            let trimmed = word.trim_matches('\'');
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}

/// Raw sentence spans. A span ends after a run of `.`, `?` or `!` plus any
/// closing quotes or brackets that follow it.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut spans = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if !is_terminator(c) || (c == '.' && !ends_sentence(text, &chars, i)) {
            i += 1;
            continue;
        }

        let mut end = i + 1;
        while end < chars.len() && (is_terminator(chars[end].1) || is_closer(chars[end].1)) {
            end += 1;
        }
        let end_byte = chars.get(end).map_or(text.len(), |&(b, _)| b);
        debug_assert!(end_byte > pos);
        spans.push(&text[start..end_byte]);
        start = end_byte;
        i = end;
    }

    if start < text.len() {
        spans.push(&text[start..]);
    }
    spans
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '?' | '!')
}

fn is_closer(c: char) -> bool {
    matches!(
        c,
        '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}' | '\u{00BB}'
    )
}

/// Whether the period at `chars[i]` closes a sentence.
fn ends_sentence(text: &str, chars: &[(usize, char)], i: usize) -> bool {
    // `3.5`, `e.g`, `U.S`: a period glued to the next character never ends one.
    if chars.get(i + 1).is_some_and(|&(_, next)| next.is_alphanumeric()) {
        return false;
    }

    let mut j = i;
    while j > 0 && (chars[j - 1].1.is_alphabetic() || chars[j - 1].1 == '.') {
        j -= 1;
    }
    let preceding = text[chars[j].0..chars[i].0].to_lowercase();
    !ABBREVIATIONS.contains(&preceding.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence_words(text: &str) -> Vec<Vec<String>> {
        tokenize(text).into_iter().map(|s| s.words).collect()
    }

    #[test]
    fn splits_on_terminators_and_keeps_closers() {
        let spans = split_sentences("He said \"Stop!\" Then he left... Why?");
        assert_eq!(spans, vec!["He said \"Stop!\"", " Then he left...", " Why?"]);
    }

    #[test]
    fn abbreviations_and_decimals_do_not_split() {
        let sentences = sentence_words("Dr. Smith paid 3.5 dollars, e.g. to Mr. Jones. It rained.");
        assert_eq!(sentences.len(), 2);
        assert_eq!(
            sentences[0],
            vec!["Dr", "Smith", "paid", "dollars", "e", "g", "to", "Mr", "Jones"]
        );
    }

    #[test]
    fn trims_edge_apostrophes_and_keeps_inner_ones() {
        assert_eq!(
            words("'Twas the dogs' bone; don't \u{2019}quote\u{2019}"),
            vec!["Twas", "the", "dogs", "bone", "don't", "quote"]
        );
    }

    #[test]
    fn drops_sentences_without_words() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("... 42 !!! ?").is_empty());
        assert_eq!(tokenize("Hi. 42. Bye").len(), 2);
    }

    #[test]
    fn counts_punctuation_but_not_hyphens() {
        let text = "A well-known dog, which barked; loudly: yes \u{2014} no - maybe.";
        let sentence = &tokenize(text)[0];
        assert_eq!(
            sentence.punctuation,
            PunctuationCounts {
                commas: 1,
                semicolons: 1,
                colons: 1,
                dashes: 2,
            }
        );
        assert_eq!(sentence.punctuation.depth_marks(), 5);
    }
}
