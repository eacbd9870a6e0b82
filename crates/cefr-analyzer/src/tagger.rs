//! Deterministic lookup-and-rules part-of-speech tagger.
//!
//! Each word gets exactly one [`CoarsePos`]:
//! 1. closed-class tables (determiners, pronouns, prepositions, conjunctions
//!    → `Other`; auxiliaries and modals → `Verb`; closed adverbs → `Adv`);
//! 2. open-class candidates the lexicon knows for the surface form or for a
//!    base form the lemmatizer derives under that POS;
//! 3. left-context disambiguation when several candidates remain;
//! 4. suffix heuristics, then `Noun`.

use cefr_morphy::Morphy;
use cefr_types::CoarsePos;

use crate::lexicon::LexiconStore;

pub struct Tagger<'a> {
    lexicon: &'a LexiconStore,
    morphy: &'a Morphy,
}

/// What the previous word implies for the current one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Context {
    None,
    /// After a determiner, possessive or adjective.
    Nominal,
    /// After `to`, an auxiliary/modal or a subject pronoun.
    Verbal,
}

impl<'a> Tagger<'a> {
    pub fn new(lexicon: &'a LexiconStore, morphy: &'a Morphy) -> Self {
        Self { lexicon, morphy }
    }

    /// Tag one sentence.
    pub fn tag(&self, words: &[String]) -> Vec<CoarsePos> {
        let mut tags = Vec::with_capacity(words.len());
        let mut context = Context::None;
        for word in words {
            let lower = word.to_lowercase();
            let pos = closed_class(&lower).unwrap_or_else(|| self.tag_open(&lower, context));
            context = next_context(&lower, pos);
            tags.push(pos);
        }
        tags
    }

    fn tag_open(&self, word: &str, context: Context) -> CoarsePos {
        let candidates = self.candidates(word);
        match candidates.as_slice() {
            [only] => *only,
            [] => by_suffix(word, context),
            several => {
                let preferred: &[CoarsePos] = match context {
                    Context::Nominal => &[CoarsePos::Noun, CoarsePos::Adj],
                    Context::Verbal => &[CoarsePos::Verb],
                    Context::None => &[],
                };
                preferred
                    .iter()
                    .copied()
                    .find(|pos| several.contains(pos))
                    .unwrap_or(several[0])
            }
        }
    }

    /// Open classes the lexicon confirms, surface matches first.
    fn candidates(&self, word: &str) -> Vec<CoarsePos> {
        let base = word.strip_suffix("'s").unwrap_or(word);
        let mut direct = Vec::new();
        let mut derived = Vec::new();
        for pos in CoarsePos::OPEN {
            if self.lexicon.has_pos(base, pos) {
                direct.push(pos);
            } else if !self
                .morphy
                .lemmas_for(pos, base, |p, lemma| self.lexicon.has_pos(lemma, p))
                .is_empty()
            {
                derived.push(pos);
            }
        }
        direct.extend(derived);
        direct
    }
}

fn next_context(word: &str, pos: CoarsePos) -> Context {
    if is_determiner(word) || pos == CoarsePos::Adj || word.ends_with("'s") {
        Context::Nominal
    } else if word == "to" || is_auxiliary(word) || is_subject_pronoun(word) {
        Context::Verbal
    } else {
        Context::None
    }
}

fn closed_class(word: &str) -> Option<CoarsePos> {
    if is_auxiliary(word) {
        return Some(CoarsePos::Verb);
    }
    if is_determiner(word) || is_pronoun(word) || is_preposition(word) || is_conjunction(word) {
        return Some(CoarsePos::Other);
    }
    if is_closed_adverb(word) {
        return Some(CoarsePos::Adv);
    }
    // Pronoun contractions: `it's`, `we've`, `they'll`.
    if let Some((head, _)) = word.split_once('\'')
        && (is_pronoun(head) || matches!(head, "that" | "there" | "what" | "who" | "let"))
    {
        return Some(CoarsePos::Other);
    }
    None
}

fn by_suffix(word: &str, context: Context) -> CoarsePos {
    const NOUN: &[&str] = &[
        "tion", "sion", "ment", "ness", "ity", "ism", "ance", "ence", "hood", "ship", "ist", "er",
        "or",
    ];
    const ADJ: &[&str] = &[
        "ous", "ful", "less", "able", "ible", "ive", "ical", "al", "ic", "ish", "ary",
    ];
    const VERB: &[&str] = &["ize", "ise", "ify", "ate", "ed", "ing", "en"];

    let ends = |suffixes: &[&str]| {
        suffixes
            .iter()
            .any(|s| word.len() > s.len() + 2 && word.ends_with(s))
    };

    if word.ends_with("ly") && word.len() > 4 {
        return CoarsePos::Adv;
    }
    if ends(ADJ) {
        return CoarsePos::Adj;
    }
    if ends(NOUN) {
        return CoarsePos::Noun;
    }
    if ends(VERB) {
        return if context == Context::Nominal {
            CoarsePos::Noun
        } else {
            CoarsePos::Verb
        };
    }
    match context {
        Context::Verbal => CoarsePos::Verb,
        _ => CoarsePos::Noun,
    }
}

fn is_determiner(word: &str) -> bool {
    matches!(
        word,
        "a" | "an"
            | "the"
            | "this"
            | "that"
            | "these"
            | "those"
            | "my"
            | "your"
            | "his"
            | "her"
            | "its"
            | "our"
            | "their"
            | "some"
            | "any"
            | "no"
            | "every"
            | "each"
            | "either"
            | "neither"
            | "much"
            | "many"
            | "few"
            | "several"
            | "all"
            | "both"
            | "another"
            | "other"
            | "such"
    )
}

fn is_subject_pronoun(word: &str) -> bool {
    matches!(word, "i" | "you" | "he" | "she" | "it" | "we" | "they")
}

fn is_pronoun(word: &str) -> bool {
    is_subject_pronoun(word)
        || matches!(
            word,
            "me" | "him"
                | "us"
                | "them"
                | "myself"
                | "yourself"
                | "himself"
                | "herself"
                | "itself"
                | "ourselves"
                | "yourselves"
                | "themselves"
                | "mine"
                | "yours"
                | "hers"
                | "ours"
                | "theirs"
                | "who"
                | "whom"
                | "whose"
                | "which"
                | "what"
                | "someone"
                | "somebody"
                | "something"
                | "anyone"
                | "anybody"
                | "anything"
                | "everyone"
                | "everybody"
                | "everything"
                | "nobody"
                | "nothing"
                | "none"
        )
}

fn is_preposition(word: &str) -> bool {
    matches!(
        word,
        "about"
            | "above"
            | "across"
            | "against"
            | "along"
            | "among"
            | "around"
            | "as"
            | "at"
            | "behind"
            | "below"
            | "beneath"
            | "beside"
            | "between"
            | "beyond"
            | "by"
            | "despite"
            | "during"
            | "except"
            | "for"
            | "from"
            | "in"
            | "inside"
            | "into"
            | "near"
            | "of"
            | "on"
            | "onto"
            | "outside"
            | "through"
            | "throughout"
            | "to"
            | "toward"
            | "towards"
            | "under"
            | "underneath"
            | "upon"
            | "via"
            | "with"
            | "within"
            | "without"
            | "notwithstanding"
    )
}

fn is_conjunction(word: &str) -> bool {
    matches!(
        word,
        "and"
            | "but"
            | "or"
            | "nor"
            | "yet"
            | "so"
            | "because"
            | "although"
            | "though"
            | "if"
            | "unless"
            | "while"
            | "whereas"
            | "whether"
            | "since"
            | "after"
            | "before"
            | "until"
            | "than"
            | "when"
            | "where"
            | "once"
    )
}

fn is_auxiliary(word: &str) -> bool {
    matches!(
        word,
        "be" | "am"
            | "is"
            | "are"
            | "was"
            | "were"
            | "been"
            | "being"
            | "have"
            | "has"
            | "had"
            | "having"
            | "do"
            | "does"
            | "did"
            | "can"
            | "could"
            | "will"
            | "would"
            | "shall"
            | "should"
            | "may"
            | "might"
            | "must"
            | "ought"
            | "isn't"
            | "aren't"
            | "wasn't"
            | "weren't"
            | "don't"
            | "doesn't"
            | "didn't"
            | "haven't"
            | "hasn't"
            | "hadn't"
            | "can't"
            | "cannot"
            | "couldn't"
            | "won't"
            | "wouldn't"
            | "shouldn't"
            | "mustn't"
    )
}

fn is_closed_adverb(word: &str) -> bool {
    matches!(
        word,
        "not"
            | "never"
            | "very"
            | "too"
            | "also"
            | "just"
            | "only"
            | "even"
            | "still"
            | "already"
            | "always"
            | "often"
            | "sometimes"
            | "usually"
            | "here"
            | "there"
            | "now"
            | "then"
            | "soon"
            | "again"
            | "ever"
            | "quite"
            | "rather"
            | "almost"
            | "however"
            | "therefore"
            | "moreover"
            | "furthermore"
            | "nevertheless"
            | "nonetheless"
            | "thus"
            | "hence"
            | "meanwhile"
            | "otherwise"
            | "instead"
            | "indeed"
            | "perhaps"
            | "maybe"
            | "why"
            | "how"
    )
}
