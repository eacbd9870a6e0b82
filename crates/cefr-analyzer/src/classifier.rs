//! Map tokens to CEFR levels and merge multi-word lexicon phrases.

use cefr_types::{CefrLevel, CoarsePos, Level, Token};

use crate::lexicon::{LexiconStore, Phrase};

pub struct Classifier<'a> {
    lexicon: &'a LexiconStore,
}

impl<'a> Classifier<'a> {
    pub fn new(lexicon: &'a LexiconStore) -> Self {
        Self { lexicon }
    }

    pub fn classify(&self, token: &Token) -> Level {
        self.resolve(token).map(|(level, _)| level).into()
    }

    /// Set `level` and `is_abstract` on every token.
    pub fn classify_all(&self, tokens: &mut [Token]) {
        for token in tokens {
            let (level, is_abstract) = match self.resolve(token) {
                Some((level, is_abstract)) => (Level::Cefr(level), is_abstract),
                None => (Level::Unknown, false),
            };
            token.level = level;
            token.is_abstract = is_abstract;
        }
    }

    fn resolve(&self, token: &Token) -> Option<(CefrLevel, bool)> {
        if token.is_phrase {
            return self.resolve_phrase(token);
        }
        let lemma = token.lemma.to_lowercase();
        self.lexicon
            .lookup(&lemma, token.pos)
            .or_else(|| self.lexicon.lookup(&lemma, CoarsePos::Other))
            .or_else(|| {
                let surface = token.text.to_lowercase();
                self.lexicon.lookup(&surface, token.pos).or_else(|| {
                    // `it's` → `it`, `we'd` → `we`.
                    let (head, _) = surface.split_once('\'')?;
                    self.lexicon.lookup(head, CoarsePos::Other)
                })
            })
    }

    /// Space-joined key, then hyphen-joined key, then the hardest constituent.
    fn resolve_phrase(&self, token: &Token) -> Option<(CefrLevel, bool)> {
        let lemma = token.lemma.to_lowercase();
        let words: Vec<&str> = lemma.split([' ', '-']).filter(|w| !w.is_empty()).collect();
        self.lexicon
            .lookup(&words.join(" "), token.pos)
            .or_else(|| self.lexicon.lookup(&words.join("-"), token.pos))
            .or_else(|| {
                words
                    .iter()
                    .filter_map(|word| self.lexicon.lookup(word, CoarsePos::Other))
                    .map(|(level, _)| level)
                    .max()
                    .map(|level| (level, false))
            })
    }

    /// Merge the longest lexicon phrase starting at each position into one
    /// `is_phrase` token. Expects one sentence of lemmatized tokens.
    pub fn group_phrases(&self, tokens: Vec<Token>) -> Vec<Token> {
        let mut merges: Vec<(usize, &Phrase)> = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            match self.longest_phrase_at(&tokens[i..]) {
                Some(phrase) => {
                    merges.push((i, phrase));
                    i += phrase.words.len();
                }
                None => i += 1,
            }
        }
        if merges.is_empty() {
            return tokens;
        }

        let mut out = Vec::with_capacity(tokens.len());
        let mut iter = tokens.into_iter();
        let mut consumed = 0;
        for (start, phrase) in merges {
            out.extend(iter.by_ref().take(start - consumed));
            let span: Vec<Token> = iter.by_ref().take(phrase.words.len()).collect();
            consumed = start + span.len();
            out.push(merge(span, phrase));
        }
        out.extend(iter);
        out
    }

    fn longest_phrase_at(&self, window: &[Token]) -> Option<&'a Phrase> {
        let first = window.first()?;
        let lemma = first.lemma.to_lowercase();
        let surface = first.text.to_lowercase();
        let by_surface = if surface != lemma {
            self.lexicon.phrases_starting_with(&surface)
        } else {
            &[]
        };

        self.lexicon
            .phrases_starting_with(&lemma)
            .iter()
            .chain(by_surface)
            .filter(|phrase| {
                phrase.words.len() <= window.len()
                    && phrase
                        .words
                        .iter()
                        .zip(window)
                        .all(|(word, token)| token_matches(word, token))
            })
            .max_by_key(|phrase| phrase.words.len())
    }
}

fn token_matches(word: &str, token: &Token) -> bool {
    token.lemma.eq_ignore_ascii_case(word) || token.text.eq_ignore_ascii_case(word)
}

fn merge(span: Vec<Token>, phrase: &Phrase) -> Token {
    let sentence_initial = span.first().is_some_and(|t| t.sentence_initial);
    let text = span
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let mut token = Token::new(text, phrase.key.clone(), phrase.pos);
    token.is_phrase = true;
    token.sentence_initial = sentence_initial;
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> LexiconStore {
        LexiconStore::embedded().expect("lexicon")
    }

    fn token(text: &str, lemma: &str, pos: CoarsePos) -> Token {
        Token::new(text, lemma, pos)
    }

    #[test]
    fn falls_back_from_lemma_to_surface() {
        let lex = lexicon();
        let classifier = Classifier::new(&lex);
        assert_eq!(
            classifier.classify(&token("ran", "run", CoarsePos::Verb)),
            Level::Cefr(CefrLevel::A1)
        );
        // Lemma misses, surface hits.
        assert_eq!(
            classifier.classify(&token("data", "datum", CoarsePos::Noun)),
            Level::Cefr(CefrLevel::B2)
        );
        assert_eq!(
            classifier.classify(&token("It's", "it's", CoarsePos::Other)),
            Level::Cefr(CefrLevel::A1)
        );
        assert_eq!(
            classifier.classify(&token("florp", "florp", CoarsePos::Noun)),
            Level::Unknown
        );
    }

    #[test]
    fn records_abstractness() {
        let lex = lexicon();
        let mut tokens = vec![
            token("freedom", "freedom", CoarsePos::Noun),
            token("cat", "cat", CoarsePos::Noun),
        ];
        Classifier::new(&lex).classify_all(&mut tokens);
        assert!(tokens[0].is_abstract);
        assert!(!tokens[1].is_abstract);
        assert_eq!(tokens[0].level, Level::Cefr(CefrLevel::B1));
    }

    #[test]
    fn merges_longest_phrase_by_lemma() {
        let lex = lexicon();
        let classifier = Classifier::new(&lex);
        let tokens = vec![
            token("We", "we", CoarsePos::Other),
            token("looked", "look", CoarsePos::Verb),
            token("forward", "forward", CoarsePos::Adv),
            token("to", "to", CoarsePos::Other),
            token("it", "it", CoarsePos::Other),
        ];
        let grouped = classifier.group_phrases(tokens);
        assert_eq!(grouped.len(), 3);
        assert!(grouped[1].is_phrase);
        assert_eq!(grouped[1].text, "looked forward to");
        assert_eq!(grouped[1].lemma, "look forward to");
        assert_eq!(grouped[1].pos, CoarsePos::Verb);
        assert_eq!(grouped[2].text, "it");
        assert_eq!(
            classifier.classify(&grouped[1]),
            Level::Cefr(CefrLevel::B1)
        );
    }

    #[test]
    fn hyphenated_phrases_match_split_words() {
        let lex = lexicon();
        let classifier = Classifier::new(&lex);
        let grouped = classifier.group_phrases(vec![
            token("well", "well", CoarsePos::Adv),
            token("known", "know", CoarsePos::Verb),
        ]);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].lemma, "well-known");
        assert_eq!(classifier.classify(&grouped[0]), Level::Cefr(CefrLevel::B1));
    }

    #[test]
    fn unknown_phrase_uses_hardest_constituent() {
        let lex = lexicon();
        let classifier = Classifier::new(&lex);
        let mut phrase = token("cat analysis", "cat analysis", CoarsePos::Noun);
        phrase.is_phrase = true;
        assert_eq!(classifier.classify(&phrase), Level::Cefr(CefrLevel::B2));

        phrase.lemma = "florp blarg".into();
        assert_eq!(classifier.classify(&phrase), Level::Unknown);
    }
}
