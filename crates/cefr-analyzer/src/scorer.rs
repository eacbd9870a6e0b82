//! Lexical score, syntax/discourse bonuses and the final CEFR bucket.

use cefr_types::{CefrLevel, DiscourseMetrics, SyntaxMetrics, Token};
use serde::{Deserialize, Serialize};

/// Weights for the bonuses added on top of the lexical score.
///
/// `adjusted = lexical + min(clause_weight × clause_density, bonus_cap)
///                     + min(connective_weight × connective_sophistication, bonus_cap)`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub clause_weight: f64,
    pub connective_weight: f64,
    pub bonus_cap: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            clause_weight: 0.5,
            connective_weight: 0.5,
            bonus_cap: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Score {
    pub lexical: f64,
    pub adjusted: f64,
    pub level: CefrLevel,
}

/// Mean ordinal (A1 = 1 … C2 = 6) over classified tokens; `None` when no
/// token is classified.
pub fn lexical_score<'t>(tokens: impl IntoIterator<Item = &'t Token>) -> Option<f64> {
    let (sum, count) = tokens
        .into_iter()
        .filter_map(|t| t.level.cefr())
        .fold((0u64, 0u64), |(sum, count), level| {
            (sum + u64::from(level.ordinal()), count + 1)
        });
    (count > 0).then(|| sum as f64 / count as f64)
}

pub fn score<'t>(
    tokens: impl IntoIterator<Item = &'t Token>,
    syntax: &SyntaxMetrics,
    discourse: &DiscourseMetrics,
    config: &ScoringConfig,
) -> Score {
    let Some(lexical) = lexical_score(tokens) else {
        return Score {
            lexical: 0.0,
            adjusted: 0.0,
            level: CefrLevel::A1,
        };
    };
    let bonus = |weight: f64, value: f64| (weight * value).min(config.bonus_cap).max(0.0);
    let adjusted = lexical
        + bonus(config.clause_weight, syntax.clause_density)
        + bonus(config.connective_weight, discourse.connective_sophistication);
    Score {
        lexical,
        adjusted,
        level: level_for_score(adjusted),
    }
}

/// Bucket a score: `<1.5` A1, `<2.5` A2, `<3.5` B1, `<4.5` B2, `<5.5` C1,
/// else C2.
pub fn level_for_score(score: f64) -> CefrLevel {
    const BOUNDS: [(f64, CefrLevel); 5] = [
        (1.5, CefrLevel::A1),
        (2.5, CefrLevel::A2),
        (3.5, CefrLevel::B1),
        (4.5, CefrLevel::B2),
        (5.5, CefrLevel::C1),
    ];
    if score.is_nan() {
        return CefrLevel::A1;
    }
    BOUNDS
        .iter()
        .find(|(upper, _)| score < *upper)
        .map_or(CefrLevel::C2, |(_, level)| *level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cefr_types::{CoarsePos, Level};

    fn leveled(levels: &[Option<CefrLevel>]) -> Vec<Token> {
        levels
            .iter()
            .map(|level| {
                let mut token = Token::new("w", "w", CoarsePos::Noun);
                token.level = Level::from(*level);
                token
            })
            .collect()
    }

    #[test]
    fn buckets_use_inclusive_lower_bounds() {
        assert_eq!(level_for_score(0.0), CefrLevel::A1);
        assert_eq!(level_for_score(1.49), CefrLevel::A1);
        assert_eq!(level_for_score(1.5), CefrLevel::A2);
        assert_eq!(level_for_score(2.5), CefrLevel::B1);
        assert_eq!(level_for_score(3.5), CefrLevel::B2);
        assert_eq!(level_for_score(4.5), CefrLevel::C1);
        assert_eq!(level_for_score(5.5), CefrLevel::C2);
        assert_eq!(level_for_score(9.0), CefrLevel::C2);
        assert_eq!(level_for_score(f64::NAN), CefrLevel::A1);
    }

    #[test]
    fn unknown_tokens_do_not_count() {
        let tokens = leveled(&[Some(CefrLevel::A1), None, Some(CefrLevel::B1), None]);
        assert_eq!(lexical_score(&tokens), Some(2.0));
        assert_eq!(lexical_score(&leveled(&[None, None])), None);
    }

    #[test]
    fn long_documents_average_exactly() {
        let tokens = leveled(&[Some(CefrLevel::A1), Some(CefrLevel::C2), None]);
        let long = tokens.iter().cycle().take(3 * 2_000_000);
        assert_eq!(lexical_score(long), Some(3.5));
    }

    #[test]
    fn no_classified_tokens_scores_zero() {
        let syntax = SyntaxMetrics {
            clause_density: 3.0,
            ..SyntaxMetrics::default()
        };
        let result = score(
            &leveled(&[None]),
            &syntax,
            &DiscourseMetrics::default(),
            &ScoringConfig::default(),
        );
        assert_eq!(result.lexical, 0.0);
        assert_eq!(result.adjusted, 0.0);
        assert_eq!(result.level, CefrLevel::A1);
    }

    #[test]
    fn bonuses_are_capped() {
        let tokens = leveled(&[Some(CefrLevel::B1)]);
        let syntax = SyntaxMetrics {
            clause_density: 10.0,
            ..SyntaxMetrics::default()
        };
        let discourse = DiscourseMetrics {
            connective_sophistication: 0.5,
            ..DiscourseMetrics::default()
        };
        let result = score(&tokens, &syntax, &discourse, &ScoringConfig::default());
        assert_eq!(result.lexical, 3.0);
        assert_eq!(result.adjusted, 3.0 + 1.0 + 0.25);
        assert_eq!(result.level, CefrLevel::B2);
    }

    #[test]
    fn harder_vocabulary_never_scores_lower() {
        let syntax = SyntaxMetrics::default();
        let discourse = DiscourseMetrics::default();
        let config = ScoringConfig::default();
        let mut previous = 0.0;
        for level in CefrLevel::ALL {
            let tokens = leveled(&[Some(CefrLevel::A1), Some(level)]);
            let result = score(&tokens, &syntax, &discourse, &config);
            assert!(result.adjusted >= previous);
            previous = result.adjusted;
        }
    }
}
