//! Sentiment detection over four keyword bags.

use super::lexicon::{KeywordSet, Lexicon};
use crate::types::{Sentiment, SentimentResult};

pub(crate) fn default_sets() -> Vec<KeywordSet<Sentiment>> {
    vec![
        KeywordSet::new(
            Sentiment::Positive,
            &["grazie", "perfetto", "ottimo", "bene", "soddisfatto", "risolto"],
        ),
        KeywordSet::new(
            Sentiment::Negative,
            &["problema", "male", "sbagliato", "insoddisfatto", "arrabbiato", "frustrato"],
        ),
        KeywordSet::new(
            Sentiment::Urgent,
            &["urgente", "subito", "emergenza", "critico", "bloccato"],
        ),
        KeywordSet::new(
            Sentiment::Neutral,
            &["informazione", "preventivo", "consulenza", "domanda"],
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct SentimentScorer {
    lexicon: Lexicon<Sentiment>,
}

impl SentimentScorer {
    pub fn new(sets: &[KeywordSet<Sentiment>]) -> Self {
        Self {
            lexicon: Lexicon::from_sets(sets, 1.0),
        }
    }

    pub fn score(&self, folded: &str) -> SentimentResult {
        let scores = self.lexicon.score(folded);
        let (sentiment, confidence) = scores.winner().unwrap_or((Sentiment::Neutral, 0.0));
        SentimentResult {
            sentiment,
            confidence,
            scores,
        }
    }
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new(&default_sets())
    }
}
