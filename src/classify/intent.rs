//! Intent detection and the emergency phrase flag.
//!
//! Unlike the other scorers, intent is not an argmax: the first intent in
//! declaration order with any keyword present wins.

use super::lexicon::{KeywordSet, Lexicon, TermGroup};
use crate::types::Intent;

pub(crate) fn default_sets() -> Vec<KeywordSet<Intent>> {
    vec![
        KeywordSet::new(
            Intent::GetInfo,
            &["info", "informazioni", "cosa", "come", "quando"],
        ),
        KeywordSet::new(
            Intent::RequestSupport,
            &["aiuto", "supporto", "problema", "assistenza"],
        ),
        KeywordSet::new(Intent::GetQuote, &["preventivo", "prezzo", "costo", "quanto"]),
        KeywordSet::new(
            Intent::Emergency,
            &["emergenza", "urgente", "subito", "immediato"],
        ),
        KeywordSet::new(
            Intent::Contact,
            &["contatto", "telefono", "email", "chiamare"],
        ),
    ]
}

pub(crate) fn default_emergency_keywords() -> Vec<String> {
    [
        "emergenza",
        "emergency",
        "urgente",
        "subito",
        "immediato",
        "bloccato",
        "down",
        "non funziona",
        "hackerato",
        "virus",
        "ransomware",
        "attacco",
        "sicurezza compromessa",
        "dati persi",
        "server down",
        "rete down",
        "email down",
        "sistema compromesso",
    ]
    .iter()
    .map(|k| k.to_string())
    .collect()
}

#[derive(Debug, Clone)]
pub struct IntentDetector {
    lexicon: Lexicon<Intent>,
    emergency: TermGroup,
}

impl IntentDetector {
    pub fn new(sets: &[KeywordSet<Intent>], emergency_keywords: &[String]) -> Self {
        Self {
            lexicon: Lexicon::from_sets(sets, 1.0),
            emergency: TermGroup::new(1.0, emergency_keywords),
        }
    }

    pub fn intent(&self, folded: &str) -> Intent {
        self.lexicon
            .score(folded)
            .iter()
            .find(|(_, score)| *score > 0.0)
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::General)
    }

    pub fn has_emergency_keywords(&self, folded: &str) -> bool {
        self.emergency.matches_any(folded)
    }
}

impl Default for IntentDetector {
    fn default() -> Self {
        Self::new(&default_sets(), &default_emergency_keywords())
    }
}
