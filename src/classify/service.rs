//! Service recommendation.

use super::lexicon::{KeywordSet, Lexicon};
use crate::types::{Service, ServiceRecommendation};

pub(crate) fn default_sets() -> Vec<KeywordSet<Service>> {
    vec![
        KeywordSet::new(
            Service::Support,
            &["supporto", "aiuto", "problema", "non funziona", "guasto"],
        ),
        KeywordSet::new(
            Service::Cybersecurity,
            &["sicurezza", "virus", "malware", "hacker", "protezione", "firewall"],
        ),
        KeywordSet::new(
            Service::Cloud,
            &["backup", "cloud", "archiviazione", "migrazione", "disaster recovery"],
        ),
        KeywordSet::new(
            Service::Voip,
            &["telefono", "centralino", "chiamate", "voip", "comunicazione"],
        ),
        KeywordSet::new(
            Service::Medical,
            &["medico", "sanitario", "gdpr sanitario", "cartelle cliniche"],
        ),
        KeywordSet::new(
            Service::Legal,
            &["legale", "avvocato", "studio legale", "documenti legali"],
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct ServiceScorer {
    lexicon: Lexicon<Service>,
}

impl ServiceScorer {
    pub fn new(sets: &[KeywordSet<Service>]) -> Self {
        Self {
            lexicon: Lexicon::from_sets(sets, 1.0),
        }
    }

    /// Best matching service line; generic support when nothing matches.
    pub fn score(&self, folded: &str) -> ServiceRecommendation {
        let scores = self.lexicon.score(folded);
        let (service, confidence) = scores.winner().unwrap_or((Service::Support, 0.0));
        ServiceRecommendation {
            service,
            confidence,
            scores,
        }
    }
}

impl Default for ServiceScorer {
    fn default() -> Self {
        Self::new(&default_sets())
    }
}
