//! Sector detection.
//!
//! Each sector carries three keyword classes: compliance terms, specialised
//! services and sector urgency words. The same [`SectorKnowledge`] feeds the
//! persona's sector block, so keywords keep their display casing here and
//! are folded only when the scorer is built.

use serde::{Deserialize, Serialize};

use super::lexicon::{Lexicon, TermGroup};
use crate::types::{Sector, SectorResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorKnowledge {
    pub sector: Sector,
    pub compliance: Vec<String>,
    pub services: Vec<String>,
    pub urgency_keywords: Vec<String>,
}

impl SectorKnowledge {
    fn new(sector: Sector, compliance: &[&str], services: &[&str], urgency: &[&str]) -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            sector,
            compliance: owned(compliance),
            services: owned(services),
            urgency_keywords: owned(urgency),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorConfig {
    pub compliance_weight: f64,
    pub services_weight: f64,
    pub urgency_weight: f64,
    /// Declaration order is the tie-break order.
    pub knowledge: Vec<SectorKnowledge>,
}

impl Default for SectorConfig {
    fn default() -> Self {
        Self {
            compliance_weight: 3.0,
            services_weight: 2.0,
            urgency_weight: 4.0,
            knowledge: vec![
                SectorKnowledge::new(
                    Sector::Medical,
                    &["GDPR sanitario", "Privacy pazienti", "Sicurezza dati clinici"],
                    &["Gestione cartelle cliniche", "Backup sicuro", "Telemedicina"],
                    &["paziente", "emergenza sanitaria", "dati clinici"],
                ),
                SectorKnowledge::new(
                    Sector::Legal,
                    &["GDPR legale", "Riservatezza", "Sicurezza documenti"],
                    &["Archiviazione sicura", "Backup legale", "Firma digitale"],
                    &["causa", "scadenza", "tribunale", "documenti legali"],
                ),
                SectorKnowledge::new(
                    Sector::General,
                    &["GDPR generale", "Sicurezza aziendale"],
                    &["Assistenza generale", "Manutenzione", "Consulenza"],
                    &["business", "produzione", "vendite"],
                ),
            ],
        }
    }
}

impl SectorConfig {
    /// Knowledge for `sector`, falling back to the general entry.
    pub fn knowledge_for(&self, sector: Sector) -> Option<&SectorKnowledge> {
        self.knowledge
            .iter()
            .find(|k| k.sector == sector)
            .or_else(|| self.knowledge.iter().find(|k| k.sector == Sector::General))
    }
}

#[derive(Debug, Clone)]
pub struct SectorScorer {
    lexicon: Lexicon<Sector>,
}

impl SectorScorer {
    pub fn new(config: &SectorConfig) -> Self {
        let lexicon = config.knowledge.iter().fold(Lexicon::new(), |lex, k| {
            lex.category(
                k.sector,
                vec![
                    TermGroup::new(config.compliance_weight, &k.compliance),
                    TermGroup::new(config.services_weight, &k.services),
                    TermGroup::new(config.urgency_weight, &k.urgency_keywords),
                ],
            )
        });
        Self { lexicon }
    }

    /// Highest-scoring sector; `General` with zero confidence when nothing matches.
    pub fn score(&self, folded: &str) -> SectorResult {
        let scores = self.lexicon.score(folded);
        let (sector, confidence) = scores.winner().unwrap_or((Sector::General, 0.0));
        SectorResult {
            sector,
            confidence,
            scores,
        }
    }
}

impl Default for SectorScorer {
    fn default() -> Self {
        Self::new(&SectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_apply_per_keyword_class() {
        let result = SectorScorer::default().score("telemedicina e gdpr sanitario per ogni paziente");
        // services 2 + compliance 3 + urgency 4
        assert_eq!(result.scores.get(Sector::Medical), 9.0);
        assert_eq!(result.sector, Sector::Medical);
        assert_eq!(result.confidence, 9.0);
    }

    #[test]
    fn legal_wins_on_legal_terms() {
        let result = SectorScorer::default().score("scadenza in tribunale, serve la firma digitale");
        assert_eq!(result.sector, Sector::Legal);
        assert_eq!(result.confidence, 10.0);
    }

    #[test]
    fn no_match_defaults_to_general() {
        let result = SectorScorer::default().score("buongiorno");
        assert_eq!(result.sector, Sector::General);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.scores.len(), 3);
    }

    #[test]
    fn tie_goes_to_first_declared_sector() {
        // "dati clinici" (medical urgency, 4) vs "causa" (legal urgency, 4)
        let result = SectorScorer::default().score("dati clinici persi a causa del guasto");
        assert_eq!(result.scores.get(Sector::Medical), 4.0);
        assert_eq!(result.scores.get(Sector::Legal), 4.0);
        assert_eq!(result.sector, Sector::Medical);
    }

    #[test]
    fn knowledge_lookup_falls_back_to_general() {
        let mut config = SectorConfig::default();
        config.knowledge.retain(|k| k.sector != Sector::Legal);
        let found = config.knowledge_for(Sector::Legal).unwrap();
        assert_eq!(found.sector, Sector::General);
    }
}
