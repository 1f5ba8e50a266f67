//! Conversation classification.
//!
//! Pure, synchronous scorers over case-folded text and local time. None of
//! them do I/O or fail: empty input simply scores zero everywhere and
//! yields the defaults (low urgency, general sector, neutral sentiment,
//! support service, general intent).
//!
//! # Lexicons
//!
//! Keyword data lives in [`ClassifierConfig`] and can be replaced from the
//! `[classifier]` section of the config file. Keywords are matched as
//! substrings and each one counts at most once per message.
//!
//! # Tie-breaking
//!
//! When categories tie, the one declared first in configuration wins.
//! Compliance copy downstream keys off the detected sector, so the order
//! is kept stable rather than randomised.

mod intent;
mod lexicon;
mod sector;
mod sentiment;
mod service;
mod urgency;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use intent::IntentDetector;
pub use lexicon::{fold, KeywordSet, Lexicon, TermGroup};
pub use sector::{SectorConfig, SectorKnowledge, SectorScorer};
pub use sentiment::SentimentScorer;
pub use service::ServiceScorer;
pub use urgency::{BusinessHours, UrgencyConfig, UrgencyScorer, UrgencyThresholds, UrgencyTier};

use crate::types::{
    Intent, MessageAnalysis, SectorResult, Sentiment, SentimentResult, Service,
    ServiceRecommendation, UrgencyResult,
};

/// Keyword data and weights for every scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub urgency: UrgencyConfig,
    pub sectors: SectorConfig,
    pub sentiment: Vec<KeywordSet<Sentiment>>,
    pub services: Vec<KeywordSet<Service>>,
    pub intents: Vec<KeywordSet<Intent>>,
    pub emergency_keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            urgency: UrgencyConfig::default(),
            sectors: SectorConfig::default(),
            sentiment: sentiment::default_sets(),
            services: service::default_sets(),
            intents: intent::default_sets(),
            emergency_keywords: intent::default_emergency_keywords(),
        }
    }
}

/// All scorers, compiled once from configuration.
#[derive(Debug, Clone)]
pub struct Classifier {
    urgency: UrgencyScorer,
    sector: SectorScorer,
    sentiment: SentimentScorer,
    service: ServiceScorer,
    intent: IntentDetector,
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            urgency: UrgencyScorer::new(&config.urgency),
            sector: SectorScorer::new(&config.sectors),
            sentiment: SentimentScorer::new(&config.sentiment),
            service: ServiceScorer::new(&config.services),
            intent: IntentDetector::new(&config.intents, &config.emergency_keywords),
        }
    }

    pub fn urgency(&self, text: &str, at: NaiveDateTime) -> UrgencyResult {
        self.urgency.score(&fold(text), at)
    }

    pub fn sector(&self, text: &str) -> SectorResult {
        self.sector.score(&fold(text))
    }

    pub fn sentiment(&self, text: &str) -> SentimentResult {
        self.sentiment.score(&fold(text))
    }

    pub fn service(&self, text: &str) -> ServiceRecommendation {
        self.service.score(&fold(text))
    }

    pub fn intent(&self, text: &str) -> Intent {
        self.intent.intent(&fold(text))
    }

    /// Run every scorer over one message received at local time `at`.
    pub fn analyze(&self, text: &str, at: NaiveDateTime) -> MessageAnalysis {
        let folded = fold(text);
        let analysis = MessageAnalysis {
            urgency: self.urgency.score(&folded, at),
            sector: self.sector.score(&folded),
            sentiment: self.sentiment.score(&folded),
            service: self.service.score(&folded),
            intent: self.intent.intent(&folded),
            has_emergency_keywords: self.intent.has_emergency_keywords(&folded),
            message_length: text.chars().count(),
            analyzed_at: at,
        };
        debug!(
            urgency = analysis.urgency.level.as_str(),
            score = analysis.urgency.adjusted_score,
            sector = analysis.sector.sector.as_str(),
            sentiment = analysis.sentiment.sentiment.as_str(),
            service = analysis.service.service.as_str(),
            intent = analysis.intent.as_str(),
            "classified message"
        );
        analysis
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}
