//! Conversation classification types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};

/// Urgency bucket, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Low => "low",
            UrgencyLevel::Medium => "medium",
            UrgencyLevel::High => "high",
            UrgencyLevel::Critical => "critical",
        }
    }
}

/// Business vertical of the conversation.
///
/// Declaration order is the tie-break order for sector scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sector {
    Medical,
    Legal,
    General,
}

impl Sector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Medical => "medical",
            Sector::Legal => "legal",
            Sector::General => "general",
        }
    }
}

/// Dominant tone of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Urgent,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Urgent => "urgent",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// Service line a message most likely asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    /// Generic IT support, the default recommendation.
    Support,
    Cybersecurity,
    Cloud,
    Voip,
    Medical,
    Legal,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Support => "support",
            Service::Cybersecurity => "cybersecurity",
            Service::Cloud => "cloud",
            Service::Voip => "voip",
            Service::Medical => "medical",
            Service::Legal => "legal",
        }
    }
}

/// Coarse user intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    GetInfo,
    RequestSupport,
    GetQuote,
    Emergency,
    Contact,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::GetInfo => "get_info",
            Intent::RequestSupport => "request_support",
            Intent::GetQuote => "get_quote",
            Intent::Emergency => "emergency",
            Intent::Contact => "contact",
            Intent::General => "general",
        }
    }
}

/// How hard a conversation should be pushed to a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationPriority {
    /// Critical urgency: hand off immediately.
    Emergency,
    /// Urgent but not critical: prioritize.
    Priority,
}

impl EscalationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationPriority::Emergency => "emergency",
            EscalationPriority::Priority => "priority",
        }
    }
}

/// Per-category scores in declaration order.
///
/// Serializes as a `{label: score}` map.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector<C> {
    entries: Vec<(C, f64)>,
}

impl<C: Copy + PartialEq> ScoreVector<C> {
    pub fn new(entries: Vec<(C, f64)>) -> Self {
        Self { entries }
    }

    /// Score for `label`, zero if the label is not scored.
    pub fn get(&self, label: C) -> f64 {
        self.entries
            .iter()
            .find(|(c, _)| *c == label)
            .map(|(_, s)| *s)
            .unwrap_or(0.0)
    }

    /// Highest positive score; ties go to the earliest declared category.
    ///
    /// Returns `None` when every score is zero.
    pub fn winner(&self) -> Option<(C, f64)> {
        let mut best: Option<(C, f64)> = None;
        for &(label, score) in &self.entries {
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((label, score));
            }
        }
        best
    }

    /// Sum of all category scores.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, s)| s).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(C, f64)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C: Serialize> Serialize for ScoreVector<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(c, s)| (c, s)))
    }
}

/// Keyword urgency score, adjusted for time of day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrgencyResult {
    /// Weighted keyword score before time adjustments.
    pub raw_score: f64,
    /// Score after out-of-hours/weekend multipliers.
    pub adjusted_score: f64,
    pub level: UrgencyLevel,
    pub is_urgent: bool,
    pub out_of_hours: bool,
    pub weekend: bool,
    /// Weighted contribution of each severity tier.
    pub tier_scores: ScoreVector<UrgencyLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorResult {
    pub sector: Sector,
    /// Score of the winning sector (zero when defaulted).
    pub confidence: f64,
    pub scores: ScoreVector<Sector>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub scores: ScoreVector<Sentiment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRecommendation {
    pub service: Service,
    pub confidence: f64,
    pub scores: ScoreVector<Service>,
}

/// Everything the classifier knows about one inbound message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageAnalysis {
    pub urgency: UrgencyResult,
    pub sector: SectorResult,
    pub sentiment: SentimentResult,
    pub service: ServiceRecommendation,
    pub intent: Intent,
    pub has_emergency_keywords: bool,
    /// Length of the message in characters.
    pub message_length: usize,
    pub analyzed_at: NaiveDateTime,
}

impl MessageAnalysis {
    /// Whether a human should be pulled into the conversation.
    pub fn requires_escalation(&self) -> bool {
        self.urgency.is_urgent || self.sentiment.sentiment == Sentiment::Urgent
    }

    pub fn escalation_priority(&self) -> Option<EscalationPriority> {
        if !self.requires_escalation() {
            None
        } else if self.urgency.level == UrgencyLevel::Critical {
            Some(EscalationPriority::Emergency)
        } else {
            Some(EscalationPriority::Priority)
        }
    }
}
