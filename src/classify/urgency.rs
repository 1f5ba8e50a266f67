//! Urgency scoring.
//!
//! Four severity tiers of keywords, weighted 10/7/4/1 by default. The raw
//! score is multiplied when the message arrives outside business hours
//! and again on weekends; the adjusted score is then bucketed.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use super::lexicon::Lexicon;
use crate::types::{UrgencyLevel, UrgencyResult};

/// One severity tier of the urgency lexicon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyTier {
    pub level: UrgencyLevel,
    pub weight: f64,
    pub keywords: Vec<String>,
}

impl UrgencyTier {
    fn new(level: UrgencyLevel, weight: f64, keywords: &[&str]) -> Self {
        Self {
            level,
            weight,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Local opening hours. Both bounds are whole hours and inclusive, so with
/// the defaults 18:45 is still in hours and 19:00 is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessHours {
    pub open_hour: u32,
    pub close_hour: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open_hour: 8,
            close_hour: 18,
        }
    }
}

impl BusinessHours {
    pub fn is_out_of_hours(&self, at: NaiveDateTime) -> bool {
        let hour = at.hour();
        hour < self.open_hour || hour > self.close_hour
    }

    pub fn is_weekend(at: NaiveDateTime) -> bool {
        matches!(at.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

/// Score cut-offs, compared with `>=` against the adjusted score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencyThresholds {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    /// Independent of the level buckets.
    pub urgent: f64,
}

impl Default for UrgencyThresholds {
    fn default() -> Self {
        Self {
            critical: 15.0,
            high: 10.0,
            medium: 5.0,
            urgent: 7.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencyConfig {
    pub tiers: Vec<UrgencyTier>,
    pub out_of_hours_multiplier: f64,
    pub weekend_multiplier: f64,
    pub business_hours: BusinessHours,
    pub thresholds: UrgencyThresholds,
}

impl Default for UrgencyConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                UrgencyTier::new(
                    UrgencyLevel::Critical,
                    10.0,
                    &[
                        "emergenza",
                        "down",
                        "bloccato",
                        "hackerato",
                        "ransomware",
                        "virus",
                        "non funziona",
                    ],
                ),
                UrgencyTier::new(
                    UrgencyLevel::High,
                    7.0,
                    &["urgente", "subito", "immediato", "problema grave", "server"],
                ),
                UrgencyTier::new(
                    UrgencyLevel::Medium,
                    4.0,
                    &["problema", "aiuto", "supporto", "lento"],
                ),
                UrgencyTier::new(
                    UrgencyLevel::Low,
                    1.0,
                    &["informazione", "preventivo", "consulenza"],
                ),
            ],
            out_of_hours_multiplier: 1.5,
            weekend_multiplier: 1.3,
            business_hours: BusinessHours::default(),
            thresholds: UrgencyThresholds::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UrgencyScorer {
    lexicon: Lexicon<UrgencyLevel>,
    out_of_hours_multiplier: f64,
    weekend_multiplier: f64,
    business_hours: BusinessHours,
    thresholds: UrgencyThresholds,
}

impl UrgencyScorer {
    pub fn new(config: &UrgencyConfig) -> Self {
        let lexicon = config.tiers.iter().fold(Lexicon::new(), |lex, tier| {
            lex.flat(tier.level, tier.weight, &tier.keywords)
        });
        Self {
            lexicon,
            out_of_hours_multiplier: config.out_of_hours_multiplier,
            weekend_multiplier: config.weekend_multiplier,
            business_hours: config.business_hours,
            thresholds: config.thresholds,
        }
    }

    /// Score folded text received at local time `at`.
    pub fn score(&self, folded: &str, at: NaiveDateTime) -> UrgencyResult {
        let tier_scores = self.lexicon.score(folded);
        let raw_score = tier_scores.total();

        let out_of_hours = self.business_hours.is_out_of_hours(at);
        let weekend = BusinessHours::is_weekend(at);

        let mut adjusted_score = raw_score;
        if out_of_hours {
            adjusted_score *= self.out_of_hours_multiplier;
        }
        if weekend {
            adjusted_score *= self.weekend_multiplier;
        }

        UrgencyResult {
            raw_score,
            adjusted_score,
            level: self.bucket(adjusted_score),
            is_urgent: adjusted_score >= self.thresholds.urgent,
            out_of_hours,
            weekend,
            tier_scores,
        }
    }

    fn bucket(&self, score: f64) -> UrgencyLevel {
        let t = &self.thresholds;
        if score >= t.critical {
            UrgencyLevel::Critical
        } else if score >= t.high {
            UrgencyLevel::High
        } else if score >= t.medium {
            UrgencyLevel::Medium
        } else {
            UrgencyLevel::Low
        }
    }
}

impl Default for UrgencyScorer {
    fn default() -> Self {
        Self::new(&UrgencyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // 2025-03-12 is a Wednesday, 2025-03-15 a Saturday.
    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn weekday_office_hours_leave_score_unadjusted() {
        let result = UrgencyScorer::default().score("il pc è lento", at(12, 10));
        assert_eq!(result.raw_score, 4.0);
        assert_eq!(result.adjusted_score, 4.0);
        assert_eq!(result.level, UrgencyLevel::Low);
        assert!(!result.out_of_hours);
        assert!(!result.weekend);
    }

    #[test]
    fn out_of_hours_and_weekend_compose() {
        let result = UrgencyScorer::default().score("aiuto", at(15, 23));
        assert!(result.out_of_hours);
        assert!(result.weekend);
        assert!((result.adjusted_score - 4.0 * 1.5 * 1.3).abs() < 1e-9);
        assert_eq!(result.level, UrgencyLevel::Medium);
        assert!(result.is_urgent);
    }

    #[test]
    fn close_hour_is_inclusive() {
        let hours = BusinessHours::default();
        assert!(!hours.is_out_of_hours(at(12, 18)));
        assert!(hours.is_out_of_hours(at(12, 19)));
        assert!(hours.is_out_of_hours(at(12, 7)));
        assert!(!hours.is_out_of_hours(at(12, 8)));
    }

    #[test]
    fn buckets_are_inclusive_lower_bounds() {
        let scorer = UrgencyScorer::default();
        assert_eq!(scorer.bucket(15.0), UrgencyLevel::Critical);
        assert_eq!(scorer.bucket(14.9), UrgencyLevel::High);
        assert_eq!(scorer.bucket(10.0), UrgencyLevel::High);
        assert_eq!(scorer.bucket(5.0), UrgencyLevel::Medium);
        assert_eq!(scorer.bucket(4.9), UrgencyLevel::Low);
    }

    #[test]
    fn tier_scores_are_reported() {
        let result = UrgencyScorer::default().score("server down", at(12, 10));
        assert_eq!(result.tier_scores.get(UrgencyLevel::Critical), 10.0);
        assert_eq!(result.tier_scores.get(UrgencyLevel::High), 7.0);
        assert_eq!(result.raw_score, 17.0);
        assert_eq!(result.level, UrgencyLevel::Critical);
    }
}
