//! Per-call request options

use serde::{Deserialize, Serialize};

use super::classification::{Sector, UrgencyLevel};

/// Options for a single gateway call.
///
/// Unset fields fall back to the provider defaults from configuration.
/// Options are part of the cache fingerprint, so two calls only share a
/// cached reply when their options serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<Sector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency_hint: Option<UrgencyLevel>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn sector(mut self, sector: Sector) -> Self {
        self.sector = Some(sector);
        self
    }

    pub fn urgency_hint(mut self, level: UrgencyLevel) -> Self {
        self.urgency_hint = Some(level);
        self
    }

    /// Overlay `self` on top of `base`: fields set here win.
    pub fn or(self, base: RequestOptions) -> RequestOptions {
        RequestOptions {
            model: self.model.or(base.model),
            max_tokens: self.max_tokens.or(base.max_tokens),
            temperature: self.temperature.or(base.temperature),
            sector: self.sector.or(base.sector),
            urgency_hint: self.urgency_hint.or(base.urgency_hint),
        }
    }
}
