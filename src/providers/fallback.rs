//! Canned replies for when every provider stage failed.
//!
//! Pools are keyed by [`FailureClass`]. Each reply points the user at the
//! phone line, so even a fully degraded gateway stays on-brand and useful.

use std::collections::HashMap;

use rand::seq::SliceRandom;

use crate::error::FailureClass;
use crate::persona::BusinessProfile;
use crate::telemetry;

#[derive(Debug, Clone)]
pub struct FallbackPool {
    pools: HashMap<FailureClass, Vec<String>>,
    last_resort: String,
}

impl FallbackPool {
    /// Empty pools; every pick returns `last_resort` until replies are added.
    pub fn new(last_resort: impl Into<String>) -> Self {
        Self {
            pools: HashMap::new(),
            last_resort: last_resort.into(),
        }
    }

    pub fn with_replies<I, S>(mut self, class: FailureClass, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pools
            .entry(class)
            .or_default()
            .extend(replies.into_iter().map(Into::into));
        self
    }

    /// Default pools rendered for `profile`.
    pub fn for_profile(profile: &BusinessProfile) -> Self {
        let name = &profile.name;
        let phone = &profile.phone;
        let eta = &profile.response_time;
        Self::new(format!("{name}: {phone}"))
            .with_replies(
                FailureClass::Timeout,
                [
                    format!("⏱️ Connessione lenta rilevata! Per assistenza immediata chiama il {phone} - risposta garantita in {eta}!"),
                    format!("🚨 EMERGENZA IT? Non aspettare! Chiama subito {phone} - {name} risponde in {eta}!"),
                ],
            )
            .with_replies(
                FailureClass::RateLimit,
                [
                    format!("🔄 Sistema temporaneamente occupato. Per assistenza immediata chiama il {phone}!"),
                    format!("⚡ Troppo traffico! Per supporto istantaneo: {phone} - {name} sempre disponibile!"),
                ],
            )
            .with_replies(
                FailureClass::General,
                [
                    format!("Ciao! Sono l'assistente {name}. Per assistenza immediata chiama il {phone} - risposta garantita in {eta}! 🚨"),
                    format!("Problemi IT? Contatta subito {name} al {phone}. Assistenza {} per le aziende! 💻", profile.emergency_hours),
                    format!("Emergenza informatica? Chiama ora il {phone}. {name} interviene in {eta}! ⚡"),
                    format!("Hai bisogno di supporto IT? Contatta {name} al {phone}. Copertura: {}! 🛡️", profile.coverage),
                ],
            )
    }

    /// Replies for `class`, empty if none are configured.
    pub fn replies(&self, class: FailureClass) -> &[String] {
        self.pools.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pick a reply for `class` at random, falling back to the general pool.
    pub fn pick(&self, class: FailureClass) -> String {
        metrics::counter!(telemetry::FALLBACK_REPLIES_TOTAL, "class" => class.as_str())
            .increment(1);
        let mut rng = rand::thread_rng();
        self.replies(class)
            .choose(&mut rng)
            .or_else(|| self.replies(FailureClass::General).choose(&mut rng))
            .cloned()
            .unwrap_or_else(|| self.last_resort.clone())
    }
}

impl Default for FallbackPool {
    fn default() -> Self {
        Self::for_profile(&BusinessProfile::default())
    }
}
