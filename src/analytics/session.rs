//! Session identity for analytics correlation.

use std::sync::OnceLock;

/// Opaque per-gateway session identifier, created on first use.
///
/// Used only to correlate analytics and escalations; never part of a
/// cache key.
#[derive(Debug, Default)]
pub struct SessionId {
    id: OnceLock<String>,
}

impl SessionId {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a known identifier, e.g. one restored by the embedding page.
    pub fn fixed(id: impl Into<String>) -> Self {
        let session = Self::default();
        let _ = session.id.set(id.into());
        session
    }

    pub fn get(&self) -> &str {
        self.id.get_or_init(|| {
            format!(
                "session_{}_{}",
                chrono::Utc::now().timestamp_millis(),
                uuid::Uuid::new_v4().simple()
            )
        })
    }
}
