//! Caching subsystem.
//!
//! - [`response::ResponseCache`] - reply cache keyed on a fingerprint of
//!   the outbound messages and options, with lazy TTL eviction. Consulted
//!   by the gateway before anything is queued; written by the fallback
//!   chain after a successful secondary call.

pub mod response;

pub use response::{CacheConfig, CacheKey, ResponseCache};
