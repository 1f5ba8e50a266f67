//! Gateway construction and the per-session facade.

mod builder;
mod conversation;
mod facade;

pub use builder::{Vedetta, VedettaBuilder};
pub use conversation::Conversation;
pub use facade::Gateway;
