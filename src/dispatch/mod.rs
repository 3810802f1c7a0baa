//! Capability dispatchers: each composes a [`ResolutionChain`](crate::chain::ResolutionChain)
//! for one capability and rejects empty input before any strategy runs.

pub mod classification;
pub mod conversation;

pub use classification::ClassificationDispatcher;
pub use conversation::ConversationDispatcher;
