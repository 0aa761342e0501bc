//! The `persistence` module keeps a history of chat messages.
//!
//! The history lives next to the broker, not inside it: callers decide when
//! a message is worth recording (the console relay stores every accepted
//! submission). Storage uses `sled` as an embedded key-value store.

pub mod sled_store;

pub use sled_store::History;
