//! The `client` module represents the users attached to the broker.
//!
//! It provides the `Session` struct, which owns the receiving end of one
//! user's delivery queue, along with the id check the identity layer runs
//! before a user is registered.

pub mod session;
pub use session::{Session, validate_user_id};

#[cfg(test)]
mod tests;
