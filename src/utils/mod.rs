//! The `utils` module provides the pieces shared across `chatcore`: the
//! error types and logging setup.

pub mod error;
pub mod logging;
