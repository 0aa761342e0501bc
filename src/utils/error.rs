//! The `error` module defines the error types surfaced by `chatcore`.
//!
//! Only conditions a caller can act on become errors. Routing misses such as
//! an unknown recipient or a stalled mailbox are dropped by the broker and
//! never reach this module.

use thiserror::Error;

/// Errors returned to producers by `Broker::send` and to owners by `Broker::run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// Cancellation fired before or while the message was being queued.
    #[error("broker is closed")]
    BrokerClosed,

    /// The input queue stayed full for the whole submit timeout.
    #[error("broker input queue full, timed out waiting for space")]
    QueueFullTimeout,

    /// `run` was called on a broker whose dispatch loop was already started.
    #[error("broker dispatch loop already started")]
    AlreadyRunning,
}

/// Errors raised by the sled-backed message history.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("history encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Errors raised while parsing a console line into a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty input")]
    Empty,

    #[error("unknown command '/{0}'")]
    UnknownCommand(String),

    #[error("missing argument for '/{0}'")]
    MissingArgument(String),

    #[error("expected '<sender> > <recipient|*>: <text>', got '{0}'")]
    Malformed(String),

    #[error("invalid user id '{0}'")]
    InvalidUserId(String),
}
