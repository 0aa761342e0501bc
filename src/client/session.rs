use tokio::sync::mpsc::{self, Receiver, error::TryRecvError};
use uuid::Uuid;

use crate::broker::message::Message;
use crate::broker::registry::{Mailbox, UserId};
use crate::utils::error::CommandError;

/// Check that `id` can name a user: non-empty and free of whitespace.
///
/// The broker itself accepts any id; this runs before `register_user`.
pub fn validate_user_id(id: &str) -> Result<(), CommandError> {
    if id.is_empty() || id.chars().any(char::is_whitespace) || id == "*" {
        return Err(CommandError::InvalidUserId(id.to_string()));
    }
    Ok(())
}

/// A user attached to the broker.
///
/// The session owns the receiving half of a bounded queue. The sending half
/// returned by `Session::new` is what gets registered with the broker, which
/// only ever pushes into it.
#[derive(Debug)]
pub struct Session {
    /// Identifier the user is registered under.
    pub id: UserId,

    inbox: Receiver<Message>,
}

impl Session {
    /// Create a session for `id` with room for `capacity` undelivered messages.
    pub fn new(id: &str, capacity: usize) -> Result<(Self, Mailbox), CommandError> {
        validate_user_id(id)?;
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Ok((
            Self {
                id: id.to_string(),
                inbox: rx,
            },
            tx,
        ))
    }

    /// Create a session under a fresh `user-<uuid>` id.
    pub fn anonymous(capacity: usize) -> (Self, Mailbox) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: format!("user-{}", Uuid::new_v4()),
                inbox: rx,
            },
            tx,
        )
    }

    /// Wait for the next delivered message. `None` once every mailbox handle is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        self.inbox.recv().await
    }

    /// Take a delivered message without waiting.
    pub fn try_recv(&mut self) -> Option<Message> {
        match self.inbox.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}
