use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::broker::registry::UserId;

/// Represents a chat message routed by the broker.
///
/// A message is either addressed to one `recipient` (unicast) or, when
/// `broadcast` is set, to every registered user including the sender. In the
/// broadcast case `recipient` is ignored.
///
/// # Fields
///
/// - `sender` - Identifier of the user that produced the message.
/// - `recipient` - Target user for unicast delivery.
/// - `content` - Opaque payload; the broker never inspects it.
/// - `broadcast` - Deliver to every registered user instead of `recipient`.
/// - `timestamp` - Unix timestamp in seconds. Zero means "not yet stamped";
///   the broker fills it in when the message leaves the input queue.
///
/// # Example
///
/// ```rust
/// use chatcore::broker::message::Message;
///
/// let msg = Message::unicast("alice", "bob", "hello");
/// assert!(!msg.broadcast);
/// assert_eq!(msg.timestamp, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: UserId,
    pub recipient: UserId,
    pub content: String,
    pub broadcast: bool,
    pub timestamp: i64,
}

impl Message {
    /// Build an unstamped message for a single recipient.
    pub fn unicast(sender: &str, recipient: &str, content: &str) -> Self {
        Self {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            content: content.to_string(),
            broadcast: false,
            timestamp: 0,
        }
    }

    /// Build an unstamped message for every registered user.
    pub fn broadcast(sender: &str, content: &str) -> Self {
        Self {
            sender: sender.to_string(),
            recipient: String::new(),
            content: content.to_string(),
            broadcast: true,
            timestamp: 0,
        }
    }

    /// Attach a client-supplied timestamp. The broker keeps any non-zero value.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Stamp the message with the current time unless it already carries one.
    pub(crate) fn stamp(&mut self) {
        if self.timestamp == 0 {
            self.timestamp = Utc::now().timestamp();
        }
    }
}
