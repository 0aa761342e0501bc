//! User registry
//!
//! The `Registry` maps a user id to the sending half of that user's delivery
//! queue. The queue itself belongs to the user's session; the registry only
//! keeps a handle so the dispatch loop can push into it.
//!
//! Concurrency note: the map sits behind a `tokio::sync::RwLock`. Dispatch
//! holds a read guard for the whole fan-out of one message, registration
//! changes take the write guard and therefore wait for that fan-out to end.

use std::collections::HashMap;

use tokio::sync::mpsc::Sender;
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::broker::message::Message;

pub type UserId = String;

/// Sending half of a user's bounded delivery queue.
pub type Mailbox = Sender<Message>;

#[derive(Debug, Default)]
pub struct Registry {
    users: RwLock<HashMap<UserId, Mailbox>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace the mailbox for `id`. Replacing redirects future deliveries.
    pub async fn register(&self, id: UserId, mailbox: Mailbox) {
        self.users.write().await.insert(id, mailbox);
    }

    /// Remove the mailbox for `id`. Unknown ids are ignored.
    pub async fn unregister(&self, id: &str) {
        self.users.write().await.remove(id);
    }

    /// Consistent view of all registrations, held for one message's fan-out.
    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, HashMap<UserId, Mailbox>> {
        self.users.read().await
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.users.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}
