//! Message history backed by `sled`
//!
//! Each sender gets its own `sled` tree, named `sender:<id>` so no user id can
//! collide with sled's default tree. Keys are prefixed with the time the
//! message was stored so iteration yields messages in arrival order and TTL
//! cleanup can work from the key alone.
//!
//! Retention options:
//! - `ttl_seconds`: messages stored longer ago than this are purged on load
//! - `max_messages_per_sender`: oldest messages are evicted once a sender's
//!   tree grows past this cap

use chrono::Utc;
use sled::{Db, Tree};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::broker::message::Message;
use crate::config::HistorySettings;
use crate::utils::error::HistoryError;

const SENDER_TREE_PREFIX: &str = "sender:";

#[derive(Clone)]
pub struct History {
    db: Db,
    ttl_seconds: Option<i64>,
    max_messages_per_sender: Option<usize>,
}

impl History {
    /// Open or create a sled database at `path` with the given policy.
    pub fn open(
        path: &str,
        ttl_seconds: Option<i64>,
        max_messages_per_sender: Option<usize>,
    ) -> Result<Self, HistoryError> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            ttl_seconds,
            max_messages_per_sender,
        })
    }

    /// Open the store described by `settings`. A zero TTL or cap disables that policy.
    /// A TTL too large for `i64` seconds never expires anything and is treated as none.
    pub fn from_settings(settings: &HistorySettings) -> Result<Self, HistoryError> {
        let ttl = (settings.ttl_secs > 0)
            .then(|| i64::try_from(settings.ttl_secs).ok())
            .flatten();
        let max = (settings.max_messages_per_sender > 0).then_some(settings.max_messages_per_sender);
        Self::open(&settings.path, ttl, max)
    }

    /// Record `msg` under its sender.
    pub fn store_message(&self, msg: &Message) -> Result<(), HistoryError> {
        let serialized = serde_json::to_vec(msg)?;
        let tree = self.db.open_tree(Self::tree_name(&msg.sender))?;

        let key = format!("{:020}_{}", Utc::now().timestamp_millis(), Uuid::new_v4());
        tree.insert(key.as_bytes(), serialized)?;

        if let Some(max) = self.max_messages_per_sender {
            let total = tree.len();
            if total > max {
                let keys_to_delete: Vec<_> = tree
                    .iter()
                    .take(total - max)
                    .filter_map(|entry| entry.ok().map(|(k, _)| k))
                    .collect();

                for key in keys_to_delete {
                    tree.remove(key)?;
                }
            }
        }

        Ok(())
    }

    /// Load stored messages, either for one sender (in arrival order) or for
    /// everyone (ordered by message timestamp). Expired entries are purged first.
    pub fn load_messages(&self, sender: Option<&str>) -> Result<Vec<Message>, HistoryError> {
        match sender {
            Some(sender) => {
                let tree = self.db.open_tree(Self::tree_name(sender))?;
                self.cleanup_old_messages(&tree)?;
                Ok(Self::decode(&tree))
            }
            None => {
                let mut messages = Vec::new();
                for tree in self.sender_trees()? {
                    self.cleanup_old_messages(&tree)?;
                    messages.extend(Self::decode(&tree));
                }
                messages.sort_by_key(|m| m.timestamp);
                Ok(messages)
            }
        }
    }

    /// Remove every stored message.
    pub fn clear(&self) -> Result<(), HistoryError> {
        for tree in self.sender_trees()? {
            let name = tree.name();
            self.db.drop_tree(&name)?;
            debug!(sender = %String::from_utf8_lossy(&name), "dropped history");
        }
        Ok(())
    }

    fn tree_name(sender: &str) -> String {
        format!("{SENDER_TREE_PREFIX}{sender}")
    }

    fn sender_trees(&self) -> Result<Vec<Tree>, HistoryError> {
        let mut trees = Vec::new();
        for name in self.db.tree_names() {
            if name.starts_with(SENDER_TREE_PREFIX.as_bytes()) {
                trees.push(self.db.open_tree(name)?);
            }
        }
        Ok(trees)
    }

    fn decode(tree: &Tree) -> Vec<Message> {
        tree.iter()
            .filter_map(|res| res.ok())
            .filter_map(|(key, val)| match serde_json::from_slice::<Message>(&val) {
                Ok(msg) => Some(msg),
                Err(e) => {
                    warn!(key = %String::from_utf8_lossy(&key), "skipping undecodable history entry: {e}");
                    None
                }
            })
            .collect()
    }

    /// Remove messages older than the TTL from one sender's tree.
    fn cleanup_old_messages(&self, tree: &Tree) -> Result<(), HistoryError> {
        let Some(ttl) = self.ttl_seconds.filter(|ttl| *ttl > 0) else {
            return Ok(());
        };
        let expiry_time = Utc::now()
            .timestamp_millis()
            .saturating_sub(ttl.saturating_mul(1000));

        let old_keys: Vec<_> = tree
            .iter()
            .filter_map(|res| res.ok())
            .filter_map(|(key_bytes, _)| {
                let key_str = std::str::from_utf8(&key_bytes).ok()?;
                let (ts_str, _) = key_str.split_once('_')?;
                let ts = ts_str.parse::<i64>().ok()?;
                (ts < expiry_time).then_some(key_bytes)
            })
            .collect();

        for key in old_keys {
            tree.remove(key)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("db", &"sled::Db")
            .field("ttl_seconds", &self.ttl_seconds)
            .field("max_messages_per_sender", &self.max_messages_per_sender)
            .finish()
    }
}
