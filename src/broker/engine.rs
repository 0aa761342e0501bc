//! Broker engine
//!
//! This module contains the in-process router responsible for:
//! - accepting messages from producers into a bounded input queue
//! - running the single dispatch loop that drains that queue
//! - fanning each message out to one user (unicast) or every user (broadcast)
//!
//! Concurrency and usage notes:
//! - The broker is meant to be shared as `Arc<Broker>`. `send`,
//!   `register_user` and `unregister_user` may be called from any task while
//!   `run` is driving the dispatch loop on another.
//! - Every push, into the input queue or into a user's mailbox, is bounded by
//!   a timeout. A mailbox that stays full is skipped for that message, so one
//!   stalled reader cannot hold up the loop for longer than the delivery
//!   timeout.
//! - Delivery is best effort and at most once. Unknown recipients and skipped
//!   mailboxes are logged, never reported to the sender.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, Receiver, Sender, error::SendTimeoutError};
use tracing::{debug, info, warn};

use crate::broker::message::Message;
use crate::broker::registry::{Mailbox, Registry, UserId};
use crate::broker::shutdown::Shutdown;
use crate::config::BrokerSettings;
use crate::utils::error::BrokerError;

/// Lifecycle of a broker. There is no way back from `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    Created,
    Running,
    Draining,
    Stopped,
}

#[derive(Debug)]
pub struct Broker {
    input_tx: Sender<Message>,
    input_rx: Mutex<Option<Receiver<Message>>>,
    registry: Registry,
    shutdown: Arc<Shutdown>,
    started: AtomicBool,
    submit_timeout: Duration,
    delivery_timeout: Duration,
}

impl Broker {
    /// Capacity of the input queue when none is configured.
    pub const DEFAULT_INPUT_CAPACITY: usize = 100;

    /// How long `send` waits for room in the input queue.
    pub const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 100;

    /// How long the dispatch loop waits on a single full mailbox.
    pub const DEFAULT_DELIVERY_TIMEOUT_MS: u64 = 100;
}

impl Broker {
    pub fn new(shutdown: Arc<Shutdown>) -> Self {
        Self::with_settings(shutdown, &BrokerSettings::default())
    }

    pub fn with_settings(shutdown: Arc<Shutdown>, settings: &BrokerSettings) -> Self {
        // tokio panics on a zero-capacity channel
        let (input_tx, input_rx) = mpsc::channel(settings.input_capacity.max(1));
        Self {
            input_tx,
            input_rx: Mutex::new(Some(input_rx)),
            registry: Registry::new(),
            shutdown,
            started: AtomicBool::new(false),
            submit_timeout: Duration::from_millis(settings.submit_timeout_ms),
            delivery_timeout: Duration::from_millis(settings.delivery_timeout_ms),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn shutdown(&self) -> &Arc<Shutdown> {
        &self.shutdown
    }

    pub fn state(&self) -> BrokerState {
        if self.shutdown.is_completed() {
            BrokerState::Stopped
        } else if !self.started.load(Ordering::Acquire) {
            BrokerState::Created
        } else if self.shutdown.is_cancelled() {
            BrokerState::Draining
        } else {
            BrokerState::Running
        }
    }

    /// Make `mailbox` the delivery target for `id`, replacing any previous one.
    pub async fn register_user(&self, id: impl Into<UserId>, mailbox: Mailbox) {
        let id = id.into();
        debug!(user = %id, "registering user");
        self.registry.register(id, mailbox).await;
    }

    /// Stop delivering to `id`. Unknown ids are ignored.
    pub async fn unregister_user(&self, id: &str) {
        debug!(user = %id, "unregistering user");
        self.registry.unregister(id).await;
    }

    /// Queue a message for routing.
    ///
    /// `Ok` only means the message was accepted into the input queue, not that
    /// anyone received it.
    pub async fn send(&self, msg: Message) -> Result<(), BrokerError> {
        if self.shutdown.is_cancelled() {
            return Err(BrokerError::BrokerClosed);
        }

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(BrokerError::BrokerClosed),
            pushed = self.input_tx.send_timeout(msg, self.submit_timeout) => match pushed {
                Ok(()) => Ok(()),
                Err(SendTimeoutError::Timeout(_)) => Err(BrokerError::QueueFullTimeout),
                Err(SendTimeoutError::Closed(_)) => Err(BrokerError::BrokerClosed),
            },
        }
    }

    /// Run the dispatch loop until the shutdown signal fires.
    ///
    /// May only be started once per broker. Messages still waiting in the
    /// input queue when cancellation is observed are discarded.
    pub async fn run(&self) -> Result<(), BrokerError> {
        let mut input = self
            .input_rx
            .lock()
            .await
            .take()
            .ok_or(BrokerError::AlreadyRunning)?;
        self.started.store(true, Ordering::Release);
        info!("broker dispatch loop started");

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = input.recv() => match next {
                    Some(msg) => self.dispatch(msg).await,
                    None => break,
                },
            }
        }

        input.close();
        let discarded = std::iter::from_fn(|| input.try_recv().ok()).count();
        if discarded > 0 {
            debug!(discarded, "dropping messages left in the input queue");
        }

        self.shutdown.mark_completed();
        info!("broker dispatch loop stopped");
        Ok(())
    }

    async fn dispatch(&self, mut msg: Message) {
        msg.stamp();

        let users = self.registry.read().await;

        if msg.broadcast {
            debug!(sender = %msg.sender, recipients = users.len(), "broadcasting message");
            for (id, mailbox) in users.iter() {
                self.deliver(id, mailbox, msg.clone()).await;
            }
        } else if let Some(mailbox) = users.get(msg.recipient.as_str()) {
            let id = msg.recipient.clone();
            self.deliver(&id, mailbox, msg).await;
        } else {
            debug!(
                sender = %msg.sender,
                recipient = %msg.recipient,
                "recipient not registered, dropping message"
            );
        }
    }

    async fn deliver(&self, id: &str, mailbox: &Mailbox, msg: Message) {
        match mailbox.send_timeout(msg, self.delivery_timeout).await {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => {
                warn!(user = %id, "mailbox full past delivery timeout, skipping");
            }
            Err(SendTimeoutError::Closed(_)) => {
                debug!(user = %id, "mailbox closed, skipping");
            }
        }
    }
}
