use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::broker::registry::UserId;
use crate::broker::{Broker, Message};
use crate::client::Session;
use crate::console::command::{Command, render};
use crate::persistence::History;
use crate::utils::error::CommandError;

/// Run a complete relay session: start the dispatch loop, feed `reader` to a
/// `Relay`, then cancel the broker and drain every task, whether the input
/// ended cleanly or failed. The input error, if any, is returned last.
pub async fn serve<R>(
    broker: Arc<Broker>,
    history: Option<History>,
    session_capacity: usize,
    reader: R,
    output: UnboundedSender<String>,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let dispatch = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.run().await })
    };

    let mut relay = Relay::new(broker.clone(), history, session_capacity, output);
    let input = relay.run(reader).await;
    if let Err(e) = &input {
        warn!("console input failed: {e}");
    }

    broker.shutdown().cancel();
    match dispatch.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("dispatch loop refused to start: {e}"),
        Err(e) => warn!("dispatch task failed: {e}"),
    }
    relay.close().await;

    input
}

/// Whether the input loop should keep reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Console relay: owns the sessions of joined users and forwards every
/// delivery to a single output sink (stdout in the binary).
pub struct Relay {
    broker: Arc<Broker>,
    history: Option<History>,
    session_capacity: usize,
    sessions: HashMap<UserId, JoinHandle<()>>,
    output: UnboundedSender<String>,
}

impl Relay {
    pub fn new(
        broker: Arc<Broker>,
        history: Option<History>,
        session_capacity: usize,
        output: UnboundedSender<String>,
    ) -> Self {
        Self {
            broker,
            history,
            session_capacity,
            sessions: HashMap::new(),
            output,
        }
    }

    /// Read commands from `reader` until EOF, `/quit`, or broker shutdown.
    pub async fn run<R>(&mut self, reader: R) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let broker = self.broker.clone();

        loop {
            let line = tokio::select! {
                _ = broker.shutdown().cancelled() => break,
                line = lines.next_line() => line?,
            };
            let Some(line) = line else { break };

            match self.handle_line(&line).await {
                Ok(Flow::Continue) | Err(CommandError::Empty) => {}
                Ok(Flow::Quit) => break,
                Err(e) => self.emit(format!("error: {e}")),
            }
        }

        Ok(())
    }

    pub async fn handle_line(&mut self, line: &str) -> Result<Flow, CommandError> {
        match Command::parse(line)? {
            Command::Send(msg) => {
                let record = msg.clone();
                match self.broker.send(msg).await {
                    Ok(()) => self.record(record),
                    Err(e) => self.emit(format!("error: {e}")),
                }
            }
            Command::Join(id) => self.join(id).await?,
            Command::Leave(id) => self.leave(&id).await,
            Command::History(sender) => self.show_history(sender.as_deref()),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Unregister every joined user and wait for their pending deliveries to be printed.
    pub async fn close(mut self) {
        let ids: Vec<_> = self.sessions.keys().cloned().collect();
        for id in &ids {
            self.broker.unregister_user(id).await;
        }
        for (id, handle) in self.sessions.drain() {
            if let Err(e) = handle.await {
                warn!(user = %id, "session task failed: {e}");
            }
        }
    }

    pub fn joined(&self) -> impl Iterator<Item = &UserId> {
        self.sessions.keys()
    }

    async fn join(&mut self, id: UserId) -> Result<(), CommandError> {
        if self.sessions.contains_key(&id) {
            self.emit(format!("{id} already joined"));
            return Ok(());
        }

        let (mut session, mailbox) = Session::new(&id, self.session_capacity)?;
        self.broker.register_user(id.clone(), mailbox).await;

        let output = self.output.clone();
        let handle = tokio::spawn(async move {
            while let Some(msg) = session.recv().await {
                let _ = output.send(format!("[{}] {}", session.id, render(&msg)));
            }
            debug!(user = %session.id, "session inbox closed");
        });

        self.sessions.insert(id.clone(), handle);
        info!(user = %id, "user joined");
        self.emit(format!("{id} joined"));
        Ok(())
    }

    async fn leave(&mut self, id: &str) {
        self.broker.unregister_user(id).await;
        // The task ends on its own once the registry drops the mailbox.
        if self.sessions.remove(id).is_some() {
            info!(user = %id, "user left");
            self.emit(format!("{id} left"));
        } else {
            self.emit(format!("{id} is not joined"));
        }
    }

    fn record(&self, mut msg: Message) {
        if let Some(history) = &self.history {
            msg.stamp();
            if let Err(e) = history.store_message(&msg) {
                warn!(sender = %msg.sender, "failed to record message: {e}");
            }
        }
    }

    fn show_history(&self, sender: Option<&str>) {
        let Some(history) = &self.history else {
            self.emit("history is disabled".to_string());
            return;
        };
        match history.load_messages(sender) {
            Ok(messages) if messages.is_empty() => self.emit("no history".to_string()),
            Ok(messages) => {
                for msg in &messages {
                    self.emit(render(msg));
                }
            }
            Err(e) => self.emit(format!("error: {e}")),
        }
    }

    fn emit(&self, line: String) {
        let _ = self.output.send(line);
    }
}
