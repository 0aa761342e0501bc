use std::sync::Arc;
use std::time::Duration;

use chatcore::broker::{Broker, BrokerState, Message, Shutdown};
use chatcore::client::Session;
use chatcore::utils::error::BrokerError;
use tokio::time::timeout;

struct Harness {
    shutdown: Arc<Shutdown>,
    broker: Arc<Broker>,
    dispatch: tokio::task::JoinHandle<Result<(), BrokerError>>,
}

impl Harness {
    fn start() -> Self {
        let shutdown = Arc::new(Shutdown::new());
        let broker = Arc::new(Broker::new(shutdown.clone()));
        let dispatch = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.run().await })
        };
        Self {
            shutdown,
            broker,
            dispatch,
        }
    }

    async fn join(&self, id: &str, capacity: usize) -> Session {
        let (session, mailbox) = Session::new(id, capacity).unwrap();
        self.broker.register_user(id, mailbox).await;
        session
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.shutdown.completed().await;
        self.dispatch.await.unwrap().unwrap();
        assert_eq!(self.broker.state(), BrokerState::Stopped);
    }
}

async fn next(session: &mut Session) -> Message {
    timeout(Duration::from_secs(2), session.recv())
        .await
        .expect("timed out waiting for delivery")
        .expect("inbox closed")
}

#[tokio::test]
async fn broadcast_hi_reaches_a_and_b_once() {
    let harness = Harness::start();
    let mut a = harness.join("a", 8).await;
    let mut b = harness.join("b", 8).await;

    harness
        .broker
        .send(Message::broadcast("a", "hi"))
        .await
        .unwrap();

    let got_a = next(&mut a).await;
    let got_b = next(&mut b).await;
    assert_eq!(got_a.content, "hi");
    assert_eq!(got_b.content, "hi");
    assert_ne!(got_a.timestamp, 0);
    assert_eq!(got_a.timestamp, got_b.timestamp);

    harness.stop().await;
    assert!(a.try_recv().is_none());
    assert!(b.try_recv().is_none());
}

#[tokio::test]
async fn unicast_to_unknown_user_is_accepted_and_dropped() {
    let harness = Harness::start();
    let mut a = harness.join("a", 8).await;
    let mut b = harness.join("b", 8).await;

    assert_eq!(
        harness.broker.send(Message::unicast("a", "c", "lost")).await,
        Ok(())
    );
    harness
        .broker
        .send(Message::unicast("a", "b", "found"))
        .await
        .unwrap();

    assert_eq!(next(&mut b).await.content, "found");
    assert!(a.try_recv().is_none());

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stuck_recipient_does_not_block_others() {
    let harness = Harness::start();
    let mut a = harness.join("a", 8).await;
    let (mut b, b_mailbox) = Session::new("b", 1).unwrap();
    b_mailbox
        .try_send(Message::unicast("x", "b", "filler"))
        .unwrap();
    harness.broker.register_user("b", b_mailbox).await;

    for i in 0..3 {
        harness
            .broker
            .send(Message::broadcast("a", &format!("round {i}")))
            .await
            .unwrap();
    }

    for i in 0..3 {
        assert_eq!(next(&mut a).await.content, format!("round {i}"));
    }
    assert_eq!(b.try_recv().unwrap().content, "filler");
    assert!(b.try_recv().is_none());

    harness.stop().await;
}

#[tokio::test]
async fn single_producer_order_is_preserved() {
    let harness = Harness::start();
    let mut b = harness.join("b", 64).await;

    for i in 0..50 {
        harness
            .broker
            .send(Message::unicast("a", "b", &i.to_string()))
            .await
            .unwrap();
    }

    for i in 0..50 {
        assert_eq!(next(&mut b).await.content, i.to_string());
    }

    harness.stop().await;
}

#[tokio::test]
async fn many_producers_all_delivered() {
    let harness = Harness::start();
    let mut sink = harness.join("sink", 256).await;

    let producers: Vec<_> = (0..8)
        .map(|p| {
            let broker = harness.broker.clone();
            tokio::spawn(async move {
                for i in 0..20 {
                    let msg = Message::unicast(&format!("p{p}"), "sink", &i.to_string());
                    while let Err(BrokerError::QueueFullTimeout) = broker.send(msg.clone()).await {}
                }
            })
        })
        .collect();
    futures::future::join_all(producers).await;

    let mut received = Vec::new();
    for _ in 0..160 {
        received.push(next(&mut sink).await);
    }
    for p in 0..8 {
        let sender = format!("p{p}");
        let order: Vec<_> = received
            .iter()
            .filter(|m| m.sender == sender)
            .map(|m| m.content.parse::<u32>().unwrap())
            .collect();
        assert_eq!(order, (0..20).collect::<Vec<_>>());
    }

    harness.stop().await;
}

#[tokio::test]
async fn replaced_registration_redirects_delivery() {
    let harness = Harness::start();
    let mut old = harness.join("a", 8).await;
    let (mut new, mailbox) = Session::new("a", 8).unwrap();
    harness.broker.register_user("a", mailbox).await;

    harness
        .broker
        .send(Message::unicast("b", "a", "to the new one"))
        .await
        .unwrap();

    assert_eq!(next(&mut new).await.content, "to the new one");
    assert!(old.try_recv().is_none());

    harness.stop().await;
}

#[tokio::test]
async fn send_after_stop_is_rejected() {
    let harness = Harness::start();
    let mut a = harness.join("a", 8).await;
    let broker = harness.broker.clone();
    harness.stop().await;

    assert_eq!(
        broker.send(Message::broadcast("a", "too late")).await,
        Err(BrokerError::BrokerClosed)
    );
    assert!(a.try_recv().is_none());
}
