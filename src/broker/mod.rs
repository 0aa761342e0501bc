//! The `broker` module is the routing core: the message model, the user
//! registry, the cancellation signal and the dispatch engine tying them
//! together.

pub mod engine;
pub mod message;
pub mod registry;
pub mod shutdown;

pub use engine::{Broker, BrokerState};
pub use message::Message;
pub use registry::{Mailbox, Registry, UserId};
pub use shutdown::Shutdown;
