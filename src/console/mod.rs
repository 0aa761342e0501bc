//! The `console` module is the line-oriented front end of the relay.
//!
//! It defines the small command language typed on stdin and the `Relay`
//! that turns those commands into broker calls: joining users, routing their
//! messages and recording them in the history store.

pub mod command;
pub mod relay;

pub use command::{Command, render};
pub use relay::{Flow, Relay, serve};
