//! # chatcore
//!
//! `chatcore` is an in-process message broker for chat-style traffic. Many
//! producers submit messages, a single dispatch loop routes each one to a
//! named user or to everyone, and every queue on the way is bounded with
//! timeout-based backpressure.
//!
//! ## Core Modules
//!
//! - `broker`: the message model, user registry, shutdown signal and dispatch engine.
//! - `client`: user sessions that own a delivery queue.
//! - `config`: loading settings from file and environment.
//! - `console`: the line-oriented relay used by the binary.
//! - `persistence`: the sled-backed message history.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod console;
pub mod persistence;
pub mod utils;
