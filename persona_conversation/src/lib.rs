#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Conversation orchestration between a user and an AI persona.
//!
//! A message is acknowledged as soon as it is logged. The persona's reply is
//! generated by a pool of background workers and appended to the same
//! session, where callers pick it up by re-reading the history.
//!
//! # Key Features
//! - One session per user/agent pair, created on first contact
//! - Bounded context window built from the session log
//! - Failed generations recorded in-band as assistant messages
//! - Observable reply queue that can be drained before exit

mod failure;
mod history;
mod queue;
mod service;

pub use failure::failure_reply;
pub use history::{History, HistoryStats};
pub use queue::{ReplyJob, ReplyQueue, ReplyWorker};
pub use service::{
    ConversationConfig, ConversationService, MessageStatus, SendMessage, SendReceipt,
};
