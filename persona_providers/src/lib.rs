#![deny(
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

//! Multi-credential, multi-provider chat-completion client.
//!
//! A call walks the provider's key list in order. Rate limits, auth
//! failures, timeouts and transport errors move on to the next key; bad
//! requests, server errors and malformed bodies stop immediately since every
//! key would fail the same way.

mod credentials;
mod failover;
mod openai_compat;
mod registry;
pub mod retry;

pub use credentials::StaticCredentials;
pub use failover::FailoverClient;
pub use registry::{ProviderKind, ProviderRegistry};
