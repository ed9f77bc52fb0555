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
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]

//! Storage backends for sessions and events.
//!
//! Both backends implement [`SessionRepo`] and [`EventRepo`] so the
//! directory and ledger never know which one they run on:
//! - [`MemoryStore`]: keyed maps plus secondary indexes behind one lock
//! - [`DatabaseStore`]: sea-orm over SQLite, Postgres or MySQL

mod convert;
mod database;
mod memory;

pub use database::DatabaseStore;
pub use memory::MemoryStore;
pub use persona_core::{EventRepo, SessionRepo};
