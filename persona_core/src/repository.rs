use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use crate::event::Event;
use crate::participant::Participant;
use crate::session::Session;

/// Storage primitives for session records and their participant index.
#[async_trait]
pub trait SessionRepo: Send + Sync {
    /// Persist `session` unless a session with the same participant key
    /// already exists. Returns the stored session and whether it was created.
    ///
    /// The session row and its participant index entries are written
    /// atomically.
    async fn insert_if_absent(&self, session: &Session) -> anyhow::Result<(Session, bool)>;

    async fn find_by_id(&self, id: &Uuid) -> anyhow::Result<Option<Session>>;

    async fn find_by_participant_key(&self, key: &str) -> anyhow::Result<Option<Session>>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Session>>;

    /// Ids of every session the participant is indexed under.
    async fn session_ids_for(&self, participant: &Participant) -> anyhow::Result<HashSet<Uuid>>;

    async fn touch(&self, id: &Uuid, at: DateTime<Utc>) -> anyhow::Result<()>;
}

/// Storage primitives for the append-only event log.
#[async_trait]
pub trait EventRepo: Send + Sync {
    async fn insert(&self, event: &Event) -> anyhow::Result<()>;

    async fn find_by_id(&self, id: &Uuid) -> anyhow::Result<Option<Event>>;

    /// Every event of the session, ordered by `(timestamp, id)` ascending.
    async fn list_by_session(&self, session_id: &Uuid) -> anyhow::Result<Vec<Event>>;

    /// The last `limit` events of the session, still in ascending order.
    async fn recent_by_session(&self, session_id: &Uuid, limit: usize)
    -> anyhow::Result<Vec<Event>>;
}
