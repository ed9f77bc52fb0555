use async_trait::async_trait;
use chrono::{DateTime, Utc};
use persona_core::{Event, EventRepo, Participant, Session, SessionRepo};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<Uuid, Session>,
    /// participant key -> session id; enforces one session per set.
    by_key: HashMap<String, Uuid>,
    by_participant: HashMap<Participant, HashSet<Uuid>>,
    events: HashMap<Uuid, Event>,
    /// session id -> event ids sorted by `(timestamp, id)`.
    by_session: HashMap<Uuid, Vec<Uuid>>,
}

/// In-process store. Every mutation happens under a single write lock, so
/// a session and its index entries appear together or not at all.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }

    pub async fn event_count(&self) -> usize {
        self.tables.read().await.events.len()
    }
}

#[async_trait]
impl SessionRepo for MemoryStore {
    async fn insert_if_absent(&self, session: &Session) -> anyhow::Result<(Session, bool)> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables
            .by_key
            .get(&session.participant_key)
            .and_then(|id| tables.sessions.get(id))
        {
            return Ok((existing.clone(), false));
        }
        if tables.sessions.contains_key(&session.id) {
            anyhow::bail!("duplicate session id: {}", session.id);
        }

        tables
            .by_key
            .insert(session.participant_key.clone(), session.id);
        for participant in session.participants.iter().filter(|p| p.kind.is_indexed()) {
            tables
                .by_participant
                .entry(participant.clone())
                .or_default()
                .insert(session.id);
        }
        tables.sessions.insert(session.id, session.clone());

        debug!("Stored session {} in memory", session.id);
        Ok((session.clone(), true))
    }

    async fn find_by_id(&self, id: &Uuid) -> anyhow::Result<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(id).cloned())
    }

    async fn find_by_participant_key(&self, key: &str) -> anyhow::Result<Option<Session>> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_key
            .get(key)
            .and_then(|id| tables.sessions.get(id))
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Session>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.sessions.get(id))
            .cloned()
            .collect())
    }

    async fn session_ids_for(&self, participant: &Participant) -> anyhow::Result<HashSet<Uuid>> {
        Ok(self
            .tables
            .read()
            .await
            .by_participant
            .get(participant)
            .cloned()
            .unwrap_or_default())
    }

    async fn touch(&self, id: &Uuid, at: DateTime<Utc>) -> anyhow::Result<()> {
        let mut tables = self.tables.write().await;
        let session = tables
            .sessions
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("session not found: {id}"))?;
        session.last_active_at = at;
        Ok(())
    }
}

#[async_trait]
impl EventRepo for MemoryStore {
    async fn insert(&self, event: &Event) -> anyhow::Result<()> {
        let mut tables = self.tables.write().await;
        if tables.events.contains_key(&event.id) {
            anyhow::bail!("duplicate event id: {}", event.id);
        }

        let Tables {
            events, by_session, ..
        } = &mut *tables;
        let ids = by_session.entry(event.session_id).or_default();
        let position = ids.partition_point(|existing| {
            events
                .get(existing)
                .is_some_and(|e| (e.timestamp, e.id) <= (event.timestamp, event.id))
        });
        ids.insert(position, event.id);
        events.insert(event.id, event.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &Uuid) -> anyhow::Result<Option<Event>> {
        Ok(self.tables.read().await.events.get(id).cloned())
    }

    async fn list_by_session(&self, session_id: &Uuid) -> anyhow::Result<Vec<Event>> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_session
            .get(session_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| tables.events.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn recent_by_session(
        &self,
        session_id: &Uuid,
        limit: usize,
    ) -> anyhow::Result<Vec<Event>> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_session
            .get(session_id)
            .map(|ids| {
                let start = ids.len().saturating_sub(limit);
                ids[start..]
                    .iter()
                    .filter_map(|id| tables.events.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
