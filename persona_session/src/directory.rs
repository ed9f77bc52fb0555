use chrono::Utc;
use persona_core::{Error, Participant, Result, Session, SessionRepo, normalize, participant_key};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Maps participant sets to their single canonical session.
#[derive(Clone)]
pub struct SessionDirectory {
    repo: Arc<dyn SessionRepo>,
}

impl SessionDirectory {
    pub fn new(repo: Arc<dyn SessionRepo>) -> Self {
        info!("SessionDirectory initialized");
        Self { repo }
    }

    /// Return the session for `participants`, creating it on first contact.
    ///
    /// Calls with any permutation of the same set return the same session,
    /// concurrent callers included.
    pub async fn get_or_create(&self, participants: &[Participant]) -> Result<Session> {
        validate_participants(participants)?;

        if let Some(existing) = self.find_by_participants(participants).await? {
            debug!("Found existing session {}", existing.id);
            return Ok(existing);
        }

        let candidate = Session::new(participants, Utc::now());
        let (session, created) = self.repo.insert_if_absent(&candidate).await?;
        if created {
            info!(
                "Created session {} for [{}]",
                session.id,
                describe(&session.participants)
            );
        }
        Ok(session)
    }

    /// Look up the session for exactly this participant set.
    ///
    /// Intersects the per-participant session sets of the index; with one
    /// session per set the intersection holds at most one candidate. An
    /// empty participant list yields `None`.
    pub async fn find_by_participants(
        &self,
        participants: &[Participant],
    ) -> Result<Option<Session>> {
        let normalized = normalize(participants);
        if normalized.is_empty() {
            return Ok(None);
        }
        let key = participant_key(&normalized);

        let indexed: Vec<&Participant> = normalized.iter().filter(|p| p.kind.is_indexed()).collect();
        if indexed.is_empty() {
            return Ok(self.repo.find_by_participant_key(&key).await?);
        }

        let mut candidates: Option<HashSet<Uuid>> = None;
        for participant in indexed {
            let ids = self.repo.session_ids_for(participant).await?;
            let narrowed = match candidates {
                Some(current) => current.intersection(&ids).copied().collect(),
                None => ids,
            };
            if narrowed.is_empty() {
                return Ok(None);
            }
            candidates = Some(narrowed);
        }

        let ids: Vec<Uuid> = candidates.unwrap_or_default().into_iter().collect();
        let sessions = self.repo.find_by_ids(&ids).await?;
        // A superset session (extra participants) shares the index entries,
        // so the key decides.
        Ok(sessions.into_iter().find(|s| s.participant_key == key))
    }

    pub async fn get(&self, session_id: &Uuid) -> Result<Session> {
        self.repo
            .find_by_id(session_id)
            .await?
            .ok_or(Error::SessionNotFound(*session_id))
    }

    /// Record activity on the session without waiting for the write.
    ///
    /// Failures are logged and never reach the caller.
    pub fn touch_activity(&self, session_id: Uuid) {
        let repo = self.repo.clone();
        tokio::spawn(async move {
            if let Err(e) = repo.touch(&session_id, Utc::now()).await {
                warn!("Failed to update activity for session {session_id}: {e}");
            }
        });
    }

    /// Sessions of a user, most recently active first.
    pub async fn find_by_user(&self, user_id: &str) -> Result<Vec<Session>> {
        self.find_by_participant(&Participant::user(user_id)).await
    }

    /// Sessions of an agent, most recently active first.
    pub async fn find_by_agent(&self, agent_id: &str) -> Result<Vec<Session>> {
        self.find_by_participant(&Participant::agent(agent_id)).await
    }

    async fn find_by_participant(&self, participant: &Participant) -> Result<Vec<Session>> {
        let ids: Vec<Uuid> = self
            .repo
            .session_ids_for(participant)
            .await?
            .into_iter()
            .collect();
        let mut sessions = self.repo.find_by_ids(&ids).await?;
        sessions.sort_by(|a, b| b.last_active_at.cmp(&a.last_active_at));
        Ok(sessions)
    }
}

fn validate_participants(participants: &[Participant]) -> Result<()> {
    if participants.is_empty() {
        return Err(Error::validation("participants must not be empty"));
    }
    if let Some(blank) = participants.iter().find(|p| p.id.trim().is_empty()) {
        return Err(Error::validation(format!(
            "participant of type {} has an empty id",
            blank.kind
        )));
    }
    Ok(())
}

fn describe(participants: &[Participant]) -> String {
    participants
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::{ErrorCode, ParticipantType};
    use persona_store::MemoryStore;
    use std::time::Duration;

    fn directory() -> SessionDirectory {
        SessionDirectory::new(Arc::new(MemoryStore::new()))
    }

    fn pair(user: &str, agent: &str) -> Vec<Participant> {
        vec![Participant::user(user), Participant::agent(agent)]
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn get_or_create_is_idempotent() {
        let dir = directory();
        let first = dir.get_or_create(&pair("u1", "a1")).await.expect("create");
        let second = dir.get_or_create(&pair("u1", "a1")).await.expect("lookup");
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn get_or_create_ignores_participant_order() {
        let dir = directory();
        let forward = dir.get_or_create(&pair("u1", "a1")).await.expect("create");
        let reversed = dir
            .get_or_create(&[Participant::agent("a1"), Participant::user("u1")])
            .await
            .expect("lookup");
        assert_eq!(forward.id, reversed.id);
        assert_eq!(forward.participants, pair("u1", "a1"));
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn distinct_pairs_get_distinct_sessions() {
        let dir = directory();
        let a = dir.get_or_create(&pair("u1", "a1")).await.expect("create");
        let b = dir.get_or_create(&pair("u1", "a2")).await.expect("create");
        let c = dir.get_or_create(&pair("u2", "a1")).await.expect("create");
        assert_ne!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_ne!(b.id, c.id);
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn concurrent_get_or_create_converges() {
        let dir = directory();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let dir = dir.clone();
            handles.push(tokio::spawn(async move {
                dir.get_or_create(&pair("same", "pair")).await.map(|s| s.id)
            }));
        }
        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.expect("join").expect("get_or_create"));
        }
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn find_by_participants_empty_is_none() {
        let dir = directory();
        assert!(dir.find_by_participants(&[]).await.expect("find").is_none());
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn find_by_participants_unknown_pair_is_none() {
        let dir = directory();
        dir.get_or_create(&pair("u1", "a1")).await.expect("create");
        let missing = dir
            .find_by_participants(&pair("u1", "nobody"))
            .await
            .expect("find");
        assert!(missing.is_none());
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn find_by_participants_does_not_match_superset() {
        let dir = directory();
        let trio = vec![
            Participant::user("u1"),
            Participant::agent("a1"),
            Participant::agent("a2"),
        ];
        dir.get_or_create(&trio).await.expect("create trio");

        let pair_lookup = dir
            .find_by_participants(&pair("u1", "a1"))
            .await
            .expect("find");
        assert!(pair_lookup.is_none());
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn unindexed_types_fall_back_to_key_lookup() {
        let dir = directory();
        let odd = vec![
            Participant::new(ParticipantType::Bot, "b1"),
            Participant::new(ParticipantType::System, "s1"),
        ];
        let created = dir.get_or_create(&odd).await.expect("create");
        let found = dir
            .find_by_participants(&odd)
            .await
            .expect("find")
            .expect("present");
        assert_eq!(created.id, found.id);
    }

    #[tokio::test]
    async fn empty_participants_are_rejected() {
        let dir = directory();
        let err = dir.get_or_create(&[]).await.err();
        assert_eq!(err.map(|e| e.code()), Some(ErrorCode::ValidationError));

        let err = dir.get_or_create(&pair("", "a1")).await.err();
        assert_eq!(err.map(|e| e.code()), Some(ErrorCode::ValidationError));
    }

    #[tokio::test]
    async fn get_unknown_session_is_not_found() {
        let dir = directory();
        let err = dir.get(&Uuid::now_v7()).await.err();
        assert_eq!(err.map(|e| e.code()), Some(ErrorCode::SessionNotFound));
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn find_by_user_orders_by_recent_activity() {
        let dir = directory();
        let older = dir.get_or_create(&pair("u1", "a1")).await.expect("create");
        tokio::time::sleep(Duration::from_millis(5)).await;
        let newer = dir.get_or_create(&pair("u1", "a2")).await.expect("create");
        dir.get_or_create(&pair("u2", "a1")).await.expect("create");

        let sessions = dir.find_by_user("u1").await.expect("find");
        let ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);

        tokio::time::sleep(Duration::from_millis(5)).await;
        dir.touch_activity(older.id);
        // Touch runs detached; give it a moment.
        let mut reordered = Vec::new();
        for _ in 0..50 {
            reordered = dir.find_by_user("u1").await.expect("find");
            if reordered.first().map(|s| s.id) == Some(older.id) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(reordered.first().map(|s| s.id), Some(older.id));

        let by_agent = dir.find_by_agent("a1").await.expect("find");
        assert_eq!(by_agent.len(), 2);
    }

    #[tokio::test]
    async fn touch_unknown_session_does_not_panic() {
        let dir = directory();
        dir.touch_activity(Uuid::now_v7());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
