//! Integration tests for the sea-orm backend on a temporary SQLite file.
//!
//! These tests verify that:
//! - Sessions are unique per participant set, including under concurrency
//! - The participant index is written together with the session
//! - Events come back ordered, and `recent_by_session` keeps that order

use chrono::{Duration, Utc};
use persona_core::{Event, EventRepo, Participant, ParticipantType, Session, SessionRepo};
use persona_store::DatabaseStore;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

async fn open_store() -> (TempDir, DatabaseStore) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("persona.db").display());
    let store = DatabaseStore::connect(&url)
        .await
        .expect("Failed to open database store");
    (dir, store)
}

fn user_event(session_id: Uuid, content: &str, offset_ms: i64) -> Event {
    Event {
        id: Uuid::now_v7(),
        session_id,
        from_type: ParticipantType::User,
        from_id: "alice".to_string(),
        to_type: ParticipantType::Agent,
        to_id: "sage".to_string(),
        content: content.to_string(),
        timestamp: Utc::now() + Duration::milliseconds(offset_ms),
    }
}

#[tokio::test]
async fn test_insert_if_absent_is_idempotent() {
    let (_dir, store) = open_store().await;
    let now = Utc::now();

    let first = Session::new(&[Participant::user("alice"), Participant::agent("sage")], now);
    let (stored, created) = store
        .insert_if_absent(&first)
        .await
        .expect("Failed to insert session");
    assert!(created);
    assert_eq!(stored.participants, first.participants);

    let again = Session::new(&[Participant::agent("sage"), Participant::user("alice")], now);
    let (stored, created) = store
        .insert_if_absent(&again)
        .await
        .expect("Failed to look up session");
    assert!(!created);
    assert_eq!(stored.id, first.id);
}

#[tokio::test]
async fn test_participant_index_written_with_session() {
    let (_dir, store) = open_store().await;
    let session = Session::new(
        &[Participant::user("alice"), Participant::agent("sage")],
        Utc::now(),
    );
    store
        .insert_if_absent(&session)
        .await
        .expect("Failed to insert session");

    let by_user = store
        .session_ids_for(&Participant::user("alice"))
        .await
        .expect("Failed to read index");
    let by_agent = store
        .session_ids_for(&Participant::agent("sage"))
        .await
        .expect("Failed to read index");
    assert_eq!(by_user, HashSet::from([session.id]));
    assert_eq!(by_agent, HashSet::from([session.id]));

    let found = store
        .find_by_ids(&[session.id, Uuid::now_v7()])
        .await
        .expect("Failed to load sessions");
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn test_concurrent_first_contact_yields_one_session() {
    let (_dir, store) = open_store().await;
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let session = Session::new(
                &[Participant::user("racer"), Participant::agent("sage")],
                Utc::now(),
            );
            store.insert_if_absent(&session).await.map(|(s, _)| s.id)
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(
            handle
                .await
                .expect("Task panicked")
                .expect("Failed to insert session"),
        );
    }
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn test_events_round_trip_in_order() {
    let (_dir, store) = open_store().await;
    let session_id = Uuid::now_v7();

    for (content, offset) in [("b", 20), ("a", 10), ("c", 30), ("d", 40)] {
        store
            .insert(&user_event(session_id, content, offset))
            .await
            .expect("Failed to insert event");
    }
    store
        .insert(&user_event(Uuid::now_v7(), "other session", 0))
        .await
        .expect("Failed to insert event");

    let all = store
        .list_by_session(&session_id)
        .await
        .expect("Failed to list events");
    let contents: Vec<&str> = all.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, vec!["a", "b", "c", "d"]);

    for k in 0..=all.len() {
        let recent = store
            .recent_by_session(&session_id, k)
            .await
            .expect("Failed to read recent events");
        assert_eq!(recent, all[all.len() - k..].to_vec());
    }

    let one = EventRepo::find_by_id(&store, &all[0].id)
        .await
        .expect("Failed to find event")
        .expect("Event should exist");
    assert_eq!(one, all[0]);
}

#[tokio::test]
async fn test_touch_updates_last_active() {
    let (_dir, store) = open_store().await;
    let session = Session::new(
        &[Participant::user("alice"), Participant::agent("sage")],
        Utc::now(),
    );
    store
        .insert_if_absent(&session)
        .await
        .expect("Failed to insert session");

    let later = session.last_active_at + Duration::minutes(5);
    store
        .touch(&session.id, later)
        .await
        .expect("Failed to touch session");

    let stored = SessionRepo::find_by_id(&store, &session.id)
        .await
        .expect("Failed to load session")
        .expect("Session should exist");
    assert_eq!(stored.last_active_at.timestamp(), later.timestamp());
}
