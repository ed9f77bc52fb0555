use async_trait::async_trait;
use chrono::{DateTime, Utc};
use persona_core::{Event, EventRepo, Participant, Session, SessionRepo};
use persona_entities::{events, session_participants, sessions};
use sea_orm::sea_query::{Expr, Index};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Schema, TransactionTrait,
};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::convert;

fn is_already_exists_error(err: &DbErr) -> bool {
    let message = err.to_string();
    message.contains("already exists") || message.contains("Duplicate key name")
}

/// sea-orm backed store.
///
/// The unique index on `sessions.participant_key` is the arbiter for
/// concurrent first contact: a writer that loses the insert race reads back
/// the winner's session.
pub struct DatabaseStore {
    db: DatabaseConnection,
}

impl DatabaseStore {
    /// Connect and create any missing tables.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        info!("Connecting to database for DatabaseStore");
        let db = Database::connect(database_url).await?;
        Self::from_connection(db).await
    }

    async fn from_connection(db: DatabaseConnection) -> anyhow::Result<Self> {
        let store = Self { db };
        store.create_schema().await?;
        info!("DatabaseStore initialized");
        Ok(store)
    }

    async fn create_schema(&self) -> anyhow::Result<()> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let tables = [
            schema.create_table_from_entity(sessions::Entity),
            schema.create_table_from_entity(session_participants::Entity),
            schema.create_table_from_entity(events::Entity),
        ];
        for stmt in &tables {
            self.execute_ddl(&backend.build(stmt).to_string()).await?;
        }

        let events_by_session = Index::create()
            .name("idx_events_session_timestamp")
            .table(events::Entity)
            .col(events::Column::SessionId)
            .col(events::Column::TimestampUs)
            .to_owned();
        self.execute_ddl(&backend.build(&events_by_session).to_string())
            .await?;

        let sessions_by_participant = Index::create()
            .name("idx_session_participants_session")
            .table(session_participants::Entity)
            .col(session_participants::Column::SessionId)
            .to_owned();
        self.execute_ddl(&backend.build(&sessions_by_participant).to_string())
            .await?;

        Ok(())
    }

    async fn execute_ddl(&self, sql: &str) -> anyhow::Result<()> {
        match self.db.execute_unprepared(sql).await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists_error(&e) => {
                debug!("Schema object already exists, skipping creation");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_session_with_index(&self, session: &Session) -> anyhow::Result<()> {
        let txn = self.db.begin().await?;

        let result = async {
            convert::session_to_active_model(session)?
                .insert(&txn)
                .await?;
            for row in convert::participant_index_rows(session) {
                session_participants::Entity::insert(row)
                    .exec_without_returning(&txn)
                    .await?;
            }
            anyhow::Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                txn.commit().await?;
                Ok(())
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl SessionRepo for DatabaseStore {
    async fn insert_if_absent(&self, session: &Session) -> anyhow::Result<(Session, bool)> {
        if let Some(existing) = self
            .find_by_participant_key(&session.participant_key)
            .await?
        {
            return Ok((existing, false));
        }

        match self.insert_session_with_index(session).await {
            Ok(()) => {
                debug!("Stored session {} in database", session.id);
                Ok((session.clone(), true))
            }
            Err(e) => {
                // Lost the race on the unique participant key.
                if let Some(existing) = self
                    .find_by_participant_key(&session.participant_key)
                    .await?
                {
                    warn!(
                        "Concurrent session creation for key {}, using {}",
                        session.participant_key, existing.id
                    );
                    return Ok((existing, false));
                }
                Err(e)
            }
        }
    }

    async fn find_by_id(&self, id: &Uuid) -> anyhow::Result<Option<Session>> {
        sessions::Entity::find_by_id(*id)
            .one(&self.db)
            .await?
            .map(convert::session_from_model)
            .transpose()
    }

    async fn find_by_participant_key(&self, key: &str) -> anyhow::Result<Option<Session>> {
        sessions::Entity::find()
            .filter(sessions::Column::ParticipantKey.eq(key))
            .one(&self.db)
            .await?
            .map(convert::session_from_model)
            .transpose()
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Session>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sessions::Entity::find()
            .filter(sessions::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(convert::session_from_model)
            .collect()
    }

    async fn session_ids_for(&self, participant: &Participant) -> anyhow::Result<HashSet<Uuid>> {
        let rows = session_participants::Entity::find()
            .filter(session_participants::Column::ParticipantType.eq(participant.kind.as_str()))
            .filter(session_participants::Column::ParticipantId.eq(participant.id.as_str()))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|r| r.session_id).collect())
    }

    async fn touch(&self, id: &Uuid, at: DateTime<Utc>) -> anyhow::Result<()> {
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::LastActiveAt, Expr::value(at))
            .filter(sessions::Column::Id.eq(*id))
            .exec(&self.db)
            .await?;
        debug!("Touched session {} ({} rows)", id, result.rows_affected);
        Ok(())
    }
}

#[async_trait]
impl EventRepo for DatabaseStore {
    async fn insert(&self, event: &Event) -> anyhow::Result<()> {
        events::Entity::insert(convert::event_to_active_model(event))
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &Uuid) -> anyhow::Result<Option<Event>> {
        events::Entity::find_by_id(*id)
            .one(&self.db)
            .await?
            .map(convert::event_from_model)
            .transpose()
    }

    async fn list_by_session(&self, session_id: &Uuid) -> anyhow::Result<Vec<Event>> {
        events::Entity::find()
            .filter(events::Column::SessionId.eq(*session_id))
            .order_by_asc(events::Column::TimestampUs)
            .order_by_asc(events::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(convert::event_from_model)
            .collect()
    }

    async fn recent_by_session(
        &self,
        session_id: &Uuid,
        limit: usize,
    ) -> anyhow::Result<Vec<Event>> {
        let mut recent = events::Entity::find()
            .filter(events::Column::SessionId.eq(*session_id))
            .order_by_desc(events::Column::TimestampUs)
            .order_by_desc(events::Column::Id)
            .limit(limit as u64)
            .all(&self.db)
            .await?
            .into_iter()
            .map(convert::event_from_model)
            .collect::<anyhow::Result<Vec<_>>>()?;
        recent.reverse();
        Ok(recent)
    }
}
