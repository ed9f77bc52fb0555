use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::participant::{Participant, ParticipantType, normalize, participant_key};

/// Durable conversational context for one unordered participant set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// Canonically ordered participants.
    pub participants: Vec<Participant>,
    /// Uniqueness key derived from `participants`.
    pub participant_key: String,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn new(participants: &[Participant], now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            participants: normalize(participants),
            participant_key: participant_key(participants),
            created_at: now,
            last_active_at: now,
        }
    }

    fn first_of(&self, kind: ParticipantType) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.kind == kind)
            .map(|p| p.id.as_str())
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.first_of(ParticipantType::User)
    }

    #[must_use]
    pub fn agent_id(&self) -> Option<&str> {
        self.first_of(ParticipantType::Agent)
    }

    #[must_use]
    pub fn has_participant(&self, participant: &Participant) -> bool {
        self.participants.contains(participant)
    }
}
