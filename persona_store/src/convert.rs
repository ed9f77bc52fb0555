use chrono::{DateTime, Utc};
use persona_core::{Event, Participant, ParticipantType, Session};
use persona_entities::{events, session_participants, sessions};
use sea_orm::Set;

pub fn session_from_model(m: sessions::Model) -> anyhow::Result<Session> {
    let participants: Vec<Participant> = serde_json::from_str(&m.participants)?;
    Ok(Session {
        id: m.id,
        participants,
        participant_key: m.participant_key,
        created_at: m.created_at,
        last_active_at: m.last_active_at,
    })
}

pub fn session_to_active_model(session: &Session) -> anyhow::Result<sessions::ActiveModel> {
    Ok(sessions::ActiveModel {
        id: Set(session.id),
        participant_key: Set(session.participant_key.clone()),
        participants: Set(serde_json::to_string(&session.participants)?),
        created_at: Set(session.created_at),
        last_active_at: Set(session.last_active_at),
    })
}

pub fn participant_index_rows(session: &Session) -> Vec<session_participants::ActiveModel> {
    session
        .participants
        .iter()
        .filter(|p| p.kind.is_indexed())
        .map(|p| session_participants::ActiveModel {
            participant_type: Set(p.kind.as_str().to_string()),
            participant_id: Set(p.id.clone()),
            session_id: Set(session.id),
        })
        .collect()
}

fn parse_type(raw: &str) -> anyhow::Result<ParticipantType> {
    raw.parse::<ParticipantType>().map_err(anyhow::Error::msg)
}

pub fn event_from_model(m: events::Model) -> anyhow::Result<Event> {
    let timestamp = DateTime::<Utc>::from_timestamp_micros(m.timestamp_us)
        .ok_or_else(|| anyhow::anyhow!("event {} has an out-of-range timestamp", m.id))?;
    Ok(Event {
        id: m.id,
        session_id: m.session_id,
        from_type: parse_type(&m.from_type)?,
        from_id: m.from_id,
        to_type: parse_type(&m.to_type)?,
        to_id: m.to_id,
        content: m.content,
        timestamp,
    })
}

pub fn event_to_active_model(event: &Event) -> events::ActiveModel {
    events::ActiveModel {
        id: Set(event.id),
        session_id: Set(event.session_id),
        from_type: Set(event.from_type.as_str().to_string()),
        from_id: Set(event.from_id.clone()),
        to_type: Set(event.to_type.as_str().to_string()),
        to_id: Set(event.to_id.clone()),
        content: Set(event.content.clone()),
        timestamp_us: Set(event.timestamp.timestamp_micros()),
    }
}
