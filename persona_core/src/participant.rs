//! Participant identities and their canonical ordering.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Kind of party to a session.
///
/// The declaration order is the canonical sort priority. Only `User` and
/// `Agent` take part in sessions today; `Bot` and `System` are reserved and
/// never indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantType {
    User,
    Agent,
    Bot,
    System,
}

impl ParticipantType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::Bot => "bot",
            Self::System => "system",
        }
    }

    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::User => 0,
            Self::Agent => 1,
            Self::Bot => 2,
            Self::System => 3,
        }
    }

    /// Whether sessions are reverse-indexed by participants of this type.
    #[must_use]
    pub const fn is_indexed(self) -> bool {
        matches!(self, Self::User | Self::Agent)
    }
}

impl fmt::Display for ParticipantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "agent" => Ok(Self::Agent),
            "bot" => Ok(Self::Bot),
            "system" => Ok(Self::System),
            other => Err(format!("unknown participant type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "type")]
    pub kind: ParticipantType,
    pub id: String,
}

impl Participant {
    #[must_use]
    pub fn new(kind: ParticipantType, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Self::new(ParticipantType::User, id)
    }

    #[must_use]
    pub fn agent(id: impl Into<String>) -> Self {
        Self::new(ParticipantType::Agent, id)
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl Ord for Participant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .priority()
            .cmp(&other.kind.priority())
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Participant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Canonical form of a participant set: type priority first, then id.
#[must_use]
pub fn normalize(participants: &[Participant]) -> Vec<Participant> {
    let mut sorted = participants.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted
}

/// Stable lookup key for an unordered participant set.
///
/// SHA-256 over the canonical `type:id` sequence, hex encoded. Identical for
/// every permutation of the same set.
#[must_use]
pub fn participant_key(participants: &[Participant]) -> String {
    let mut hasher = Sha256::new();
    for (i, participant) in normalize(participants).iter().enumerate() {
        if i > 0 {
            hasher.update(b"|");
        }
        hasher.update(participant.kind.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(participant.id.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_orders_by_type_priority_then_id() {
        let input = vec![
            Participant::new(ParticipantType::System, "s"),
            Participant::agent("a2"),
            Participant::user("u1"),
            Participant::agent("a1"),
            Participant::new(ParticipantType::Bot, "b"),
        ];

        let normalized = normalize(&input);
        let rendered: Vec<String> = normalized.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["user:u1", "agent:a1", "agent:a2", "bot:b", "system:s"]
        );
    }

    #[test]
    fn normalize_is_permutation_invariant() {
        let a = Participant::user("alice");
        let b = Participant::agent("helper");
        let c = Participant::agent("critic");

        let expected = normalize(&[a.clone(), b.clone(), c.clone()]);
        let permutations = [
            vec![a.clone(), c.clone(), b.clone()],
            vec![b.clone(), a.clone(), c.clone()],
            vec![b.clone(), c.clone(), a.clone()],
            vec![c.clone(), a.clone(), b.clone()],
            vec![c, b, a],
        ];
        for p in permutations {
            assert_eq!(normalize(&p), expected);
        }
    }

    #[test]
    fn participant_key_ignores_order() {
        let forward = participant_key(&[Participant::user("u"), Participant::agent("a")]);
        let backward = participant_key(&[Participant::agent("a"), Participant::user("u")]);
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 64);
    }

    #[test]
    fn participant_key_distinguishes_types() {
        let as_user = participant_key(&[Participant::user("x"), Participant::agent("y")]);
        let swapped = participant_key(&[Participant::agent("x"), Participant::user("y")]);
        assert_ne!(as_user, swapped);
    }

    #[test]
    fn parse_participant_type() {
        assert_eq!("agent".parse::<ParticipantType>(), Ok(ParticipantType::Agent));
        assert!("robot".parse::<ParticipantType>().is_err());
    }
}
