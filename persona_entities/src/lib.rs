//! sea-orm entities backing the session directory and event ledger.

pub mod events;
pub mod session_participants;
pub mod sessions;

pub mod prelude {
    pub use super::events::Entity as Events;
    pub use super::session_participants::Entity as SessionParticipants;
    pub use super::sessions::Entity as Sessions;
}
