use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of `users_events_roles`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventRole {
    pub user_id: i64,
    pub event_id: i64,
    pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    Organizer,
    Coorganizer,
    TrackOrganizer,
    Moderator,
    Registrar,
}

impl RoleName {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "organizer" => RoleName::Organizer,
            "coorganizer" => RoleName::Coorganizer,
            "track_organizer" => RoleName::TrackOrganizer,
            "moderator" => RoleName::Moderator,
            "registrar" => RoleName::Registrar,
            _ => return None,
        })
    }
}

impl EventRole {
    /// Unknown role strings never grant anything
    pub fn name(&self) -> Option<RoleName> {
        RoleName::parse(&self.role)
    }
}
