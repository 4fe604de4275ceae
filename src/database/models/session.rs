use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: i64,
    pub title: String,
    pub event_id: Option<i64>,
    pub microlocation_id: Option<i64>,
}
