use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    /// Human-readable slug used in URLs in place of the numeric id
    pub identifier: String,
    pub name: String,
    pub owner_id: Option<i64>,
}
