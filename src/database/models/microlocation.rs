use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;

use super::Row;
use crate::filter::ColumnKind;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Microlocation {
    pub id: i64,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub floor: Option<i32>,
    pub room: Option<String>,
    pub event_id: Option<i64>,
}

impl Microlocation {
    pub const TABLE: &'static str = "microlocations";
    pub const COLUMNS: &'static [(&'static str, ColumnKind)] = &[
        ("id", ColumnKind::Integer),
        ("name", ColumnKind::Text),
        ("latitude", ColumnKind::Float),
        ("longitude", ColumnKind::Float),
        ("floor", ColumnKind::Integer),
        ("room", ColumnKind::Text),
        ("event_id", ColumnKind::Integer),
    ];
}

impl Row for Microlocation {
    fn column(&self, name: &str) -> Value {
        match name {
            "id" => json!(self.id),
            "name" => json!(self.name),
            "latitude" => json!(self.latitude),
            "longitude" => json!(self.longitude),
            "floor" => json!(self.floor),
            "room" => json!(self.room),
            "event_id" => json!(self.event_id),
            _ => Value::Null,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewMicrolocation {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub floor: Option<i32>,
    pub room: Option<String>,
    pub event_id: i64,
}

/// Partial update. The outer `Option` says whether the attribute was sent,
/// the inner one carries an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MicrolocationChanges {
    pub name: Option<String>,
    pub latitude: Option<Option<f64>>,
    pub longitude: Option<Option<f64>>,
    pub floor: Option<Option<i32>>,
    pub room: Option<Option<String>>,
    pub event_id: Option<i64>,
}

impl MicrolocationChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.floor.is_none()
            && self.room.is_none()
            && self.event_id.is_none()
    }

    pub fn apply(&self, location: &mut Microlocation) {
        if let Some(name) = &self.name {
            location.name = name.clone();
        }
        if let Some(latitude) = self.latitude {
            location.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            location.longitude = longitude;
        }
        if let Some(floor) = self.floor {
            location.floor = floor;
        }
        if let Some(room) = &self.room {
            location.room = room.clone();
        }
        if let Some(event_id) = self.event_id {
            location.event_id = Some(event_id);
        }
    }
}
