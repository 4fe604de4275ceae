use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;

use super::Row;
use crate::filter::ColumnKind;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Faq {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub event_id: Option<i64>,
}

impl Faq {
    pub const TABLE: &'static str = "faqs";
    /// Columns clients may filter and sort on
    pub const COLUMNS: &'static [(&'static str, ColumnKind)] = &[
        ("id", ColumnKind::Integer),
        ("question", ColumnKind::Text),
        ("answer", ColumnKind::Text),
        ("event_id", ColumnKind::Integer),
    ];
}

impl Row for Faq {
    fn column(&self, name: &str) -> Value {
        match name {
            "id" => json!(self.id),
            "question" => json!(self.question),
            "answer" => json!(self.answer),
            "event_id" => json!(self.event_id),
            _ => Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFaq {
    pub question: String,
    pub answer: String,
    pub event_id: i64,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaqChanges {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub event_id: Option<i64>,
}

impl FaqChanges {
    pub fn is_empty(&self) -> bool {
        self.question.is_none() && self.answer.is_none() && self.event_id.is_none()
    }

    pub fn apply(&self, faq: &mut Faq) {
        if let Some(question) = &self.question {
            faq.question = question.clone();
        }
        if let Some(answer) = &self.answer {
            faq.answer = answer.clone();
        }
        if let Some(event_id) = self.event_id {
            faq.event_id = Some(event_id);
        }
    }
}
