//! Test doubles: an in-memory `Store` that evaluates listing filters the
//! way the Postgres store's SQL does, plus principal and token fixtures.

use std::cmp::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::{generate_jwt, Claims, Principal};
use crate::database::models::{
    Event, EventRole, Faq, FaqChanges, Microlocation, MicrolocationChanges, NewFaq, NewMicrolocation, Row, Session,
};
use crate::database::{DatabaseError, Store};
use crate::filter::{Filter, FilterOp, FilterWhereInfo, SortDirection};

/// A plain user with no staff flags
pub fn principal(user_id: i64) -> Principal {
    Principal {
        user_id,
        email: format!("user{}@example.com", user_id),
        is_admin: false,
        is_super_admin: false,
    }
}

/// Signed bearer token for `user_id`
pub fn token(user_id: i64) -> String {
    generate_jwt(&Claims::new(user_id, format!("user{}@example.com", user_id), false, false)).unwrap()
}

#[derive(Default)]
struct Tables {
    events: Vec<Event>,
    roles: Vec<EventRole>,
    sessions: Vec<Session>,
    faqs: Vec<Faq>,
    microlocations: Vec<Microlocation>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&self, id: i64, identifier: &str, owner_id: Option<i64>) {
        self.tables.lock().unwrap().events.push(Event {
            id,
            identifier: identifier.to_string(),
            name: identifier.to_uppercase(),
            owner_id,
        });
    }

    pub fn add_role(&self, user_id: i64, event_id: i64, role: &str) {
        self.tables.lock().unwrap().roles.push(EventRole { user_id, event_id, role: role.to_string() });
    }

    pub fn add_session(&self, id: i64, event_id: i64, microlocation_id: Option<i64>) {
        self.tables.lock().unwrap().sessions.push(Session {
            id,
            title: format!("Session {}", id),
            event_id: Some(event_id),
            microlocation_id,
        });
    }

    pub fn add_faq(&self, id: i64, question: &str, answer: &str, event_id: Option<i64>) {
        self.tables.lock().unwrap().faqs.push(Faq {
            id,
            question: question.to_string(),
            answer: answer.to_string(),
            event_id,
        });
    }

    pub fn add_microlocation(&self, id: i64, name: &str, event_id: Option<i64>) {
        self.tables.lock().unwrap().microlocations.push(Microlocation {
            id,
            name: name.to_string(),
            latitude: None,
            longitude: None,
            floor: None,
            room: None,
            event_id,
        });
    }

    pub fn faq_count(&self) -> usize {
        self.tables.lock().unwrap().faqs.len()
    }

    pub fn microlocation_count(&self) -> usize {
        self.tables.lock().unwrap().microlocations.len()
    }

    /// Mirrors the foreign keys: FAQs, microlocations and sessions of the
    /// event go with it, and sessions lose their deleted microlocation.
    pub fn delete_event(&self, event_id: i64) {
        let mut tables = self.tables.lock().unwrap();
        tables.events.retain(|e| e.id != event_id);
        tables.roles.retain(|r| r.event_id != event_id);
        tables.faqs.retain(|f| f.event_id != Some(event_id));
        tables.sessions.retain(|s| s.event_id != Some(event_id));
        tables.microlocations.retain(|m| m.event_id != Some(event_id));
        let remaining: Vec<i64> = tables.microlocations.iter().map(|m| m.id).collect();
        for session in tables.sessions.iter_mut() {
            if matches!(session.microlocation_id, Some(id) if !remaining.contains(&id)) {
                session.microlocation_id = None;
            }
        }
    }

    /// Rows passing the conditions and join, in filter order
    fn matching<T: Row + Clone>(rows: &[T], sessions: &[Session], filter: &Filter) -> Vec<T> {
        let mut matched: Vec<T> = rows
            .iter()
            .filter(|row| filter.conditions().iter().all(|c| matches_condition(*row, c)))
            .filter(|row| match filter.join_data() {
                Some(join) => sessions
                    .iter()
                    .find(|s| s.id == join.id)
                    .map(|s| session_column(s, &join.foreign_key) == row.column("id"))
                    .unwrap_or(false),
                None => true,
            })
            .cloned()
            .collect();

        let order = filter.order_infos();
        matched.sort_by(|a, b| {
            for info in &order {
                let ord = compare(&a.column(&info.column), &b.column(&info.column)).unwrap_or(Ordering::Equal);
                let ord = match info.sort {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        matched
    }

    fn select<T: Row + Clone>(rows: &[T], sessions: &[Session], filter: &Filter) -> Vec<T> {
        let matched = Self::matching(rows, sessions, filter);
        let offset = filter.offset_value().unwrap_or(0).max(0) as usize;
        let limit = filter.limit_value().map(|l| l as usize).unwrap_or(usize::MAX);
        matched.into_iter().skip(offset).take(limit).collect()
    }

    fn count<T: Row + Clone>(rows: &[T], sessions: &[Session], filter: &Filter) -> i64 {
        Self::matching(rows, sessions, filter).len() as i64
    }
}

fn session_column(session: &Session, name: &str) -> Value {
    match name {
        "id" => Value::from(session.id),
        "event_id" => session.event_id.map(Value::from).unwrap_or(Value::Null),
        "microlocation_id" => session.microlocation_id.map(Value::from).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        // Postgres sorts NULL last in ascending order
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Greater),
        (_, Value::Null) => Some(Ordering::Less),
        _ => None,
    }
}

fn like(text: &str, pattern: &str) -> bool {
    fn go(t: &[char], p: &[char]) -> bool {
        match p.split_first() {
            None => t.is_empty(),
            Some(('%', rest)) => (0..=t.len()).any(|i| go(&t[i..], rest)),
            Some(('_', rest)) => !t.is_empty() && go(&t[1..], rest),
            Some((c, rest)) => t.first() == Some(c) && go(&t[1..], rest),
        }
    }
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    go(&t, &p)
}

fn matches_condition<T: Row>(row: &T, condition: &FilterWhereInfo) -> bool {
    let value = row.column(&condition.column);
    let data = &condition.data;
    match condition.operator {
        FilterOp::Eq if data.is_null() => value.is_null(),
        FilterOp::Ne if data.is_null() => !value.is_null(),
        _ if value.is_null() => false,
        FilterOp::Eq => compare(&value, data) == Some(Ordering::Equal),
        FilterOp::Ne => compare(&value, data) != Some(Ordering::Equal),
        FilterOp::Gt => compare(&value, data) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(compare(&value, data), Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Lt => compare(&value, data) == Some(Ordering::Less),
        FilterOp::Lte => matches!(compare(&value, data), Some(Ordering::Less | Ordering::Equal)),
        FilterOp::Like => match (value.as_str(), data.as_str()) {
            (Some(text), Some(pattern)) => like(text, pattern),
            _ => false,
        },
        FilterOp::ILike => match (value.as_str(), data.as_str()) {
            (Some(text), Some(pattern)) => like(&text.to_lowercase(), &pattern.to_lowercase()),
            _ => false,
        },
        FilterOp::In => data
            .as_array()
            .map(|items| items.iter().any(|item| compare(&value, item) == Some(Ordering::Equal)))
            .unwrap_or(false),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn event_by_id(&self, id: i64) -> Result<Option<Event>, DatabaseError> {
        Ok(self.tables.lock().unwrap().events.iter().find(|e| e.id == id).cloned())
    }

    async fn event_by_identifier(&self, identifier: &str) -> Result<Option<Event>, DatabaseError> {
        Ok(self.tables.lock().unwrap().events.iter().find(|e| e.identifier == identifier).cloned())
    }

    async fn session_by_id(&self, id: i64) -> Result<Option<Session>, DatabaseError> {
        Ok(self.tables.lock().unwrap().sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn event_roles(&self, user_id: i64, event_id: i64) -> Result<Vec<EventRole>, DatabaseError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .roles
            .iter()
            .filter(|r| r.user_id == user_id && r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn faq_by_id(&self, id: i64) -> Result<Option<Faq>, DatabaseError> {
        Ok(self.tables.lock().unwrap().faqs.iter().find(|f| f.id == id).cloned())
    }

    async fn faq_by_event(&self, event_id: i64) -> Result<Option<Faq>, DatabaseError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .faqs
            .iter()
            .filter(|f| f.event_id == Some(event_id))
            .min_by_key(|f| f.id)
            .cloned())
    }

    async fn list_faqs(&self, filter: &Filter) -> Result<Vec<Faq>, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        Ok(Self::select(&tables.faqs, &tables.sessions, filter))
    }

    async fn count_faqs(&self, filter: &Filter) -> Result<i64, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        Ok(Self::count(&tables.faqs, &tables.sessions, filter))
    }

    async fn insert_faq(&self, faq: NewFaq) -> Result<Faq, DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.faqs.iter().map(|f| f.id).max().unwrap_or(0) + 1;
        let row = Faq { id, question: faq.question, answer: faq.answer, event_id: Some(faq.event_id) };
        tables.faqs.push(row.clone());
        Ok(row)
    }

    async fn update_faq(&self, id: i64, changes: &FaqChanges) -> Result<Option<Faq>, DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.faqs.iter_mut().find(|f| f.id == id).map(|faq| {
            changes.apply(faq);
            faq.clone()
        }))
    }

    async fn delete_faq(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.faqs.len();
        tables.faqs.retain(|f| f.id != id);
        Ok(tables.faqs.len() != before)
    }

    async fn microlocation_by_id(&self, id: i64) -> Result<Option<Microlocation>, DatabaseError> {
        Ok(self.tables.lock().unwrap().microlocations.iter().find(|m| m.id == id).cloned())
    }

    async fn list_microlocations(&self, filter: &Filter) -> Result<Vec<Microlocation>, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        Ok(Self::select(&tables.microlocations, &tables.sessions, filter))
    }

    async fn count_microlocations(&self, filter: &Filter) -> Result<i64, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        Ok(Self::count(&tables.microlocations, &tables.sessions, filter))
    }

    async fn insert_microlocation(
        &self,
        location: NewMicrolocation,
        session_ids: &[i64],
    ) -> Result<Microlocation, DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        if session_ids.iter().any(|sid| !tables.sessions.iter().any(|s| s.id == *sid)) {
            return Err(DatabaseError::Sqlx(sqlx::Error::RowNotFound));
        }
        let id = tables.microlocations.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        let row = Microlocation {
            id,
            name: location.name,
            latitude: location.latitude,
            longitude: location.longitude,
            floor: location.floor,
            room: location.room,
            event_id: Some(location.event_id),
        };
        tables.microlocations.push(row.clone());
        for session in tables.sessions.iter_mut().filter(|s| session_ids.contains(&s.id)) {
            session.microlocation_id = Some(id);
        }
        Ok(row)
    }

    async fn update_microlocation(
        &self,
        id: i64,
        changes: &MicrolocationChanges,
    ) -> Result<Option<Microlocation>, DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.microlocations.iter_mut().find(|m| m.id == id).map(|location| {
            changes.apply(location);
            location.clone()
        }))
    }

    async fn delete_microlocation(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.microlocations.len();
        tables.microlocations.retain(|m| m.id != id);
        for session in tables.sessions.iter_mut().filter(|s| s.microlocation_id == Some(id)) {
            session.microlocation_id = None;
        }
        Ok(tables.microlocations.len() != before)
    }

    async fn sessions_by_microlocation(&self, microlocation_id: i64) -> Result<Vec<Session>, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        let mut sessions: Vec<Session> = tables
            .sessions
            .iter()
            .filter(|s| s.microlocation_id == Some(microlocation_id))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.id);
        Ok(sessions)
    }

    async fn replace_microlocation_sessions(
        &self,
        microlocation_id: i64,
        session_ids: &[i64],
    ) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        for session in tables.sessions.iter_mut() {
            if session_ids.contains(&session.id) {
                session.microlocation_id = Some(microlocation_id);
            } else if session.microlocation_id == Some(microlocation_id) {
                session.microlocation_id = None;
            }
        }
        Ok(())
    }

    async fn unlink_microlocation_sessions(
        &self,
        microlocation_id: i64,
        session_ids: &[i64],
    ) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        for session in tables.sessions.iter_mut() {
            if session_ids.contains(&session.id) && session.microlocation_id == Some(microlocation_id) {
                session.microlocation_id = None;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterJoin;
    use serde_json::json;

    #[tokio::test]
    async fn microlocation_insert_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.add_event(3, "devconf", None);
        store.add_session(7, 3, None);
        let location = || NewMicrolocation {
            name: "Stage".to_string(),
            latitude: None,
            longitude: None,
            floor: None,
            room: None,
            event_id: 3,
        };

        assert!(store.insert_microlocation(location(), &[7, 404]).await.is_err());
        assert_eq!(store.microlocation_count(), 0);
        assert_eq!(store.session_by_id(7).await.unwrap().unwrap().microlocation_id, None);

        let created = store.insert_microlocation(location(), &[7]).await.unwrap();
        assert_eq!(store.session_by_id(7).await.unwrap().unwrap().microlocation_id, Some(created.id));
    }

    #[tokio::test]
    async fn deleting_an_event_cascades_to_its_faqs() {
        let store = MemoryStore::new();
        store.add_event(5, "summit", None);
        store.add_event(6, "meetup", None);
        store.add_faq(1, "Q1", "A1", Some(5));
        store.add_faq(2, "Q2", "A2", Some(5));
        store.add_faq(3, "Q3", "A3", Some(6));

        store.delete_event(5);

        let filter = Filter::new(Faq::TABLE, Faq::COLUMNS).unwrap();
        let remaining = store.list_faqs(&filter).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining.iter().all(|f| f.event_id == Some(6)));
        assert!(store.faq_by_event(5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn evaluates_filters_joins_and_paging() {
        let store = MemoryStore::new();
        store.add_event(3, "devconf", None);
        store.add_microlocation(12, "Hall A", Some(3));
        store.add_microlocation(13, "hall B", Some(3));
        store.add_microlocation(14, "Kitchen", Some(3));
        store.add_session(9, 3, Some(12));

        let mut filter = Filter::new(Microlocation::TABLE, Microlocation::COLUMNS).unwrap();
        filter.where_clause(&json!({"name": {"$ilike": "hall%"}})).unwrap();
        filter.order("-id").unwrap();
        let ids: Vec<i64> = store.list_microlocations(&filter).await.unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![13, 12]);

        filter.limit(1, Some(1)).unwrap();
        let page = store.list_microlocations(&filter).await.unwrap();
        assert_eq!(page[0].id, 12);
        assert_eq!(store.count_microlocations(&filter).await.unwrap(), 2);

        let joined = Filter::new(Microlocation::TABLE, Microlocation::COLUMNS)
            .unwrap()
            .join(FilterJoin { table: "sessions".into(), foreign_key: "microlocation_id".into(), id: 9 })
            .unwrap();
        let ids: Vec<i64> = store.list_microlocations(&joined).await.unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![12]);
    }
}
