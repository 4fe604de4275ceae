use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgArguments, FromRow, PgPool, Postgres, Row};

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    Event, EventRole, Faq, FaqChanges, Microlocation, MicrolocationChanges, NewFaq, NewMicrolocation, Session,
};
use crate::database::store::Store;
use crate::filter::types::SqlResult;
use crate::filter::Filter;

const FAQ_COLUMNS: &str = "id, question, answer, event_id";
const MICROLOCATION_COLUMNS: &str = "id, name, latitude, longitude, floor, room, event_id";
const SESSION_COLUMNS: &str = "id, title, event_id, microlocation_id";

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    manager: DatabaseManager,
}

impl PgStore {
    pub fn new(manager: DatabaseManager) -> Self {
        Self { manager }
    }

    fn pool(&self) -> &PgPool {
        self.manager.pool()
    }

    async fn select_all<T>(&self, sql_result: SqlResult) -> Result<Vec<T>, DatabaseError>
    where
        T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        log_query(&sql_result);
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(self.pool()).await?)
    }

    async fn count(&self, sql_result: SqlResult) -> Result<i64, DatabaseError> {
        log_query(&sql_result);
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(self.pool()).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }
}

fn log_query(sql_result: &SqlResult) {
    if crate::config::CONFIG.database.enable_query_logging {
        tracing::debug!(params = ?sql_result.params, "{}", sql_result.query);
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        self.manager.health_check().await
    }

    async fn event_by_id(&self, id: i64) -> Result<Option<Event>, DatabaseError> {
        let event = sqlx::query_as::<_, Event>("SELECT id, identifier, name, owner_id FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(event)
    }

    async fn event_by_identifier(&self, identifier: &str) -> Result<Option<Event>, DatabaseError> {
        let event =
            sqlx::query_as::<_, Event>("SELECT id, identifier, name, owner_id FROM events WHERE identifier = $1")
                .bind(identifier)
                .fetch_optional(self.pool())
                .await?;
        Ok(event)
    }

    async fn session_by_id(&self, id: i64) -> Result<Option<Session>, DatabaseError> {
        let session = sqlx::query_as::<_, Session>(&format!("SELECT {} FROM sessions WHERE id = $1", SESSION_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(session)
    }

    async fn event_roles(&self, user_id: i64, event_id: i64) -> Result<Vec<EventRole>, DatabaseError> {
        let roles = sqlx::query_as::<_, EventRole>(
            "SELECT user_id, event_id, role FROM users_events_roles WHERE user_id = $1 AND event_id = $2",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_all(self.pool())
        .await?;
        Ok(roles)
    }

    async fn faq_by_id(&self, id: i64) -> Result<Option<Faq>, DatabaseError> {
        let faq = sqlx::query_as::<_, Faq>(&format!("SELECT {} FROM faqs WHERE id = $1", FAQ_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(faq)
    }

    async fn faq_by_event(&self, event_id: i64) -> Result<Option<Faq>, DatabaseError> {
        let faq = sqlx::query_as::<_, Faq>(&format!(
            "SELECT {} FROM faqs WHERE event_id = $1 ORDER BY id LIMIT 1",
            FAQ_COLUMNS
        ))
        .bind(event_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(faq)
    }

    async fn list_faqs(&self, filter: &Filter) -> Result<Vec<Faq>, DatabaseError> {
        self.select_all(filter.to_sql()).await
    }

    async fn count_faqs(&self, filter: &Filter) -> Result<i64, DatabaseError> {
        self.count(filter.to_count_sql()).await
    }

    async fn insert_faq(&self, faq: NewFaq) -> Result<Faq, DatabaseError> {
        let created = sqlx::query_as::<_, Faq>(&format!(
            "INSERT INTO faqs (question, answer, event_id) VALUES ($1, $2, $3) RETURNING {}",
            FAQ_COLUMNS
        ))
        .bind(faq.question)
        .bind(faq.answer)
        .bind(faq.event_id)
        .fetch_one(self.pool())
        .await?;
        Ok(created)
    }

    async fn update_faq(&self, id: i64, changes: &FaqChanges) -> Result<Option<Faq>, DatabaseError> {
        if changes.is_empty() {
            return self.faq_by_id(id).await;
        }

        let mut qb = sqlx::QueryBuilder::<Postgres>::new("UPDATE faqs SET ");
        let mut set = qb.separated(", ");
        if let Some(question) = &changes.question {
            set.push("question = ").push_bind_unseparated(question.clone());
        }
        if let Some(answer) = &changes.answer {
            set.push("answer = ").push_bind_unseparated(answer.clone());
        }
        if let Some(event_id) = changes.event_id {
            set.push("event_id = ").push_bind_unseparated(event_id);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {}", FAQ_COLUMNS));

        let updated = qb.build_query_as::<Faq>().fetch_optional(self.pool()).await?;
        Ok(updated)
    }

    async fn delete_faq(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM faqs WHERE id = $1").bind(id).execute(self.pool()).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn microlocation_by_id(&self, id: i64) -> Result<Option<Microlocation>, DatabaseError> {
        let location = sqlx::query_as::<_, Microlocation>(&format!(
            "SELECT {} FROM microlocations WHERE id = $1",
            MICROLOCATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(location)
    }

    async fn list_microlocations(&self, filter: &Filter) -> Result<Vec<Microlocation>, DatabaseError> {
        self.select_all(filter.to_sql()).await
    }

    async fn count_microlocations(&self, filter: &Filter) -> Result<i64, DatabaseError> {
        self.count(filter.to_count_sql()).await
    }

    async fn insert_microlocation(
        &self,
        location: NewMicrolocation,
        session_ids: &[i64],
    ) -> Result<Microlocation, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let created = sqlx::query_as::<_, Microlocation>(&format!(
            "INSERT INTO microlocations (name, latitude, longitude, floor, room, event_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            MICROLOCATION_COLUMNS
        ))
        .bind(location.name)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(location.floor)
        .bind(location.room)
        .bind(location.event_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut ids = session_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if !ids.is_empty() {
            let linked = sqlx::query("UPDATE sessions SET microlocation_id = $1 WHERE id = ANY($2)")
                .bind(created.id)
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
            // Dropping the transaction rolls the insert back
            if linked.rows_affected() != ids.len() as u64 {
                return Err(DatabaseError::Sqlx(sqlx::Error::RowNotFound));
            }
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn update_microlocation(
        &self,
        id: i64,
        changes: &MicrolocationChanges,
    ) -> Result<Option<Microlocation>, DatabaseError> {
        if changes.is_empty() {
            return self.microlocation_by_id(id).await;
        }

        let mut qb = sqlx::QueryBuilder::<Postgres>::new("UPDATE microlocations SET ");
        let mut set = qb.separated(", ");
        if let Some(name) = &changes.name {
            set.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(latitude) = changes.latitude {
            set.push("latitude = ").push_bind_unseparated(latitude);
        }
        if let Some(longitude) = changes.longitude {
            set.push("longitude = ").push_bind_unseparated(longitude);
        }
        if let Some(floor) = changes.floor {
            set.push("floor = ").push_bind_unseparated(floor);
        }
        if let Some(room) = &changes.room {
            set.push("room = ").push_bind_unseparated(room.clone());
        }
        if let Some(event_id) = changes.event_id {
            set.push("event_id = ").push_bind_unseparated(event_id);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {}", MICROLOCATION_COLUMNS));

        let updated = qb.build_query_as::<Microlocation>().fetch_optional(self.pool()).await?;
        Ok(updated)
    }

    async fn delete_microlocation(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM microlocations WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn sessions_by_microlocation(&self, microlocation_id: i64) -> Result<Vec<Session>, DatabaseError> {
        let sessions = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM sessions WHERE microlocation_id = $1 ORDER BY id",
            SESSION_COLUMNS
        ))
        .bind(microlocation_id)
        .fetch_all(self.pool())
        .await?;
        Ok(sessions)
    }

    async fn replace_microlocation_sessions(
        &self,
        microlocation_id: i64,
        session_ids: &[i64],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("UPDATE sessions SET microlocation_id = NULL WHERE microlocation_id = $1 AND NOT (id = ANY($2))")
            .bind(microlocation_id)
            .bind(session_ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE sessions SET microlocation_id = $1 WHERE id = ANY($2)")
            .bind(microlocation_id)
            .bind(session_ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn unlink_microlocation_sessions(
        &self,
        microlocation_id: i64,
        session_ids: &[i64],
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE sessions SET microlocation_id = NULL WHERE microlocation_id = $1 AND id = ANY($2)")
            .bind(microlocation_id)
            .bind(session_ids)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Arrays are expanded into one placeholder per element by FilterWhere
        Value::Array(_) | Value::Object(_) => q.bind(v),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v),
    }
}
