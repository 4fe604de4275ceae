use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Event, EventRole, Faq, FaqChanges, Microlocation, MicrolocationChanges, NewFaq, NewMicrolocation, Session,
};
use crate::filter::Filter;

/// Persistence collaborator for the resource layer. Every lookup returns
/// `Ok(None)` for a missing row; turning that into a client error is the
/// caller's decision.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), DatabaseError>;

    async fn event_by_id(&self, id: i64) -> Result<Option<Event>, DatabaseError>;
    async fn event_by_identifier(&self, identifier: &str) -> Result<Option<Event>, DatabaseError>;
    async fn session_by_id(&self, id: i64) -> Result<Option<Session>, DatabaseError>;
    async fn event_roles(&self, user_id: i64, event_id: i64) -> Result<Vec<EventRole>, DatabaseError>;

    async fn faq_by_id(&self, id: i64) -> Result<Option<Faq>, DatabaseError>;
    /// Lowest-id FAQ of the event
    async fn faq_by_event(&self, event_id: i64) -> Result<Option<Faq>, DatabaseError>;
    async fn list_faqs(&self, filter: &Filter) -> Result<Vec<Faq>, DatabaseError>;
    async fn count_faqs(&self, filter: &Filter) -> Result<i64, DatabaseError>;
    async fn insert_faq(&self, faq: NewFaq) -> Result<Faq, DatabaseError>;
    async fn update_faq(&self, id: i64, changes: &FaqChanges) -> Result<Option<Faq>, DatabaseError>;
    async fn delete_faq(&self, id: i64) -> Result<bool, DatabaseError>;

    async fn microlocation_by_id(&self, id: i64) -> Result<Option<Microlocation>, DatabaseError>;
    async fn list_microlocations(&self, filter: &Filter) -> Result<Vec<Microlocation>, DatabaseError>;
    async fn count_microlocations(&self, filter: &Filter) -> Result<i64, DatabaseError>;
    /// Insert the microlocation and point `session_ids` at it in one unit of
    /// work. Nothing is written unless every session is linked.
    async fn insert_microlocation(
        &self,
        location: NewMicrolocation,
        session_ids: &[i64],
    ) -> Result<Microlocation, DatabaseError>;
    async fn update_microlocation(
        &self,
        id: i64,
        changes: &MicrolocationChanges,
    ) -> Result<Option<Microlocation>, DatabaseError>;
    async fn delete_microlocation(&self, id: i64) -> Result<bool, DatabaseError>;

    async fn sessions_by_microlocation(&self, microlocation_id: i64) -> Result<Vec<Session>, DatabaseError>;
    /// Point exactly `session_ids` at the microlocation, unlinking the rest,
    /// in one unit of work
    async fn replace_microlocation_sessions(
        &self,
        microlocation_id: i64,
        session_ids: &[i64],
    ) -> Result<(), DatabaseError>;
    /// Unlink the listed sessions if they currently point at the microlocation
    async fn unlink_microlocation_sessions(
        &self,
        microlocation_id: i64,
        session_ids: &[i64],
    ) -> Result<(), DatabaseError>;
}
