use crate::access::context::PathParams;
use crate::access::error::ResourceError;
use crate::access::lookup::{find, find_event};
use crate::database::Store;
use crate::filter::{Filter, FilterJoin, FilterWhereInfo};

/// A detail target together with the event that governs access to it.
/// `event_scope` is `None` when the walk found no owning event.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub entity: T,
    pub event_scope: Option<i64>,
}

/// Narrow a listing query to the event and session named in the path.
/// `session_link` is the sessions column pointing back at this resource;
/// resources without one ignore a session scope.
pub async fn scope(
    store: &dyn Store,
    base: Filter,
    params: &PathParams,
    session_link: Option<&str>,
) -> Result<Filter, ResourceError> {
    let mut query = base;

    if let Some(event_ref) = &params.event {
        let event = find_event(store, event_ref).await?;
        tracing::debug!("Scoping {} to event {}", query.table_name(), event.id);
        query = query.and_where(FilterWhereInfo::eq("event_id", event.id));
    }

    if let (Some(session_id), Some(foreign_key)) = (params.session_id, session_link) {
        let session = find(store.session_by_id(session_id), "session_id", "Session", session_id).await?;
        tracing::debug!("Scoping {} to session {}", query.table_name(), session.id);
        query = query.join(FilterJoin {
            table: "sessions".to_string(),
            foreign_key: foreign_key.to_string(),
            id: session.id,
        })?;
    }

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::context::EventRef;
    use crate::database::models::Microlocation;
    use crate::testing::MemoryStore;

    fn base() -> Filter {
        Filter::new(Microlocation::TABLE, Microlocation::COLUMNS).unwrap()
    }

    #[tokio::test]
    async fn unscoped_query_is_unchanged() {
        let store = MemoryStore::new();
        let query = scope(&store, base(), &PathParams::default(), Some("microlocation_id")).await.unwrap();
        assert!(query.conditions().is_empty());
        assert!(query.join_data().is_none());
    }

    #[tokio::test]
    async fn event_scope_by_slug_resolves_to_id() {
        let store = MemoryStore::new();
        store.add_event(3, "devconf", None);
        let params = PathParams { event: Some(EventRef::Identifier("devconf".into())), ..Default::default() };

        let query = scope(&store, base(), &params, None).await.unwrap();
        let sql = query.to_sql();
        assert!(sql.query.contains("\"microlocations\".\"event_id\" = $1"));
        assert_eq!(sql.params, vec![serde_json::json!(3)]);
    }

    #[tokio::test]
    async fn session_scope_joins_sessions() {
        let store = MemoryStore::new();
        store.add_event(3, "devconf", None);
        store.add_session(9, 3, None);
        let params = PathParams { session_id: Some(9), ..Default::default() };

        let query = scope(&store, base(), &params, Some("microlocation_id")).await.unwrap();
        let join = query.join_data().unwrap();
        assert_eq!(join.table, "sessions");
        assert_eq!(join.id, 9);
    }

    #[tokio::test]
    async fn unknown_scope_entities_are_not_found() {
        let store = MemoryStore::new();
        let params = PathParams { event: Some(EventRef::Id(8)), ..Default::default() };
        assert!(matches!(
            scope(&store, base(), &params, None).await,
            Err(ResourceError::NotFound { parameter: "event_id", .. })
        ));

        let params = PathParams { session_id: Some(9), ..Default::default() };
        assert!(matches!(
            scope(&store, base(), &params, Some("microlocation_id")).await,
            Err(ResourceError::NotFound { parameter: "session_id", .. })
        ));
    }
}
