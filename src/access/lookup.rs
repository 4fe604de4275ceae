use std::fmt::Display;
use std::future::Future;

use crate::access::context::EventRef;
use crate::access::error::ResourceError;
use crate::database::models::Event;
use crate::database::{DatabaseError, Store};

/// Await a single-row lookup and turn an empty result into
/// `NotFound(parameter)`. The lookup future fixes the entity type and the
/// field searched; `entity` and `value` only label the error.
pub async fn find<T, F>(lookup: F, parameter: &'static str, entity: &str, value: impl Display) -> Result<T, ResourceError>
where
    F: Future<Output = Result<Option<T>, DatabaseError>>,
{
    match lookup.await? {
        Some(found) => Ok(found),
        None => {
            tracing::debug!("{} lookup by {} = {} found nothing", entity, parameter, value);
            Err(ResourceError::not_found(parameter, format!("{}: {} not found", entity, value)))
        }
    }
}

/// Lookup keyed by a value an earlier resolution step may have left unset.
/// An unset key is reported as not found, never widened to "any row".
pub async fn find_resolved<T, F, Fut>(
    key: Option<i64>,
    lookup: F,
    parameter: &'static str,
    entity: &str,
) -> Result<T, ResourceError>
where
    F: FnOnce(i64) -> Fut,
    Fut: Future<Output = Result<Option<T>, DatabaseError>>,
{
    match key {
        Some(id) => find(lookup(id), parameter, entity, id).await,
        None => Err(ResourceError::not_found(parameter, format!("{} not found", entity))),
    }
}

/// Resolve an event addressed by id or identifier
pub async fn find_event(store: &dyn Store, event: &EventRef) -> Result<Event, ResourceError> {
    match event {
        EventRef::Id(id) => find(store.event_by_id(*id), event.parameter(), "Event", id).await,
        EventRef::Identifier(identifier) => {
            find(store.event_by_identifier(identifier), event.parameter(), "Event", identifier).await
        }
    }
}
