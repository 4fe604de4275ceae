//! Resource endpoints composed from the access layer.

pub mod faq;
pub mod microlocation;

pub use faq::FaqHandler;
pub use microlocation::MicrolocationHandler;

use async_trait::async_trait;
use serde_json::Value;

use crate::access::{authorize_event_reference, Guard, Policy, RequestContext, ResourceError, Verb};
use crate::api::{Linkage, ResourceObject, ResourcePayload};
use crate::database::Store;
use crate::filter::FilterData;

/// PATCH and DELETE on a resource require co-organizer access to its event
pub const WRITE_GUARD: Guard = Guard::new(Policy::IsCoorganizer, &[Verb::Patch, Verb::Delete]);

/// A relationship exposed under `/{collection}/{id}/relationships/{name}`
#[derive(Debug, Clone, Copy)]
pub struct RelationshipSpec {
    pub name: &'static str,
    pub verbs: &'static [Verb],
    pub guard: Guard,
}

/// One page of a listing plus the total before paging
#[derive(Debug, Clone)]
pub struct Page {
    pub resources: Vec<ResourceObject>,
    pub count: i64,
}

#[async_trait]
pub trait ResourceHandler: Send + Sync + 'static {
    /// JSON:API resource type
    const TYPE: &'static str;
    /// Path segment of the collection
    const COLLECTION: &'static str;

    fn relationships(&self) -> &'static [RelationshipSpec];

    async fn list(&self, ctx: &RequestContext, options: FilterData) -> Result<Page, ResourceError>;
    async fn create(&self, ctx: &RequestContext, payload: ResourcePayload) -> Result<ResourceObject, ResourceError>;
    async fn get(&self, ctx: &RequestContext) -> Result<ResourceObject, ResourceError>;
    async fn update(&self, ctx: &RequestContext, payload: ResourcePayload) -> Result<ResourceObject, ResourceError>;
    async fn delete(&self, ctx: &RequestContext) -> Result<(), ResourceError>;

    async fn get_relationship(&self, ctx: &RequestContext, name: &str) -> Result<Value, ResourceError>;
    async fn update_relationship(
        &self,
        ctx: &RequestContext,
        name: &str,
        linkage: Linkage,
    ) -> Result<Value, ResourceError>;
    async fn delete_relationship(
        &self,
        ctx: &RequestContext,
        name: &str,
        linkage: Linkage,
    ) -> Result<Value, ResourceError>;

    /// Declared relationship `name`, if it accepts the request's verb
    fn relationship(&self, name: &str, verb: Verb) -> Result<&'static RelationshipSpec, ResourceError> {
        let spec = self
            .relationships()
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| {
                ResourceError::not_found("relationship", format!("{} has no relationship {}", Self::TYPE, name))
            })?;
        if !spec.verbs.contains(&verb) {
            return Err(ResourceError::MethodNotAllowed(format!(
                "{} is not allowed on the {} relationship",
                verb.as_str(),
                name
            )));
        }
        Ok(spec)
    }
}

/// Event id a write asks to move the resource to. Moving counts as
/// referencing the new event, so it is checked like a create.
pub(crate) async fn requested_event(
    store: &dyn Store,
    ctx: &RequestContext,
    payload: &ResourcePayload,
    current: Option<i64>,
) -> Result<Option<i64>, ResourceError> {
    match payload.to_one("event", "event")? {
        None => Ok(None),
        Some(None) => Err(ResourceError::MissingRelationship("event".to_string())),
        Some(Some(event_id)) if Some(event_id) == current => Ok(None),
        Some(Some(event_id)) => {
            authorize_event_reference(store, ctx.principal.as_ref(), Policy::IsCoorganizer, event_id).await?;
            Ok(Some(event_id))
        }
    }
}

/// Target event of an `event` relationship body
pub(crate) fn event_linkage(linkage: &Linkage) -> Result<i64, ResourceError> {
    match linkage {
        Linkage::One(Some(identifier)) => identifier.id_of("event", "/data"),
        Linkage::One(None) => Err(ResourceError::MissingRelationship("event".to_string())),
        Linkage::Many(_) => Err(ResourceError::invalid_payload("/data", "Expected a single identifier")),
    }
}

/// Session ids of a to-many `sessions` body
pub(crate) fn session_linkage(linkage: &Linkage) -> Result<Vec<i64>, ResourceError> {
    match linkage {
        Linkage::Many(identifiers) => identifiers
            .iter()
            .enumerate()
            .map(|(i, identifier)| identifier.id_of("session", &format!("/data/{}", i)))
            .collect(),
        Linkage::One(_) => Err(ResourceError::invalid_payload("/data", "Expected an array of identifiers")),
    }
}
