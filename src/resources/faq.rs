use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::{event_linkage, requested_event, Page, RelationshipSpec, ResourceHandler, WRITE_GUARD};
use crate::access::{
    authorize_event_reference, find, find_event, require, scope, Guard, Policy, RequestContext, ResourceError,
    Resolved, Verb,
};
use crate::api::{link, relationship_document, Linkage, RelationshipObject, ResourceObject, ResourcePayload};
use crate::database::models::{Faq, FaqChanges, NewFaq};
use crate::database::Store;
use crate::filter::{Filter, FilterData};

const RELATIONSHIPS: &[RelationshipSpec] = &[RelationshipSpec {
    name: "event",
    verbs: &[Verb::Get, Verb::Patch],
    guard: Guard::new(Policy::IsCoorganizer, &[Verb::Patch]),
}];

/// Frequently asked questions attached to an event
pub struct FaqHandler {
    store: Arc<dyn Store>,
}

impl FaqHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Target FAQ of a detail route: by id, or the first FAQ of the event
    async fn resolve(&self, ctx: &RequestContext) -> Result<Resolved<Faq>, ResourceError> {
        let store = self.store.as_ref();
        let faq = match (ctx.path.id, &ctx.path.event) {
            (Some(id), _) => find(store.faq_by_id(id), "id", "Faq", id).await?,
            (None, Some(event_ref)) => {
                let event = find_event(store, event_ref).await?;
                find(store.faq_by_event(event.id), "event_id", "Faq for event", event.id).await?
            }
            (None, None) => return Err(ResourceError::not_found("id", "Faq not found")),
        };
        let event_scope = faq.event_id;
        Ok(Resolved { entity: faq, event_scope })
    }

    fn resource(faq: &Faq) -> ResourceObject {
        let self_link = link(&format!("/{}/{}", Self::COLLECTION, faq.id));
        ResourceObject {
            kind: Self::TYPE,
            id: faq.id,
            attributes: json!({ "question": faq.question, "answer": faq.answer }),
            relationships: vec![RelationshipObject {
                name: "event",
                self_link: format!("{}/relationships/event", self_link),
                data: Some(Linkage::to_one("event", faq.event_id)),
            }],
            self_link,
        }
    }

    fn relationship_link(id: i64, name: &str) -> String {
        link(&format!("/{}/{}/relationships/{}", Self::COLLECTION, id, name))
    }
}

#[async_trait]
impl ResourceHandler for FaqHandler {
    const TYPE: &'static str = "faq";
    const COLLECTION: &'static str = "faqs";

    fn relationships(&self) -> &'static [RelationshipSpec] {
        RELATIONSHIPS
    }

    async fn list(&self, ctx: &RequestContext, options: FilterData) -> Result<Page, ResourceError> {
        let store = self.store.as_ref();
        let mut base = Filter::new(Faq::TABLE, Faq::COLUMNS)?;
        base.assign(options)?;
        let query = scope(store, base, &ctx.path, None).await?;

        let faqs = store.list_faqs(&query).await?;
        let count = store.count_faqs(&query).await?;
        Ok(Page { resources: faqs.iter().map(Self::resource).collect(), count })
    }

    async fn create(&self, ctx: &RequestContext, payload: ResourcePayload) -> Result<ResourceObject, ResourceError> {
        let store = self.store.as_ref();
        require(&["event"], &payload)?;
        let question = payload.required_text("question")?;
        let answer = payload.required_text("answer")?;
        let event_id = payload
            .to_one("event", "event")?
            .flatten()
            .ok_or_else(|| ResourceError::MissingRelationship("event".to_string()))?;

        authorize_event_reference(store, ctx.principal.as_ref(), Policy::IsCoorganizer, event_id).await?;

        let faq = store.insert_faq(NewFaq { question, answer, event_id }).await?;
        info!("Created faq {} for event {}", faq.id, event_id);
        Ok(Self::resource(&faq))
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceObject, ResourceError> {
        let resolved = self.resolve(ctx).await?;
        Ok(Self::resource(&resolved.entity))
    }

    async fn update(&self, ctx: &RequestContext, payload: ResourcePayload) -> Result<ResourceObject, ResourceError> {
        let store = self.store.as_ref();
        let Resolved { entity: faq, event_scope } = self.resolve(ctx).await?;
        WRITE_GUARD.enforce(store, ctx, event_scope).await?;
        payload.check_id(faq.id)?;

        let changes = FaqChanges {
            question: payload.text("question")?,
            answer: payload.text("answer")?,
            event_id: requested_event(store, ctx, &payload, faq.event_id).await?,
        };
        if changes.is_empty() {
            return Ok(Self::resource(&faq));
        }

        let updated = find(store.update_faq(faq.id, &changes), "id", "Faq", faq.id).await?;
        info!("Updated faq {}", updated.id);
        Ok(Self::resource(&updated))
    }

    async fn delete(&self, ctx: &RequestContext) -> Result<(), ResourceError> {
        let store = self.store.as_ref();
        let Resolved { entity: faq, event_scope } = self.resolve(ctx).await?;
        WRITE_GUARD.enforce(store, ctx, event_scope).await?;

        if !store.delete_faq(faq.id).await? {
            return Err(ResourceError::not_found("id", format!("Faq: {} not found", faq.id)));
        }
        info!("Deleted faq {}", faq.id);
        Ok(())
    }

    async fn get_relationship(&self, ctx: &RequestContext, name: &str) -> Result<Value, ResourceError> {
        let spec = self.relationship(name, ctx.verb)?;
        let Resolved { entity: faq, event_scope } = self.resolve(ctx).await?;
        spec.guard.enforce(self.store.as_ref(), ctx, event_scope).await?;

        Ok(relationship_document(
            &Linkage::to_one("event", faq.event_id),
            &Self::relationship_link(faq.id, name),
        ))
    }

    async fn update_relationship(
        &self,
        ctx: &RequestContext,
        name: &str,
        linkage: Linkage,
    ) -> Result<Value, ResourceError> {
        let store = self.store.as_ref();
        let spec = self.relationship(name, ctx.verb)?;
        let Resolved { entity: faq, event_scope } = self.resolve(ctx).await?;
        spec.guard.enforce(store, ctx, event_scope).await?;

        let event_id = event_linkage(&linkage)?;
        let faq = if faq.event_id == Some(event_id) {
            faq
        } else {
            authorize_event_reference(store, ctx.principal.as_ref(), Policy::IsCoorganizer, event_id).await?;
            let changes = FaqChanges { event_id: Some(event_id), ..Default::default() };
            let updated = find(store.update_faq(faq.id, &changes), "id", "Faq", faq.id).await?;
            info!("Moved faq {} to event {}", updated.id, event_id);
            updated
        };

        Ok(relationship_document(
            &Linkage::to_one("event", faq.event_id),
            &Self::relationship_link(faq.id, name),
        ))
    }

    async fn delete_relationship(
        &self,
        ctx: &RequestContext,
        name: &str,
        _linkage: Linkage,
    ) -> Result<Value, ResourceError> {
        // No FAQ relationship accepts DELETE; this reports 404 or 405
        self.relationship(name, ctx.verb)?;
        Err(ResourceError::MethodNotAllowed(format!("DELETE is not allowed on the {} relationship", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{EventRef, PathParams};
    use crate::testing::{principal, MemoryStore};

    fn setup() -> (Arc<MemoryStore>, FaqHandler) {
        let store = Arc::new(MemoryStore::new());
        store.add_event(5, "summit", None);
        store.add_event(6, "meetup", None);
        store.add_role(10, 5, "coorganizer");
        store.add_role(10, 6, "coorganizer");
        store.add_faq(1, "Where?", "Hall 1", Some(5));
        store.add_faq(2, "When?", "Noon", Some(5));
        store.add_faq(3, "Parking?", "No", Some(6));
        let handler = FaqHandler::new(store.clone());
        (store, handler)
    }

    fn ctx(verb: Verb, user: Option<i64>, path: PathParams) -> RequestContext {
        RequestContext::new(verb, user.map(principal), path)
    }

    fn by_id(id: i64) -> PathParams {
        PathParams { id: Some(id), ..Default::default() }
    }

    fn payload(doc: Value) -> ResourcePayload {
        ResourcePayload::from_document(&doc, "faq").unwrap()
    }

    fn create_doc(event: Value) -> Value {
        json!({"data": {
            "type": "faq",
            "attributes": {"question": "Q1", "answer": "A1"},
            "relationships": {"event": {"data": event}}
        }})
    }

    #[tokio::test]
    async fn coorganizer_creates_faq_for_event() {
        let (store, handler) = setup();
        let faq = handler
            .create(
                &ctx(Verb::Post, Some(10), PathParams::default()),
                payload(create_doc(json!({"type": "event", "id": "5"}))),
            )
            .await
            .unwrap();

        assert_eq!(faq.attributes["question"], "Q1");
        let stored = store.faq_by_id(faq.id).await.unwrap().unwrap();
        assert_eq!(stored.event_id, Some(5));
    }

    #[tokio::test]
    async fn outsider_create_reports_missing_event() {
        let (store, handler) = setup();
        let err = handler
            .create(
                &ctx(Verb::Post, Some(99), PathParams::default()),
                payload(create_doc(json!({"type": "event", "id": "5"}))),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ResourceError::NotFound { parameter: "event_id", .. }));
        assert_eq!(store.faq_count(), 3);
    }

    #[tokio::test]
    async fn create_without_event_is_never_persisted() {
        let (store, handler) = setup();
        let doc = json!({"data": {"type": "faq", "attributes": {"question": "Q1", "answer": "A1"}}});
        let err = handler
            .create(&ctx(Verb::Post, Some(10), PathParams::default()), payload(doc))
            .await
            .unwrap_err();

        assert!(matches!(err, ResourceError::MissingRelationship(ref name) if name == "event"));
        assert_eq!(store.faq_count(), 3);
    }

    #[tokio::test]
    async fn list_is_scoped_to_event() {
        let (_, handler) = setup();
        let path = PathParams { event: Some(EventRef::Identifier("summit".into())), ..Default::default() };
        let page = handler
            .list(&ctx(Verb::Get, Some(99), path), FilterData::default())
            .await
            .unwrap();

        assert_eq!(page.count, 2);
        assert!(page.resources.iter().all(|r| r.attributes["question"] != "Parking?"));
    }

    #[tokio::test]
    async fn detail_by_unknown_identifier_is_not_found() {
        let (_, handler) = setup();
        let path = PathParams { event: Some(EventRef::Identifier("nope".into())), ..Default::default() };
        let err = handler.get(&ctx(Verb::Get, None, path)).await.unwrap_err();
        assert!(matches!(err, ResourceError::NotFound { parameter: "event_identifier", .. }));
    }

    #[tokio::test]
    async fn detail_by_event_returns_first_faq() {
        let (_, handler) = setup();
        let path = PathParams { event: Some(EventRef::Id(5)), ..Default::default() };
        let faq = handler.get(&ctx(Verb::Get, None, path)).await.unwrap();
        assert_eq!(faq.id, 1);
    }

    #[tokio::test]
    async fn event_without_faqs_reports_event_id() {
        let (store, handler) = setup();
        store.add_event(7, "quiet", None);
        let path = PathParams { event: Some(EventRef::Identifier("quiet".into())), ..Default::default() };
        let err = handler.get(&ctx(Verb::Get, None, path)).await.unwrap_err();
        assert!(matches!(err, ResourceError::NotFound { parameter: "event_id", .. }));
    }

    #[tokio::test]
    async fn writes_by_outsiders_are_forbidden() {
        let (store, handler) = setup();
        let patch = payload(json!({"data": {"type": "faq", "id": "1", "attributes": {"answer": "Hall 2"}}}));

        let err = handler.update(&ctx(Verb::Patch, Some(99), by_id(1)), patch.clone()).await.unwrap_err();
        assert!(matches!(err, ResourceError::Forbidden(_)));

        let err = handler.delete(&ctx(Verb::Delete, Some(99), by_id(1))).await.unwrap_err();
        assert!(matches!(err, ResourceError::Forbidden(_)));
        assert!(store.faq_by_id(1).await.unwrap().is_some());

        let updated = handler.update(&ctx(Verb::Patch, Some(10), by_id(1)), patch).await.unwrap();
        assert_eq!(updated.attributes["answer"], "Hall 2");
    }

    #[tokio::test]
    async fn moving_to_a_foreign_event_is_hidden() {
        let (store, handler) = setup();
        store.add_event(7, "private", None);
        let patch = payload(json!({"data": {
            "type": "faq",
            "id": "1",
            "relationships": {"event": {"data": {"type": "event", "id": "7"}}}
        }}));

        let err = handler.update(&ctx(Verb::Patch, Some(10), by_id(1)), patch).await.unwrap_err();
        assert!(matches!(err, ResourceError::NotFound { parameter: "event_id", .. }));
        assert_eq!(store.faq_by_id(1).await.unwrap().unwrap().event_id, Some(5));
    }

    #[tokio::test]
    async fn event_relationship_round() {
        let (store, handler) = setup();
        let doc = handler
            .get_relationship(&ctx(Verb::Get, None, by_id(1)), "event")
            .await
            .unwrap();
        assert_eq!(doc["data"], json!({"type": "event", "id": "5"}));

        let err = handler
            .update_relationship(&ctx(Verb::Patch, Some(99), by_id(1)), "event", Linkage::to_one("event", Some(6)))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Forbidden(_)));

        let doc = handler
            .update_relationship(&ctx(Verb::Patch, Some(10), by_id(1)), "event", Linkage::to_one("event", Some(6)))
            .await
            .unwrap();
        assert_eq!(doc["data"]["id"], "6");
        assert_eq!(store.faq_by_id(1).await.unwrap().unwrap().event_id, Some(6));

        let err = handler
            .update_relationship(&ctx(Verb::Patch, Some(10), by_id(1)), "event", Linkage::One(None))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::MissingRelationship(_)));
    }

    #[tokio::test]
    async fn undeclared_relationships_are_rejected() {
        let (_, handler) = setup();
        let err = handler
            .get_relationship(&ctx(Verb::Get, None, by_id(1)), "speakers")
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::NotFound { parameter: "relationship", .. }));

        let err = handler
            .delete_relationship(&ctx(Verb::Delete, Some(10), by_id(1)), "event", Linkage::One(None))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::MethodNotAllowed(_)));
    }
}
