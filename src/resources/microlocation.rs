use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::{event_linkage, requested_event, session_linkage, Page, RelationshipSpec, ResourceHandler, WRITE_GUARD};
use crate::access::{
    authorize_event_reference, find, find_resolved, require, scope, Guard, Policy, RequestContext, ResourceError,
    Resolved, Verb,
};
use crate::api::{link, relationship_document, Linkage, RelationshipObject, ResourceObject, ResourcePayload};
use crate::database::models::{Microlocation, MicrolocationChanges, NewMicrolocation};
use crate::database::Store;
use crate::filter::{Filter, FilterData};

const RELATIONSHIPS: &[RelationshipSpec] = &[
    RelationshipSpec {
        name: "event",
        verbs: &[Verb::Get, Verb::Patch],
        guard: Guard::new(Policy::IsCoorganizer, &[Verb::Patch]),
    },
    RelationshipSpec {
        name: "sessions",
        verbs: &[Verb::Get, Verb::Patch, Verb::Delete],
        guard: Guard::new(Policy::IsCoorganizer, &[Verb::Patch, Verb::Delete]),
    },
];

/// Column of `sessions` pointing at the hosting microlocation
const SESSION_LINK: &str = "microlocation_id";

/// Named places inside an event venue
pub struct MicrolocationHandler {
    store: Arc<dyn Store>,
}

impl MicrolocationHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Target of a detail route: by id, or the microlocation hosting a
    /// session. Reached through a session, the session's event governs
    /// access.
    async fn resolve(&self, ctx: &RequestContext) -> Result<Resolved<Microlocation>, ResourceError> {
        let store = self.store.as_ref();
        match (ctx.path.id, ctx.path.session_id) {
            (Some(id), _) => {
                let location = find(store.microlocation_by_id(id), "id", "Microlocation", id).await?;
                let event_scope = location.event_id;
                Ok(Resolved { entity: location, event_scope })
            }
            (None, Some(session_id)) => {
                let session = find(store.session_by_id(session_id), "session_id", "Session", session_id).await?;
                let location = find_resolved(
                    session.microlocation_id,
                    |id| store.microlocation_by_id(id),
                    "session_id",
                    "Microlocation",
                )
                .await?;
                if location.event_id.is_some() && location.event_id != session.event_id {
                    tracing::warn!(
                        "Session {} links microlocation {} of event {:?}",
                        session_id,
                        location.id,
                        location.event_id
                    );
                    return Err(ResourceError::not_found(
                        "session_id",
                        format!("Microlocation for session: {} not found", session_id),
                    ));
                }
                Ok(Resolved { entity: location, event_scope: session.event_id })
            }
            (None, None) => Err(ResourceError::not_found("id", "Microlocation not found")),
        }
    }

    fn resource(location: &Microlocation) -> ResourceObject {
        let self_link = link(&format!("/{}/{}", Self::COLLECTION, location.id));
        ResourceObject {
            kind: Self::TYPE,
            id: location.id,
            attributes: json!({
                "name": location.name,
                "latitude": location.latitude,
                "longitude": location.longitude,
                "floor": location.floor,
                "room": location.room,
            }),
            relationships: vec![
                RelationshipObject {
                    name: "event",
                    self_link: format!("{}/relationships/event", self_link),
                    data: Some(Linkage::to_one("event", location.event_id)),
                },
                RelationshipObject {
                    name: "sessions",
                    self_link: format!("{}/relationships/sessions", self_link),
                    data: None,
                },
            ],
            self_link,
        }
    }

    fn relationship_link(id: i64, name: &str) -> String {
        link(&format!("/{}/{}/relationships/{}", Self::COLLECTION, id, name))
    }

    async fn sessions_document(&self, location_id: i64) -> Result<Value, ResourceError> {
        let sessions = self.store.sessions_by_microlocation(location_id).await?;
        Ok(relationship_document(
            &Linkage::to_many("session", sessions.iter().map(|s| s.id)),
            &Self::relationship_link(location_id, "sessions"),
        ))
    }

    /// Sessions named in a body must exist and belong to `event_id`.
    /// Anything else is reported as a missing session.
    async fn check_sessions(&self, session_ids: &[i64], event_id: Option<i64>) -> Result<(), ResourceError> {
        for session_id in session_ids {
            let session = find(self.store.session_by_id(*session_id), "session_id", "Session", session_id).await?;
            if event_id.is_none() || session.event_id != event_id {
                tracing::warn!("Session {} is outside event {:?}", session_id, event_id);
                return Err(ResourceError::not_found(
                    "session_id",
                    format!("Session: {} not found", session_id),
                ));
            }
        }
        Ok(())
    }
}

fn check_range(value: Option<Option<f64>>, name: &str, limit: f64) -> Result<(), ResourceError> {
    match value {
        Some(Some(v)) if !(-limit..=limit).contains(&v) => Err(ResourceError::invalid_payload(
            format!("/data/attributes/{}", name),
            format!("{} must be between -{} and {}", name, limit, limit),
        )),
        _ => Ok(()),
    }
}

fn coordinates(payload: &ResourcePayload) -> Result<(Option<Option<f64>>, Option<Option<f64>>), ResourceError> {
    let latitude = payload.nullable_float("latitude")?;
    let longitude = payload.nullable_float("longitude")?;
    check_range(latitude, "latitude", 90.0)?;
    check_range(longitude, "longitude", 180.0)?;
    Ok((latitude, longitude))
}

#[async_trait]
impl ResourceHandler for MicrolocationHandler {
    const TYPE: &'static str = "microlocation";
    const COLLECTION: &'static str = "microlocations";

    fn relationships(&self) -> &'static [RelationshipSpec] {
        RELATIONSHIPS
    }

    async fn list(&self, ctx: &RequestContext, options: FilterData) -> Result<Page, ResourceError> {
        let store = self.store.as_ref();
        let mut base = Filter::new(Microlocation::TABLE, Microlocation::COLUMNS)?;
        base.assign(options)?;
        let query = scope(store, base, &ctx.path, Some(SESSION_LINK)).await?;

        let locations = store.list_microlocations(&query).await?;
        let count = store.count_microlocations(&query).await?;
        Ok(Page { resources: locations.iter().map(Self::resource).collect(), count })
    }

    async fn create(&self, ctx: &RequestContext, payload: ResourcePayload) -> Result<ResourceObject, ResourceError> {
        let store = self.store.as_ref();
        require(&["event"], &payload)?;
        let name = payload.required_text("name")?;
        let (latitude, longitude) = coordinates(&payload)?;
        let event_id = payload
            .to_one("event", "event")?
            .flatten()
            .ok_or_else(|| ResourceError::MissingRelationship("event".to_string()))?;
        let sessions = match payload.relationships.get("sessions") {
            Some(linkage) => session_linkage(linkage)?,
            None => vec![],
        };

        authorize_event_reference(store, ctx.principal.as_ref(), Policy::IsCoorganizer, event_id).await?;
        self.check_sessions(&sessions, Some(event_id)).await?;

        let location = NewMicrolocation {
            name,
            latitude: latitude.flatten(),
            longitude: longitude.flatten(),
            floor: payload.nullable_int("floor")?.flatten(),
            room: payload.nullable_text("room")?.flatten(),
            event_id,
        };
        let location = store.insert_microlocation(location, &sessions).await?;

        info!("Created microlocation {} for event {}", location.id, event_id);
        Ok(Self::resource(&location))
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceObject, ResourceError> {
        let resolved = self.resolve(ctx).await?;
        Ok(Self::resource(&resolved.entity))
    }

    async fn update(&self, ctx: &RequestContext, payload: ResourcePayload) -> Result<ResourceObject, ResourceError> {
        let store = self.store.as_ref();
        let Resolved { entity: location, event_scope } = self.resolve(ctx).await?;
        WRITE_GUARD.enforce(store, ctx, event_scope).await?;
        payload.check_id(location.id)?;

        let (latitude, longitude) = coordinates(&payload)?;
        let changes = MicrolocationChanges {
            name: payload.text("name")?,
            latitude,
            longitude,
            floor: payload.nullable_int("floor")?,
            room: payload.nullable_text("room")?,
            event_id: requested_event(store, ctx, &payload, location.event_id).await?,
        };
        if changes.is_empty() {
            return Ok(Self::resource(&location));
        }

        let updated = find(
            store.update_microlocation(location.id, &changes),
            "id",
            "Microlocation",
            location.id,
        )
        .await?;
        info!("Updated microlocation {}", updated.id);
        Ok(Self::resource(&updated))
    }

    async fn delete(&self, ctx: &RequestContext) -> Result<(), ResourceError> {
        let store = self.store.as_ref();
        let Resolved { entity: location, event_scope } = self.resolve(ctx).await?;
        WRITE_GUARD.enforce(store, ctx, event_scope).await?;

        if !store.delete_microlocation(location.id).await? {
            return Err(ResourceError::not_found("id", format!("Microlocation: {} not found", location.id)));
        }
        info!("Deleted microlocation {}", location.id);
        Ok(())
    }

    async fn get_relationship(&self, ctx: &RequestContext, name: &str) -> Result<Value, ResourceError> {
        let spec = self.relationship(name, ctx.verb)?;
        let Resolved { entity: location, event_scope } = self.resolve(ctx).await?;
        spec.guard.enforce(self.store.as_ref(), ctx, event_scope).await?;

        match spec.name {
            "sessions" => self.sessions_document(location.id).await,
            _ => Ok(relationship_document(
                &Linkage::to_one("event", location.event_id),
                &Self::relationship_link(location.id, name),
            )),
        }
    }

    async fn update_relationship(
        &self,
        ctx: &RequestContext,
        name: &str,
        linkage: Linkage,
    ) -> Result<Value, ResourceError> {
        let store = self.store.as_ref();
        let spec = self.relationship(name, ctx.verb)?;
        let Resolved { entity: location, event_scope } = self.resolve(ctx).await?;
        spec.guard.enforce(store, ctx, event_scope).await?;

        if spec.name == "sessions" {
            let session_ids = session_linkage(&linkage)?;
            self.check_sessions(&session_ids, location.event_id).await?;
            store.replace_microlocation_sessions(location.id, &session_ids).await?;
            info!("Linked {} sessions to microlocation {}", session_ids.len(), location.id);
            return self.sessions_document(location.id).await;
        }

        let event_id = event_linkage(&linkage)?;
        let location = if location.event_id == Some(event_id) {
            location
        } else {
            authorize_event_reference(store, ctx.principal.as_ref(), Policy::IsCoorganizer, event_id).await?;
            let changes = MicrolocationChanges { event_id: Some(event_id), ..Default::default() };
            let updated = find(
                store.update_microlocation(location.id, &changes),
                "id",
                "Microlocation",
                location.id,
            )
            .await?;
            info!("Moved microlocation {} to event {}", updated.id, event_id);
            updated
        };

        Ok(relationship_document(
            &Linkage::to_one("event", location.event_id),
            &Self::relationship_link(location.id, name),
        ))
    }

    async fn delete_relationship(
        &self,
        ctx: &RequestContext,
        name: &str,
        linkage: Linkage,
    ) -> Result<Value, ResourceError> {
        let store = self.store.as_ref();
        let spec = self.relationship(name, ctx.verb)?;
        let Resolved { entity: location, event_scope } = self.resolve(ctx).await?;
        spec.guard.enforce(store, ctx, event_scope).await?;

        let session_ids = session_linkage(&linkage)?;
        store.unlink_microlocation_sessions(location.id, &session_ids).await?;
        info!("Unlinked {} sessions from microlocation {}", session_ids.len(), location.id);
        self.sessions_document(location.id).await
    }
}
