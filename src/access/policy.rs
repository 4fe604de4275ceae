use crate::access::context::{RequestContext, Verb};
use crate::access::error::ResourceError;
use crate::access::lookup::{find, find_resolved};
use crate::auth::Principal;
use crate::database::models::{Event, EventRole, RoleName};
use crate::database::{DatabaseError, Store};

/// Named permission checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    IsSuperAdmin,
    IsAdmin,
    IsOrganizer,
    IsCoorganizer,
}

impl Policy {
    pub fn name(&self) -> &'static str {
        match self {
            Policy::IsSuperAdmin => "is_super_admin",
            Policy::IsAdmin => "is_admin",
            Policy::IsOrganizer => "is_organizer",
            Policy::IsCoorganizer => "is_coorganizer",
        }
    }

    fn grants(&self, role: RoleName) -> bool {
        match self {
            Policy::IsOrganizer => role == RoleName::Organizer,
            Policy::IsCoorganizer => matches!(role, RoleName::Organizer | RoleName::Coorganizer),
            Policy::IsAdmin | Policy::IsSuperAdmin => false,
        }
    }
}

/// Evaluate `policy` for `principal`. Event-scoped policies are false when
/// there is no event to check against.
pub async fn has_access(
    store: &dyn Store,
    principal: &Principal,
    policy: Policy,
    event: Option<&Event>,
) -> Result<bool, DatabaseError> {
    if principal.is_super_admin {
        return Ok(true);
    }

    match policy {
        Policy::IsSuperAdmin => Ok(false),
        Policy::IsAdmin => Ok(principal.is_admin),
        Policy::IsOrganizer | Policy::IsCoorganizer => {
            if principal.is_staff() {
                return Ok(true);
            }
            let Some(event) = event else {
                return Ok(false);
            };
            if event.owner_id == Some(principal.user_id) {
                return Ok(true);
            }
            let roles = store.event_roles(principal.user_id, event.id).await?;
            Ok(roles.iter().filter_map(EventRole::name).any(|role| policy.grants(role)))
        }
    }
}

/// Pre-check on an event id taken from a request body. The caller has not
/// proven the event exists, so a denial looks exactly like a missing event.
pub async fn authorize_event_reference(
    store: &dyn Store,
    principal: Option<&Principal>,
    policy: Policy,
    event_id: i64,
) -> Result<Event, ResourceError> {
    let principal = principal.ok_or_else(ResourceError::authentication_required)?;
    let event = find(store.event_by_id(event_id), "event_id", "Event", event_id).await?;

    if has_access(store, principal, policy, Some(&event)).await? {
        Ok(event)
    } else {
        tracing::warn!(
            "User {} failed {} for referenced event {}",
            principal.user_id,
            policy.name(),
            event_id
        );
        Err(ResourceError::not_found("event_id", format!("Event: {} not found", event_id)))
    }
}

/// A policy attached to an endpoint for a fixed set of verbs
#[derive(Debug, Clone, Copy)]
pub struct Guard {
    pub policy: Policy,
    pub verbs: &'static [Verb],
}

impl Guard {
    pub const fn new(policy: Policy, verbs: &'static [Verb]) -> Self {
        Self { policy, verbs }
    }

    pub fn applies_to(&self, verb: Verb) -> bool {
        self.verbs.contains(&verb)
    }

    /// Enforce against a resolved resource whose owning event is
    /// `event_scope`. Verbs outside the guard pass untouched.
    pub async fn enforce(
        &self,
        store: &dyn Store,
        ctx: &RequestContext,
        event_scope: Option<i64>,
    ) -> Result<(), ResourceError> {
        if !self.applies_to(ctx.verb) {
            return Ok(());
        }
        let principal = ctx.require_principal()?;
        let event = find_resolved(event_scope, |id| store.event_by_id(id), "event_id", "Event").await?;

        if has_access(store, principal, self.policy, Some(&event)).await? {
            Ok(())
        } else {
            tracing::warn!(
                "User {} denied {} on event {}: {} required",
                principal.user_id,
                ctx.verb.as_str(),
                event.id,
                self.policy.name()
            );
            Err(ResourceError::coorganizer_required())
        }
    }
}
