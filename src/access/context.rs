use std::collections::HashMap;

use axum::http::Method;

use crate::access::error::ResourceError;
use crate::auth::Principal;

/// HTTP verbs the resource endpoints dispatch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Patch,
    Delete,
}

impl Verb {
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET | Method::HEAD => Some(Verb::Get),
            Method::POST => Some(Verb::Post),
            Method::PATCH => Some(Verb::Patch),
            Method::DELETE => Some(Verb::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }
}

/// An event addressed in a URL, either by numeric id or by slug
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRef {
    Id(i64),
    Identifier(String),
}

impl EventRef {
    /// All-digit segments are ids, anything else is an identifier
    pub fn parse(segment: &str) -> Self {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = segment.parse() {
                return EventRef::Id(id);
            }
        }
        EventRef::Identifier(segment.to_string())
    }

    /// Request parameter name reported when the event cannot be found
    pub fn parameter(&self) -> &'static str {
        match self {
            EventRef::Id(_) => "event_id",
            EventRef::Identifier(_) => "event_identifier",
        }
    }
}

impl std::fmt::Display for EventRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventRef::Id(id) => write!(f, "{}", id),
            EventRef::Identifier(identifier) => write!(f, "{}", identifier),
        }
    }
}

/// Typed path parameters of a resource route
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    pub id: Option<i64>,
    pub event: Option<EventRef>,
    pub session_id: Option<i64>,
    pub relationship: Option<String>,
}

impl PathParams {
    pub fn from_map(raw: &HashMap<String, String>) -> Result<Self, ResourceError> {
        Ok(Self {
            id: parse_id(raw, "id")?,
            event: raw.get("event").map(|segment| EventRef::parse(segment)),
            session_id: parse_id(raw, "session_id")?,
            relationship: raw.get("relationship").cloned(),
        })
    }
}

// A non-numeric id can never match a row
fn parse_id(raw: &HashMap<String, String>, key: &'static str) -> Result<Option<i64>, ResourceError> {
    match raw.get(key) {
        None => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ResourceError::not_found(key, format!("{}: {} not found", key, value))),
    }
}

/// Everything a resource operation needs to know about the request.
/// Built once per request and never mutated; resolution steps return
/// their results instead of writing them back here.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub verb: Verb,
    pub principal: Option<Principal>,
    pub path: PathParams,
}

impl RequestContext {
    pub fn new(verb: Verb, principal: Option<Principal>, path: PathParams) -> Self {
        Self { verb, principal, path }
    }

    pub fn require_principal(&self) -> Result<&Principal, ResourceError> {
        self.principal.as_ref().ok_or_else(ResourceError::authentication_required)
    }
}
