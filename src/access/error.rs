use thiserror::Error;

use crate::database::DatabaseError;
use crate::filter::FilterError;

/// Failures raised by resource resolution, authorization and validation.
/// Each kind maps to one client-facing status at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A referenced entity does not exist, or must look as if it did not
    #[error("{detail}")]
    NotFound { parameter: &'static str, detail: String },

    #[error("Missing required relationship: {0}")]
    MissingRelationship(String),

    /// The principal lacks the required role on an existing resource
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{detail}")]
    InvalidPayload { pointer: String, detail: String },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ResourceError {
    pub fn not_found(parameter: &'static str, detail: impl Into<String>) -> Self {
        ResourceError::NotFound { parameter, detail: detail.into() }
    }

    pub fn invalid_payload(pointer: impl Into<String>, detail: impl Into<String>) -> Self {
        ResourceError::InvalidPayload { pointer: pointer.into(), detail: detail.into() }
    }

    pub fn authentication_required() -> Self {
        ResourceError::Unauthorized("Authentication is required".to_string())
    }

    pub fn coorganizer_required() -> Self {
        ResourceError::Forbidden("Co-organizer access is required.".to_string())
    }
}
