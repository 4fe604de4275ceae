// HTTP API Error Types
use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};
use serde_json::{json, Value};

use crate::access::ResourceError;
use crate::api::CONTENT_TYPE;
use crate::auth::JwtError;
use crate::database::DatabaseError;
use crate::filter::FilterError;

/// Where in the request an error originated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorSource {
    /// Query or path parameter name
    Parameter(String),
    /// JSON pointer into the request document
    Pointer(String),
}

/// HTTP API error rendered as a JSON:API `errors` document
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest { detail: String, source: Option<ErrorSource> },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound { detail: String, source: Option<ErrorSource> },

    // 405 Method Not Allowed
    MethodNotAllowed(String),

    // 409 Conflict
    Conflict(String),

    // 422 Unprocessable Entity
    UnprocessableEntity { detail: String, source: Option<ErrorSource> },

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Short, human-readable summary of the problem type
    pub fn title(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "Bad Request",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::Forbidden(_) => "Access Forbidden",
            ApiError::NotFound { .. } => "Object not found",
            ApiError::MethodNotAllowed(_) => "Method Not Allowed",
            ApiError::Conflict(_) => "Conflict",
            ApiError::UnprocessableEntity { .. } => "Validation error",
            ApiError::InternalServerError(_) => "Internal Server Error",
            ApiError::ServiceUnavailable(_) => "Service Unavailable",
        }
    }

    /// Client-safe error message
    pub fn detail(&self) -> &str {
        match self {
            ApiError::BadRequest { detail, .. } => detail,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound { detail, .. } => detail,
            ApiError::MethodNotAllowed(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::UnprocessableEntity { detail, .. } => detail,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<&ErrorSource> {
        match self {
            ApiError::BadRequest { source, .. }
            | ApiError::NotFound { source, .. }
            | ApiError::UnprocessableEntity { source, .. } => source.as_ref(),
            _ => None,
        }
    }

    /// Convert to JSON:API response body
    pub fn to_json(&self) -> Value {
        let mut error = json!({
            "status": self.status_code().as_u16().to_string(),
            "title": self.title(),
            "detail": self.detail(),
        });
        match self.source() {
            Some(ErrorSource::Parameter(parameter)) => error["source"] = json!({ "parameter": parameter }),
            Some(ErrorSource::Pointer(pointer)) => error["source"] = json!({ "pointer": pointer }),
            None => {}
        }
        json!({ "errors": [error], "jsonapi": { "version": "1.0" } })
    }
}

// Static constructor methods
impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<ResourceError> for ApiError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::NotFound { parameter, detail } => ApiError::NotFound {
                detail,
                source: Some(ErrorSource::Parameter(parameter.to_string())),
            },
            ResourceError::MissingRelationship(name) => ApiError::BadRequest {
                detail: format!("Must have {} relationship", name),
                source: Some(ErrorSource::Pointer(format!("/data/relationships/{}", name))),
            },
            ResourceError::Forbidden(msg) => ApiError::Forbidden(msg),
            ResourceError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            ResourceError::InvalidPayload { pointer, detail } => ApiError::UnprocessableEntity {
                detail,
                source: (!pointer.is_empty()).then_some(ErrorSource::Pointer(pointer)),
            },
            ResourceError::Conflict(msg) => ApiError::Conflict(msg),
            ResourceError::MethodNotAllowed(msg) => ApiError::MethodNotAllowed(msg),
            ResourceError::Filter(err) => err.into(),
            ResourceError::Database(err) => err.into(),
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        let parameter = match &err {
            FilterError::InvalidLimit(_) => "page[size]",
            FilterError::InvalidOffset(_) => "page[number]",
            FilterError::InvalidColumn(_) => "sort",
            _ => "filter",
        };
        ApiError::BadRequest {
            detail: err.to_string(),
            source: Some(ErrorSource::Parameter(parameter.to_string())),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        if err.is_unavailable() {
            tracing::error!("Database unavailable: {}", err);
            return ApiError::service_unavailable("Database temporarily unavailable");
        }
        match err {
            DatabaseError::MigrationError(msg) => {
                tracing::error!("Migration error: {}", msg);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            other => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidSecret => {
                tracing::error!("JWT secret not configured");
                ApiError::internal_server_error("Authentication is not configured")
            }
            other => ApiError::unauthorized(other.to_string()),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.detail())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status_code(),
            [(header::CONTENT_TYPE, CONTENT_TYPE)],
            self.to_json().to_string(),
        )
            .into_response()
    }
}
