use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::CONTENT_TYPE;

/// Wrapper for JSON:API documents that adds the `jsonapi` member and media type
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub document: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(document: T) -> Self {
        Self { document, status_code: None }
    }

    pub fn with_status(document: T, status_code: StatusCode) -> Self {
        Self { document, status_code: Some(status_code) }
    }

    /// Create a 201 Created response
    pub fn created(document: T) -> Self {
        Self::with_status(document, StatusCode::CREATED)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let mut document = match serde_json::to_value(&self.document) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response document: {}", e);
                return crate::error::ApiError::internal_server_error("Failed to format response").into_response();
            }
        };

        if let Value::Object(members) = &mut document {
            members.insert("jsonapi".to_string(), json!({ "version": "1.0" }));
        }

        (status, [(header::CONTENT_TYPE, CONTENT_TYPE)], document.to_string()).into_response()
    }
}

// Convenience type aliases
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
