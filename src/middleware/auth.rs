use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{decode_jwt, Principal};
use crate::error::ApiError;

/// Decode a bearer token when one is sent and attach the `Principal` to the
/// request. Anonymous requests pass through; a bad token is rejected.
pub async fn identify_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    if let Some(token) = extract_jwt_from_headers(request.headers())? {
        let claims = decode_jwt(&token)?;
        tracing::debug!("Authenticated user {}", claims.sub);
        request.extensions_mut().insert(Principal::from(claims));
    }

    Ok(next.run(request).await)
}

/// Reject requests that `identify_middleware` left anonymous
pub async fn require_auth_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    if request.extensions().get::<Principal>().is_none() {
        return Err(ApiError::unauthorized("Authentication is required"));
    }
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    // Flask-JWT style "JWT <token>" is accepted alongside "Bearer <token>"
    let token = auth_str
        .strip_prefix("Bearer ")
        .or_else(|| auth_str.strip_prefix("JWT "))
        .ok_or_else(|| ApiError::unauthorized("Authorization header must use Bearer token format"))?;

    if token.trim().is_empty() {
        return Err(ApiError::unauthorized("Empty JWT token"));
    }
    Ok(Some(token.trim().to_string()))
}
