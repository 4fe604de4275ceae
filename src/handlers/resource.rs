//! Axum handlers shared by every `ResourceHandler`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, Query, State},
    http::Method,
    Extension,
};
use serde_json::{json, Value};

use crate::access::{PathParams, RequestContext, ResourceError, Verb};
use crate::api::{collection_document, list_params, parse_body, resource_document, Linkage, ResourcePayload};
use crate::auth::Principal;
use crate::middleware::{ApiResponse, ApiResult};
use crate::resources::ResourceHandler;

fn context(
    method: &Method,
    principal: Option<Extension<Principal>>,
    raw: &HashMap<String, String>,
) -> Result<RequestContext, ResourceError> {
    let verb = Verb::from_method(method)
        .ok_or_else(|| ResourceError::MethodNotAllowed(format!("{} is not supported", method)))?;
    let path = PathParams::from_map(raw)?;
    Ok(RequestContext::new(verb, principal.map(|Extension(p)| p), path))
}

fn relationship_name(ctx: &RequestContext) -> String {
    ctx.path.relationship.clone().unwrap_or_default()
}

/// GET /events/:event/{collection}, /sessions/:session_id/{collection}
pub async fn list<H: ResourceHandler>(
    State(handler): State<Arc<H>>,
    method: Method,
    principal: Option<Extension<Principal>>,
    Path(raw): Path<HashMap<String, String>>,
    Query(query): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Value> {
    let ctx = context(&method, principal, &raw)?;
    let options = list_params(&query)?;
    let page = handler.list(&ctx, options).await?;
    Ok(ApiResponse::success(collection_document(&page.resources, page.count, &uri.to_string())))
}

/// POST /{collection}
pub async fn create<H: ResourceHandler>(
    State(handler): State<Arc<H>>,
    method: Method,
    principal: Option<Extension<Principal>>,
    body: Bytes,
) -> ApiResult<Value> {
    let ctx = context(&method, principal, &HashMap::new())?;
    let payload = ResourcePayload::from_document(&parse_body(&body)?, H::TYPE)?;
    let resource = handler.create(&ctx, payload).await?;
    Ok(ApiResponse::created(resource_document(&resource)))
}

/// GET on a detail route
pub async fn get<H: ResourceHandler>(
    State(handler): State<Arc<H>>,
    method: Method,
    principal: Option<Extension<Principal>>,
    Path(raw): Path<HashMap<String, String>>,
) -> ApiResult<Value> {
    let ctx = context(&method, principal, &raw)?;
    let resource = handler.get(&ctx).await?;
    Ok(ApiResponse::success(resource_document(&resource)))
}

/// PATCH on a detail route
pub async fn update<H: ResourceHandler>(
    State(handler): State<Arc<H>>,
    method: Method,
    principal: Option<Extension<Principal>>,
    Path(raw): Path<HashMap<String, String>>,
    body: Bytes,
) -> ApiResult<Value> {
    let ctx = context(&method, principal, &raw)?;
    let payload = ResourcePayload::from_document(&parse_body(&body)?, H::TYPE)?;
    let resource = handler.update(&ctx, payload).await?;
    Ok(ApiResponse::success(resource_document(&resource)))
}

/// DELETE on a detail route
pub async fn delete<H: ResourceHandler>(
    State(handler): State<Arc<H>>,
    method: Method,
    principal: Option<Extension<Principal>>,
    Path(raw): Path<HashMap<String, String>>,
) -> ApiResult<Value> {
    let ctx = context(&method, principal, &raw)?;
    handler.delete(&ctx).await?;
    Ok(ApiResponse::success(json!({ "meta": { "message": "Object successfully deleted" } })))
}

/// GET /{collection}/:id/relationships/:relationship
pub async fn relationship_get<H: ResourceHandler>(
    State(handler): State<Arc<H>>,
    method: Method,
    principal: Option<Extension<Principal>>,
    Path(raw): Path<HashMap<String, String>>,
) -> ApiResult<Value> {
    let ctx = context(&method, principal, &raw)?;
    let document = handler.get_relationship(&ctx, &relationship_name(&ctx)).await?;
    Ok(ApiResponse::success(document))
}

/// PATCH /{collection}/:id/relationships/:relationship
pub async fn relationship_update<H: ResourceHandler>(
    State(handler): State<Arc<H>>,
    method: Method,
    principal: Option<Extension<Principal>>,
    Path(raw): Path<HashMap<String, String>>,
    body: Bytes,
) -> ApiResult<Value> {
    let ctx = context(&method, principal, &raw)?;
    let name = relationship_name(&ctx);
    handler.relationship(&name, ctx.verb)?;
    let linkage = Linkage::from_document(&parse_body(&body)?)?;
    let document = handler.update_relationship(&ctx, &name, linkage).await?;
    Ok(ApiResponse::success(document))
}

/// DELETE /{collection}/:id/relationships/:relationship
pub async fn relationship_delete<H: ResourceHandler>(
    State(handler): State<Arc<H>>,
    method: Method,
    principal: Option<Extension<Principal>>,
    Path(raw): Path<HashMap<String, String>>,
    body: Bytes,
) -> ApiResult<Value> {
    let ctx = context(&method, principal, &raw)?;
    let name = relationship_name(&ctx);
    handler.relationship(&name, ctx.verb)?;
    let linkage = Linkage::from_document(&parse_body(&body)?)?;
    let document = handler.delete_relationship(&ctx, &name, linkage).await?;
    Ok(ApiResponse::success(document))
}
