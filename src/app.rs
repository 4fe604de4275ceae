use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config;
use crate::database::Store;
use crate::handlers::{self, resource};
use crate::middleware::{identify_middleware, require_auth_middleware};
use crate::resources::{FaqHandler, MicrolocationHandler, ResourceHandler};

/// Shared state handed to every route
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub faqs: Arc<FaqHandler>,
    pub microlocations: Arc<MicrolocationHandler>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            faqs: Arc::new(FaqHandler::new(store.clone())),
            microlocations: Arc::new(MicrolocationHandler::new(store.clone())),
            store,
        }
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Arc<FaqHandler> {
    fn from_ref(state: &AppState) -> Self {
        state.faqs.clone()
    }
}

impl FromRef<AppState> for Arc<MicrolocationHandler> {
    fn from_ref(state: &AppState) -> Self {
        state.microlocations.clone()
    }
}

pub fn app(state: AppState) -> Router {
    let api = Router::new().merge(faq_routes()).merge(microlocation_routes());
    let base_path = &config::config().api.base_path;

    let router = Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health));
    let router = if base_path.is_empty() {
        router.merge(api)
    } else {
        router.nest(base_path, api)
    };

    let mut router = router.layer(middleware::from_fn(identify_middleware));
    if config::config().security.enable_cors {
        router = router.layer(cors_layer());
    }
    if config::config().api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router.with_state(state)
}

fn faq_routes() -> Router<AppState> {
    Router::new()
        .merge(resource_routes::<FaqHandler>())
        // Any signed-in user may list an event's FAQs
        .route(
            "/events/:event/faqs",
            get(resource::list::<FaqHandler>).route_layer(middleware::from_fn(require_auth_middleware)),
        )
        .route("/events/:event/faq", detail::<FaqHandler>())
}

fn microlocation_routes() -> Router<AppState> {
    Router::new()
        .merge(resource_routes::<MicrolocationHandler>())
        .route("/events/:event/microlocations", get(resource::list::<MicrolocationHandler>))
        .route("/sessions/:session_id/microlocations", get(resource::list::<MicrolocationHandler>))
        .route("/sessions/:session_id/microlocation", detail::<MicrolocationHandler>())
}

/// Create, detail and relationship routes under `/{collection}`
fn resource_routes<H: ResourceHandler>() -> Router<AppState>
where
    Arc<H>: FromRef<AppState>,
{
    let collection = format!("/{}", H::COLLECTION);
    Router::new()
        .route(&collection, post(resource::create::<H>))
        .route(&format!("{}/:id", collection), detail::<H>())
        .route(
            &format!("{}/:id/relationships/:relationship", collection),
            get(resource::relationship_get::<H>)
                .patch(resource::relationship_update::<H>)
                .delete(resource::relationship_delete::<H>),
        )
}

fn detail<H: ResourceHandler>() -> MethodRouter<AppState>
where
    Arc<H>: FromRef<AppState>,
{
    get(resource::get::<H>).patch(resource::update::<H>).delete(resource::delete::<H>)
}

fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = config::config()
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
