use axum::{
    http::HeaderValue,
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Settings;
use crate::handlers;
use crate::state::AppState;

pub fn app(state: AppState, settings: &Settings) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::public::root))
        // Protected API
        .merge(task_routes(state.clone()))
        // Global middleware
        .layer(cors_layer(settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn task_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::tasks;

    let collection = get(tasks::collection_get).post(tasks::collection_post);
    let record = get(tasks::record_get)
        .put(tasks::record_put)
        .delete(tasks::record_delete);

    Router::new()
        .route("/api/tasks", collection.clone())
        .route("/api/tasks/", collection)
        .route("/api/tasks/:id", record)
        // route_layer: unknown paths stay 404 instead of 401
        .route_layer(middleware::from_fn_with_state(state, crate::middleware::require_identity))
}

/// Permissive in development; an explicit origin allow-list elsewhere.
pub fn cors_layer(settings: &Settings) -> CorsLayer {
    if settings.environment.is_development() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = settings
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
