pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    // Support cases
    let case_routes = Router::new()
        .route("/", get(routes::support_case::list))
        .route("/new", post(routes::support_case::create))
        .route("/unassigned", get(routes::support_case::list_unassigned))
        .route("/unassigned/count", get(routes::support_case::count_unassigned))
        .route("/unseen/count", get(routes::support_case::unseen_for_admin))
        .route("/mark-all-seen", put(routes::seen::mark_all))
        .route(
            "/property/{property_id}",
            get(routes::support_case::list_for_property),
        )
        .route(
            "/property/{property_id}/unseen/agent",
            get(routes::support_case::unseen_for_property_agent),
        )
        .route(
            "/client/{client_id}/unseen",
            get(routes::support_case::unseen_for_client),
        )
        .route("/{id}", get(routes::support_case::get))
        .route("/{id}", put(routes::support_case::update))
        .route("/{id}/seen/admin-agent", put(routes::seen::admin_or_agent))
        .route("/{id}/seen/client", put(routes::seen::client))
        .route("/{id}/seen-by-admin", put(routes::seen::by_admin))
        .route("/{id}/seen-by-agent", put(routes::seen::by_agent))
        .route(
            "/{id}/messages/{message_id}",
            delete(routes::support_case::delete_message),
        );

    let api = Router::new().nest("/support-cases", case_routes);

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .route("/ws", get(ws::handler::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| o.parse().ok())
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(allowed)
    }
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
