pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Json, Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/logout", post(routes::auth::logout))
        .route("/me", get(routes::auth::me));

    let meeting_routes = Router::new()
        .route("/", get(routes::meeting::list).post(routes::meeting::create))
        .route(
            "/{meeting_id}",
            get(routes::meeting::get).delete(routes::meeting::delete),
        )
        .route("/{meeting_id}/start", post(routes::meeting::start))
        .route("/{meeting_id}/end", post(routes::meeting::end));

    let attendance_routes = Router::new()
        .route("/join", post(routes::attendance::join))
        .route("/leave", post(routes::attendance::leave))
        .route("/heartbeat", post(routes::attendance::heartbeat))
        .route(
            "/check-recent-session",
            post(routes::attendance::check_recent_session),
        )
        .route("/resume-session", post(routes::attendance::resume_session))
        .route("/active-sessions", get(routes::attendance::active_sessions))
        .route("/attendance", get(routes::attendance::history))
        .route("/attendance/cleanup", post(routes::attendance::cleanup));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/meeting", meeting_routes)
        .nest("/meeting/{meeting_id}", attendance_routes);

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state))
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .settings
        .app
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([
                axum::http::header::AUTHORIZATION,
                axum::http::header::CONTENT_TYPE,
            ])
            .allow_credentials(true)
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
