mod handlers;
pub mod middleware;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;
use crate::report::ReportStore;

/// Shared state for all handlers: the store plus the report writer.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub reports: ReportStore,
}

pub fn create_router(state: AppState) -> Router {
    // Login and health are the only unauthenticated routes.
    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login));

    let protected = Router::new()
        .route("/auth/logout", post(handlers::logout))
        .route("/dashboard", get(handlers::dashboard))
        // Patients
        .route("/patients", get(handlers::list_patients))
        .route("/patients", post(handlers::create_patient))
        .route("/patients/{id}", get(handlers::get_patient))
        .route("/patients/{id}", put(handlers::update_patient))
        .route("/patients/{id}", delete(handlers::delete_patient))
        .route("/patients/{id}/start-session", post(handlers::start_session))
        .route("/patients/{id}/history", get(handlers::session_history))
        // Sessions
        .route("/sessions", get(handlers::list_sessions))
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/sessions/{id}", put(handlers::update_session))
        .route("/sessions/{id}", delete(handlers::delete_session))
        .route("/sessions/{id}/activities", get(handlers::list_session_activities))
        .route("/sessions/{id}/activities", post(handlers::add_session_activities))
        .route("/sessions/{id}/close", post(handlers::close_session))
        .route("/sessions/{id}/report", get(handlers::session_report))
        // Activity templates
        .route("/activity-templates", get(handlers::list_templates))
        .route("/activity-templates", post(handlers::create_template))
        .route("/activity-templates/{id}", get(handlers::get_template))
        .route("/activity-templates/{id}", put(handlers::update_template))
        .route("/activity-templates/{id}", delete(handlers::delete_template))
        // Session activities
        .route("/session-activities", get(handlers::list_activities))
        .route("/session-activities", post(handlers::create_activity))
        .route("/session-activities/{id}", get(handlers::get_activity))
        .route("/session-activities/{id}", put(handlers::update_activity))
        .route("/session-activities/{id}", delete(handlers::delete_activity))
        .route("/session-activities/{id}/edit", post(handlers::edit_activity))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .nest("/api/v1", public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
