//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (auth, CORS, compression,
//! tracing), and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::middleware::{require_admin, require_auth};
use super::state::AppState;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| {
            let parsed = origin.parse::<HeaderValue>();
            if parsed.is_err() {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
            }
            parsed.ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn patient_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_patients).post(handlers::create_patient))
        .route("/paged", get(handlers::get_patients_paged))
        .route("/grouped", get(handlers::get_patients_grouped))
        .route("/by-cnp/{cnp}", get(handlers::get_patient_by_cnp))
        .route(
            "/{id}",
            get(handlers::get_patient)
                .put(handlers::update_patient)
                .delete(handlers::delete_patient),
        )
}

fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_staff).post(handlers::create_staff))
        .route("/paged", get(handlers::get_staff_paged))
        .route("/grouped", get(handlers::get_staff_grouped))
        .route("/by-department/{id}", get(handlers::list_staff_by_department))
        .route(
            "/{id}",
            get(handlers::get_staff)
                .put(handlers::update_staff)
                .delete(handlers::delete_staff),
        )
}

fn device_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_devices).post(handlers::create_device))
        .route("/paged", get(handlers::get_devices_paged))
        .route("/grouped", get(handlers::get_devices_grouped))
        .route("/maintenance-due", get(handlers::get_devices_due_for_maintenance))
        .route(
            "/{id}",
            get(handlers::get_device)
                .put(handlers::update_device)
                .delete(handlers::delete_device),
        )
}

fn medication_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_medications).post(handlers::create_medication))
        .route("/paged", get(handlers::get_medications_paged))
        .route("/grouped", get(handlers::get_medications_grouped))
        .route("/low-stock", get(handlers::get_low_stock_medications))
        .route("/{id}/stock", post(handlers::adjust_medication_stock))
        .route(
            "/{id}",
            get(handlers::get_medication)
                .put(handlers::update_medication)
                .delete(handlers::delete_medication),
        )
}

fn partner_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_partners).post(handlers::create_partner))
        .route("/paged", get(handlers::get_partners_paged))
        .route("/grouped", get(handlers::get_partners_grouped))
        .route("/by-fiscal-code/{code}", get(handlers::get_partner_by_fiscal_code))
        .route(
            "/{id}",
            get(handlers::get_partner)
                .put(handlers::update_partner)
                .delete(handlers::delete_partner),
        )
}

fn department_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_departments).post(handlers::create_department))
        .route("/paged", get(handlers::get_departments_paged))
        .route("/grouped", get(handlers::get_departments_grouped))
        .route("/tree", get(handlers::get_department_tree))
        .route("/by-kind/{kind}", get(handlers::list_departments_by_kind))
        .route("/{id}/children", get(handlers::get_department_children))
        .route(
            "/{id}",
            get(handlers::get_department)
                .put(handlers::update_department)
                .delete(handlers::delete_department),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route("/paged", get(handlers::get_users_paged))
        .route("/grouped", get(handlers::get_users_grouped))
        .route(
            "/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route_layer(middleware::from_fn(require_admin))
}

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_origins);

    // Everything here requires a valid bearer token
    let protected = Router::new()
        .route("/auth/me", get(handlers::me))
        .nest("/patients", patient_routes())
        .nest("/medical-staff", staff_routes())
        .nest("/medical-devices", device_routes())
        .nest("/medications", medication_routes())
        .nest("/partners", partner_routes())
        .nest("/departments", department_routes())
        .nest("/users", user_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .route("/auth/login", post(handlers::login))
        .merge(protected);

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
