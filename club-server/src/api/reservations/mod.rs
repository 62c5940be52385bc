//! Venue reservation routes

mod handler;

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use crate::auth::permissions::RESERVATIONS_MANAGE;
use crate::auth::require_permission;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/reservations", routes())
}

fn routes() -> Router<ServerState> {
    // The expiry sweep only needs a session
    let read_routes = Router::new()
        .route("/", get(handler::list))
        .route("/expire", post(handler::expire))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/payments", get(handler::payments));

    let manage_routes = Router::new()
        .route("/", post(handler::create))
        .route("/{id}/status", patch(handler::update_status))
        .route("/{id}/apa", patch(handler::update_apa))
        .route("/{id}/payments", post(handler::add_payment))
        .layer(middleware::from_fn(require_permission(RESERVATIONS_MANAGE)));

    read_routes.merge(manage_routes)
}
