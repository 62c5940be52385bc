//! Member routes, including the member's ledger

mod handler;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::auth::permissions::MEMBERS_MANAGE;
use crate::auth::require_permission;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/members", routes())
}

fn routes() -> Router<ServerState> {
    let read_routes = Router::new()
        .route("/", get(handler::list))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/movements", get(handler::movements))
        .route("/{id}/balance", get(handler::balance));

    let manage_routes = Router::new()
        .route("/", post(handler::create))
        .route("/{id}", axum::routing::put(handler::update).delete(handler::delete))
        .route("/{id}/movements", post(handler::create_movement))
        .route("/{id}/movements/{movement_id}", delete(handler::delete_movement))
        .layer(middleware::from_fn(require_permission(MEMBERS_MANAGE)));

    read_routes.merge(manage_routes)
}
