//! Refinancing routes

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::permissions::REFINANCINGS_MANAGE;
use crate::auth::require_permission;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/refinancings", routes())
}

fn routes() -> Router<ServerState> {
    let read_routes = Router::new()
        .route("/", get(handler::list))
        .route("/simulate", post(handler::simulate))
        .route("/{id}", get(handler::get_by_id));

    let manage_routes = Router::new()
        .route("/", post(handler::create))
        .route("/{id}/installments/{number}/pay", post(handler::pay_installment))
        .route("/{id}/cancel", post(handler::cancel))
        .layer(middleware::from_fn(require_permission(REFINANCINGS_MANAGE)));

    read_routes.merge(manage_routes)
}
