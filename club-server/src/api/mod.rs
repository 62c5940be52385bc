//! HTTP API
//!
//! One router per resource, merged by [`build_app`]. Read routes only need
//! a session; writes are layered with
//! [`require_permission`](crate::auth::require_permission).
//!
//! - [`health`] - liveness (public)
//! - [`auth`] - login, logout, current user
//! - [`members`] - members and their ledger
//! - [`payments`] - member payments
//! - [`charges`] - monthly charge run
//! - [`services`] / [`categories`] / [`collectors`] / [`resources`] - catalog
//! - [`reservations`] - venue bookings
//! - [`refinancings`] - installment plans
//! - [`users`] - back-office users (admin)
//! - [`cron`] - shared-secret endpoints for external schedulers
//! - [`maintenance`] - integrity, repair, export and import (admin)

pub mod auth;
pub mod health;

// Members and ledger
pub mod charges;
pub mod members;
pub mod payments;

// Catalog
pub mod categories;
pub mod collectors;
pub mod resources;
pub mod services;

// Bookings and plans
pub mod refinancings;
pub mod reservations;

// Administration
pub mod cron;
pub mod maintenance;
pub mod users;

use std::time::Duration;

use axum::{Router, middleware};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

use crate::auth::require_auth;
use crate::core::ServerState;

pub use crate::utils::{AppError, AppResult};

/// Access log middleware
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::info!(target: "http_access", "{} {} {}", method, uri, response.status());

    response
}

/// Full application: routes, auth, state and tower layers
pub fn build_app(state: ServerState) -> Router {
    let timeout = Duration::from_millis(state.config.request_timeout_ms.max(1));
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(members::router())
        .merge(payments::router())
        .merge(charges::router())
        .merge(services::router())
        .merge(categories::router())
        .merge(collectors::router())
        .merge(resources::router())
        .merge(reservations::router())
        .merge(refinancings::router())
        .merge(users::router())
        .merge(maintenance::router())
        .merge(cron::router(&state))
        // require_auth skips public routes itself
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::from_fn(log_request))
}
