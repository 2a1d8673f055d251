use axum::{Router, http::Method, middleware, routing::get};
use std::error::Error;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::handler::{AppState, healthcheck};

pub mod api;
pub mod books;
pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod id;
pub mod model;
pub mod request_log;

/// Builds the full service: healthcheck, book routes, request logging and CORS.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(healthcheck))
        .merge(books::routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_log::log_requests))
                .layer(cors),
        )
        .with_state(state)
}

pub fn unpack_error(err: &dyn Error) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
