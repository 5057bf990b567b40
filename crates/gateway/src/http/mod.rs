//! HTTP surface (C8): routes the Gateway's client-facing API to the saga
//! coordinator and read aggregator.

mod handlers;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/cars", get(handlers::list_cars))
        .route(
            "/api/v1/rental",
            post(handlers::create_rental).get(handlers::list_rentals),
        )
        .route(
            "/api/v1/rental/:uid",
            get(handlers::get_rental).delete(handlers::cancel_rental),
        )
        .route("/api/v1/rental/:uid/finish", post(handlers::finish_rental))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
