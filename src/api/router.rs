use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::state::AppState;
use crate::api::{allocations, assets, clients};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/clients", post(clients::create).get(clients::list))
        .route(
            "/clients/{client_id}",
            get(clients::get)
                .put(clients::replace)
                .patch(clients::patch)
                .delete(clients::remove),
        )
        .route(
            "/clients/{client_id}/allocations",
            get(allocations::list).post(allocations::create),
        )
        .route(
            "/clients/{client_id}/allocations/{allocation_id}",
            patch(allocations::patch).delete(allocations::remove),
        )
        .route("/assets/available", get(assets::available))
        .route("/assets/quotes", get(assets::quotes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
