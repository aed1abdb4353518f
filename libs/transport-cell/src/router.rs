// libs/transport-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn transport_routes(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route("/capacity", get(handlers::get_date_capacity))
        .route("/trips/{trip_id}", get(handlers::get_trip))
        .route("/trips/{trip_id}/passengers", get(handlers::get_trip_passengers))
        .route(
            "/trips/{trip_id}/appointments/{appointment_id}",
            post(handlers::assign_to_trip).delete(handlers::unassign_from_trip),
        )
        .route("/trips/{trip_id}/audit", get(handlers::audit_trip))
        .route("/trips/{trip_id}/reconcile", post(handlers::reconcile_trip))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
