// libs/schedule-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn schedule_routes(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route("/professionals/{professional_id}/slots", get(handlers::get_available_slots))
        .route("/professionals/{professional_id}/working-days", get(handlers::get_working_days))
        .route(
            "/professionals/{professional_id}/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .route("/professionals/{professional_id}/work-schedules", put(handlers::update_work_schedules))
        .route(
            "/professionals/{professional_id}/blocked-days/{date}",
            post(handlers::block_day).delete(handlers::unblock_day),
        )
        .route(
            "/professionals/{professional_id}/blocked-slots/{date}/{time}",
            post(handlers::block_time_slot).delete(handlers::unblock_time_slot),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
