// libs/transport-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::access::require_role;

use crate::models::{CapacityQuery, TripAssignment, TripAudit, TripManifest};
use crate::services::{TransportLedger, TripService};

const TRIP_VIEWERS: &[Role] = &[Role::Driver, Role::Attendant, Role::Professional, Role::Admin];
const TRIP_MANAGERS: &[Role] = &[Role::Attendant, Role::Admin];

fn trips(state: &AppState) -> TripService {
    TripService::new(Arc::clone(&state.supabase))
}

pub async fn get_date_capacity(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<CapacityQuery>,
) -> Result<Json<Value>, AppError> {
    let ledger = TransportLedger::new(
        Arc::clone(&state.supabase),
        state.config.default_transport_capacity,
    );
    let load = ledger.date_load(query.date, auth.token()).await?;
    let additional = query.additional.unwrap_or(1);

    Ok(Json(json!({
        "date": load.date,
        "capacity": load.capacity,
        "committed": load.committed,
        "remaining": load.remaining,
        "can_accommodate": load.can_accommodate(additional)
    })))
}

pub async fn get_trip(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, TRIP_VIEWERS, "view trips")?;
    let trip = trips(&state).get_trip(trip_id, auth.token()).await?;
    let free_seats = trip.free_seats();
    Ok(Json(json!({ "trip": trip, "free_seats": free_seats })))
}

pub async fn get_trip_passengers(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripManifest>, AppError> {
    require_role(&user, TRIP_VIEWERS, "view trip passengers")?;
    Ok(Json(trips(&state).trip_passengers(trip_id, auth.token()).await?))
}

pub async fn assign_to_trip(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((trip_id, appointment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TripAssignment>, AppError> {
    require_role(&user, TRIP_MANAGERS, "assign passengers")?;
    Ok(Json(trips(&state).assign(trip_id, appointment_id, auth.token()).await?))
}

pub async fn unassign_from_trip(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((trip_id, appointment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TripAssignment>, AppError> {
    require_role(&user, TRIP_MANAGERS, "remove passengers")?;
    Ok(Json(trips(&state).unassign(trip_id, appointment_id, auth.token()).await?))
}

pub async fn audit_trip(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripAudit>, AppError> {
    require_role(&user, &[Role::Admin], "audit trips")?;
    Ok(Json(trips(&state).audit(trip_id, auth.token()).await?))
}

pub async fn reconcile_trip(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripAudit>, AppError> {
    require_role(&user, &[Role::Admin], "reconcile trips")?;
    Ok(Json(trips(&state).reconcile(trip_id, auth.token()).await?))
}
