// libs/schedule-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::access::require_self_or_role;

use crate::models::{ProfessionalSettings, SlotQuery, WorkSchedule, WorkingDaysQuery};
use crate::services::AvailabilityService;

const MAX_WORKING_DAYS_WINDOW: u32 = 90;

fn service(state: &AppState) -> AvailabilityService {
    AvailabilityService::new(Arc::clone(&state.supabase))
}

fn require_schedule_owner(user: &User, professional_id: Uuid) -> Result<(), AppError> {
    require_self_or_role(user, &professional_id.to_string(), &[Role::Admin], "manage this agenda")
}

pub async fn get_available_slots(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(professional_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = service(&state)
        .available_slots(professional_id, query.date, auth.token())
        .await?;

    Ok(Json(json!({
        "professional_id": professional_id,
        "date": query.date,
        "slots": slots,
        "total": slots.len()
    })))
}

pub async fn get_working_days(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(professional_id): Path<Uuid>,
    Query(query): Query<WorkingDaysQuery>,
) -> Result<Json<Value>, AppError> {
    let days = query.days.unwrap_or(30).min(MAX_WORKING_DAYS_WINDOW);
    let dates = service(&state)
        .working_days(professional_id, query.from, days, auth.token())
        .await?;

    Ok(Json(json!({ "professional_id": professional_id, "dates": dates })))
}

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(professional_id): Path<Uuid>,
) -> Result<Json<ProfessionalSettings>, AppError> {
    require_schedule_owner(&user, professional_id)?;
    let settings = service(&state).get_settings(professional_id, auth.token()).await?;
    Ok(Json(settings))
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(professional_id): Path<Uuid>,
    Json(settings): Json<ProfessionalSettings>,
) -> Result<Json<ProfessionalSettings>, AppError> {
    require_schedule_owner(&user, professional_id)?;
    let saved = service(&state)
        .save_settings(professional_id, &settings, auth.token())
        .await?;
    Ok(Json(saved))
}

pub async fn update_work_schedules(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(professional_id): Path<Uuid>,
    Json(schedules): Json<Vec<WorkSchedule>>,
) -> Result<Json<ProfessionalSettings>, AppError> {
    require_schedule_owner(&user, professional_id)?;
    let saved = service(&state)
        .set_work_schedules(professional_id, schedules, auth.token())
        .await?;
    Ok(Json(saved))
}

pub async fn block_day(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((professional_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<ProfessionalSettings>, AppError> {
    require_schedule_owner(&user, professional_id)?;
    Ok(Json(service(&state).block_day(professional_id, date, auth.token()).await?))
}

pub async fn unblock_day(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((professional_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<ProfessionalSettings>, AppError> {
    require_schedule_owner(&user, professional_id)?;
    Ok(Json(service(&state).unblock_day(professional_id, date, auth.token()).await?))
}

pub async fn block_time_slot(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((professional_id, date, time)): Path<(Uuid, NaiveDate, String)>,
) -> Result<Json<ProfessionalSettings>, AppError> {
    require_schedule_owner(&user, professional_id)?;
    Ok(Json(service(&state).block_time_slot(professional_id, date, &time, auth.token()).await?))
}

pub async fn unblock_time_slot(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((professional_id, date, time)): Path<(Uuid, NaiveDate, String)>,
) -> Result<Json<ProfessionalSettings>, AppError> {
    require_schedule_owner(&user, professional_id)?;
    Ok(Json(service(&state).unblock_time_slot(professional_id, date, &time, auth.token()).await?))
}
