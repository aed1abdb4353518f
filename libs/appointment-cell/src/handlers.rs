// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_models::scheduling::Appointment;
use shared_utils::access::{require_role, require_self_or_role};

use crate::models::{
    BookAppointmentRequest, BookingResponse, CancelAppointmentRequest, ProfessionalDayQuery,
    UpdateNotesRequest, UpdateTransportStatusRequest,
};
use crate::services::{AppointmentBookingService, AppointmentLifecycleService};

const FRONT_DESK: &[Role] = &[Role::Attendant, Role::Admin];

fn lifecycle(state: &AppState) -> AppointmentLifecycleService {
    AppointmentLifecycleService::new(Arc::clone(&state.supabase))
}

/// Owner, the appointment's professional, or operational staff.
fn can_view(user: &User, appointment: &Appointment) -> bool {
    user.is(appointment.client_id)
        || user.is(appointment.professional_id)
        || user.has_any_role(&[Role::Attendant, Role::Driver, Role::Admin])
}

/// Professionals act only on their own agenda.
async fn require_own_agenda(
    service: &AppointmentLifecycleService,
    user: &User,
    appointment_id: Uuid,
    auth_token: &str,
    action: &str,
) -> Result<(), AppError> {
    let appointment = service.get_appointment(appointment_id, auth_token).await?;
    if !user.is(appointment.professional_id) {
        warn!("Professional {} tried to {} appointment {} of another professional",
              user.id, action, appointment_id);
        return Err(AppError::Forbidden(format!(
            "Professionals can only {} their own appointments", action
        )));
    }
    Ok(())
}

pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(mut request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    require_role(&user, &[Role::Citizen, Role::Attendant, Role::Admin], "book appointments")?;

    // Citizens book for themselves only.
    if user.role() == Role::Citizen {
        let own_id = Uuid::parse_str(&user.id)
            .map_err(|_| AppError::Auth("Invalid user id in token".to_string()))?;
        if request.client_id.is_some_and(|id| id != own_id) {
            warn!("Citizen {} tried to book for another client", user.id);
            return Err(AppError::Forbidden("Citizens can only book for themselves".to_string()));
        }
        request.client_id = Some(own_id);
    }

    let service = AppointmentBookingService::new(Arc::clone(&state.supabase), &state.config);
    let response = service.book_appointment(request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = lifecycle(&state).get_appointment(appointment_id, auth.token()).await?;
    if !can_view(&user, &appointment) {
        return Err(AppError::Forbidden("Not allowed to view this appointment".to_string()));
    }
    Ok(Json(appointment))
}

pub async fn get_client_appointments(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_self_or_role(&user, &client_id.to_string(), FRONT_DESK, "view these appointments")?;

    let appointments = lifecycle(&state).list_for_client(client_id, auth.token()).await?;
    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn get_professional_day(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(professional_id): Path<Uuid>,
    Query(query): Query<ProfessionalDayQuery>,
) -> Result<Json<Value>, AppError> {
    require_self_or_role(&user, &professional_id.to_string(), FRONT_DESK, "view this agenda")?;

    let appointments = lifecycle(&state)
        .list_for_professional_date(professional_id, query.date, auth.token())
        .await?;
    Ok(Json(json!({
        "date": query.date,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let service = lifecycle(&state);

    if user.role() == Role::Professional {
        require_own_agenda(&service, &user, appointment_id, auth.token(), "complete").await?;
    } else {
        require_role(&user, FRONT_DESK, "complete appointments")?;
    }

    Ok(Json(service.complete(appointment_id, auth.token()).await?))
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let service = lifecycle(&state);

    match user.role() {
        Role::Citizen => {
            let appointment = service.get_appointment(appointment_id, auth.token()).await?;
            if !user.is(appointment.client_id) {
                return Err(AppError::Forbidden("Citizens can only cancel their own appointments".to_string()));
            }
        }
        Role::Professional => {
            require_own_agenda(&service, &user, appointment_id, auth.token(), "cancel").await?;
        }
        _ => require_role(&user, FRONT_DESK, "cancel appointments")?,
    }

    Ok(Json(service.cancel(appointment_id, request.confirmed, auth.token()).await?))
}

pub async fn update_notes(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateNotesRequest>,
) -> Result<Json<Appointment>, AppError> {
    let service = lifecycle(&state);

    if user.role() == Role::Professional {
        require_own_agenda(&service, &user, appointment_id, auth.token(), "annotate").await?;
    } else {
        require_role(&user, FRONT_DESK, "edit notes")?;
    }

    Ok(Json(service.update_notes(appointment_id, request.notes, auth.token()).await?))
}

pub async fn update_transport_status(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateTransportStatusRequest>,
) -> Result<Json<Appointment>, AppError> {
    require_role(&user, &[Role::Driver, Role::Attendant, Role::Admin], "record boarding")?;
    Ok(Json(
        lifecycle(&state)
            .set_transport_status(appointment_id, request.transport_status, auth.token())
            .await?,
    ))
}
