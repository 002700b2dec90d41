use axum::{
    extract::{Extension, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    parse_date, parse_slots, AvailabilityRequest, DoctorSlotsQuery, DoctorSummary,
    DoctorsBySpecializationRequest,
};
use crate::router::DoctorCellState;

// ==============================================================================
// DOCTOR AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn set_availability(
    State(state): State<DoctorCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = user.require_doctor()?;
    let date = parse_date(&request.date)?;
    let slots = parse_slots(&request.slots)?;

    let record = state
        .availability
        .set_availability(doctor_id, date, slots)
        .await?;

    Ok(Json(json!({
        "message": "Availability updated successfully",
        "availability": record
    })))
}

#[axum::debug_handler]
pub async fn delete_slots(
    State(state): State<DoctorCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = user.require_doctor()?;
    let date = parse_date(&request.date)?;
    let slots = parse_slots(&request.slots)?;

    let remaining = state
        .availability
        .delete_slots(doctor_id, date, slots)
        .await?;

    info!("Doctor {} removed slots on {}", doctor_id, date);

    Ok(Json(json!({
        "message": "Slots deleted successfully",
        "availability": remaining
    })))
}

#[axum::debug_handler]
pub async fn list_availability(
    State(state): State<DoctorCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = user.require_doctor()?;

    let availability = state.availability.list_availability(doctor_id).await?;

    Ok(Json(json!({
        "availability": availability
    })))
}

// ==============================================================================
// PATIENT-FACING LOOKUPS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_doctors_by_specialization(
    State(state): State<DoctorCellState>,
    Extension(_user): Extension<User>,
    Json(request): Json<DoctorsBySpecializationRequest>,
) -> Result<Json<Value>, AppError> {
    let doctors: Vec<DoctorSummary> = state
        .directory
        .by_specialization(&request.specialization)
        .await?
        .into_iter()
        .map(DoctorSummary::from)
        .collect();

    Ok(Json(json!({
        "doctors": doctors
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_slots(
    State(state): State<DoctorCellState>,
    Extension(_user): Extension<User>,
    Query(query): Query<DoctorSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&query.date)?;

    let slots = state.availability.open_slots(query.doctor_id, date).await?;

    Ok(Json(json!({
        "doctorId": query.doctor_id,
        "date": date,
        "slots": slots
    })))
}
