use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::scheduling::AppointmentStatus;

use crate::models::{AppointmentError, BookAppointmentRequest, UpdateStatusRequest};
use crate::router::AppointmentCellState;

fn parse_date(value: &str) -> Result<NaiveDate, AppointmentError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AppointmentError::Validation("Invalid date format. Use YYYY-MM-DD.".to_string())
    })
}

// ==============================================================================
// PATIENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user_id = user.uuid()?;
    let date = parse_date(&request.date)?;

    let appointment = state
        .booking
        .book_appointment(user_id, request.doctor_id, date, &request.slot)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appointment booked successfully",
            "appointment": appointment
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_user_appointments(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user.uuid()?;

    let appointments = state.booking.list_user_appointments(user_id).await?;

    Ok(Json(json!({
        "appointments": appointments
    })))
}

// ==============================================================================
// DOCTOR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = user.require_doctor()?;

    let appointments = state.booking.list_doctor_appointments(doctor_id).await?;

    Ok(Json(json!({
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = user.require_doctor()?;
    let status: AppointmentStatus = request
        .status
        .parse()
        .map_err(AppError::ValidationError)?;

    let appointment = state
        .booking
        .update_appointment_status(doctor_id, request.appointment_id, status)
        .await?;

    Ok(Json(json!({
        "message": "Appointment status updated successfully",
        "appointment": appointment
    })))
}
