use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::models::AvailabilityError;
use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::scheduling::{AppointmentStatus, SlotTime};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub date: String,
    /// `HH:MM`, `H:MM AM/PM`, or a `start - end` label as shown to the patient.
    pub slot: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub appointment_id: Uuid,
    pub status: String,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

/// A patient's view of one booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAppointmentView {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub doctor: String,
    pub department: String,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub end_time: Option<SlotTime>,
    pub status: AppointmentStatus,
    pub meeting_id: Option<String>,
}

/// A doctor's view of one booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorAppointmentView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub patient: String,
    pub patient_email: Option<String>,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub end_time: Option<SlotTime>,
    pub status: AppointmentStatus,
    pub meeting_id: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot book appointments on past date {0}")]
    PastDate(NaiveDate),

    #[error("Doctor has no availability on {0}")]
    NoAvailability(NaiveDate),

    #[error("Slot {0} is not available")]
    SlotUnavailable(SlotTime),

    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Unauthorized access to appointment")]
    Forbidden,

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment was modified concurrently, please retry")]
    Conflict,

    #[error("Storage error: {0}")]
    Store(String),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => AppointmentError::Conflict,
            StoreError::Backend(msg) => AppointmentError::Store(msg),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::PastDate(_) => AppError::BadRequest(err.to_string()),
            AppointmentError::NoAvailability(_) => AppError::NotFound(err.to_string()),
            AppointmentError::SlotUnavailable(_) => AppError::Conflict(err.to_string()),
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::PatientNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::Forbidden => AppError::Forbidden(err.to_string()),
            AppointmentError::InvalidStatusTransition { .. } => AppError::Conflict(err.to_string()),
            AppointmentError::Conflict => AppError::Conflict(err.to_string()),
            AppointmentError::Store(msg) => AppError::Database(msg),
        }
    }
}

/// Maps a failed ledger claim onto the booking vocabulary.
pub fn claim_error(err: AvailabilityError, date: NaiveDate, start: SlotTime) -> AppointmentError {
    match err {
        AvailabilityError::NotFound => AppointmentError::NoAvailability(date),
        AvailabilityError::SlotNotOpen(_) | AvailabilityError::Conflict => {
            AppointmentError::SlotUnavailable(start)
        }
        AvailabilityError::PastDate(d) => AppointmentError::PastDate(d),
        AvailabilityError::DoctorNotFound => AppointmentError::DoctorNotFound,
        AvailabilityError::Validation(msg) => AppointmentError::Validation(msg),
        other => AppointmentError::Store(other.to_string()),
    }
}
