use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::scheduling::{Doctor, Slot, SlotTime};

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Slot as sent by clients; validated into a `Slot` at the ledger boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotInput {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub date: String,
    pub slots: Vec<SlotInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSlotsQuery {
    pub doctor_id: Uuid,
    pub date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorsBySpecializationRequest {
    pub specialization: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub name: String,
    pub specialization: String,
}

impl From<Doctor> for DoctorSummary {
    fn from(doctor: Doctor) -> Self {
        Self {
            id: doctor.id,
            name: doctor.name,
            specialization: doctor.specialization,
        }
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, AvailabilityError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AvailabilityError::Validation("Invalid date format. Use YYYY-MM-DD.".to_string())
    })
}

/// Validates raw slots; the ledger only ever sees well-formed `Slot` values.
pub fn parse_slots(inputs: &[SlotInput]) -> Result<Vec<Slot>, AvailabilityError> {
    if inputs.is_empty() {
        return Err(AvailabilityError::Validation(
            "At least one slot must be specified.".to_string(),
        ));
    }

    inputs
        .iter()
        .map(|input| {
            Slot::parse(&input.start, &input.end)
                .map_err(|e| AvailabilityError::Validation(e.to_string()))
        })
        .collect()
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Date {0} is in the past")]
    PastDate(NaiveDate),

    #[error("Slot {first} overlaps with slot {second}")]
    Overlap { first: Slot, second: Slot },

    #[error("None of the requested slots exist on {0}")]
    NoMatch(NaiveDate),

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("No availability found")]
    NotFound,

    #[error("Slot {0} is not open")]
    SlotNotOpen(SlotTime),

    #[error("Availability was modified concurrently, please retry")]
    Conflict,

    #[error("Storage error: {0}")]
    Store(String),
}

impl From<StoreError> for AvailabilityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => AvailabilityError::Conflict,
            StoreError::Backend(msg) => AvailabilityError::Store(msg),
        }
    }
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::Validation(msg) => AppError::ValidationError(msg),
            AvailabilityError::PastDate(_) => AppError::BadRequest(err.to_string()),
            AvailabilityError::Overlap { .. } => AppError::Conflict(err.to_string()),
            AvailabilityError::NoMatch(_) => AppError::Conflict(err.to_string()),
            AvailabilityError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AvailabilityError::NotFound => AppError::NotFound(err.to_string()),
            AvailabilityError::SlotNotOpen(_) => AppError::Conflict(err.to_string()),
            AvailabilityError::Conflict => AppError::Conflict(err.to_string()),
            AvailabilityError::Store(msg) => AppError::Database(msg),
        }
    }
}
