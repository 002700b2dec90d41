use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use appointment_cell::models::AppointmentError;
use doctor_cell::models::AvailabilityError;
use shared_models::error::AppError;
use shared_models::scheduling::{Slot, SlotTime};

/// Specializations offered by the phone menu, in keypad order.
pub const SPECIALIZATIONS: [&str; 6] = [
    "General Physician",
    "Cardiology",
    "Neurology",
    "Orthopedics",
    "Gastroenterology",
    "Endocrinology",
];

/// Most options read out in one menu.
pub const MAX_MENU_OPTIONS: usize = 7;

/// Booking intent accumulated across the webhooks of one call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSession {
    pub user_id: Option<Uuid>,
    pub specialization: Option<String>,
    #[serde(default)]
    pub doctor_ids: Vec<Uuid>,
    pub doctor_id: Option<Uuid>,
    #[serde(default)]
    pub available_dates: Vec<NaiveDate>,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub slots: Vec<Slot>,
    pub slot: Option<SlotTime>,
}

impl CallSession {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    // Each choice discards everything chosen after it.

    pub fn choose_specialization(&mut self, specialization: &str, doctor_ids: Vec<Uuid>) {
        self.specialization = Some(specialization.to_string());
        self.doctor_ids = doctor_ids;
        self.doctor_id = None;
        self.available_dates.clear();
        self.date = None;
        self.slots.clear();
        self.slot = None;
    }

    pub fn choose_doctor(&mut self, doctor_id: Uuid, available_dates: Vec<NaiveDate>) {
        self.doctor_id = Some(doctor_id);
        self.available_dates = available_dates;
        self.date = None;
        self.slots.clear();
        self.slot = None;
    }

    pub fn choose_date(&mut self, date: NaiveDate, slots: Vec<Slot>) {
        self.date = Some(date);
        self.slots = slots;
        self.slot = None;
    }

    pub fn choose_slot(&mut self, slot: SlotTime) {
        self.slot = Some(slot);
    }
}

/// Form fields posted by the telephony provider on every webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookForm {
    #[serde(rename = "CallSid", default)]
    pub call_sid: Option<String>,
    #[serde(rename = "Digits", default)]
    pub digits: Option<String>,
}

/// Maps a keypad entry onto a zero-based index into a menu of `len` options.
pub fn parse_choice(digits: Option<&str>, len: usize) -> Option<usize> {
    let choice: usize = digits?.trim().parse().ok()?;
    (1..=len.min(MAX_MENU_OPTIONS)).contains(&choice).then(|| choice - 1)
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum SessionStoreError {
    #[error("Session backend error: {0}")]
    Backend(String),

    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for SessionStoreError {
    fn from(err: redis::RedisError) -> Self {
        SessionStoreError::Backend(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for SessionStoreError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        SessionStoreError::Backend(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum TelephonyError {
    #[error("Telephony is not configured")]
    NotConfigured,

    #[error("Telephony API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected telephony response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug)]
pub enum PhoneBookingError {
    #[error("Phone booking is not available: {0}")]
    Telephony(#[from] TelephonyError),

    #[error("Patient not found")]
    PatientNotFound,

    #[error("No phone number on file for this account")]
    MissingPhone,

    #[error("Session store error: {0}")]
    Session(#[from] SessionStoreError),

    #[error(transparent)]
    Availability(#[from] AvailabilityError),

    #[error(transparent)]
    Booking(#[from] AppointmentError),

    #[error("Storage error: {0}")]
    Store(String),
}

impl From<shared_database::StoreError> for PhoneBookingError {
    fn from(err: shared_database::StoreError) -> Self {
        PhoneBookingError::Store(err.to_string())
    }
}

impl From<PhoneBookingError> for AppError {
    fn from(err: PhoneBookingError) -> Self {
        match err {
            PhoneBookingError::Telephony(e) => {
                // Provider responses can carry account details.
                error!("Telephony provider request failed: {}", e);
                AppError::ExternalService("Phone booking is temporarily unavailable".to_string())
            }
            PhoneBookingError::PatientNotFound => AppError::NotFound(err.to_string()),
            PhoneBookingError::MissingPhone => AppError::ValidationError(err.to_string()),
            PhoneBookingError::Session(e) => AppError::Internal(e.to_string()),
            PhoneBookingError::Availability(e) => e.into(),
            PhoneBookingError::Booking(e) => e.into(),
            PhoneBookingError::Store(msg) => AppError::Database(msg),
        }
    }
}
