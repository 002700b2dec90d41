use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use shared_models::scheduling::Slot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// What both parties need to hear about a new booking.
#[derive(Debug, Clone)]
pub struct BookingNotice {
    pub appointment_id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub doctor_name: String,
    pub doctor_email: String,
    pub specialization: String,
    pub date: NaiveDate,
    pub slot: Slot,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Doubles after every failed attempt.
    pub initial_backoff: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

/// Per-recipient outcome of a booking notification.
#[derive(Debug)]
pub struct DeliveryReport {
    pub patient: Result<u32, NotificationError>,
    pub doctor: Result<u32, NotificationError>,
}

impl DeliveryReport {
    pub fn all_delivered(&self) -> bool {
        self.patient.is_ok() && self.doctor.is_ok()
    }
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Email delivery is not configured")]
    NotConfigured,

    #[error("Email API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email send timed out after {millis}ms")]
    Timeout { millis: u128 },

    #[error("Email not delivered after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl NotificationError {
    /// Client errors other than rate limiting will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            NotificationError::Api { status, .. } => *status == 429 || *status >= 500,
            NotificationError::NotConfigured => false,
            _ => true,
        }
    }
}
