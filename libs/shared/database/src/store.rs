use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use shared_models::scheduling::{Appointment, AppointmentStatus, DayAvailability, Doctor, Patient};

use crate::supabase::DatabaseError;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A conditional write lost against a concurrent writer.
    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(msg) => StoreError::Conflict(msg),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Backend(format!("Serialization error: {}", err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub type DynStore = Arc<dyn ClinicStore>;

/// Persistence seam for the scheduling core.
///
/// Ledger writes are conditional: updates and deletes succeed only while the
/// stored `version` still equals the one the caller read, and appointment
/// status writes only while the stored status equals the expected one.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn get_doctor(&self, doctor_id: Uuid) -> StoreResult<Option<Doctor>>;

    async fn list_doctors_by_specialization(&self, specialization: &str) -> StoreResult<Vec<Doctor>>;

    async fn get_patient(&self, user_id: Uuid) -> StoreResult<Option<Patient>>;

    async fn get_day_availability(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<DayAvailability>>;

    /// All dates for a doctor, ascending.
    async fn list_availability(&self, doctor_id: Uuid) -> StoreResult<Vec<DayAvailability>>;

    /// Fails with `Conflict` when a record already exists for `(doctor_id, date)`.
    async fn insert_day_availability(&self, record: &DayAvailability) -> StoreResult<DayAvailability>;

    /// Replaces the slot set of `record`, bumping its version.
    async fn update_day_availability(&self, record: &DayAvailability) -> StoreResult<DayAvailability>;

    async fn delete_day_availability(&self, record: &DayAvailability) -> StoreResult<()>;

    /// Fails with `Conflict` when an active appointment already holds the slot.
    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<Appointment>;

    async fn get_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Appointment>>;

    async fn list_appointments_for_patient(&self, user_id: Uuid) -> StoreResult<Vec<Appointment>>;

    async fn list_appointments_for_doctor(&self, doctor_id: Uuid) -> StoreResult<Vec<Appointment>>;

    /// Non-cancelled appointments for one doctor and date.
    async fn list_active_appointments_on(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Appointment>>;

    /// Writes status and meeting id of `appointment` if the stored status is still `expected`.
    async fn update_appointment(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> StoreResult<Appointment>;
}
