use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::scheduling::{Appointment, AppointmentStatus, DayAvailability, Doctor, Patient};

use crate::store::{ClinicStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    doctors: HashMap<Uuid, Doctor>,
    patients: HashMap<Uuid, Patient>,
    availability: HashMap<(Uuid, NaiveDate), DayAvailability>,
    appointments: HashMap<Uuid, Appointment>,
}

/// Process-local `ClinicStore`, used for development and tests.
///
/// Every operation runs under one lock, so conditional writes are atomic.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_doctor(&self, doctor: Doctor) {
        self.tables.write().await.doctors.insert(doctor.id, doctor);
    }

    pub async fn add_patient(&self, patient: Patient) {
        self.tables.write().await.patients.insert(patient.id, patient);
    }
}

fn sorted_by_slot(mut appointments: Vec<Appointment>) -> Vec<Appointment> {
    appointments.sort_by(|a, b| a.date.cmp(&b.date).then(a.slot.cmp(&b.slot)));
    appointments
}

#[async_trait]
impl ClinicStore for InMemoryStore {
    async fn get_doctor(&self, doctor_id: Uuid) -> StoreResult<Option<Doctor>> {
        Ok(self.tables.read().await.doctors.get(&doctor_id).cloned())
    }

    async fn list_doctors_by_specialization(&self, specialization: &str) -> StoreResult<Vec<Doctor>> {
        let tables = self.tables.read().await;
        let mut doctors: Vec<Doctor> = tables
            .doctors
            .values()
            .filter(|d| d.specialization.eq_ignore_ascii_case(specialization))
            .cloned()
            .collect();
        doctors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(doctors)
    }

    async fn get_patient(&self, user_id: Uuid) -> StoreResult<Option<Patient>> {
        Ok(self.tables.read().await.patients.get(&user_id).cloned())
    }

    async fn get_day_availability(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<DayAvailability>> {
        Ok(self
            .tables
            .read()
            .await
            .availability
            .get(&(doctor_id, date))
            .cloned())
    }

    async fn list_availability(&self, doctor_id: Uuid) -> StoreResult<Vec<DayAvailability>> {
        let tables = self.tables.read().await;
        let mut days: Vec<DayAvailability> = tables
            .availability
            .values()
            .filter(|day| day.doctor_id == doctor_id)
            .cloned()
            .collect();
        days.sort_by_key(|day| day.date);
        Ok(days)
    }

    async fn insert_day_availability(&self, record: &DayAvailability) -> StoreResult<DayAvailability> {
        let mut tables = self.tables.write().await;
        let key = (record.doctor_id, record.date);
        if tables.availability.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "availability for doctor {} on {} already exists",
                record.doctor_id, record.date
            )));
        }
        tables.availability.insert(key, record.clone());
        Ok(record.clone())
    }

    async fn update_day_availability(&self, record: &DayAvailability) -> StoreResult<DayAvailability> {
        let mut tables = self.tables.write().await;
        match tables.availability.get_mut(&(record.doctor_id, record.date)) {
            Some(stored) if stored.id == record.id && stored.version == record.version => {
                stored.slots = record.slots.clone();
                stored.version += 1;
                stored.updated_at = Utc::now();
                Ok(stored.clone())
            }
            _ => Err(StoreError::Conflict(format!(
                "availability {} changed since version {}",
                record.id, record.version
            ))),
        }
    }

    async fn delete_day_availability(&self, record: &DayAvailability) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let key = (record.doctor_id, record.date);
        match tables.availability.get(&key) {
            Some(stored) if stored.id == record.id && stored.version == record.version => {
                tables.availability.remove(&key);
                Ok(())
            }
            _ => Err(StoreError::Conflict(format!(
                "availability {} changed since version {}",
                record.id, record.version
            ))),
        }
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<Appointment> {
        let mut tables = self.tables.write().await;
        let taken = tables.appointments.values().any(|existing| {
            existing.status.is_active()
                && existing.doctor_id == appointment.doctor_id
                && existing.date == appointment.date
                && existing.slot == appointment.slot
        });
        if taken {
            return Err(StoreError::Conflict(format!(
                "slot {} on {} is already booked",
                appointment.slot, appointment.date
            )));
        }
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn get_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(&appointment_id).cloned())
    }

    async fn list_appointments_for_patient(&self, user_id: Uuid) -> StoreResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_slot(
            tables
                .appointments
                .values()
                .filter(|a| a.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_appointments_for_doctor(&self, doctor_id: Uuid) -> StoreResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_slot(
            tables
                .appointments
                .values()
                .filter(|a| a.doctor_id == doctor_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_active_appointments_on(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_slot(
            tables
                .appointments
                .values()
                .filter(|a| a.doctor_id == doctor_id && a.date == date && a.status.is_active())
                .cloned()
                .collect(),
        ))
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> StoreResult<Appointment> {
        let mut tables = self.tables.write().await;
        match tables.appointments.get_mut(&appointment.id) {
            Some(stored) if stored.status == expected => {
                stored.status = appointment.status;
                stored.meeting_id = appointment.meeting_id.clone();
                stored.updated_at = Utc::now();
                Ok(stored.clone())
            }
            _ => Err(StoreError::Conflict(format!(
                "appointment {} is no longer {}",
                appointment.id, expected
            ))),
        }
    }
}
