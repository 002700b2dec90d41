use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::services::AvailabilityService;
use notification_cell::models::BookingNotice;
use notification_cell::services::NotificationDispatcher;
use shared_database::{DynStore, StoreError};
use shared_models::scheduling::{Appointment, AppointmentStatus, Doctor, Patient, SlotTime};

use crate::models::{
    claim_error, AppointmentError, DoctorAppointmentView, PatientAppointmentView,
};
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct BookingService {
    store: DynStore,
    availability: Arc<AvailabilityService>,
    notifier: Arc<NotificationDispatcher>,
    lifecycle: AppointmentLifecycleService,
}

impl BookingService {
    pub fn new(availability: Arc<AvailabilityService>, notifier: Arc<NotificationDispatcher>) -> Self {
        Self {
            store: availability.store().clone(),
            availability,
            notifier,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    pub fn availability(&self) -> &Arc<AvailabilityService> {
        &self.availability
    }

    /// Books `slot_label` for the patient, removing it from the doctor's ledger.
    ///
    /// Slot removal and appointment creation happen under the day lock; if the
    /// insert fails the slot goes back into the ledger. Confirmation emails are
    /// sent in the background and never affect the outcome.
    #[instrument(skip(self), fields(appointment_id = tracing::field::Empty))]
    pub async fn book_appointment(
        &self,
        user_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        slot_label: &str,
    ) -> Result<Appointment, AppointmentError> {
        let start = SlotTime::from_label(slot_label)
            .map_err(|e| AppointmentError::Validation(e.to_string()))?;

        if date < Utc::now().date_naive() {
            return Err(AppointmentError::PastDate(date));
        }

        let doctor = self
            .store
            .get_doctor(doctor_id)
            .await?
            .ok_or(AppointmentError::DoctorNotFound)?;
        let patient = self
            .store
            .get_patient(user_id)
            .await?
            .ok_or(AppointmentError::PatientNotFound)?;

        let claim = self
            .availability
            .claim_slot(doctor_id, date, start)
            .await
            .map_err(|e| claim_error(e, date, start))?;

        let appointment = Appointment::pending(user_id, doctor_id, date, &claim.slot);

        let saved = match self.store.insert_appointment(&appointment).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Appointment insert failed for slot {} on {}: {}", start, date, e);
                if let Err(restore_err) = self.availability.release_claim(claim).await {
                    warn!("Slot {} on {} could not be restored: {}", start, date, restore_err);
                }
                return Err(match e {
                    StoreError::Conflict(_) => AppointmentError::SlotUnavailable(start),
                    other => other.into(),
                });
            }
        };
        drop(claim);

        tracing::Span::current().record("appointment_id", tracing::field::display(saved.id));
        info!(
            "Appointment {} booked: patient {} with doctor {} on {} at {}",
            saved.id, user_id, doctor_id, date, start
        );

        if let Some(slot) = saved.booked_slot() {
            self.notifier.spawn_booking_notifications(BookingNotice {
                appointment_id: saved.id,
                patient_name: patient.name,
                patient_email: patient.email,
                doctor_name: doctor.name,
                doctor_email: doctor.email,
                specialization: doctor.specialization,
                date,
                slot,
            });
        }

        Ok(saved)
    }

    pub async fn list_user_appointments(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PatientAppointmentView>, AppointmentError> {
        let appointments = self.store.list_appointments_for_patient(user_id).await?;

        let mut doctors: HashMap<Uuid, Option<Doctor>> = HashMap::new();
        let mut views = Vec::with_capacity(appointments.len());

        for appointment in appointments {
            if !doctors.contains_key(&appointment.doctor_id) {
                let doctor = self.store.get_doctor(appointment.doctor_id).await?;
                doctors.insert(appointment.doctor_id, doctor);
            }
            let doctor = doctors.get(&appointment.doctor_id).and_then(Option::as_ref);

            views.push(PatientAppointmentView {
                id: appointment.id,
                doctor_id: appointment.doctor_id,
                doctor: doctor.map(|d| d.name.clone()).unwrap_or_else(|| "Unknown doctor".to_string()),
                department: doctor.map(|d| d.specialization.clone()).unwrap_or_default(),
                date: appointment.date,
                time: appointment.slot,
                end_time: appointment.slot_end,
                status: appointment.status,
                meeting_id: appointment.meeting_id,
            });
        }

        debug!("Listed {} appointments for patient {}", views.len(), user_id);
        Ok(views)
    }

    pub async fn list_doctor_appointments(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<DoctorAppointmentView>, AppointmentError> {
        let appointments = self.store.list_appointments_for_doctor(doctor_id).await?;

        let mut patients: HashMap<Uuid, Option<Patient>> = HashMap::new();
        let mut views = Vec::with_capacity(appointments.len());

        for appointment in appointments {
            if !patients.contains_key(&appointment.user_id) {
                let patient = self.store.get_patient(appointment.user_id).await?;
                patients.insert(appointment.user_id, patient);
            }
            let patient = patients.get(&appointment.user_id).and_then(Option::as_ref);

            views.push(DoctorAppointmentView {
                id: appointment.id,
                user_id: appointment.user_id,
                patient: patient.map(|p| p.name.clone()).unwrap_or_else(|| "Unknown patient".to_string()),
                patient_email: patient.map(|p| p.email.clone()),
                date: appointment.date,
                time: appointment.slot,
                end_time: appointment.slot_end,
                status: appointment.status,
                meeting_id: appointment.meeting_id,
            });
        }

        debug!("Listed {} appointments for doctor {}", views.len(), doctor_id);
        Ok(views)
    }

    /// Moves an appointment along its lifecycle on behalf of its doctor.
    #[instrument(skip(self))]
    pub async fn update_appointment_status(
        &self,
        doctor_id: Uuid,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let current = self
            .store
            .get_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        if current.doctor_id != doctor_id {
            warn!("Doctor {} tried to update appointment {} owned by {}", doctor_id, appointment_id, current.doctor_id);
            return Err(AppointmentError::Forbidden);
        }

        self.lifecycle
            .validate_status_transition(current.status, new_status)?;

        let mut updated = current.clone();
        updated.status = new_status;
        updated.updated_at = Utc::now();
        if new_status == AppointmentStatus::Confirmed && updated.meeting_id.is_none() {
            updated.meeting_id = Some(Uuid::new_v4().to_string());
        }

        let saved = self
            .store
            .update_appointment(&updated, current.status)
            .await?;

        info!("Appointment {} moved from {} to {}", appointment_id, current.status, new_status);

        if new_status == AppointmentStatus::Cancelled {
            self.reopen_cancelled_slot(&saved).await;
        }

        Ok(saved)
    }

    async fn reopen_cancelled_slot(&self, appointment: &Appointment) {
        let Some(slot) = appointment.booked_slot() else {
            debug!("Appointment {} has no slot end, nothing to reopen", appointment.id);
            return;
        };

        match self
            .availability
            .reopen_slot(appointment.doctor_id, appointment.date, slot)
            .await
        {
            Ok(true) => info!("Reopened slot {} on {} after cancellation", slot, appointment.date),
            Ok(false) => {}
            Err(e) => warn!("Failed to reopen slot {} on {}: {}", slot, appointment.date, e),
        }
    }
}
