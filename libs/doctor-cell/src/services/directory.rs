use tracing::debug;

use shared_database::DynStore;
use shared_models::scheduling::Doctor;

use crate::models::AvailabilityError;

/// Read-only lookups over the doctor roster.
pub struct DoctorDirectory {
    store: DynStore,
}

impl DoctorDirectory {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    /// Doctors practising `specialization`, skipping rows with no usable name.
    pub async fn by_specialization(
        &self,
        specialization: &str,
    ) -> Result<Vec<Doctor>, AvailabilityError> {
        let specialization = specialization.trim();
        if specialization.is_empty() {
            return Err(AvailabilityError::Validation(
                "Specialization is required".to_string(),
            ));
        }

        let doctors: Vec<Doctor> = self
            .store
            .list_doctors_by_specialization(specialization)
            .await?
            .into_iter()
            .filter(|d| !d.name.trim().is_empty())
            .collect();

        debug!("Found {} doctors for {}", doctors.len(), specialization);
        Ok(doctors)
    }

    pub async fn get(&self, doctor_id: uuid::Uuid) -> Result<Doctor, AvailabilityError> {
        self.store
            .get_doctor(doctor_id)
            .await?
            .ok_or(AvailabilityError::DoctorNotFound)
    }
}
