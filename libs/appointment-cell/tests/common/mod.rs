#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use appointment_cell::services::BookingService;
use doctor_cell::services::AvailabilityService;
use notification_cell::models::{EmailMessage, RetryPolicy};
use notification_cell::services::{LoggingEmailSender, NotificationDispatcher};
use shared_database::InMemoryStore;
use shared_models::scheduling::{Doctor, Patient, Slot};
use shared_utils::test_utils::ClinicFixtures;

pub struct Clinic {
    pub store: Arc<InMemoryStore>,
    pub availability: Arc<AvailabilityService>,
    pub booking: Arc<BookingService>,
    pub outbox: Arc<LoggingEmailSender>,
    pub doctor: Doctor,
    pub patient: Patient,
}

pub fn slot(start: &str, end: &str) -> Slot {
    Slot::parse(start, end).unwrap()
}

pub fn day() -> NaiveDate {
    ClinicFixtures::future_date(3)
}

impl Clinic {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let doctor = ClinicFixtures::doctor("Dr. Sarah Reynolds", "Cardiology");
        let patient = ClinicFixtures::patient("Jamie Lee");
        store.add_doctor(doctor.clone()).await;
        store.add_patient(patient.clone()).await;

        let outbox = Arc::new(LoggingEmailSender::new());
        let notifier = Arc::new(NotificationDispatcher::new(
            outbox.clone(),
            "EquiHealth <no-reply@equihealth.test>",
            RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(5),
                attempt_timeout: Duration::from_millis(200),
            },
        ));

        let availability = Arc::new(AvailabilityService::new(store.clone()));
        let booking = Arc::new(BookingService::new(availability.clone(), notifier));

        Self {
            store,
            availability,
            booking,
            outbox,
            doctor,
            patient,
        }
    }

    pub async fn open(&self, slots: &[(&str, &str)]) {
        let slots = slots.iter().map(|(s, e)| slot(s, e)).collect();
        self.availability
            .set_availability(self.doctor.id, day(), slots)
            .await
            .unwrap();
    }

    pub async fn add_patient(&self, name: &str) -> Patient {
        let patient = ClinicFixtures::patient(name);
        self.store.add_patient(patient.clone()).await;
        patient
    }

    /// Waits for background notification tasks to drain into the outbox.
    pub async fn wait_for_emails(&self, count: usize) -> Vec<EmailMessage> {
        for _ in 0..50 {
            let sent = self.outbox.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.outbox.sent()
    }
}
