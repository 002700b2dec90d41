#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use appointment_cell::services::BookingService;
use doctor_cell::services::AvailabilityService;
use notification_cell::models::RetryPolicy;
use notification_cell::services::{LoggingEmailSender, NotificationDispatcher};
use phone_booking_cell::models::CallSession;
use phone_booking_cell::services::{
    InMemorySessionStore, PhoneBookingFlow, SessionStore, TelephonyGateway,
};
use shared_config::AppConfig;
use shared_database::InMemoryStore;
use shared_models::scheduling::{Doctor, Patient, Slot};
use shared_utils::test_utils::{ClinicFixtures, TestConfig};

pub const CALL: &str = "CA0000000000000000000000000000test";

pub fn day() -> NaiveDate {
    ClinicFixtures::future_date(3)
}

pub struct PhoneClinic {
    pub config: Arc<AppConfig>,
    pub store: Arc<InMemoryStore>,
    pub availability: Arc<AvailabilityService>,
    pub booking: Arc<BookingService>,
    pub sessions: Arc<InMemorySessionStore>,
    pub flow: Arc<PhoneBookingFlow>,
    pub doctor: Doctor,
    pub patient: Patient,
}

impl PhoneClinic {
    pub async fn new() -> Self {
        Self::build(TestConfig::default().to_arc(), None).await
    }

    pub async fn build(config: Arc<AppConfig>, telephony: Option<Arc<dyn TelephonyGateway>>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let doctor = ClinicFixtures::doctor("Dr. Sarah Reynolds", "Cardiology");
        let patient = ClinicFixtures::patient("Jamie Lee");
        store.add_doctor(doctor.clone()).await;
        store.add_patient(patient.clone()).await;

        let notifier = Arc::new(NotificationDispatcher::new(
            Arc::new(LoggingEmailSender::new()),
            "EquiHealth <no-reply@equihealth.test>",
            RetryPolicy {
                max_attempts: 1,
                initial_backoff: Duration::from_millis(1),
                attempt_timeout: Duration::from_millis(100),
            },
        ));
        let availability = Arc::new(AvailabilityService::new(store.clone()));
        let booking = Arc::new(BookingService::new(availability.clone(), notifier));
        let sessions = Arc::new(InMemorySessionStore::new(Duration::from_secs(60)));

        let flow = Arc::new(PhoneBookingFlow::new(
            config.clone(),
            sessions.clone(),
            booking.clone(),
            telephony,
        ));

        Self {
            config,
            store,
            availability,
            booking,
            sessions,
            flow,
            doctor,
            patient,
        }
    }

    pub async fn open(&self, slots: &[(&str, &str)]) {
        let slots = slots
            .iter()
            .map(|(s, e)| Slot::parse(s, e).unwrap())
            .collect();
        self.availability
            .set_availability(self.doctor.id, day(), slots)
            .await
            .unwrap();
    }

    /// Opens a session as if the outbound call had just been answered.
    pub async fn answer_call(&self) {
        self.sessions
            .put(CALL, &CallSession::for_user(self.patient.id))
            .await
            .unwrap();
    }

    pub async fn session(&self) -> Option<CallSession> {
        self.sessions.get(CALL).await.unwrap()
    }
}
