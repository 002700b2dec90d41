use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use appointment_cell::models::AppointmentError;
use appointment_cell::services::BookingService;
use doctor_cell::models::AvailabilityError;
use doctor_cell::services::{AvailabilityService, DoctorDirectory};
use shared_config::AppConfig;
use shared_models::scheduling::Doctor;

use crate::models::{
    parse_choice, CallSession, PhoneBookingError, TelephonyError, MAX_MENU_OPTIONS,
    SPECIALIZATIONS,
};
use crate::services::menus::{self, apology_hangup, reprompt, spoken_date};
use crate::services::session::DynSessionStore;
use crate::services::telephony::TelephonyGateway;
use crate::services::twiml::VoiceResponse;

const SESSION_LOST: &str =
    "Sorry, we could not find your booking session. Please start a new booking. Goodbye.";
const TRY_AGAIN: &str = "Sorry, something went wrong. Please try again.";
const INVALID_CHOICE: &str = "Invalid choice.";

/// The provider can post the first webhook before `initiate` has stored the
/// session; the first step looks again once after this long.
const FIRST_WEBHOOK_GRACE: Duration = Duration::from_millis(250);

type StepResult = Result<VoiceResponse, PhoneBookingError>;

/// Five-step keypad booking driven by telephony webhooks.
///
/// Every step reads the call's session, validates the pressed digit against
/// the options offered last, stores the choice and answers with the next
/// menu. Invalid input re-asks the previous menu instead of moving forward.
pub struct PhoneBookingFlow {
    config: Arc<AppConfig>,
    sessions: DynSessionStore,
    directory: Arc<DoctorDirectory>,
    booking: Arc<BookingService>,
    telephony: Option<Arc<dyn TelephonyGateway>>,
}

impl PhoneBookingFlow {
    pub fn new(
        config: Arc<AppConfig>,
        sessions: DynSessionStore,
        booking: Arc<BookingService>,
        telephony: Option<Arc<dyn TelephonyGateway>>,
    ) -> Self {
        let directory = Arc::new(DoctorDirectory::new(booking.availability().store().clone()));
        Self {
            config,
            sessions,
            directory,
            booking,
            telephony,
        }
    }

    pub fn sessions(&self) -> &DynSessionStore {
        &self.sessions
    }

    fn availability(&self) -> &AvailabilityService {
        self.booking.availability()
    }

    /// Calls the patient's phone and opens a session under the returned call id.
    #[instrument(skip(self))]
    pub async fn initiate(&self, user_id: Uuid) -> Result<String, PhoneBookingError> {
        let gateway = self
            .telephony
            .as_ref()
            .ok_or(TelephonyError::NotConfigured)?;

        let patient = self
            .availability()
            .store()
            .get_patient(user_id)
            .await?
            .ok_or(PhoneBookingError::PatientNotFound)?;

        let phone = patient
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(PhoneBookingError::MissingPhone)?;

        let twiml = menus::specialization_menu(&self.config).render();
        let call_id = gateway.place_call(phone, &twiml).await?;

        self.sessions
            .put(&call_id, &CallSession::for_user(user_id))
            .await?;

        info!("Phone booking call {} started for patient {}", call_id, user_id);
        Ok(call_id)
    }

    pub async fn handle_specialization(&self, call_id: &str, digits: Option<&str>) -> VoiceResponse {
        self.respond(call_id, "specialization", self.specialization_step(call_id, digits).await)
    }

    pub async fn handle_doctor(&self, call_id: &str, digits: Option<&str>) -> VoiceResponse {
        self.respond(call_id, "doctor", self.doctor_step(call_id, digits).await)
    }

    pub async fn handle_date(&self, call_id: &str, digits: Option<&str>) -> VoiceResponse {
        self.respond(call_id, "date", self.date_step(call_id, digits).await)
    }

    pub async fn handle_slot(&self, call_id: &str, digits: Option<&str>) -> VoiceResponse {
        self.respond(call_id, "slot", self.slot_step(call_id, digits).await)
    }

    pub async fn confirm(&self, call_id: &str, digits: Option<&str>) -> VoiceResponse {
        self.respond(call_id, "confirm", self.confirm_step(call_id, digits).await)
    }

    // Infrastructure failures keep the call alive and restart the menus.
    fn respond(&self, call_id: &str, step: &str, result: StepResult) -> VoiceResponse {
        match result {
            Ok(response) => response,
            Err(e) => {
                error!("Phone booking step {} failed for call {}: {}", step, call_id, e);
                reprompt(TRY_AGAIN, menus::specialization_menu(&self.config))
            }
        }
    }

    async fn specialization_step(&self, call_id: &str, digits: Option<&str>) -> StepResult {
        let Some(mut session) = self.first_session(call_id).await? else {
            return Ok(session_lost(call_id));
        };

        let Some(index) = parse_choice(digits, SPECIALIZATIONS.len()) else {
            return Ok(reprompt(INVALID_CHOICE, menus::specialization_menu(&self.config)));
        };
        let specialization = SPECIALIZATIONS[index];

        let mut doctors = self.directory.by_specialization(specialization).await?;
        doctors.truncate(MAX_MENU_OPTIONS);
        if doctors.is_empty() {
            return Ok(reprompt(
                &format!("Sorry, there are no doctors available for {}.", specialization),
                menus::specialization_menu(&self.config),
            ));
        }

        session.choose_specialization(specialization, doctors.iter().map(|d| d.id).collect());
        self.sessions.put(call_id, &session).await?;

        debug!("Call {} chose {}", call_id, specialization);
        Ok(menus::doctor_menu(&self.config, &doctors))
    }

    async fn first_session(&self, call_id: &str) -> Result<Option<CallSession>, PhoneBookingError> {
        if let Some(session) = self.sessions.get(call_id).await? {
            return Ok(Some(session));
        }
        debug!("No session yet for call {}, waiting for initiate to store it", call_id);
        tokio::time::sleep(FIRST_WEBHOOK_GRACE).await;
        Ok(self.sessions.get(call_id).await?)
    }

    async fn doctor_step(&self, call_id: &str, digits: Option<&str>) -> StepResult {
        let Some(mut session) = self.sessions.get(call_id).await? else {
            return Ok(session_lost(call_id));
        };

        let Some(index) = parse_choice(digits, session.doctor_ids.len()) else {
            return Ok(reprompt(INVALID_CHOICE, menus::specialization_menu(&self.config)));
        };
        let doctor_id = session.doctor_ids[index];

        let dates = self.availability().upcoming_dates_from_today(doctor_id).await?;
        if dates.is_empty() {
            let menu = self.doctor_menu_for(&session).await?;
            return Ok(reprompt("Sorry, that doctor has no available dates.", menu));
        }

        session.choose_doctor(doctor_id, dates.clone());
        self.sessions.put(call_id, &session).await?;

        debug!("Call {} chose doctor {}", call_id, doctor_id);
        Ok(menus::date_menu(&self.config, &dates))
    }

    async fn date_step(&self, call_id: &str, digits: Option<&str>) -> StepResult {
        let Some(mut session) = self.sessions.get(call_id).await? else {
            return Ok(session_lost(call_id));
        };

        let (Some(doctor_id), Some(index)) = (
            session.doctor_id,
            parse_choice(digits, session.available_dates.len()),
        ) else {
            let menu = self.doctor_menu_for(&session).await?;
            return Ok(reprompt(INVALID_CHOICE, menu));
        };
        let date = session.available_dates[index];

        let mut slots = self.availability().open_slots(doctor_id, date).await?;
        slots.truncate(MAX_MENU_OPTIONS);
        if slots.is_empty() {
            let notice = format!("Sorry, there are no times left on {}.", spoken_date(date));
            return self.refresh_dates(call_id, &mut session, doctor_id, &notice).await;
        }

        session.choose_date(date, slots.clone());
        self.sessions.put(call_id, &session).await?;

        debug!("Call {} chose {}", call_id, date);
        Ok(menus::slot_menu(&self.config, &slots))
    }

    async fn slot_step(&self, call_id: &str, digits: Option<&str>) -> StepResult {
        let Some(mut session) = self.sessions.get(call_id).await? else {
            return Ok(session_lost(call_id));
        };

        let (Some(doctor_id), Some(date), Some(index)) = (
            session.doctor_id,
            session.date,
            parse_choice(digits, session.slots.len()),
        ) else {
            let menu = if session.available_dates.is_empty() {
                self.doctor_menu_for(&session).await?
            } else {
                menus::date_menu(&self.config, &session.available_dates)
            };
            return Ok(reprompt(INVALID_CHOICE, menu));
        };
        let slot = session.slots[index].start;

        session.choose_slot(slot);
        self.sessions.put(call_id, &session).await?;

        let doctor_name = match self.directory.get(doctor_id).await {
            Ok(doctor) => doctor.name,
            Err(AvailabilityError::DoctorNotFound) => "your doctor".to_string(),
            Err(e) => return Err(e.into()),
        };

        debug!("Call {} chose {} on {}", call_id, slot, date);
        Ok(menus::confirm_menu(&self.config, &doctor_name, date, slot))
    }

    async fn confirm_step(&self, call_id: &str, digits: Option<&str>) -> StepResult {
        let Some(mut session) = self.sessions.get(call_id).await? else {
            return Ok(session_lost(call_id));
        };

        let (Some(user_id), Some(doctor_id), Some(date), Some(slot)) =
            (session.user_id, session.doctor_id, session.date, session.slot)
        else {
            warn!("Call {} reached confirmation with an incomplete session", call_id);
            self.sessions.delete(call_id).await?;
            return Ok(apology_hangup(SESSION_LOST));
        };

        if digits.map(str::trim) != Some("1") {
            self.sessions.delete(call_id).await?;
            info!("Call {} cancelled the booking", call_id);
            return Ok(apology_hangup("Your booking has been cancelled. Goodbye."));
        }

        match self
            .booking
            .book_appointment(user_id, doctor_id, date, &slot.to_string())
            .await
        {
            Ok(appointment) => {
                self.sessions.delete(call_id).await?;
                info!("Call {} booked appointment {}", call_id, appointment.id);
                Ok(apology_hangup(&format!(
                    "Your appointment is booked for {} at {}. A confirmation email is on its way. Goodbye.",
                    spoken_date(date),
                    slot.spoken()
                )))
            }
            Err(AppointmentError::SlotUnavailable(_)) | Err(AppointmentError::NoAvailability(_)) => {
                info!("Call {} lost slot {} on {} to another booking", call_id, slot, date);
                let mut slots = self.availability().open_slots(doctor_id, date).await?;
                slots.truncate(MAX_MENU_OPTIONS);
                let notice = "Sorry, that time was just taken.";

                if slots.is_empty() {
                    return self.refresh_dates(call_id, &mut session, doctor_id, notice).await;
                }

                session.choose_date(date, slots.clone());
                self.sessions.put(call_id, &session).await?;
                Ok(reprompt(notice, menus::slot_menu(&self.config, &slots)))
            }
            Err(e) => {
                warn!("Call {} could not book: {}", call_id, e);
                self.sessions.delete(call_id).await?;
                Ok(apology_hangup(
                    "Sorry, we could not complete your booking. Please try again later. Goodbye.",
                ))
            }
        }
    }

    /// Re-offers the doctor's remaining dates, or the doctor menu when none are left.
    async fn refresh_dates(
        &self,
        call_id: &str,
        session: &mut CallSession,
        doctor_id: Uuid,
        notice: &str,
    ) -> StepResult {
        let dates = self.availability().upcoming_dates_from_today(doctor_id).await?;
        if dates.is_empty() {
            let menu = self.doctor_menu_for(session).await?;
            return Ok(reprompt(
                &format!("{} That doctor has no other available dates.", notice),
                menu,
            ));
        }

        session.choose_doctor(doctor_id, dates.clone());
        self.sessions.put(call_id, session).await?;
        Ok(reprompt(notice, menus::date_menu(&self.config, &dates)))
    }

    /// The doctor menu offered earlier in this call, or the specialization menu if there was none.
    async fn doctor_menu_for(&self, session: &CallSession) -> StepResult {
        let mut doctors: Vec<Doctor> = Vec::with_capacity(session.doctor_ids.len());
        for doctor_id in &session.doctor_ids {
            match self.directory.get(*doctor_id).await {
                Ok(doctor) => doctors.push(doctor),
                Err(AvailabilityError::DoctorNotFound) => {}
                Err(e) => return Err(e.into()),
            }
        }

        if doctors.len() != session.doctor_ids.len() || doctors.is_empty() {
            return Ok(menus::specialization_menu(&self.config));
        }
        Ok(menus::doctor_menu(&self.config, &doctors))
    }
}

fn session_lost(call_id: &str) -> VoiceResponse {
    warn!("No booking session for call {}", call_id);
    apology_hangup(SESSION_LOST)
}

/// Answer for a webhook that carries no call id at all.
pub fn unidentified_call(step: &str) -> VoiceResponse {
    warn!("Phone booking {} webhook without a call id", step);
    apology_hangup(SESSION_LOST)
}
