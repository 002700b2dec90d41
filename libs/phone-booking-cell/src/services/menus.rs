//! Spoken menus for each step of a phone booking.

use chrono::NaiveDate;

use shared_config::AppConfig;
use shared_models::scheduling::{Doctor, Slot, SlotTime};

use crate::models::{MAX_MENU_OPTIONS, SPECIALIZATIONS};
use crate::services::twiml::{Gather, VoiceResponse};

pub const SPECIALIZATION_ACTION: &str = "/user/handle-specialization-choice";
pub const DOCTOR_ACTION: &str = "/user/handle-doctor-choice";
pub const DATE_ACTION: &str = "/user/handle-date-choice";
pub const SLOT_ACTION: &str = "/user/handle-slot-choice";
pub const CONFIRM_ACTION: &str = "/user/confirm-appointment";

const NO_INPUT: &str = "We did not receive any input. Goodbye.";

pub fn spoken_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn menu<'a>(
    config: &AppConfig,
    action: &str,
    intro: &str,
    options: impl Iterator<Item = &'a str>,
) -> VoiceResponse {
    menu_owned(config, action, intro, options.map(str::to_string))
}

fn menu_owned(
    config: &AppConfig,
    action: &str,
    intro: &str,
    options: impl Iterator<Item = String>,
) -> VoiceResponse {
    let gather = options
        .take(MAX_MENU_OPTIONS)
        .enumerate()
        .fold(Gather::new(config.public_url(action)).say(intro), |gather, (i, option)| {
            gather.say(format!("Press {} for {}.", i + 1, option))
        });

    VoiceResponse::new().gather(gather).say(NO_INPUT).hangup()
}

pub fn specialization_menu(config: &AppConfig) -> VoiceResponse {
    menu(
        config,
        SPECIALIZATION_ACTION,
        "Welcome to EquiHealth phone booking. Please choose a specialization.",
        SPECIALIZATIONS.iter().copied(),
    )
}

pub fn doctor_menu(config: &AppConfig, doctors: &[Doctor]) -> VoiceResponse {
    menu(
        config,
        DOCTOR_ACTION,
        "Please choose a doctor.",
        doctors.iter().map(|d| d.name.as_str()),
    )
}

pub fn date_menu(config: &AppConfig, dates: &[NaiveDate]) -> VoiceResponse {
    menu_owned(
        config,
        DATE_ACTION,
        "Please choose a date.",
        dates.iter().map(|d| spoken_date(*d)),
    )
}

pub fn slot_menu(config: &AppConfig, slots: &[Slot]) -> VoiceResponse {
    menu_owned(
        config,
        SLOT_ACTION,
        "Please choose a time.",
        slots.iter().map(|s| s.start.spoken()),
    )
}

pub fn confirm_menu(
    config: &AppConfig,
    doctor_name: &str,
    date: NaiveDate,
    slot: SlotTime,
) -> VoiceResponse {
    let gather = Gather::new(config.public_url(CONFIRM_ACTION))
        .say(format!(
            "You selected {} on {} at {}.",
            doctor_name,
            spoken_date(date),
            slot.spoken()
        ))
        .say("Press 1 to confirm, or any other key to cancel.");

    VoiceResponse::new().gather(gather).say(NO_INPUT).hangup()
}

/// Ends the call after `message`.
pub fn apology_hangup(message: &str) -> VoiceResponse {
    VoiceResponse::new().say(message).hangup()
}

/// Speaks `notice` before re-asking `menu`.
pub fn reprompt(notice: &str, menu: VoiceResponse) -> VoiceResponse {
    VoiceResponse::new().say(notice).then(menu)
}
