use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// SLOT TIMES
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("Invalid time '{0}', expected HH:MM (24-hour)")]
    InvalidTime(String),

    #[error("Invalid slot label '{0}'")]
    InvalidLabel(String),

    #[error("Slot start {start} must be before end {end}")]
    EmptyRange { start: SlotTime, end: SlotTime },
}

fn slot_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("slot time pattern is valid")
    })
}

fn loose_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{1,2}):([0-5]\d)$").expect("loose time pattern is valid"))
}

/// Minute-precision time of day, written as zero-padded 24-hour `HH:MM`.
///
/// Ordering is chronological, which for the canonical text form is also
/// lexicographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(SlotTime)
    }

    /// Strict parse of the canonical `HH:MM` form.
    pub fn parse(value: &str) -> Result<Self, SlotError> {
        let caps = slot_time_pattern()
            .captures(value)
            .ok_or_else(|| SlotError::InvalidTime(value.to_string()))?;
        let hour: u32 = caps[1].parse().map_err(|_| SlotError::InvalidTime(value.to_string()))?;
        let minute: u32 = caps[2].parse().map_err(|_| SlotError::InvalidTime(value.to_string()))?;
        Self::from_hm(hour, minute).ok_or_else(|| SlotError::InvalidTime(value.to_string()))
    }

    /// Normalizes a client-supplied slot label into the canonical start key.
    ///
    /// Accepts `HH:MM`, `H:MM`, `H:MM AM`/`H:MM PM` and `start - end` ranges.
    /// A 12-hour label is converted to 24-hour time; an hour above 12 with a
    /// trailing suffix is taken as already 24-hour and only the suffix is dropped.
    pub fn from_label(label: &str) -> Result<Self, SlotError> {
        let invalid = || SlotError::InvalidLabel(label.to_string());

        let start_part = label.split(" - ").next().unwrap_or(label).trim();
        let upper = start_part.to_ascii_uppercase();

        let (clock, meridiem) = if let Some(rest) = upper.strip_suffix("AM") {
            (rest.trim(), Some(false))
        } else if let Some(rest) = upper.strip_suffix("PM") {
            (rest.trim(), Some(true))
        } else {
            (upper.as_str(), None)
        };

        let caps = loose_time_pattern().captures(clock).ok_or_else(invalid)?;
        let hour: u32 = caps[1].parse().map_err(|_| invalid())?;
        let minute: u32 = caps[2].parse().map_err(|_| invalid())?;

        let hour = match meridiem {
            None => hour,
            Some(_) if hour > 12 => hour,
            Some(_) if hour == 0 => return Err(invalid()),
            Some(false) => hour % 12,
            Some(true) => hour % 12 + 12,
        };

        Self::from_hm(hour, minute).ok_or_else(invalid)
    }

    pub fn as_naive_time(&self) -> NaiveTime {
        self.0
    }

    /// Spoken form used by the phone menus, e.g. `9:30 AM`.
    pub fn spoken(&self) -> String {
        let (is_pm, hour) = self.0.hour12();
        format!(
            "{}:{:02} {}",
            hour,
            self.0.minute(),
            if is_pm { "PM" } else { "AM" }
        )
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for SlotTime {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SlotTime::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ==============================================================================
// SLOTS AND DAY AVAILABILITY
// ==============================================================================

/// Half-open interval `[start, end)` within one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub start: SlotTime,
    pub end: SlotTime,
}

impl Slot {
    pub fn new(start: SlotTime, end: SlotTime) -> Result<Self, SlotError> {
        if start >= end {
            return Err(SlotError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, SlotError> {
        Self::new(SlotTime::parse(start)?, SlotTime::parse(end)?)
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Open slots one doctor offers on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
    /// Bumped on every write; ledger updates are conditional on it.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DayAvailability {
    pub fn new(doctor_id: Uuid, date: NaiveDate, slots: Vec<Slot>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            date,
            slots,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn slot_starting_at(&self, start: SlotTime) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.start == start)
    }

    /// Sorted by start and pairwise non-overlapping.
    pub fn is_well_formed(&self) -> bool {
        self.slots.windows(2).all(|pair| pair[1].start >= pair[0].end)
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Every status except `Cancelled` holds its slot.
    pub fn is_active(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "PENDING"),
            AppointmentStatus::Confirmed => write!(f, "CONFIRMED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(AppointmentStatus::Pending),
            "CONFIRMED" => Ok(AppointmentStatus::Confirmed),
            "COMPLETED" => Ok(AppointmentStatus::Completed),
            "CANCELLED" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!(
                "Invalid status '{}'. Use 'PENDING', 'CONFIRMED', 'COMPLETED', or 'CANCELLED'.",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    /// Start time of the claimed slot.
    pub slot: SlotTime,
    pub slot_end: Option<SlotTime>,
    pub status: AppointmentStatus,
    pub meeting_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn pending(user_id: Uuid, doctor_id: Uuid, date: NaiveDate, slot: &Slot) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            doctor_id,
            date,
            slot: slot.start,
            slot_end: Some(slot.end),
            status: AppointmentStatus::Pending,
            meeting_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn booked_slot(&self) -> Option<Slot> {
        self.slot_end.and_then(|end| Slot::new(self.slot, end).ok())
    }
}

// ==============================================================================
// PEOPLE
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub specialization: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}
