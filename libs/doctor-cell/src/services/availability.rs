use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_database::DynStore;
use shared_models::scheduling::{DayAvailability, Slot, SlotTime};

use crate::models::AvailabilityError;
use crate::services::ledger::{self, SlotOverlap};
use crate::services::locks::{DayGuard, DayLocks};

/// Upper bound on dates offered to callers picking a day.
pub const MAX_OFFERED_DATES: usize = 7;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl From<SlotOverlap> for AvailabilityError {
    fn from(overlap: SlotOverlap) -> Self {
        AvailabilityError::Overlap {
            first: overlap.first,
            second: overlap.second,
        }
    }
}

/// A slot taken out of the ledger while its day lock is held.
///
/// The lock stays held until the claim is dropped or handed back through
/// [`AvailabilityService::release_claim`], so the caller can persist the
/// appointment before any other writer sees the day again.
#[derive(Debug)]
pub struct SlotClaim {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slot: Slot,
    guard: DayGuard,
}

impl SlotClaim {
    pub fn is_locked_for(&self, doctor_id: Uuid, date: NaiveDate) -> bool {
        self.guard.covers(doctor_id, date)
    }
}

pub struct AvailabilityService {
    store: DynStore,
    locks: Arc<DayLocks>,
}

impl AvailabilityService {
    pub fn new(store: DynStore) -> Self {
        Self {
            store,
            locks: Arc::new(DayLocks::new()),
        }
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    /// Adds slots to a doctor's day, creating the record if needed.
    #[instrument(skip(self, slots), fields(slot_count = slots.len()))]
    pub async fn set_availability(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        slots: Vec<Slot>,
    ) -> Result<DayAvailability, AvailabilityError> {
        if slots.is_empty() {
            return Err(AvailabilityError::Validation(
                "At least one slot must be specified.".to_string(),
            ));
        }
        if date < today() {
            return Err(AvailabilityError::PastDate(date));
        }
        if self.store.get_doctor(doctor_id).await?.is_none() {
            return Err(AvailabilityError::DoctorNotFound);
        }

        let _guard = self.locks.lock(doctor_id, date).await;

        let existing = self.store.get_day_availability(doctor_id, date).await?;
        let booked = self.booked_starts(doctor_id, date).await?;
        let current = existing.as_ref().map(|r| r.slots.as_slice()).unwrap_or(&[]);

        let merged = ledger::merge_slots(current, &slots, &booked)?;

        let saved = match existing {
            Some(record) => {
                let updated = DayAvailability {
                    slots: merged,
                    updated_at: Utc::now(),
                    ..record
                };
                self.store.update_day_availability(&updated).await?
            }
            None => {
                let record = DayAvailability::new(doctor_id, date, merged);
                self.store.insert_day_availability(&record).await?
            }
        };

        info!(
            "Availability for doctor {} on {} now has {} slots",
            doctor_id,
            date,
            saved.slots.len()
        );
        Ok(saved)
    }

    /// Removes exactly matching slots. An emptied day is deleted and `None` returned.
    #[instrument(skip(self, slots), fields(slot_count = slots.len()))]
    pub async fn delete_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        slots: Vec<Slot>,
    ) -> Result<Option<DayAvailability>, AvailabilityError> {
        if slots.is_empty() {
            return Err(AvailabilityError::Validation(
                "At least one slot must be specified.".to_string(),
            ));
        }
        if date < today() {
            return Err(AvailabilityError::PastDate(date));
        }

        let _guard = self.locks.lock(doctor_id, date).await;

        let record = self
            .store
            .get_day_availability(doctor_id, date)
            .await?
            .ok_or(AvailabilityError::NoMatch(date))?;

        let remaining =
            ledger::remove_slots(&record.slots, &slots).ok_or(AvailabilityError::NoMatch(date))?;

        if remaining.is_empty() {
            self.store.delete_day_availability(&record).await?;
            info!("Removed last slot for doctor {} on {}", doctor_id, date);
            return Ok(None);
        }

        let updated = DayAvailability {
            slots: remaining,
            updated_at: Utc::now(),
            ..record
        };
        let saved = self.store.update_day_availability(&updated).await?;
        debug!("Doctor {} has {} slots left on {}", doctor_id, saved.slots.len(), date);
        Ok(Some(saved))
    }

    /// All day records for a doctor, ascending by date.
    pub async fn list_availability(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<DayAvailability>, AvailabilityError> {
        let records = self.store.list_availability(doctor_id).await?;
        if records.is_empty() {
            return Err(AvailabilityError::NotFound);
        }
        Ok(records)
    }

    /// Bookable slots on a day: present in the ledger and not held by an active appointment.
    pub async fn open_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, AvailabilityError> {
        let Some(record) = self.store.get_day_availability(doctor_id, date).await? else {
            return Ok(Vec::new());
        };
        let booked = self.booked_starts(doctor_id, date).await?;
        Ok(ledger::open_slots(&record.slots, &booked))
    }

    /// Dates from `from` onward that still have at least one open slot.
    pub async fn upcoming_dates(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
    ) -> Result<Vec<NaiveDate>, AvailabilityError> {
        let records = self.store.list_availability(doctor_id).await?;
        let mut dates = Vec::new();

        for record in records.into_iter().filter(|r| r.date >= from) {
            if dates.len() == MAX_OFFERED_DATES {
                break;
            }
            let booked = self.booked_starts(doctor_id, record.date).await?;
            if !ledger::open_slots(&record.slots, &booked).is_empty() {
                dates.push(record.date);
            }
        }

        Ok(dates)
    }

    pub async fn upcoming_dates_from_today(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<NaiveDate>, AvailabilityError> {
        self.upcoming_dates(doctor_id, today()).await
    }

    /// Takes the slot starting at `start` out of the ledger and keeps the day locked.
    #[instrument(skip(self))]
    pub async fn claim_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        start: SlotTime,
    ) -> Result<SlotClaim, AvailabilityError> {
        if date < today() {
            return Err(AvailabilityError::PastDate(date));
        }

        let guard = self.locks.lock(doctor_id, date).await;

        let booked = self.booked_starts(doctor_id, date).await?;
        if booked.contains(&start) {
            return Err(AvailabilityError::SlotNotOpen(start));
        }

        let record = self
            .store
            .get_day_availability(doctor_id, date)
            .await?
            .ok_or(AvailabilityError::NotFound)?;

        let slot = *record
            .slot_starting_at(start)
            .ok_or(AvailabilityError::SlotNotOpen(start))?;

        let remaining: Vec<Slot> = record.slots.iter().filter(|s| **s != slot).copied().collect();
        if remaining.is_empty() {
            self.store.delete_day_availability(&record).await?;
        } else {
            let updated = DayAvailability {
                slots: remaining,
                updated_at: Utc::now(),
                ..record
            };
            self.store.update_day_availability(&updated).await?;
        }

        debug!("Claimed slot {} for doctor {} on {}", slot, doctor_id, date);
        Ok(SlotClaim {
            doctor_id,
            date,
            slot,
            guard,
        })
    }

    /// Puts a claimed slot back after the booking that needed it failed.
    pub async fn release_claim(&self, claim: SlotClaim) -> Result<(), AvailabilityError> {
        let SlotClaim {
            doctor_id,
            date,
            slot,
            guard,
        } = claim;

        let result = self.merge_back(doctor_id, date, slot).await;
        drop(guard);

        match result {
            Ok(()) => {
                info!("Restored slot {} for doctor {} on {}", slot, doctor_id, date);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to restore slot {} for doctor {} on {}: {}", slot, doctor_id, date, e);
                Err(e)
            }
        }
    }

    /// Returns a released appointment's slot to the ledger.
    ///
    /// Past dates are left alone. If the slot now overlaps something the doctor
    /// added since, the ledger is kept as is.
    pub async fn reopen_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        slot: Slot,
    ) -> Result<bool, AvailabilityError> {
        if date < today() {
            debug!("Not reopening slot {} on past date {}", slot, date);
            return Ok(false);
        }

        let _guard = self.locks.lock(doctor_id, date).await;

        match self.merge_back(doctor_id, date, slot).await {
            Ok(()) => Ok(true),
            Err(AvailabilityError::Overlap { first, second }) => {
                warn!(
                    "Not reopening slot {} for doctor {} on {}: {} overlaps {}",
                    slot, doctor_id, date, first, second
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    // Caller must hold the day lock.
    async fn merge_back(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        slot: Slot,
    ) -> Result<(), AvailabilityError> {
        let existing = self.store.get_day_availability(doctor_id, date).await?;
        let booked = self.booked_starts(doctor_id, date).await?;

        match existing {
            Some(record) => {
                let merged = ledger::merge_slots(&record.slots, &[slot], &booked)?;
                let updated = DayAvailability {
                    slots: merged,
                    updated_at: Utc::now(),
                    ..record
                };
                self.store.update_day_availability(&updated).await?;
            }
            None => {
                let merged = ledger::merge_slots(&[], &[slot], &booked)?;
                if !merged.is_empty() {
                    let record = DayAvailability::new(doctor_id, date, merged);
                    self.store.insert_day_availability(&record).await?;
                }
            }
        }

        Ok(())
    }

    async fn booked_starts(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<std::collections::HashSet<SlotTime>, AvailabilityError> {
        let appointments = self.store.list_active_appointments_on(doctor_id, date).await?;
        Ok(ledger::booked_starts(&appointments))
    }
}
