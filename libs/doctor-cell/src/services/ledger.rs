//! Pure slot-set arithmetic behind the availability ledger.

use std::collections::HashSet;

use shared_models::scheduling::{Appointment, Slot, SlotTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotOverlap {
    pub first: Slot,
    pub second: Slot,
}

/// Start times held by non-cancelled appointments.
pub fn booked_starts(appointments: &[Appointment]) -> HashSet<SlotTime> {
    appointments
        .iter()
        .filter(|a| a.status.is_active())
        .map(|a| a.slot)
        .collect()
}

/// Combines existing and incoming slots into a sorted, overlap-free set.
///
/// Slots whose start is already booked are dropped; booked slots cannot be
/// reopened through a merge. The first adjacent pair that overlaps is
/// reported; an exact duplicate overlaps itself.
pub fn merge_slots(
    existing: &[Slot],
    incoming: &[Slot],
    booked: &HashSet<SlotTime>,
) -> Result<Vec<Slot>, SlotOverlap> {
    let mut merged: Vec<Slot> = existing
        .iter()
        .chain(incoming)
        .filter(|slot| !booked.contains(&slot.start))
        .copied()
        .collect();

    merged.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

    if let Some(pair) = merged.windows(2).find(|pair| pair[1].start < pair[0].end) {
        return Err(SlotOverlap {
            first: pair[0],
            second: pair[1],
        });
    }

    Ok(merged)
}

/// Removes exact `(start, end)` matches. `None` when nothing matched.
pub fn remove_slots(existing: &[Slot], requested: &[Slot]) -> Option<Vec<Slot>> {
    let remaining: Vec<Slot> = existing
        .iter()
        .filter(|slot| !requested.contains(slot))
        .copied()
        .collect();

    if remaining.len() == existing.len() {
        None
    } else {
        Some(remaining)
    }
}

pub fn open_slots(day: &[Slot], booked: &HashSet<SlotTime>) -> Vec<Slot> {
    day.iter()
        .filter(|slot| !booked.contains(&slot.start))
        .copied()
        .collect()
}
