use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type DayKey = (Uuid, NaiveDate);

/// Per-(doctor, date) async locks serializing ledger writers in this process.
#[derive(Default)]
pub struct DayLocks {
    locks: Mutex<HashMap<DayKey, Arc<AsyncMutex<()>>>>,
}

/// Exclusive hold on one doctor's day; released on drop.
#[derive(Debug)]
pub struct DayGuard {
    doctor_id: Uuid,
    date: NaiveDate,
    _guard: OwnedMutexGuard<()>,
}

impl DayGuard {
    pub fn covers(&self, doctor_id: Uuid, date: NaiveDate) -> bool {
        self.doctor_id == doctor_id && self.date == date
    }
}

impl DayLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, doctor_id: Uuid, date: NaiveDate) -> DayGuard {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Only the map references an idle entry.
            locks.retain(|_, m| Arc::strong_count(m) > 1);
            locks.entry((doctor_id, date)).or_default().clone()
        };

        DayGuard {
            doctor_id,
            date,
            _guard: mutex.lock_owned().await,
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.len())
            .unwrap_or_default()
    }
}
