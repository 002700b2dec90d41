pub mod availability;
pub mod directory;
pub mod ledger;
pub mod locks;

pub use availability::{AvailabilityService, SlotClaim};
pub use directory::DoctorDirectory;
pub use locks::{DayGuard, DayLocks};
