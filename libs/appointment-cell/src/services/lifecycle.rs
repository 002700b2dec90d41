use tracing::{debug, warn};

use shared_models::scheduling::AppointmentStatus;

use crate::models::AppointmentError;

pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> &'static [AppointmentStatus] {
        match current_status {
            AppointmentStatus::Pending => &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled],
            AppointmentStatus::Confirmed => &[AppointmentStatus::Completed, AppointmentStatus::Cancelled],
            // Terminal states
            AppointmentStatus::Completed => &[],
            AppointmentStatus::Cancelled => &[],
        }
    }

    pub fn is_terminal(&self, status: AppointmentStatus) -> bool {
        self.get_valid_transitions(status).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use AppointmentStatus::*;

    #[test]
    fn allowed_transitions() {
        let lifecycle = AppointmentLifecycleService::new();
        for (from, to) in [
            (Pending, Confirmed),
            (Pending, Cancelled),
            (Confirmed, Completed),
            (Confirmed, Cancelled),
        ] {
            assert!(lifecycle.validate_status_transition(from, to).is_ok(), "{} -> {}", from, to);
        }
    }

    #[test]
    fn rejected_transitions() {
        let lifecycle = AppointmentLifecycleService::new();
        for (from, to) in [
            (Pending, Completed),
            (Pending, Pending),
            (Confirmed, Pending),
            (Completed, Cancelled),
            (Cancelled, Confirmed),
            (Cancelled, Completed),
        ] {
            assert_matches!(
                lifecycle.validate_status_transition(from, to),
                Err(AppointmentError::InvalidStatusTransition { .. })
            );
        }
        assert!(lifecycle.is_terminal(Completed));
        assert!(lifecycle.is_terminal(Cancelled));
        assert!(!lifecycle.is_terminal(Confirmed));
    }
}
