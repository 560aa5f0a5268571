// libs/reservation-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{ReservationError, ReservationStatus};

pub struct ReservationLifecycleService;

impl ReservationLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: ReservationStatus,
        new_status: ReservationStatus,
    ) -> Result<(), ReservationError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(ReservationError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Manual transitions. `Expired` is only set by the maintenance job.
    pub fn get_valid_transitions(&self, current_status: ReservationStatus) -> Vec<ReservationStatus> {
        match current_status {
            ReservationStatus::Pending => vec![ReservationStatus::Confirmed, ReservationStatus::Cancelled],
            ReservationStatus::Confirmed => vec![
                ReservationStatus::Completed,
                ReservationStatus::Cancelled,
                ReservationStatus::NoShow,
            ],
            // Terminal states - no transitions allowed
            ReservationStatus::Cancelled
            | ReservationStatus::Completed
            | ReservationStatus::NoShow
            | ReservationStatus::Expired => vec![],
        }
    }

    pub fn is_terminal(&self, status: ReservationStatus) -> bool {
        self.get_valid_transitions(status).is_empty()
    }
}

impl Default for ReservationLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReservationStatus::*;

    #[test]
    fn pending_can_be_confirmed_or_cancelled() {
        let lifecycle = ReservationLifecycleService::new();
        assert!(lifecycle.validate_status_transition(Pending, Confirmed).is_ok());
        assert!(lifecycle.validate_status_transition(Pending, Cancelled).is_ok());
        assert!(lifecycle.validate_status_transition(Pending, Completed).is_err());
        assert!(lifecycle.validate_status_transition(Pending, NoShow).is_err());
    }

    #[test]
    fn confirmed_can_finish_three_ways() {
        let lifecycle = ReservationLifecycleService::new();
        for next in [Completed, Cancelled, NoShow] {
            assert!(lifecycle.validate_status_transition(Confirmed, next).is_ok());
        }
        assert!(lifecycle.validate_status_transition(Confirmed, Pending).is_err());
    }

    #[test]
    fn terminal_states_reject_everything() {
        let lifecycle = ReservationLifecycleService::new();
        for terminal in [Cancelled, Completed, NoShow, Expired] {
            assert!(lifecycle.is_terminal(terminal));
            assert!(matches!(
                lifecycle.validate_status_transition(terminal, Confirmed),
                Err(ReservationError::InvalidStatusTransition { .. })
            ));
        }
    }
}
