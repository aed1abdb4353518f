// libs/appointment-cell/src/services/status.rs
//
// Appointment state machine: upcoming -> completed | cancelled, both terminal.
// Boarding sub-state: pending -> present | absent, present <-> absent.
// Guards return Ok(true) when a write is needed and Ok(false) for a no-op.

use tracing::{debug, warn};

use shared_models::scheduling::{AppointmentStatus, TransportStatus};

use crate::models::AppointmentError;

pub fn valid_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
    match current {
        AppointmentStatus::Upcoming => &[AppointmentStatus::Completed, AppointmentStatus::Cancelled],
        AppointmentStatus::Completed | AppointmentStatus::Cancelled => &[],
    }
}

/// Re-applying the current status is accepted and changes nothing.
pub fn check_status_transition(
    current: AppointmentStatus,
    requested: AppointmentStatus,
) -> Result<bool, AppointmentError> {
    if current == requested {
        debug!("Status already {}, nothing to do", current);
        return Ok(false);
    }

    if !valid_transitions(current).contains(&requested) {
        warn!("Invalid status transition attempted: {} -> {}", current, requested);
        return Err(AppointmentError::InvalidStatusTransition { from: current, to: requested });
    }

    Ok(true)
}

/// `current` is `None` on external rows written before boarding was tracked;
/// those are treated as pending.
pub fn check_transport_transition(
    current: Option<TransportStatus>,
    requested: TransportStatus,
) -> Result<bool, AppointmentError> {
    let current = current.unwrap_or(TransportStatus::Pending);

    if current == requested {
        return Ok(false);
    }

    match (current, requested) {
        (_, TransportStatus::Pending) => {
            warn!("Boarding status cannot return to pending from {}", current);
            Err(AppointmentError::InvalidTransportTransition { from: current, to: requested })
        }
        _ => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn upcoming_moves_to_either_terminal_state() {
        assert_matches!(check_status_transition(AppointmentStatus::Upcoming, AppointmentStatus::Completed), Ok(true));
        assert_matches!(check_status_transition(AppointmentStatus::Upcoming, AppointmentStatus::Cancelled), Ok(true));
    }

    #[test]
    fn terminal_states_never_change() {
        for terminal in [AppointmentStatus::Completed, AppointmentStatus::Cancelled] {
            for requested in [AppointmentStatus::Upcoming, AppointmentStatus::Completed, AppointmentStatus::Cancelled] {
                let result = check_status_transition(terminal, requested);
                if requested == terminal {
                    assert_matches!(result, Ok(false));
                } else {
                    assert_matches!(
                        result,
                        Err(AppointmentError::InvalidStatusTransition { from, to }) if from == terminal && to == requested
                    );
                }
            }
        }
    }

    #[test]
    fn boarding_toggles_but_never_returns_to_pending() {
        use TransportStatus::*;

        assert_matches!(check_transport_transition(Some(Pending), Present), Ok(true));
        assert_matches!(check_transport_transition(Some(Pending), Absent), Ok(true));
        assert_matches!(check_transport_transition(Some(Present), Absent), Ok(true));
        assert_matches!(check_transport_transition(Some(Absent), Present), Ok(true));
        assert_matches!(check_transport_transition(Some(Present), Present), Ok(false));
        assert_matches!(check_transport_transition(Some(Pending), Pending), Ok(false));
        assert_matches!(
            check_transport_transition(Some(Absent), Pending),
            Err(AppointmentError::InvalidTransportTransition { .. })
        );
        assert_matches!(check_transport_transition(None, Present), Ok(true));
    }
}
