use tracing::{debug, warn};

use shared_models::auth::Role;

use crate::models::{AppointmentError, AppointmentStatus, PaymentStatus};

use AppointmentStatus::*;

/// Every legal status change and the roles that may perform it.
/// Ownership is checked separately by `authorization::authorize`.
const TRANSITIONS: &[(AppointmentStatus, AppointmentStatus, &[Role])] = &[
    (Scheduled, Confirmed, &[Role::Doctor]),
    (Scheduled, Cancelled, &[Role::Patient, Role::Doctor]),
    (Confirmed, Completed, &[Role::Doctor]),
    (Confirmed, Cancelled, &[Role::Patient, Role::Doctor]),
    (Scheduled, NoShow, &[Role::Doctor, Role::Admin]),
    (Confirmed, NoShow, &[Role::Doctor, Role::Admin]),
];

pub fn allowed_roles(from: AppointmentStatus, to: AppointmentStatus) -> &'static [Role] {
    TRANSITIONS
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map(|(_, _, roles)| *roles)
        .unwrap_or(&[])
}

pub fn valid_targets(from: AppointmentStatus, role: Role) -> Vec<AppointmentStatus> {
    TRANSITIONS
        .iter()
        .filter(|(f, _, roles)| *f == from && roles.contains(&role))
        .map(|(_, t, _)| *t)
        .collect()
}

pub fn check_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
    role: Role,
) -> Result<(), AppointmentError> {
    debug!("Validating status transition {} -> {} for {}", from, to, role);

    if !allowed_roles(from, to).contains(&role) {
        warn!("Invalid status transition attempted by {}: {} -> {}", role, from, to);
        return Err(AppointmentError::InvalidTransition { from, to });
    }

    Ok(())
}

/// Payments move forward only: pending -> paid -> refunded.
pub fn check_payment_transition(
    from: PaymentStatus,
    to: PaymentStatus,
) -> Result<(), AppointmentError> {
    match (from, to) {
        (PaymentStatus::Pending, PaymentStatus::Paid)
        | (PaymentStatus::Paid, PaymentStatus::Refunded) => Ok(()),
        _ => {
            warn!("Invalid payment transition attempted: {} -> {}", from, to);
            Err(AppointmentError::InvalidPaymentTransition { from, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_doctor_path_through_lifecycle() {
        assert!(check_transition(Scheduled, Confirmed, Role::Doctor).is_ok());
        assert!(check_transition(Confirmed, Completed, Role::Doctor).is_ok());
        assert!(check_transition(Confirmed, Cancelled, Role::Doctor).is_ok());
    }

    #[test]
    fn test_patient_may_only_cancel() {
        assert_eq!(valid_targets(Scheduled, Role::Patient), vec![Cancelled]);
        assert_eq!(valid_targets(Confirmed, Role::Patient), vec![Cancelled]);
        assert_matches!(
            check_transition(Scheduled, Confirmed, Role::Patient),
            Err(AppointmentError::InvalidTransition { from: Scheduled, to: Confirmed })
        );
    }

    #[test]
    fn test_admin_may_only_mark_no_show() {
        assert_eq!(valid_targets(Scheduled, Role::Admin), vec![NoShow]);
        assert!(check_transition(Confirmed, Cancelled, Role::Admin).is_err());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in [Completed, Cancelled, NoShow] {
            for to in AppointmentStatus::ALL {
                assert!(allowed_roles(from, to).is_empty(), "{} -> {} should be illegal", from, to);
            }
        }
    }

    #[test]
    fn test_scheduled_is_never_a_target() {
        for from in AppointmentStatus::ALL {
            assert!(allowed_roles(from, Scheduled).is_empty());
        }
        assert!(allowed_roles(Scheduled, Completed).is_empty());
    }

    #[test]
    fn test_payment_transitions() {
        assert!(check_payment_transition(PaymentStatus::Pending, PaymentStatus::Paid).is_ok());
        assert!(check_payment_transition(PaymentStatus::Paid, PaymentStatus::Refunded).is_ok());
        assert_matches!(
            check_payment_transition(PaymentStatus::Pending, PaymentStatus::Refunded),
            Err(AppointmentError::InvalidPaymentTransition { .. })
        );
        assert!(check_payment_transition(PaymentStatus::Refunded, PaymentStatus::Paid).is_err());
        assert!(check_payment_transition(PaymentStatus::Paid, PaymentStatus::Paid).is_err());
    }
}
