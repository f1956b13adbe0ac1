use crate::entities::booking::{BookingStatus, PaymentStatus};
use crate::entities::user::UserRole;
use crate::error::AppError;

/// Status transition policy for bookings.
///
/// The service order is fixed: requested → accepted → on-way → arrived →
/// completed. A garage may only move a booking to the immediate successor
/// of its current status. Cancellation is reachable from every non-terminal
/// status and may be issued by the rider or the garage. Everything else is
/// rejected.
pub fn validate_transition(
    current: BookingStatus,
    target: BookingStatus,
    role: &UserRole,
) -> Result<(), AppError> {
    if current.is_terminal() {
        return Err(AppError::InvalidTransition(format!(
            "booking is already {}",
            status_label(current)
        )));
    }

    if target == BookingStatus::Cancelled {
        return match role {
            UserRole::Rider | UserRole::Garage => Ok(()),
            UserRole::Admin => Err(AppError::InvalidTransition(
                "only the rider or the garage may cancel a booking".to_string(),
            )),
        };
    }

    if *role != UserRole::Garage {
        return Err(AppError::InvalidTransition(
            "only the garage may advance a booking".to_string(),
        ));
    }

    if current.successor() == Some(target) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition(format!(
            "cannot move a booking from {} to {}",
            status_label(current),
            status_label(target)
        )))
    }
}

/// Payment is a single unpaid→paid flip, allowed only once the job is done.
pub fn validate_payment(
    status: BookingStatus,
    payment_status: PaymentStatus,
) -> Result<(), AppError> {
    if status != BookingStatus::Completed {
        return Err(AppError::PaymentPrecondition(
            "booking must be completed before payment".to_string(),
        ));
    }
    if payment_status == PaymentStatus::Paid {
        return Err(AppError::PaymentPrecondition(
            "booking is already paid".to_string(),
        ));
    }
    Ok(())
}

/// A review requires a completed, paid booking with no review yet attached.
/// The rating range is checked first so a bad rating fails regardless of
/// booking state.
pub fn validate_review(
    status: BookingStatus,
    payment_status: PaymentStatus,
    has_review: bool,
    rating: i32,
) -> Result<(), AppError> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::ReviewPrecondition(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    if status != BookingStatus::Completed || payment_status != PaymentStatus::Paid {
        return Err(AppError::ReviewPrecondition(
            "only completed and paid bookings can be reviewed".to_string(),
        ));
    }
    if has_review {
        return Err(AppError::ReviewPrecondition(
            "booking already has a review".to_string(),
        ));
    }
    Ok(())
}

fn status_label(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Requested => "requested",
        BookingStatus::Accepted => "accepted",
        BookingStatus::OnWay => "on-way",
        BookingStatus::Arrived => "arrived",
        BookingStatus::Completed => "completed",
        BookingStatus::Cancelled => "cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    const ALL: [BookingStatus; 6] = [Requested, Accepted, OnWay, Arrived, Completed, Cancelled];

    #[test]
    fn garage_advances_only_to_immediate_successor() {
        for current in ALL {
            for target in ALL {
                let ok = validate_transition(current, target, &UserRole::Garage).is_ok();
                let expected = if target == Cancelled {
                    !current.is_terminal()
                } else {
                    current.successor() == Some(target)
                };
                assert_eq!(ok, expected, "garage: {current:?} -> {target:?}");
            }
        }
    }

    #[test]
    fn rider_may_only_cancel() {
        for current in ALL {
            for target in ALL {
                let ok = validate_transition(current, target, &UserRole::Rider).is_ok();
                let expected = target == Cancelled && !current.is_terminal();
                assert_eq!(ok, expected, "rider: {current:?} -> {target:?}");
            }
        }
    }

    #[test]
    fn terminal_states_reject_everything() {
        for current in [Completed, Cancelled] {
            for target in ALL {
                for role in [UserRole::Rider, UserRole::Garage, UserRole::Admin] {
                    assert!(validate_transition(current, target, &role).is_err());
                }
            }
        }
    }

    #[test]
    fn skipping_a_status_is_rejected() {
        assert!(validate_transition(Requested, OnWay, &UserRole::Garage).is_err());
        assert!(validate_transition(Accepted, Completed, &UserRole::Garage).is_err());
    }

    #[test]
    fn going_backwards_is_rejected() {
        assert!(validate_transition(Arrived, OnWay, &UserRole::Garage).is_err());
        assert!(validate_transition(Accepted, Requested, &UserRole::Garage).is_err());
    }

    #[test]
    fn payment_requires_completed_and_unpaid() {
        assert!(validate_payment(Completed, PaymentStatus::Unpaid).is_ok());

        assert!(validate_payment(Requested, PaymentStatus::Unpaid).is_err());
        assert!(validate_payment(Arrived, PaymentStatus::Unpaid).is_err());
        assert!(validate_payment(Cancelled, PaymentStatus::Unpaid).is_err());
    }

    #[test]
    fn paying_twice_is_rejected() {
        assert!(validate_payment(Completed, PaymentStatus::Paid).is_err());
    }

    #[test]
    fn review_requires_completed_paid_and_unreviewed() {
        assert!(validate_review(Completed, PaymentStatus::Paid, false, 4).is_ok());

        assert!(validate_review(Completed, PaymentStatus::Unpaid, false, 4).is_err());
        assert!(validate_review(Arrived, PaymentStatus::Paid, false, 4).is_err());
        assert!(validate_review(Completed, PaymentStatus::Paid, true, 4).is_err());
    }

    #[test]
    fn rating_out_of_range_fails_regardless_of_state() {
        assert!(validate_review(Completed, PaymentStatus::Paid, false, 0).is_err());
        assert!(validate_review(Completed, PaymentStatus::Paid, false, 6).is_err());
        // Bad rating loses even on a booking that fails the other checks too
        assert!(validate_review(Requested, PaymentStatus::Unpaid, false, 0).is_err());
    }
}
