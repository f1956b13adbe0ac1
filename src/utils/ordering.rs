use crate::entities::booking;

/// Newest-first ordering for booking lists. Ids break timestamp ties so
/// two bookings created in the same instant still list deterministically.
pub fn newest_first(bookings: &mut [booking::Model]) {
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::booking::{BookingStatus, PaymentStatus};
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    fn booking_at(id: Uuid, created_at: DateTime<Utc>) -> booking::Model {
        booking::Model {
            id,
            user_id: Uuid::new_v4(),
            garage_id: Uuid::new_v4(),
            issue_type: "Puncture".to_string(),
            status: BookingStatus::Requested,
            price: 250,
            payment_status: PaymentStatus::Unpaid,
            created_at: created_at.into(),
            updated_at: created_at.into(),
        }
    }

    #[test]
    fn newer_bookings_come_first() {
        let older = Utc::now();
        let newer = older + chrono::Duration::minutes(5);
        let first = booking_at(Uuid::new_v4(), older);
        let second = booking_at(Uuid::new_v4(), newer);

        let mut bookings = vec![first.clone(), second.clone()];
        newest_first(&mut bookings);

        assert_eq!(bookings[0].id, second.id);
        assert_eq!(bookings[1].id, first.id);
    }

    #[test]
    fn equal_timestamps_break_ties_by_id() {
        let now = Utc::now();
        let low = Uuid::from_u128(1);
        let high = Uuid::from_u128(2);

        let mut bookings = vec![booking_at(low, now), booking_at(high, now)];
        newest_first(&mut bookings);

        assert_eq!(bookings[0].id, high);
        assert_eq!(bookings[1].id, low);

        // Same result regardless of the fetch order
        let mut reversed = vec![booking_at(high, now), booking_at(low, now)];
        newest_first(&mut reversed);
        assert_eq!(reversed[0].id, high);
        assert_eq!(reversed[1].id, low);
    }
}
