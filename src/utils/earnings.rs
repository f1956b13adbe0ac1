use serde::Serialize;

use crate::entities::booking::{self, BookingStatus, PaymentStatus};
use crate::entities::review;

/// Derived financial figures for a garage, recomputed from raw rows on
/// every read. Nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarningsSummary {
    /// Sum of prices over completed and paid bookings.
    pub earnings: i64,
    /// Earnings after the platform commission, rounded to the nearest unit.
    pub balance: i64,
    /// Completed jobs regardless of payment status.
    pub completed_jobs: u64,
    /// Mean rating over all reviews; `None` when there are none.
    pub average_rating: Option<f64>,
}

impl EarningsSummary {
    pub fn compute(bookings: &[booking::Model], reviews: &[review::Model], commission: f64) -> Self {
        let earnings: i64 = bookings
            .iter()
            .filter(|b| {
                b.status == BookingStatus::Completed && b.payment_status == PaymentStatus::Paid
            })
            .map(|b| i64::from(b.price))
            .sum();

        let balance = (earnings as f64 * (1.0 - commission)).round() as i64;

        let completed_jobs = bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Completed)
            .count() as u64;

        Self {
            earnings,
            balance,
            completed_jobs,
            average_rating: average_rating(reviews),
        }
    }
}

/// Mean rating over a set of reviews. An empty set is "no data", never
/// zero, so an unrated garage does not look like a one-star garage.
pub fn average_rating<'a, I>(reviews: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a review::Model>,
{
    let mut count: u32 = 0;
    let mut total: i64 = 0;
    for r in reviews {
        count += 1;
        total += i64::from(r.rating);
    }

    if count == 0 {
        None
    } else {
        Some(total as f64 / f64::from(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn booking(status: BookingStatus, payment_status: PaymentStatus, price: i32) -> booking::Model {
        let now = Utc::now().into();
        booking::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            garage_id: Uuid::new_v4(),
            issue_type: "Flat tyre".to_string(),
            status,
            price,
            payment_status,
            created_at: now,
            updated_at: now,
        }
    }

    fn review(rating: i32) -> review::Model {
        review::Model {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            garage_id: Uuid::new_v4(),
            rating,
            comment: None,
            garage_response: None,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn only_completed_and_paid_bookings_earn() {
        let bookings = vec![
            booking(BookingStatus::Completed, PaymentStatus::Paid, 200),
            booking(BookingStatus::Completed, PaymentStatus::Unpaid, 300),
            booking(BookingStatus::Cancelled, PaymentStatus::Unpaid, 100),
        ];

        let summary = EarningsSummary::compute(&bookings, &[], 0.1);
        assert_eq!(summary.earnings, 200);
        assert_eq!(summary.balance, 180); // 200 * (1 - 0.1)
        // Completed count ignores payment status
        assert_eq!(summary.completed_jobs, 2);
    }

    #[test]
    fn balance_rounds_to_nearest_unit() {
        let bookings = vec![booking(BookingStatus::Completed, PaymentStatus::Paid, 333)];

        let summary = EarningsSummary::compute(&bookings, &[], 0.15);
        // 333 * 0.85 = 283.05
        assert_eq!(summary.balance, 283);
    }

    #[test]
    fn zero_commission_keeps_everything() {
        let bookings = vec![booking(BookingStatus::Completed, PaymentStatus::Paid, 450)];

        let summary = EarningsSummary::compute(&bookings, &[], 0.0);
        assert_eq!(summary.balance, summary.earnings);
    }

    #[test]
    fn no_reviews_means_no_rating_not_zero() {
        let summary = EarningsSummary::compute(&[], &[], 0.1);
        assert_eq!(summary.average_rating, None);
    }

    #[test]
    fn average_rating_is_the_mean() {
        let reviews = vec![review(5), review(4), review(3)];

        let summary = EarningsSummary::compute(&[], &reviews, 0.1);
        assert_eq!(summary.average_rating, Some(4.0));
    }

    #[test]
    fn average_rating_works_over_a_filtered_subset() {
        let garage_id = Uuid::new_v4();
        let mut mine = review(5);
        mine.garage_id = garage_id;
        let theirs = review(1);

        let reviews = vec![mine, theirs];
        let rating = average_rating(reviews.iter().filter(|r| r.garage_id == garage_id));
        assert_eq!(rating, Some(5.0));

        let none = average_rating(reviews.iter().filter(|_| false));
        assert_eq!(none, None);
    }

    #[test]
    fn empty_booking_set_is_all_zeroes() {
        let summary = EarningsSummary::compute(&[], &[], 0.2);
        assert_eq!(summary.earnings, 0);
        assert_eq!(summary.balance, 0);
        assert_eq!(summary.completed_jobs, 0);
    }
}
