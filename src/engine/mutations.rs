use std::time::Instant;

use chrono::TimeDelta;
use tracing::info;
use ulid::Ulid;

use crate::model::{Booking, BookingStatus, CreateBooking, DiscoverParams, Slot};
use crate::observability;

use super::{BookingError, Engine, lock_key};

impl Engine {
    /// Atomic booking attempt. Validation failures return before any side
    /// effect; once the keyed lock is held, every exit path releases it via
    /// the guard, and the idempotency key is registered only after a
    /// successful commit.
    pub async fn create_booking(
        &self,
        data: &CreateBooking,
        idempotency_key: Option<&str>,
    ) -> Result<Booking, BookingError> {
        let restaurant = self.require_restaurant(&data.restaurant_id).await?;
        self.require_sector(&data.restaurant_id, &data.sector_id).await?;

        if data.duration_minutes == 0 {
            return Err(BookingError::InvalidDuration);
        }
        if !restaurant.allows_window(data.window_start, data.window_end) {
            metrics::counter!(observability::BOOKINGS_REJECTED_TOTAL, "reason" => "outside_window")
                .increment(1);
            return Err(BookingError::OutsideServiceWindow);
        }

        // Fast rejection before contending on the lock.
        if let Some(key) = idempotency_key
            && self.ledger.check_existing(key).await?
        {
            metrics::counter!(observability::DUPLICATE_REQUESTS_TOTAL).increment(1);
            return Err(BookingError::DuplicateRequest);
        }

        let start = data.date.and_time(data.window_start);
        let key = lock_key(&data.restaurant_id, &data.sector_id, start);

        let waiting = Instant::now();
        let _guard = self.locks.acquire(&key).await;
        metrics::histogram!(observability::LOCK_WAIT_SECONDS)
            .record(waiting.elapsed().as_secs_f64());
        let committing = Instant::now();

        // A retry may have committed while this attempt waited on the lock.
        if let Some(key) = idempotency_key
            && self.ledger.check_existing(key).await?
        {
            metrics::counter!(observability::DUPLICATE_REQUESTS_TOTAL).increment(1);
            return Err(BookingError::DuplicateRequest);
        }

        // Recompute under the lock; pre-lock snapshots may be stale.
        let window_start = start;
        let window_end = data.date.and_time(data.window_end);
        let duration = TimeDelta::minutes(data.duration_minutes as i64);
        let availabilities = self
            .sector_availability(
                &data.restaurant_id,
                &data.sector_id,
                data.date,
                window_start,
                window_end,
                duration,
            )
            .await?;

        let params = DiscoverParams {
            restaurant_id: data.restaurant_id.clone(),
            sector_id: data.sector_id.clone(),
            date: data.date,
            party_size: data.party_size,
            duration_minutes: data.duration_minutes,
            window_start: Some(data.window_start),
            window_end: Some(data.window_end),
            limit: Some(1),
        };
        let candidates = self.strategy.find_candidates(&params, &availabilities);
        let Some(candidate) = candidates.into_iter().next() else {
            metrics::counter!(observability::BOOKINGS_REJECTED_TOTAL, "reason" => "no_capacity")
                .increment(1);
            return Err(BookingError::NoCapacity);
        };

        let now = chrono::Utc::now().naive_utc();
        let booking = Booking {
            id: Ulid::new(),
            restaurant_id: data.restaurant_id.clone(),
            sector_id: data.sector_id.clone(),
            table_ids: candidate.tables.iter().map(|t| t.id.clone()).collect(),
            party_size: data.party_size,
            // The booking consumes the whole requested window, not just the
            // duration. A later same-window request then finds no free slot
            // on these tables when it recomputes under the lock.
            slot: Slot::new(start, window_end),
            duration_minutes: data.duration_minutes,
            status: BookingStatus::Confirmed,
            created_at: now,
            updated_at: now,
        };
        self.repo.add_booking(booking.clone()).await?;

        // The booking is committed either way; a registration failure must
        // surface so the caller knows this key carries no duplicate
        // protection.
        if let Some(key) = idempotency_key {
            self.ledger.register(key).await?;
        }

        metrics::counter!(observability::BOOKINGS_CONFIRMED_TOTAL).increment(1);
        metrics::histogram!(observability::BOOKING_COMMIT_DURATION_SECONDS)
            .record(committing.elapsed().as_secs_f64());
        info!(
            booking = %booking.id,
            restaurant = %booking.restaurant_id,
            sector = %booking.sector_id,
            tables = ?booking.table_ids,
            party_size = booking.party_size,
            start = %booking.slot.start,
            "booking confirmed"
        );

        Ok(booking)
    }

    /// Cancels a booking, keeping the record with CANCELLED status so the
    /// history stays auditable. Cancelled slots return to availability.
    pub async fn delete_booking(&self, id: Ulid) -> Result<(), BookingError> {
        if !self.repo.cancel_booking(id).await? {
            return Err(BookingError::BookingNotFound(id));
        }
        info!(booking = %id, "booking cancelled");
        Ok(())
    }
}
