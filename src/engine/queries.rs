use chrono::{NaiveDate, TimeDelta};
use tracing::debug;

use crate::model::{Booking, DiscoverParams, Discovery};
use crate::observability;

use super::{BookingError, Engine, day_window};

impl Engine {
    /// Lock-free discovery of table sets that can seat the party. Advisory
    /// only; a concurrent commit can consume a returned slot, and the locked
    /// booking path recomputes before committing.
    pub async fn discover(&self, params: &DiscoverParams) -> Result<Discovery, BookingError> {
        let restaurant = self.require_restaurant(&params.restaurant_id).await?;
        self.require_sector(&params.restaurant_id, &params.sector_id).await?;

        if let (Some(start), Some(end)) = (params.window_start, params.window_end)
            && !restaurant.allows_window(start, end)
        {
            return Err(BookingError::OutsideServiceWindow);
        }

        let (window_start, window_end) =
            day_window(params.date, params.window_start, params.window_end);
        let availabilities = self
            .sector_availability(
                &params.restaurant_id,
                &params.sector_id,
                params.date,
                window_start,
                window_end,
                TimeDelta::minutes(params.duration_minutes as i64),
            )
            .await?;

        let mut params = params.clone();
        params.limit = params.limit.or(self.discovery_limit);
        let candidates = self.strategy.find_candidates(&params, &availabilities);
        if candidates.is_empty() {
            return Err(BookingError::NoCapacity);
        }

        metrics::counter!(observability::DISCOVERIES_TOTAL).increment(1);
        debug!(
            restaurant = %params.restaurant_id,
            sector = %params.sector_id,
            date = %params.date,
            party_size = params.party_size,
            candidates = candidates.len(),
            "discovery served"
        );

        Ok(Discovery {
            slot_minutes: self.slot_minutes,
            duration_minutes: params.duration_minutes,
            candidates: candidates.into_iter().map(Into::into).collect(),
        })
    }

    /// Snapshot read of a restaurant's bookings, optionally narrowed to a
    /// sector and a calendar date. Returns every status.
    pub async fn bookings_by_day(
        &self,
        restaurant_id: &str,
        sector_id: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, BookingError> {
        self.require_restaurant(restaurant_id).await?;
        let bookings = self.repo.bookings().await?;
        Ok(bookings
            .into_iter()
            .filter(|b| {
                b.restaurant_id == restaurant_id
                    && sector_id.is_none_or(|s| b.sector_id == s)
                    && date.is_none_or(|d| b.slot.start.date() == d)
            })
            .collect())
    }
}
