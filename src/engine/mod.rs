//! Booking engine: availability computation, table-set discovery, and the
//! guarded booking state machine.

pub mod availability;
pub mod discovery;
pub mod error;
pub mod mutations;
pub mod queries;


pub use discovery::Strategy;
pub use error::BookingError;

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use crate::config::Config;
use crate::ledger::IdempotencyLedger;
use crate::lock::KeyedMutex;
use crate::model::{BookingStatus, Restaurant, Sector, Slot, TableAvailability};
use crate::repo::Repository;

pub struct Engine {
    repo: Arc<dyn Repository>,
    ledger: Arc<IdempotencyLedger>,
    locks: KeyedMutex,
    strategy: Strategy,
    discovery_limit: Option<usize>,
    slot_minutes: u32,
    default_duration_minutes: u32,
}

impl Engine {
    pub fn new(repo: Arc<dyn Repository>, ledger: Arc<IdempotencyLedger>, config: &Config) -> Self {
        Self {
            repo,
            ledger,
            locks: KeyedMutex::new(),
            strategy: config.strategy,
            discovery_limit: config.discovery_limit,
            slot_minutes: config.slot_minutes,
            default_duration_minutes: config.default_duration_minutes,
        }
    }

    pub fn default_duration_minutes(&self) -> u32 {
        self.default_duration_minutes
    }

    async fn require_restaurant(&self, id: &str) -> Result<Restaurant, BookingError> {
        self.repo
            .restaurant_by_id(id)
            .await?
            .ok_or_else(|| BookingError::RestaurantNotFound(id.to_owned()))
    }

    async fn require_sector(
        &self,
        restaurant_id: &str,
        sector_id: &str,
    ) -> Result<Sector, BookingError> {
        self.repo
            .sector_by_id(restaurant_id, sector_id)
            .await?
            .ok_or_else(|| BookingError::SectorNotFound(sector_id.to_owned()))
    }

    /// Free slots per table in a sector over the given window. Only confirmed
    /// bookings consume capacity; tables with no free slot long enough are
    /// dropped.
    async fn sector_availability(
        &self,
        restaurant_id: &str,
        sector_id: &str,
        date: NaiveDate,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        min_duration: TimeDelta,
    ) -> Result<Vec<TableAvailability>, BookingError> {
        let tables = self.repo.tables_by_sector(restaurant_id, sector_id).await?;
        let bookings = self.repo.bookings_by_date(restaurant_id, sector_id, date).await?;

        let mut out = Vec::with_capacity(tables.len());
        for table in tables {
            let mut booked: Vec<Slot> = bookings
                .iter()
                .filter(|b| {
                    b.status == BookingStatus::Confirmed
                        && b.table_ids.iter().any(|id| *id == table.id)
                })
                .map(|b| b.slot)
                .collect();
            booked.sort_by_key(|s| s.start);

            let free_slots =
                availability::free_slots(&booked, window_start, window_end, min_duration);
            if !free_slots.is_empty() {
                out.push(TableAvailability { table, free_slots });
            }
        }
        Ok(out)
    }
}

/// Absolute bounds of a day's search window. Unset bounds default to the
/// whole day, midnight to next-day midnight.
fn day_window(
    date: NaiveDate,
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
) -> (NaiveDateTime, NaiveDateTime) {
    let window_start = date.and_time(start.unwrap_or(NaiveTime::MIN));
    let window_end = match end {
        Some(t) => date.and_time(t),
        None => date
            .succ_opt()
            .map(|next| next.and_time(NaiveTime::MIN))
            // NaiveDate::MAX has no successor; clamp to the day's last second
            .unwrap_or_else(|| date.and_hms_opt(23, 59, 59).unwrap_or(NaiveDateTime::MAX)),
    };
    (window_start, window_end)
}

/// Contention key for a booking commit. Requests for the same restaurant,
/// sector, and start serialize; everything else proceeds in parallel.
fn lock_key(restaurant_id: &str, sector_id: &str, start: NaiveDateTime) -> String {
    format!("{restaurant_id}|{sector_id}|{}", start.format("%Y-%m-%dT%H:%M:%S"))
}
