//! Persistence port and the in-memory adapter backing it.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::{Booking, BookingStatus, Restaurant, Sector, Table};

#[derive(Debug)]
pub struct RepoError(pub String);

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "repository error: {}", self.0)
    }
}

impl std::error::Error for RepoError {}

/// Storage seam for restaurant layout and bookings. The engine depends on
/// this trait only, so a SQL adapter can replace the in-memory one without
/// touching booking logic.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn restaurant_by_id(&self, id: &str) -> Result<Option<Restaurant>, RepoError>;
    async fn sector_by_id(&self, restaurant_id: &str, sector_id: &str)
        -> Result<Option<Sector>, RepoError>;
    async fn tables_by_sector(&self, restaurant_id: &str, sector_id: &str)
        -> Result<Vec<Table>, RepoError>;

    /// Bookings for a restaurant/sector on a calendar date, every status.
    async fn bookings_by_date(
        &self,
        restaurant_id: &str,
        sector_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, RepoError>;

    async fn bookings(&self) -> Result<Vec<Booking>, RepoError>;
    async fn booking_by_id(&self, id: Ulid) -> Result<Option<Booking>, RepoError>;
    async fn add_booking(&self, booking: Booking) -> Result<(), RepoError>;

    /// Marks the booking cancelled. Returns false when no such booking.
    async fn cancel_booking(&self, id: Ulid) -> Result<bool, RepoError>;
}

#[derive(Default)]
pub struct MemoryRepository {
    restaurants: Vec<Restaurant>,
    sectors: HashMap<String, Vec<Sector>>,
    tables: HashMap<(String, String), Vec<Table>>,
    bookings: RwLock<Vec<Booking>>,
}

impl MemoryRepository {
    pub fn new(restaurants: Vec<Restaurant>, sectors: Vec<Sector>, tables: Vec<Table>) -> Self {
        let mut by_restaurant: HashMap<String, Vec<Sector>> = HashMap::new();
        let mut by_sector: HashMap<(String, String), Vec<Table>> = HashMap::new();
        for sector in sectors {
            let key = (sector.restaurant_id.clone(), sector.id.clone());
            let tables = tables
                .iter()
                .filter(|t| t.sector_id == sector.id)
                .cloned()
                .collect();
            by_sector.insert(key, tables);
            by_restaurant
                .entry(sector.restaurant_id.clone())
                .or_default()
                .push(sector);
        }
        Self {
            restaurants,
            sectors: by_restaurant,
            tables: by_sector,
            bookings: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn restaurant_by_id(&self, id: &str) -> Result<Option<Restaurant>, RepoError> {
        Ok(self.restaurants.iter().find(|r| r.id == id).cloned())
    }

    async fn sector_by_id(
        &self,
        restaurant_id: &str,
        sector_id: &str,
    ) -> Result<Option<Sector>, RepoError> {
        Ok(self
            .sectors
            .get(restaurant_id)
            .and_then(|sectors| sectors.iter().find(|s| s.id == sector_id))
            .cloned())
    }

    async fn tables_by_sector(
        &self,
        restaurant_id: &str,
        sector_id: &str,
    ) -> Result<Vec<Table>, RepoError> {
        Ok(self
            .tables
            .get(&(restaurant_id.to_owned(), sector_id.to_owned()))
            .cloned()
            .unwrap_or_default())
    }

    async fn bookings_by_date(
        &self,
        restaurant_id: &str,
        sector_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, RepoError> {
        Ok(self
            .bookings
            .read()
            .await
            .iter()
            .filter(|b| {
                b.restaurant_id == restaurant_id
                    && b.sector_id == sector_id
                    && b.slot.start.date() == date
            })
            .cloned()
            .collect())
    }

    async fn bookings(&self) -> Result<Vec<Booking>, RepoError> {
        Ok(self.bookings.read().await.clone())
    }

    async fn booking_by_id(&self, id: Ulid) -> Result<Option<Booking>, RepoError> {
        Ok(self.bookings.read().await.iter().find(|b| b.id == id).cloned())
    }

    async fn add_booking(&self, booking: Booking) -> Result<(), RepoError> {
        self.bookings.write().await.push(booking);
        Ok(())
    }

    async fn cancel_booking(&self, id: Ulid) -> Result<bool, RepoError> {
        let mut bookings = self.bookings.write().await;
        match bookings.iter_mut().find(|b| b.id == id) {
            Some(booking) => {
                booking.status = BookingStatus::Cancelled;
                booking.updated_at = chrono::Utc::now().naive_utc();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
