use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds, the ledger's time type.
pub type Ms = i64;

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Slot {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        debug_assert!(start < end, "Slot start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Overlapping part of two slots, `[max(start), min(end))` when positive.
    pub fn intersect(&self, other: &Slot) -> Option<Slot> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Slot { start, end })
    }
}

/// Open-for-business interval within a day, owned by the restaurant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    /// Informational only; all instants in this crate are restaurant-local.
    pub timezone: String,
    /// Empty means open all day.
    #[serde(default)]
    pub windows: Vec<ServiceWindow>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Restaurant {
    /// True if `[start, end]` falls entirely inside at least one service
    /// window. No windows defined means open all day.
    pub fn allows_window(&self, start: NaiveTime, end: NaiveTime) -> bool {
        if self.windows.is_empty() {
            return true;
        }
        self.windows.iter().any(|w| start >= w.start && end <= w.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub id: String,
    pub restaurant_id: String,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A seat-bearing unit with a capacity range `[min_size, max_size]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    pub sector_id: String,
    pub name: String,
    pub min_size: u32,
    pub max_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub restaurant_id: String,
    pub sector_id: String,
    /// Single table or combination, never empty.
    pub table_ids: Vec<String>,
    pub party_size: u32,
    #[serde(flatten)]
    pub slot: Slot,
    pub duration_minutes: u32,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A table together with its free slots for one date. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAvailability {
    pub table: Table,
    pub free_slots: Vec<Slot>,
}

/// Proposed table set able to jointly host a party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub tables: Vec<Table>,
    /// Sum of member `max_size`.
    pub total_capacity: u32,
    /// Intersection of the members' free slots.
    pub available_slots: Vec<Slot>,
}

// ── Facade request/response types ────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscoverParams {
    pub restaurant_id: String,
    pub sector_id: String,
    pub date: NaiveDate,
    pub party_size: u32,
    pub duration_minutes: u32,
    pub window_start: Option<NaiveTime>,
    pub window_end: Option<NaiveTime>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateBooking {
    pub restaurant_id: String,
    pub sector_id: String,
    pub party_size: u32,
    pub duration_minutes: u32,
    pub date: NaiveDate,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Single,
    Combination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotCandidate {
    pub kind: CandidateKind,
    pub table_ids: Vec<String>,
    pub available_slots: Vec<Slot>,
}

impl From<Candidate> for SlotCandidate {
    fn from(c: Candidate) -> Self {
        let kind = if c.tables.len() > 1 {
            CandidateKind::Combination
        } else {
            CandidateKind::Single
        };
        Self {
            kind,
            table_ids: c.tables.into_iter().map(|t| t.id).collect(),
            available_slots: c.available_slots,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discovery {
    pub slot_minutes: u32,
    pub duration_minutes: u32,
    pub candidates: Vec<SlotCandidate>,
}
