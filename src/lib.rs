//! mesa: restaurant table-booking core.
//!
//! Computes per-table free time windows against confirmed reservations,
//! searches single- and multi-table combinations for a party, and commits
//! reservations exactly once under concurrent, possibly duplicated requests
//! using a keyed lock and a signed idempotency ledger.

pub mod config;
pub mod engine;
pub mod ledger;
pub mod lock;
pub mod model;
pub mod observability;
pub mod repo;

pub use config::{Config, ConfigError};
pub use engine::{BookingError, Engine, Strategy};
pub use ledger::{IdempotencyLedger, LedgerError};
pub use lock::KeyedMutex;
pub use repo::{MemoryRepository, RepoError, Repository};
