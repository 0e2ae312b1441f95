//! Fuelbank - points ledger for gamified student committee work
//!
//! Students earn points through approved task requests and manual
//! adjustments; groups carry an additional direct bucket on top of the
//! member-derived sum. Totals are rendered as fuel-tank liters.
//!
//! ## Components
//!
//! - **Ledger**: the operation surface; per-group single-writer locking
//! - **Allocation**: bulk and percentage distribution across members,
//!   with capacity-limited deduction and shortfall redistribution
//! - **Propagation**: settings-driven mirroring of individual events into
//!   the group direct bucket
//! - **Fuel**: greedy point-to-liter quantization for display and export
//! - **Reports**: aggregated data for external renderers

pub mod config;
pub mod db;
pub mod error;
pub mod fuel;
pub mod ledger;
pub mod notify;
pub mod report;
pub mod week;

pub use config::{Config, StorageBackend};
pub use db::LedgerDb;
pub use error::LedgerError;
pub use fuel::{FuelGrade, FuelTanks};
pub use ledger::{Ledger, PointAction};
pub use notify::{LogSink, PushMessage, PushSink};

pub type Result<T> = std::result::Result<T, LedgerError>;
