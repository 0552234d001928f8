//! airtime - Content rotation and candidate scoring for broadcast schedules
//!
//! Fills the gaps of a broadcast day with promos, station IDs, public service
//! spots, packages and long-form programming. A configurable rotation decides
//! which category airs next; an additive scorer ranks the eligible assets
//! for each slot.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Rotation policy, storage and logging configuration
//! - [`models`] - Assets, scheduling metadata, gaps and placed items
//! - [`scheduler`] - Rotation, scoring, selection and gap filling
//! - [`storage`] - Candidate catalog (SQLite and in-memory)
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use airtime::config::Config;
//! use airtime::models::ScheduleGap;
//! use airtime::scheduler::{RunKind, Scheduler};
//! use airtime::storage::SqliteCatalog;
//! use chrono::NaiveDate;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let catalog = Arc::new(SqliteCatalog::new(&config.storage.sqlite_path)?);
//!     let mut scheduler = Scheduler::new(catalog.clone(), catalog, RunKind::Daily);
//!
//!     let start = NaiveDate::from_ymd_opt(2024, 3, 10)
//!         .and_then(|d| d.and_hms_opt(18, 0, 0))
//!         .ok_or_else(|| anyhow::anyhow!("bad date"))?;
//!     let report = scheduler.build_schedule(&[ScheduleGap::new(start, 1800)], &config.rotation)?;
//!     println!("{} items placed", report.items.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigProvider, RotationConfig};
    pub use crate::error::{AirtimeErrorTrait, Error, ErrorCategory, Result};
    pub use crate::models::{Asset, Candidate, ContentType, ScheduleGap, ScheduledItem};
    pub use crate::scheduler::{RotationCategory, RunKind, ScheduleReport, Scheduler};
    pub use crate::storage::{CatalogStore, InMemoryCatalog, SqliteCatalog};
}

// Direct re-exports for convenience
pub use models::{Asset, Candidate, ContentType, ScheduleGap, ScheduledItem};
