//! Content rotation and candidate scoring
//!
//! This module decides which asset airs in each slot of a broadcast day.
//!
//! # Overview
//!
//! Schedule building cycles through a configured order of content categories.
//! For each slot the current category is peeked, eligible candidates are
//! fetched from the catalog, scored, and the best usable one is placed and
//! recorded. The rotation only advances after a placement for the peeked
//! category, so a category with temporarily empty inventory gets its turn
//! again on the next slot.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Scheduler                            │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                 GapFillOrchestrator                    │  │
//! │  │   ┌──────────────────────────────────────────────┐     │  │
//! │  │   │              SelectionEngine                 │     │  │
//! │  │   │  ┌───────────────┐   ┌──────────────────┐    │     │  │
//! │  │   │  │   Rotation    │   │ CandidateScorer  │    │     │  │
//! │  │   │  │ StateMachine  │   │  + RandomSource  │    │     │  │
//! │  │   │  └───────────────┘   └──────────────────┘    │     │  │
//! │  │   └───────────┬─────────────────────┬────────────┘     │  │
//! │  └───────────────┼─────────────────────┼──────────────────┘  │
//! └──────────────────┼─────────────────────┼─────────────────────┘
//!                    ▼                     ▼
//!          CandidateRepository       UsageRecorder
//! ```
//!
//! # Modules
//!
//! - [`rotation`] - Category tokens and the rotation state machine
//! - [`scoring`] - Additive scorer, random sources, daypart policy
//! - [`selection`] - One slot-fill decision at a time
//! - [`orchestrator`] - Gap filling and gap reports
//! - [`service`] - Per-run scheduler
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use airtime::config::RotationConfig;
//! use airtime::models::ScheduleGap;
//! use airtime::scheduler::{RunKind, Scheduler};
//! use airtime::storage::SqliteCatalog;
//!
//! let catalog = Arc::new(SqliteCatalog::new("data/airtime.db")?);
//! let mut scheduler = Scheduler::new(catalog.clone(), catalog, RunKind::Daily).with_seed(7);
//!
//! let gaps = vec![ScheduleGap::new(start, 1800)];
//! let report = scheduler.build_schedule(&gaps, &RotationConfig::default())?;
//! for item in &report.items {
//!     println!("{} {} {}", item.start, item.asset_id, item.placed_category);
//! }
//! ```

pub mod error;
pub mod orchestrator;
pub mod rotation;
pub mod scoring;
pub mod selection;
pub mod service;

pub use error::{SchedulerError, SchedulerResult};
pub use orchestrator::{GapFillOrchestrator, GapReport, GapStatus, ScheduleReport};
pub use rotation::{RotationCategory, RotationState, RotationStateMachine};
pub use scoring::{
    CandidateScorer, FeaturedDaypartPolicy, FixedRandom, RandomSource, ScoreBreakdown,
    ScoredCandidate, ScoringContext, SeededRandom,
};
pub use selection::{RunLedger, SelectionEngine, SlotOutcome, SlotRequest};
pub use service::{RunKind, Scheduler};
