//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use airtime::models::{Asset, Candidate, ContentType, ScheduleGap, ScheduledItem};
use airtime::scheduler::{FixedRandom, RotationCategory, RunKind, Scheduler};
use airtime::storage::{InMemoryCatalog, StorageError, StorageResult, UsageRecorder};
use chrono::{NaiveDate, NaiveDateTime};

/// A time on the reference day
pub fn at(h: u32, m: u32) -> NaiveDateTime {
    on_day(10, h, m)
}

/// A time on a given day of March 2024
pub fn on_day(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

/// 10 second station ID
pub fn station_id(id: &str) -> Candidate {
    Candidate::new(Asset::new(id, ContentType::Bump, 10))
}

/// 30 second PSA
pub fn spot(id: &str) -> Candidate {
    Candidate::new(Asset::new(id, ContentType::Psa, 30))
}

/// 5 minute news package
pub fn package(id: &str, theme: &str) -> Candidate {
    Candidate::new(Asset::new(id, ContentType::Package, 300).with_theme(theme))
}

/// 10 minute short-form program
pub fn short_form(id: &str) -> Candidate {
    Candidate::new(Asset::new(id, ContentType::Other, 600))
}

/// 30 minute long-form program
pub fn long_form(id: &str) -> Candidate {
    Candidate::new(Asset::new(id, ContentType::Other, 1800))
}

/// Several assets of every default rotation category, all fresh
pub fn full_inventory() -> Vec<Candidate> {
    let themes = ["council", "roads", "schools", "parks", "budget"];
    let mut candidates = Vec::new();
    for i in 0..5 {
        candidates.push(station_id(&format!("id-{i}")));
        candidates.push(spot(&format!("spot-{i}")));
        candidates.push(package(&format!("pkg-{i}"), themes[i]));
        candidates.push(short_form(&format!("feature-{i}")));
        candidates.push(long_form(&format!("long-{i}")));
    }
    candidates
}

/// Seconds needed for one pass of the default order with `full_inventory`
pub const DEFAULT_CYCLE_SECS: u32 = 10 + 30 + 300 + 600 + 300 + 1800;

pub fn catalog(candidates: Vec<Candidate>) -> Arc<InMemoryCatalog> {
    Arc::new(InMemoryCatalog::with_candidates(candidates))
}

/// Scheduler with no jitter that accepts every featured pick
pub fn neutral_scheduler(catalog: &Arc<InMemoryCatalog>, kind: RunKind) -> Scheduler {
    Scheduler::new(catalog.clone(), catalog.clone(), kind)
        .with_random(Box::new(FixedRandom::neutral()))
}

/// Consecutive gaps of equal length, one per hour from `first_hour`
pub fn hourly_gaps(first_hour: u32, count: u32, duration_secs: u32) -> Vec<ScheduleGap> {
    (0..count)
        .map(|i| ScheduleGap::new(at(first_hour + i, 0), duration_secs))
        .collect()
}

pub fn placed_categories(items: &[ScheduledItem]) -> Vec<RotationCategory> {
    items.iter().map(|i| i.placed_category).collect()
}

/// Recorder that always fails
pub struct FailingRecorder;

impl UsageRecorder for FailingRecorder {
    fn record(
        &self,
        _asset_id: &str,
        _placed_at: NaiveDateTime,
        _category: RotationCategory,
    ) -> StorageResult<()> {
        Err(StorageError::unavailable("recorder offline"))
    }
}
