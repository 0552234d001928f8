//! Gap filling
//!
//! The orchestrator walks each gap from its start, asking the selection
//! engine for one placement at a time until the gap is used up or nothing
//! fits. Rotation is re-peeked before every placement; when the rotation
//! category and its fallback come up empty the configured filler categories
//! are tried before the gap is given up.
//!
//! ```text
//! PENDING ──▶ FILLING ──┬──▶ FILLED   (leftover within tolerance)
//!                       ├──▶ PARTIAL  (some items, leftover too large)
//!                       └──▶ EMPTY    (nothing placed)
//! ```

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use super::error::SchedulerResult;
use super::rotation::RotationState;
use super::selection::{SelectionEngine, SlotOutcome, SlotRequest};
use super::service::RunKind;
use crate::config::RotationConfig;
use crate::models::{ScheduleGap, ScheduledItem};

// ============================================================================
// Gap Status
// ============================================================================

/// Lifecycle of one gap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GapStatus {
    Pending,
    Filling,
    Filled,
    Partial,
    Empty,
}

impl GapStatus {
    /// Check if the gap reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Partial | Self::Empty)
    }
}

/// Outcome of filling one gap
#[derive(Debug, Clone, Serialize)]
pub struct GapReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub start: NaiveDateTime,
    pub duration_secs: u32,
    pub status: GapStatus,
    pub filled_secs: u32,
    pub unfilled_secs: u32,
    pub items: usize,
}

impl GapReport {
    fn pending(gap: &ScheduleGap) -> Self {
        Self {
            label: gap.label.clone(),
            start: gap.start,
            duration_secs: gap.duration_secs,
            status: GapStatus::Pending,
            filled_secs: 0,
            unfilled_secs: gap.duration_secs,
            items: 0,
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleReport {
    pub kind: RunKind,
    pub items: Vec<ScheduledItem>,
    pub gaps: Vec<GapReport>,
    /// Placements that relaxed at least one policy
    pub relaxations: usize,
    /// Rotation position after the run
    pub rotation: RotationState,
}

impl ScheduleReport {
    /// The placed items, in schedule order
    pub fn into_items(self) -> Vec<ScheduledItem> {
        self.items
    }

    /// Seconds filled across all gaps
    pub fn filled_secs(&self) -> u64 {
        self.gaps.iter().map(|g| u64::from(g.filled_secs)).sum()
    }

    /// Check if every gap ended FILLED
    pub fn is_complete(&self) -> bool {
        self.gaps.iter().all(|g| g.status == GapStatus::Filled)
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Drives the selection engine across gaps
pub struct GapFillOrchestrator {
    engine: SelectionEngine,
}

impl GapFillOrchestrator {
    pub fn new(engine: SelectionEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &SelectionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SelectionEngine {
        &mut self.engine
    }

    /// Fill one gap
    pub fn fill_gap(
        &mut self,
        gap: &ScheduleGap,
        config: &RotationConfig,
    ) -> SchedulerResult<(Vec<ScheduledItem>, GapReport)> {
        let mut report = GapReport::pending(gap);
        report.status = GapStatus::Filling;

        let tolerance = config.gap_fill.tolerance_seconds;
        let mut lookback = gap.preceding.clone();
        let mut items = Vec::new();
        let mut cursor = gap.start;
        let mut remaining = gap.duration_secs;

        while remaining > 0 {
            let request = SlotRequest {
                start: cursor,
                available_secs: remaining,
            };

            let mut outcome = self.engine.fill_slot(&request, &lookback, config)?;
            if matches!(outcome, SlotOutcome::NoCandidate) {
                outcome = self.engine.fill_with_filler(
                    &request,
                    &lookback,
                    &config.gap_fill.filler_categories,
                    config,
                )?;
            }

            let SlotOutcome::Placed(item) = outcome else {
                break;
            };

            cursor = item.end();
            remaining = remaining.saturating_sub(item.duration_secs);
            lookback.push(item.as_placed());
            items.push(item);
        }

        report.items = items.len();
        report.unfilled_secs = remaining;
        report.filled_secs = gap.duration_secs - remaining;
        report.status = if remaining <= tolerance {
            GapStatus::Filled
        } else if items.is_empty() {
            GapStatus::Empty
        } else {
            GapStatus::Partial
        };

        match report.status {
            GapStatus::Filled => info!(
                start = %gap.start,
                items = report.items,
                unfilled_secs = remaining,
                "Gap filled"
            ),
            status => warn!(
                start = %gap.start,
                label = gap.label.as_deref().unwrap_or(""),
                status = ?status,
                filled_secs = report.filled_secs,
                unfilled_secs = remaining,
                "Gap not filled"
            ),
        }

        Ok((items, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Asset, Candidate, ContentType};
    use crate::scheduler::rotation::RotationCategory;
    use crate::scheduler::scoring::FixedRandom;
    use crate::storage::InMemoryCatalog;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn orchestrator(candidates: Vec<Candidate>) -> GapFillOrchestrator {
        let catalog = Arc::new(InMemoryCatalog::with_candidates(candidates));
        GapFillOrchestrator::new(SelectionEngine::new(
            catalog.clone(),
            catalog,
            Box::new(FixedRandom::neutral()),
            RunKind::Daily,
        ))
    }

    fn spots(n: usize, secs: u32) -> Vec<Candidate> {
        (0..n)
            .map(|i| Candidate::new(Asset::new(format!("spot-{i}"), ContentType::Psa, secs)))
            .collect()
    }

    fn spots_only() -> RotationConfig {
        let mut config = RotationConfig::default();
        config.order = vec![RotationCategory::Spots];
        config
    }

    #[test]
    fn test_gap_filled_exactly() {
        let mut orchestrator = orchestrator(spots(4, 30));
        let gap = ScheduleGap::new(at(10, 0), 90);

        let (items, report) = orchestrator.fill_gap(&gap, &spots_only()).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(report.status, GapStatus::Filled);
        assert_eq!(report.unfilled_secs, 0);

        // Back to back
        assert_eq!(items[1].start, items[0].end());
        assert_eq!(items[2].start, items[1].end());
    }

    #[test]
    fn test_leftover_within_tolerance_is_filled() {
        let mut orchestrator = orchestrator(spots(4, 30));
        let gap = ScheduleGap::new(at(10, 0), 64);

        let (items, report) = orchestrator.fill_gap(&gap, &spots_only()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(report.unfilled_secs, 4);
        assert_eq!(report.status, GapStatus::Filled);
    }

    #[test]
    fn test_partial_gap() {
        let mut orchestrator = orchestrator(spots(1, 30));
        let gap = ScheduleGap::new(at(10, 0), 120);

        let (items, report) = orchestrator.fill_gap(&gap, &spots_only()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(report.status, GapStatus::Partial);
        assert_eq!(report.filled_secs, 30);
        assert_eq!(report.unfilled_secs, 90);
    }

    #[test]
    fn test_empty_gap() {
        let mut orchestrator = orchestrator(Vec::new());
        let gap = ScheduleGap::new(at(10, 0), 120).with_label("afternoon break");

        let (items, report) = orchestrator.fill_gap(&gap, &spots_only()).unwrap();
        assert!(items.is_empty());
        assert_eq!(report.status, GapStatus::Empty);
        assert_eq!(report.label.as_deref(), Some("afternoon break"));
        assert!(report.status.is_terminal());
    }

    #[test]
    fn test_filler_finishes_gap() {
        // Rotation asks for long-form, which cannot fit a 40 second gap
        let mut candidates = spots(1, 30);
        candidates.push(Candidate::new(Asset::new("id-1", ContentType::Bump, 10)));
        candidates.push(Candidate::new(Asset::new("show", ContentType::Other, 1800)));
        let mut orchestrator = orchestrator(candidates);
        let mut config = RotationConfig::default();
        config.order = vec![RotationCategory::LongForm];

        let (items, report) = orchestrator
            .fill_gap(&ScheduleGap::new(at(10, 0), 40), &config)
            .unwrap();

        assert_eq!(report.status, GapStatus::Filled);
        assert_eq!(items.len(), 2);
        assert!(items
            .iter()
            .all(|i| i.kind == crate::models::PlacementKind::Filler));
        assert_eq!(orchestrator.engine().rotation_position().advanced, 0);
    }
}
