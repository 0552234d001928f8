//! Per-run scheduler service
//!
//! A [`Scheduler`] owns one rotation state and one run ledger. Independent
//! runs use independent schedulers; nothing here is global.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{SchedulerError, SchedulerResult};
use super::orchestrator::{GapFillOrchestrator, ScheduleReport};
use super::rotation::RotationState;
use super::scoring::{RandomSource, SeededRandom};
use super::selection::SelectionEngine;
use crate::config::RotationConfig;
use crate::models::ScheduleGap;
use crate::storage::{CandidateRepository, UsageRecorder};

// ============================================================================
// Run Kind
// ============================================================================

/// Scope of a schedule-building run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    /// One broadcast day; no asset repeats within the run
    Daily,
    /// A week; assets may repeat on different days
    Weekly,
    /// A month; assets may repeat on different days
    Monthly,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RunKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(format!(
                "invalid run kind '{other}' (expected daily, weekly or monthly)"
            )),
        }
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Builds schedules for one run at a time
pub struct Scheduler {
    orchestrator: GapFillOrchestrator,
}

impl Scheduler {
    /// Create a scheduler with an entropy-seeded random source
    pub fn new(
        repository: Arc<dyn CandidateRepository>,
        recorder: Arc<dyn UsageRecorder>,
        kind: RunKind,
    ) -> Self {
        let engine = SelectionEngine::new(
            repository,
            recorder,
            Box::new(SeededRandom::from_entropy()),
            kind,
        );
        Self {
            orchestrator: GapFillOrchestrator::new(engine),
        }
    }

    /// Use a specific random source
    pub fn with_random(mut self, random: Box<dyn RandomSource>) -> Self {
        self.orchestrator.engine_mut().set_random(random);
        self
    }

    /// Use a reproducible seeded random source
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_random(Box::new(SeededRandom::new(seed)))
    }

    /// Run kind
    pub fn kind(&self) -> RunKind {
        self.orchestrator.engine().kind()
    }

    /// Current rotation position
    pub fn rotation_position(&self) -> RotationState {
        self.orchestrator.engine().rotation_position()
    }

    /// Return the rotation to its first category
    pub fn reset_rotation(&mut self) {
        self.orchestrator.engine_mut().reset_rotation();
    }

    /// Fill every gap, in chronological order
    ///
    /// Overlapping gaps are rejected before anything is placed. A collaborator
    /// failure aborts the run; placements recorded before it stay recorded.
    pub fn build_schedule(
        &mut self,
        gaps: &[ScheduleGap],
        config: &RotationConfig,
    ) -> SchedulerResult<ScheduleReport> {
        if config.order.is_empty() {
            return Err(SchedulerError::EmptyRotation);
        }

        let mut ordered: Vec<&ScheduleGap> = gaps.iter().collect();
        ordered.sort_by_key(|gap| gap.start);
        for pair in ordered.windows(2) {
            if pair[1].start < pair[0].end() {
                return Err(SchedulerError::invalid_gap(
                    pair[1].start,
                    format!("overlaps gap starting at {}", pair[0].start),
                ));
            }
        }

        let kind = self.kind();
        info!(
            kind = %kind,
            gaps = ordered.len(),
            rotation = ?self.rotation_position(),
            "Schedule run started"
        );

        self.orchestrator.engine_mut().begin_run();

        let mut items = Vec::new();
        let mut reports = Vec::with_capacity(ordered.len());
        for gap in ordered {
            let (placed, report) = self.orchestrator.fill_gap(gap, config)?;
            items.extend(placed);
            reports.push(report);
        }

        let relaxations = items.iter().filter(|i| !i.relaxations.is_empty()).count();
        let report = ScheduleReport {
            kind,
            items,
            gaps: reports,
            relaxations,
            rotation: self.rotation_position(),
        };

        info!(
            kind = %kind,
            items = report.items.len(),
            filled_secs = report.filled_secs(),
            relaxations,
            complete = report.is_complete(),
            "Schedule run finished"
        );

        Ok(report)
    }
}
