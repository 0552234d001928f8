//! Slot-fill decisions
//!
//! One call to [`SelectionEngine::fill_slot`] is one placement attempt:
//! peek the rotation, fetch eligible candidates, score, pick, record, and
//! advance the rotation. If the rotation category has nothing usable the
//! engine retries once under the category's parent; a fallback placement never
//! advances the rotation.
//!
//! A package that repeats a theme without a long-form item in between is only
//! ever placed when the catalog has no long-form inventory at all; that
//! placement carries a `PackageTheme` relaxation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use super::error::{SchedulerError, SchedulerResult};
use super::rotation::{RotationCategory, RotationState, RotationStateMachine};
use super::scoring::{
    sort_ranked, CandidateScorer, FeaturedDaypartPolicy, RandomSource, ScoredCandidate,
    ScoringContext,
};
use super::service::RunKind;
use crate::config::RotationConfig;
use crate::models::{PlacedItem, PlacementKind, PolicyRelaxation, ScheduledItem, SlotContext};
use crate::storage::{CandidateRepository, UsageRecorder};

// ============================================================================
// Requests and Outcomes
// ============================================================================

/// One slot to fill
#[derive(Debug, Clone, Copy)]
pub struct SlotRequest {
    /// Slot start
    pub start: NaiveDateTime,

    /// Seconds left in the enclosing gap
    pub available_secs: u32,
}

/// Result of a placement attempt
#[derive(Debug, Clone)]
pub enum SlotOutcome {
    /// An asset was placed
    Placed(ScheduledItem),
    /// Nothing usable in the requested category or its fallback
    NoCandidate,
}

/// Result of searching one category
#[derive(Debug)]
enum Attempt {
    Placed(ScheduledItem),
    /// Only packages with a theme conflict were usable
    ThemeBlocked,
    Empty,
}

// ============================================================================
// Run Ledger
// ============================================================================

/// Placements made so far in the current run
#[derive(Debug, Clone, Default)]
pub struct RunLedger {
    items: Vec<ScheduledItem>,
    per_asset: HashMap<String, u32>,
    last_featured_at: Option<NaiveDateTime>,
}

impl RunLedger {
    /// Items placed in this run, in placement order
    pub fn items(&self) -> &[ScheduledItem] {
        &self.items
    }

    /// Placements per asset
    pub fn per_asset(&self) -> &HashMap<String, u32> {
        &self.per_asset
    }

    /// Start of the last item that counted as featured
    pub fn last_featured_at(&self) -> Option<NaiveDateTime> {
        self.last_featured_at
    }

    /// Assets the repository must not return for a slot
    fn excluded_ids(&self, start: NaiveDateTime, kind: RunKind) -> Vec<String> {
        let mut ids: Vec<String> = self
            .items
            .iter()
            .filter(|item| match kind {
                RunKind::Daily => true,
                RunKind::Weekly | RunKind::Monthly => item.start.date() == start.date(),
            })
            .map(|item| item.asset_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Lookback and run items before `start`, oldest first
    fn recent(&self, lookback: &[PlacedItem], start: NaiveDateTime) -> Vec<PlacedItem> {
        let mut recent: Vec<PlacedItem> = lookback
            .iter()
            .filter(|item| item.start < start)
            .cloned()
            .chain(
                self.items
                    .iter()
                    .filter(|item| item.start < start)
                    .map(ScheduledItem::as_placed),
            )
            .collect();
        recent.sort_by_key(|item| item.start);
        recent.dedup_by(|a, b| a.asset_id == b.asset_id && a.start == b.start);
        recent
    }

    fn commit(&mut self, item: ScheduledItem) {
        *self.per_asset.entry(item.asset_id.clone()).or_insert(0) += 1;
        if item.featured {
            self.last_featured_at = Some(match self.last_featured_at {
                Some(prev) if prev > item.start => prev,
                _ => item.start,
            });
        }
        self.items.push(item);
    }

    fn clear(&mut self) {
        self.items.clear();
        self.per_asset.clear();
        self.last_featured_at = None;
    }
}

// ============================================================================
// Selection Engine
// ============================================================================

/// Makes one slot-fill decision at a time for a single run
pub struct SelectionEngine {
    repository: Arc<dyn CandidateRepository>,
    recorder: Arc<dyn UsageRecorder>,
    scorer: CandidateScorer,
    rotation: RotationStateMachine,
    random: Box<dyn RandomSource>,
    ledger: RunLedger,
    kind: RunKind,
    long_form_inventory: Option<bool>,
}

impl SelectionEngine {
    /// Create an engine at rotation index 0
    pub fn new(
        repository: Arc<dyn CandidateRepository>,
        recorder: Arc<dyn UsageRecorder>,
        random: Box<dyn RandomSource>,
        kind: RunKind,
    ) -> Self {
        Self {
            repository,
            recorder,
            scorer: CandidateScorer::new(),
            rotation: RotationStateMachine::new(),
            random,
            ledger: RunLedger::default(),
            kind,
            long_form_inventory: None,
        }
    }

    /// Replace the random source
    pub fn set_random(&mut self, random: Box<dyn RandomSource>) {
        self.random = random;
    }

    /// Run kind
    pub fn kind(&self) -> RunKind {
        self.kind
    }

    /// Current rotation position
    pub fn rotation_position(&self) -> RotationState {
        self.rotation.position()
    }

    /// Category the next placement will be asked for
    pub fn peek(&self, config: &RotationConfig) -> SchedulerResult<RotationCategory> {
        self.rotation.peek(&config.order)
    }

    /// Return the rotation to index 0
    pub fn reset_rotation(&mut self) {
        self.rotation.reset();
    }

    /// Forget the previous run's placements; the rotation position is kept
    pub fn begin_run(&mut self) {
        self.ledger.clear();
        self.long_form_inventory = None;
    }

    /// Placements of the current run
    pub fn ledger(&self) -> &RunLedger {
        &self.ledger
    }

    /// Fill one slot from the rotation category, falling back once to its parent
    ///
    /// When only theme-conflicting packages are usable and the catalog has
    /// long-form inventory, a long-form item is placed as a non-advancing
    /// separator instead, which clears the conflict for the next slot.
    pub fn fill_slot(
        &mut self,
        request: &SlotRequest,
        lookback: &[PlacedItem],
        config: &RotationConfig,
    ) -> SchedulerResult<SlotOutcome> {
        let category = self.rotation.peek(&config.order)?;
        let theme_repeat_allowed = !self.has_long_form_inventory(request)?;
        let mut blocked = false;

        match self.try_category(
            category,
            category,
            PlacementKind::Rotation,
            request,
            lookback,
            config,
            theme_repeat_allowed,
        )? {
            Attempt::Placed(item) => {
                self.rotation.advance(&config.order);
                debug!(
                    next = %self.rotation.format_position(&config.order),
                    "Rotation advanced"
                );
                return Ok(SlotOutcome::Placed(item));
            }
            Attempt::ThemeBlocked => blocked = true,
            Attempt::Empty => {}
        }

        if let Some(parent) = category.parent() {
            debug!(category = %category, fallback = %parent, "Falling back to parent category");
            match self.try_category(
                category,
                parent,
                PlacementKind::Fallback,
                request,
                lookback,
                config,
                theme_repeat_allowed,
            )? {
                Attempt::Placed(item) => return Ok(SlotOutcome::Placed(item)),
                Attempt::ThemeBlocked => blocked = true,
                Attempt::Empty => {}
            }
        }

        if blocked && category != RotationCategory::LongForm {
            debug!(
                category = %category,
                start = %request.start,
                "Only theme-conflicting packages usable, trying a long-form separator"
            );
            if let Attempt::Placed(item) = self.try_category(
                category,
                RotationCategory::LongForm,
                PlacementKind::Fallback,
                request,
                lookback,
                config,
                theme_repeat_allowed,
            )? {
                return Ok(SlotOutcome::Placed(item));
            }
        }

        debug!(category = %category, start = %request.start, "No usable candidate");
        Ok(SlotOutcome::NoCandidate)
    }

    /// Fill one slot outside the rotation from the first category that yields
    /// a usable candidate; the rotation does not move
    pub fn fill_with_filler(
        &mut self,
        request: &SlotRequest,
        lookback: &[PlacedItem],
        categories: &[RotationCategory],
        config: &RotationConfig,
    ) -> SchedulerResult<SlotOutcome> {
        let theme_repeat_allowed = !self.has_long_form_inventory(request)?;

        for &category in categories {
            if let Attempt::Placed(item) = self.try_category(
                category,
                category,
                PlacementKind::Filler,
                request,
                lookback,
                config,
                theme_repeat_allowed,
            )? {
                return Ok(SlotOutcome::Placed(item));
            }
        }
        Ok(SlotOutcome::NoCandidate)
    }

    /// Whether the catalog holds any schedulable long-form asset, checked once
    /// per run regardless of fit
    fn has_long_form_inventory(&mut self, request: &SlotRequest) -> SchedulerResult<bool> {
        if let Some(known) = self.long_form_inventory {
            return Ok(known);
        }

        let anywhere = SlotContext {
            start: request.start,
            available_secs: u32::MAX,
            excluded_ids: Vec::new(),
        };
        let present = !self
            .repository
            .find_eligible(RotationCategory::LongForm, &anywhere)
            .map_err(|e| SchedulerError::storage("find_eligible", e))?
            .is_empty();

        if !present {
            debug!("No long-form inventory, package themes may repeat back to back");
        }
        self.long_form_inventory = Some(present);
        Ok(present)
    }

    #[allow(clippy::too_many_arguments)]
    fn try_category(
        &mut self,
        requested: RotationCategory,
        search: RotationCategory,
        kind: PlacementKind,
        request: &SlotRequest,
        lookback: &[PlacedItem],
        config: &RotationConfig,
        theme_repeat_allowed: bool,
    ) -> SchedulerResult<Attempt> {
        let slot = SlotContext {
            start: request.start,
            available_secs: request.available_secs,
            excluded_ids: self.ledger.excluded_ids(request.start, self.kind),
        };

        let candidates = self
            .repository
            .find_eligible(search, &slot)
            .map_err(|e| SchedulerError::storage("find_eligible", e))?;
        if candidates.is_empty() {
            return Ok(Attempt::Empty);
        }

        let recent = self.ledger.recent(lookback, request.start);
        let last_featured_at = recent
            .iter()
            .filter(|item| item.featured)
            .map(|item| item.start)
            .chain(self.ledger.last_featured_at())
            .max();

        let context = ScoringContext {
            slot_start: request.start,
            recent: &recent,
            run_airings: self.ledger.per_asset(),
            last_featured_at,
            config,
        };

        let fetched = candidates.len();
        let mut ranked = self
            .scorer
            .rank(candidates, &context, self.random.as_mut());

        debug!(
            category = %search,
            start = %request.start,
            fetched,
            usable = ranked.len(),
            top = ranked.first().map(|s| s.candidate.id()),
            top_score = ranked.first().map(|s| s.score),
            "Candidates scored"
        );

        if ranked.is_empty() {
            return Ok(Attempt::Empty);
        }

        if ranked[0].breakdown.counts_as_featured() {
            let daypart = FeaturedDaypartPolicy::new(config.featured);
            let roll = self.random.roll();
            if !daypart.accept(request.start, roll) {
                debug!(
                    start = %request.start,
                    roll,
                    weight = daypart.acceptance_weight(request.start),
                    "Featured pick rejected for daypart"
                );
                ranked.iter_mut().for_each(ScoredCandidate::strip_featured_boost);
                sort_ranked(&mut ranked);
            }
        }

        let conflicted = ranked.iter().any(|s| s.breakdown.package_theme_conflict);
        let Some((chosen, relaxations)) = pick(ranked, theme_repeat_allowed) else {
            return Ok(if conflicted {
                Attempt::ThemeBlocked
            } else {
                Attempt::Empty
            });
        };
        let item = self.commit(chosen, requested, search, kind, request, relaxations)?;
        Ok(Attempt::Placed(item))
    }

    fn commit(
        &mut self,
        chosen: ScoredCandidate,
        requested: RotationCategory,
        placed: RotationCategory,
        kind: PlacementKind,
        request: &SlotRequest,
        relaxations: Vec<PolicyRelaxation>,
    ) -> SchedulerResult<ScheduledItem> {
        let asset = &chosen.candidate.asset;

        self.recorder
            .record(&asset.id, request.start, placed)
            .map_err(|e| SchedulerError::storage("record", e))?;

        for relaxation in &relaxations {
            match relaxation {
                PolicyRelaxation::ReplayDelay {
                    threshold_hours,
                    elapsed_hours,
                } => warn!(
                    target: "airtime::relaxation",
                    asset_id = %asset.id,
                    start = %request.start,
                    threshold_hours,
                    elapsed_hours,
                    "Replay delay relaxed: no compliant candidate in category"
                ),
                PolicyRelaxation::PackageTheme { theme } => warn!(
                    target: "airtime::relaxation",
                    asset_id = %asset.id,
                    start = %request.start,
                    theme = %theme,
                    "Package theme repeated without long-form separation"
                ),
            }
        }

        let item = ScheduledItem {
            sequence: self.ledger.items().len() as u32 + 1,
            asset_id: asset.id.clone(),
            title: asset.title.clone(),
            start: request.start,
            duration_secs: asset.duration_secs,
            content_type: asset.content_type,
            duration_category: asset.duration_category(),
            theme: asset.theme.clone(),
            requested_category: requested,
            placed_category: placed,
            kind,
            score: chosen.score,
            featured: chosen.breakdown.counts_as_featured(),
            relaxations,
        };

        info!(
            sequence = item.sequence,
            asset_id = %item.asset_id,
            start = %item.start,
            duration_secs = item.duration_secs,
            requested = %requested,
            placed = %placed,
            kind = ?kind,
            score = item.score,
            featured = item.featured,
            "Slot filled"
        );

        self.ledger.commit(item.clone());
        Ok(item)
    }
}

/// Choose from a ranked list
///
/// Replay-compliant candidates win over non-compliant ones; among those,
/// packages without a theme conflict win over conflicting ones. Conflicting
/// packages are dropped outright unless `theme_repeat_allowed`. Anything
/// placed despite a rule is reported as a relaxation.
fn pick(
    ranked: Vec<ScoredCandidate>,
    theme_repeat_allowed: bool,
) -> Option<(ScoredCandidate, Vec<PolicyRelaxation>)> {
    let ranked: Vec<ScoredCandidate> = if theme_repeat_allowed {
        ranked
    } else {
        ranked
            .into_iter()
            .filter(|s| !s.breakdown.package_theme_conflict)
            .collect()
    };

    let any_compliant = ranked.iter().any(|s| s.breakdown.replay_compliant());
    let pool: Vec<ScoredCandidate> = if any_compliant {
        ranked
            .into_iter()
            .filter(|s| s.breakdown.replay_compliant())
            .collect()
    } else {
        ranked
    };

    let any_clear = pool.iter().any(|s| !s.breakdown.package_theme_conflict);
    let chosen = pool
        .into_iter()
        .find(|s| !any_clear || !s.breakdown.package_theme_conflict)?;

    let mut relaxations = Vec::new();
    if !chosen.breakdown.replay_compliant() {
        relaxations.push(PolicyRelaxation::ReplayDelay {
            threshold_hours: chosen.breakdown.replay_threshold_hours,
            elapsed_hours: chosen.breakdown.elapsed_hours.unwrap_or_default(),
        });
    }
    if chosen.breakdown.package_theme_conflict {
        relaxations.push(PolicyRelaxation::PackageTheme {
            theme: chosen.candidate.asset.theme.clone().unwrap_or_default(),
        });
    }

    Some((chosen, relaxations))
}
