//! Candidate scoring
//!
//! Every eligible candidate for a slot gets an additive desirability score:
//!
//! | Term             | Value                                                  |
//! |------------------|--------------------------------------------------------|
//! | base             | 100 plus jitter in [-5, +5]                            |
//! | freshness        | +30 when never aired                                   |
//! | recency          | -100 / -50 / -25 / -10 under 1 / 2 / 4 / 6 hours       |
//! | concentration    | -50 per in-run airing beyond the second                |
//! | replay delay     | -200 per hour short of the replay threshold            |
//! | theme conflict   | -200                                                   |
//! | featured boost   | +150, scaled by meeting relevance                      |
//! | featured spacing | excluded inside the minimum featured spacing           |
//!
//! The daytime bias for featured picks is not a score term: it is an explicit
//! accept/reject step ([`FeaturedDaypartPolicy`]) applied by the selection
//! engine to the ranked list.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDateTime;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::{FeaturedPolicy, RelevanceTier, RotationConfig};
use crate::models::{Candidate, ContentType, DurationCategory, PlacedItem};

// ============================================================================
// Constants
// ============================================================================

pub const BASE_SCORE: f64 = 100.0;
pub const JITTER_RANGE: f64 = 5.0;
pub const FRESHNESS_BONUS: f64 = 30.0;
pub const CONCENTRATION_PENALTY: f64 = 50.0;
/// In-run airings allowed before the concentration penalty applies
pub const CONCENTRATION_ALLOWANCE: u32 = 2;
pub const REPLAY_PENALTY_PER_HOUR: f64 = 200.0;
pub const THEME_CONFLICT_PENALTY: f64 = 200.0;
pub const FEATURED_BOOST: f64 = 150.0;

/// Scores at or below this are never placed
pub const UNUSABLE_FLOOR: f64 = f64::NEG_INFINITY;

/// (hours since last airing, penalty), checked in order
const RECENCY_PENALTIES: [(f64, f64); 4] = [(1.0, -100.0), (2.0, -50.0), (4.0, -25.0), (6.0, -10.0)];

// ============================================================================
// Random Source
// ============================================================================

/// Source of the two random draws the scheduler makes
pub trait RandomSource: Send {
    /// Uniform in [-JITTER_RANGE, JITTER_RANGE]
    fn jitter(&mut self) -> f64;

    /// Uniform in [0, 1)
    fn roll(&mut self) -> f64;
}

/// ChaCha8-backed random source; reproducible when seeded
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Create a reproducible source
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Create a source seeded from the OS
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn jitter(&mut self) -> f64 {
        self.rng.gen_range(-JITTER_RANGE..=JITTER_RANGE)
    }

    fn roll(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Constant draws, for tests and fully deterministic runs
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom {
    pub jitter: f64,
    pub roll: f64,
}

impl FixedRandom {
    /// No jitter; every featured pick accepted
    pub fn neutral() -> Self {
        Self {
            jitter: 0.0,
            roll: 0.0,
        }
    }
}

impl RandomSource for FixedRandom {
    fn jitter(&mut self) -> f64 {
        self.jitter.clamp(-JITTER_RANGE, JITTER_RANGE)
    }

    fn roll(&mut self) -> f64 {
        self.roll.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

// ============================================================================
// Scoring Context
// ============================================================================

/// Everything about the slot the scorer needs
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    /// Slot start
    pub slot_start: NaiveDateTime,

    /// Items before the slot, oldest first
    pub recent: &'a [PlacedItem],

    /// Placements per asset so far in this run
    pub run_airings: &'a HashMap<String, u32>,

    /// Start of the last featured placement in this run
    pub last_featured_at: Option<NaiveDateTime>,

    pub config: &'a RotationConfig,
}

// ============================================================================
// Score Breakdown
// ============================================================================

/// Per-term contributions to a candidate's score
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub jitter: f64,
    pub freshness: f64,
    pub recency: f64,
    pub concentration: f64,
    pub replay_delay: f64,
    pub theme_conflict: f64,
    pub featured_boost: f64,

    /// Blocked by the featured spacing gate
    pub spacing_blocked: bool,

    /// Featured and not an expired meeting
    pub effectively_featured: bool,

    /// Meeting relevance tier, for meetings
    pub relevance: Option<RelevanceTier>,

    /// Replay threshold in hours (after the featured factor)
    pub replay_threshold_hours: f64,

    /// Hours between the slot and the last airing
    pub elapsed_hours: Option<f64>,

    /// Package sharing a theme with an earlier package and no long-form since
    pub package_theme_conflict: bool,
}

impl ScoreBreakdown {
    /// Sum of all terms; `-inf` when gated
    pub fn total(&self) -> f64 {
        if self.spacing_blocked {
            return f64::NEG_INFINITY;
        }
        self.base
            + self.jitter
            + self.freshness
            + self.recency
            + self.concentration
            + self.replay_delay
            + self.theme_conflict
            + self.featured_boost
    }

    /// Placed at least the replay threshold after its last airing
    pub fn replay_compliant(&self) -> bool {
        self.elapsed_hours
            .map_or(true, |elapsed| elapsed >= self.replay_threshold_hours)
    }

    /// Counts as a featured placement if placed
    pub fn counts_as_featured(&self) -> bool {
        self.effectively_featured && self.featured_boost > 0.0
    }
}

/// A candidate with its score
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

impl ScoredCandidate {
    /// Remove the featured boost for this slot
    pub fn strip_featured_boost(&mut self) {
        self.breakdown.featured_boost = 0.0;
        self.score = self.breakdown.total();
    }
}

// ============================================================================
// Candidate Scorer
// ============================================================================

/// Additive candidate scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateScorer;

impl CandidateScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score one candidate
    pub fn score(
        &self,
        candidate: &Candidate,
        context: &ScoringContext<'_>,
        random: &mut dyn RandomSource,
    ) -> ScoreBreakdown {
        let asset = &candidate.asset;
        let meta = &candidate.metadata;
        let config = context.config;

        let mut breakdown = ScoreBreakdown {
            base: BASE_SCORE,
            jitter: random.jitter(),
            ..ScoreBreakdown::default()
        };

        // Meeting relevance decides whether "featured" still means anything
        if asset.content_type == ContentType::Meeting {
            breakdown.relevance = Some(
                config
                    .meeting_relevance
                    .tier(asset.recorded_on, context.slot_start.date()),
            );
        }
        breakdown.effectively_featured =
            meta.featured && breakdown.relevance != Some(RelevanceTier::Expired);

        if meta.total_airings == 0 && meta.last_scheduled_at.is_none() {
            breakdown.freshness = FRESHNESS_BONUS;
        }

        let elapsed = meta
            .last_scheduled_at
            .map(|last| hours_between(context.slot_start, last));
        breakdown.elapsed_hours = elapsed;

        if let Some(hours) = elapsed {
            breakdown.recency = RECENCY_PENALTIES
                .iter()
                .find(|(limit, _)| hours < *limit)
                .map_or(0.0, |(_, penalty)| *penalty);
        }

        let in_run = context.run_airings.get(&asset.id).copied().unwrap_or(0);
        breakdown.concentration =
            -CONCENTRATION_PENALTY * f64::from(in_run.saturating_sub(CONCENTRATION_ALLOWANCE));

        let mut threshold = config.replay_delay_for(asset).threshold_hours(meta.total_airings);
        if breakdown.effectively_featured {
            threshold *= config.featured.replay_delay_factor;
        }
        breakdown.replay_threshold_hours = threshold;
        if let Some(hours) = elapsed {
            if hours < threshold {
                breakdown.replay_delay = -REPLAY_PENALTY_PER_HOUR * (threshold - hours);
            }
        }

        let spots_conflict = asset.duration_category() == DurationCategory::Spots
            && spots_theme_conflict(asset.theme.as_deref(), context.recent);
        breakdown.package_theme_conflict = asset.content_type == ContentType::Package
            && package_theme_conflict(asset.theme.as_deref(), context.recent);
        if spots_conflict || breakdown.package_theme_conflict {
            breakdown.theme_conflict = -THEME_CONFLICT_PENALTY;
        }

        if breakdown.effectively_featured {
            if let Some(last) = context.last_featured_at {
                let spacing = hours_between(context.slot_start, last);
                breakdown.spacing_blocked = spacing < config.featured.minimum_spacing_hours;
            }
            let weight = breakdown.relevance.map_or(1.0, |tier| tier.weight());
            breakdown.featured_boost = FEATURED_BOOST * weight;
        }

        breakdown
    }

    /// Score and sort candidates, best first, dropping unusable ones
    ///
    /// Candidates are scored in id order so a seeded source gives the same
    /// jitter regardless of repository ordering.
    pub fn rank(
        &self,
        mut candidates: Vec<Candidate>,
        context: &ScoringContext<'_>,
        random: &mut dyn RandomSource,
    ) -> Vec<ScoredCandidate> {
        candidates.sort_by(|a, b| a.asset.id.cmp(&b.asset.id));

        let mut ranked: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|candidate| {
                let breakdown = self.score(&candidate, context, random);
                ScoredCandidate {
                    score: breakdown.total(),
                    candidate,
                    breakdown,
                }
            })
            .filter(|s| s.score > UNUSABLE_FLOOR && !s.score.is_nan())
            .collect();

        sort_ranked(&mut ranked);
        ranked
    }
}

/// Sort best first: score, then priority, then engagement, then id
pub fn sort_ranked(ranked: &mut [ScoredCandidate]) {
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| {
                b.candidate
                    .metadata
                    .priority_score
                    .total_cmp(&a.candidate.metadata.priority_score)
            })
            .then_with(|| {
                let ea = a.candidate.asset.engagement_score.unwrap_or(f64::MIN);
                let eb = b.candidate.asset.engagement_score.unwrap_or(f64::MIN);
                eb.partial_cmp(&ea).unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.candidate.asset.id.cmp(&b.candidate.asset.id))
    });
}

fn hours_between(a: NaiveDateTime, b: NaiveDateTime) -> f64 {
    (a - b).num_seconds().abs() as f64 / 3600.0
}

/// Theme of the most recent spots item equals this theme
fn spots_theme_conflict(theme: Option<&str>, recent: &[PlacedItem]) -> bool {
    let Some(theme) = theme else {
        return false;
    };
    recent
        .iter()
        .rev()
        .find(|item| item.category == DurationCategory::Spots)
        .and_then(|item| item.theme.as_deref())
        .is_some_and(|t| t == theme)
}

/// An earlier package has this theme with no long-form item after it
fn package_theme_conflict(theme: Option<&str>, recent: &[PlacedItem]) -> bool {
    let Some(theme) = theme else {
        return false;
    };
    for item in recent.iter().rev() {
        if item.category == DurationCategory::LongForm {
            return false;
        }
        if item.content_type == ContentType::Package && item.theme.as_deref() == Some(theme) {
            return true;
        }
    }
    false
}

// ============================================================================
// Featured Daypart Policy
// ============================================================================

/// Weighted accept/reject for featured picks by time of day
///
/// With a daytime window of D hours, N = 24 - D night hours and a target
/// daytime share p, a featured pick is accepted with weight p/D by day and
/// (1 - p)/N by night, normalised so the larger weight is 1. Over a day of
/// uniformly offered slots the accepted featured picks land in daytime with
/// probability p.
#[derive(Debug, Clone, Copy)]
pub struct FeaturedDaypartPolicy {
    policy: FeaturedPolicy,
}

impl FeaturedDaypartPolicy {
    pub fn new(policy: FeaturedPolicy) -> Self {
        Self { policy }
    }

    /// Probability of accepting a featured pick for a slot starting at `at`
    pub fn acceptance_weight(&self, at: NaiveDateTime) -> f64 {
        let day_hours = f64::from(self.policy.daytime_hours());
        let night_hours = 24.0 - day_hours;
        let p = self.policy.daytime_probability;

        let day = if day_hours > 0.0 { p / day_hours } else { 0.0 };
        let night = if night_hours > 0.0 {
            (1.0 - p) / night_hours
        } else {
            0.0
        };
        let max = day.max(night);
        if max <= 0.0 {
            return 1.0;
        }

        if self.policy.is_daytime(at) {
            day / max
        } else {
            night / max
        }
    }

    /// Decide a featured pick given a roll in [0, 1)
    pub fn accept(&self, at: NaiveDateTime, roll: f64) -> bool {
        roll < self.acceptance_weight(at)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Asset;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    struct Fixture {
        config: RotationConfig,
        run_airings: HashMap<String, u32>,
        recent: Vec<PlacedItem>,
        last_featured_at: Option<NaiveDateTime>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: RotationConfig::default(),
                run_airings: HashMap::new(),
                recent: Vec::new(),
                last_featured_at: None,
            }
        }

        fn context(&self, slot_start: NaiveDateTime) -> ScoringContext<'_> {
            ScoringContext {
                slot_start,
                recent: &self.recent,
                run_airings: &self.run_airings,
                last_featured_at: self.last_featured_at,
                config: &self.config,
            }
        }

        fn score(&self, candidate: &Candidate, slot_start: NaiveDateTime) -> ScoreBreakdown {
            CandidateScorer::new().score(
                candidate,
                &self.context(slot_start),
                &mut FixedRandom::neutral(),
            )
        }
    }

    fn placed(id: &str, content_type: ContentType, secs: u32, theme: Option<&str>) -> PlacedItem {
        PlacedItem {
            asset_id: id.to_string(),
            category: DurationCategory::from_duration(secs),
            content_type,
            theme: theme.map(String::from),
            featured: false,
            start: at(9, 0),
        }
    }

    #[test]
    fn test_fresh_asset_score() {
        let fixture = Fixture::new();
        let candidate = Candidate::new(Asset::new("new", ContentType::Bump, 10));

        let breakdown = fixture.score(&candidate, at(10, 0));
        assert_eq!(breakdown.total(), 130.0);
        assert!(breakdown.replay_compliant());
    }

    #[test]
    fn test_replay_delay_penalty() {
        // id threshold with two airings: 9 + 2 * 2 = 13h; aired 10h ago
        let fixture = Fixture::new();
        let candidate =
            Candidate::new(Asset::new("station-id", ContentType::Bump, 10)).with_history(at(0, 0), 2);

        let breakdown = fixture.score(&candidate, at(10, 0));
        assert_eq!(breakdown.replay_threshold_hours, 13.0);
        assert_eq!(breakdown.replay_delay, -600.0);
        assert!(!breakdown.replay_compliant());
        assert_eq!(breakdown.total(), 100.0 - 600.0);
    }

    #[test]
    fn test_recency_tiers() {
        let mut fixture = Fixture::new();
        fixture.config.replay_delays.clear();
        for category in crate::scheduler::rotation::RotationCategory::all() {
            fixture
                .config
                .replay_delays
                .insert(category, crate::config::ReplayDelay::new(0.0, 0.0));
        }

        let cases = [((9, 30), -100.0), ((8, 30), -50.0), ((7, 0), -25.0), ((5, 0), -10.0), ((3, 0), 0.0)];
        for ((h, m), expected) in cases {
            let candidate =
                Candidate::new(Asset::new("x", ContentType::Psa, 30)).with_history(at(h, m), 1);
            assert_eq!(fixture.score(&candidate, at(10, 0)).recency, expected, "last at {h}:{m}");
        }
    }

    #[test]
    fn test_future_airing_measured_by_distance() {
        let fixture = Fixture::new();
        let candidate =
            Candidate::new(Asset::new("x", ContentType::Psa, 30)).with_history(at(10, 30), 1);

        let breakdown = fixture.score(&candidate, at(10, 0));
        assert_eq!(breakdown.elapsed_hours, Some(0.5));
        assert_eq!(breakdown.recency, -100.0);
    }

    #[test]
    fn test_concentration_penalty() {
        let mut fixture = Fixture::new();
        fixture.run_airings.insert("x".to_string(), 4);
        let candidate = Candidate::new(Asset::new("x", ContentType::Bump, 10));

        assert_eq!(fixture.score(&candidate, at(10, 0)).concentration, -100.0);
    }

    #[test]
    fn test_spots_theme_conflict() {
        let mut fixture = Fixture::new();
        fixture.recent = vec![
            placed("s1", ContentType::Psa, 30, Some("health")),
            placed("p1", ContentType::Package, 300, Some("transit")),
        ];

        let health = Candidate::new(Asset::new("s2", ContentType::Psa, 30).with_theme("health"));
        assert_eq!(fixture.score(&health, at(10, 0)).theme_conflict, -200.0);

        let other = Candidate::new(Asset::new("s3", ContentType::Psa, 30).with_theme("parks"));
        assert_eq!(fixture.score(&other, at(10, 0)).theme_conflict, 0.0);
    }

    #[test]
    fn test_package_theme_conflict_cleared_by_long_form() {
        let mut fixture = Fixture::new();
        fixture.recent = vec![
            placed("p1", ContentType::Package, 300, Some("transit")),
            placed("s1", ContentType::Psa, 30, None),
        ];
        let pkg = Candidate::new(Asset::new("p2", ContentType::Package, 300).with_theme("transit"));

        let breakdown = fixture.score(&pkg, at(10, 0));
        assert!(breakdown.package_theme_conflict);
        assert_eq!(breakdown.theme_conflict, -200.0);

        fixture
            .recent
            .push(placed("m1", ContentType::Meeting, 3600, None));
        let breakdown = fixture.score(&pkg, at(10, 0));
        assert!(!breakdown.package_theme_conflict);
        assert_eq!(breakdown.theme_conflict, 0.0);
    }

    #[test]
    fn test_featured_boost_and_spacing_gate() {
        let mut fixture = Fixture::new();
        let featured = Candidate::new(Asset::new("f", ContentType::Package, 300)).featured(true);

        let breakdown = fixture.score(&featured, at(10, 0));
        assert_eq!(breakdown.featured_boost, 150.0);
        assert!(breakdown.counts_as_featured());

        fixture.last_featured_at = Some(at(9, 0));
        assert_eq!(fixture.score(&featured, at(10, 0)).total(), f64::NEG_INFINITY);

        fixture.last_featured_at = Some(at(8, 0));
        assert!(fixture.score(&featured, at(10, 0)).total().is_finite());
    }

    #[test]
    fn test_featured_replay_factor() {
        let fixture = Fixture::new();
        let featured = Candidate::new(Asset::new("f", ContentType::Psa, 30))
            .featured(true)
            .with_history(at(0, 0), 0);

        // spots threshold 12h halved for featured content
        assert_eq!(fixture.score(&featured, at(10, 0)).replay_threshold_hours, 6.0);
    }

    #[test]
    fn test_meeting_relevance_decay() {
        let fixture = Fixture::new();
        let days_ago = |n: u64| {
            NaiveDate::from_ymd_opt(2024, 3, 10)
                .unwrap()
                .checked_sub_days(chrono::Days::new(n))
                .unwrap()
        };
        let meeting = |n: u64| {
            Candidate::new(Asset::new("m", ContentType::Meeting, 3600).with_recorded_on(days_ago(n)))
                .featured(true)
        };

        assert_eq!(fixture.score(&meeting(1), at(10, 0)).featured_boost, 150.0);
        assert_eq!(fixture.score(&meeting(5), at(10, 0)).featured_boost, 90.0);
        assert_eq!(fixture.score(&meeting(20), at(10, 0)).featured_boost, 37.5);

        let expired = fixture.score(&meeting(40), at(10, 0));
        assert_eq!(expired.featured_boost, 0.0);
        assert!(!expired.effectively_featured);
    }

    #[test]
    fn test_expired_meeting_not_gated() {
        let mut fixture = Fixture::new();
        fixture.last_featured_at = Some(at(9, 30));
        let old = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let meeting = Candidate::new(
            Asset::new("m", ContentType::Meeting, 3600).with_recorded_on(old),
        )
        .featured(true);

        assert!(fixture.score(&meeting, at(10, 0)).total().is_finite());
    }

    #[test]
    fn test_rank_drops_gated_and_breaks_ties() {
        let mut fixture = Fixture::new();
        fixture.last_featured_at = Some(at(9, 30));

        let mut high = Candidate::new(Asset::new("b", ContentType::Bump, 10));
        high.metadata.priority_score = 2.0;
        let low = Candidate::new(Asset::new("a", ContentType::Bump, 10));
        let gated = Candidate::new(Asset::new("c", ContentType::Bump, 10)).featured(true);

        let ranked = CandidateScorer::new().rank(
            vec![low, gated, high],
            &fixture.context(at(10, 0)),
            &mut FixedRandom::neutral(),
        );

        let ids: Vec<_> = ranked.iter().map(|s| s.candidate.id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_rank_all_excluded_is_empty() {
        let mut fixture = Fixture::new();
        fixture.last_featured_at = Some(at(9, 30));
        let gated = Candidate::new(Asset::new("c", ContentType::Bump, 10)).featured(true);

        let ranked = CandidateScorer::new().rank(
            vec![gated],
            &fixture.context(at(10, 0)),
            &mut FixedRandom::neutral(),
        );
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_strip_featured_boost() {
        let fixture = Fixture::new();
        let featured = Candidate::new(Asset::new("f", ContentType::Bump, 10)).featured(true);
        let breakdown = fixture.score(&featured, at(10, 0));

        let mut scored = ScoredCandidate {
            candidate: featured,
            score: breakdown.total(),
            breakdown,
        };
        scored.strip_featured_boost();
        assert_eq!(scored.score, 130.0);
        assert!(!scored.breakdown.counts_as_featured());
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        for _ in 0..20 {
            let j = a.jitter();
            assert_eq!(j, b.jitter());
            assert!((-JITTER_RANGE..=JITTER_RANGE).contains(&j));
            let r = a.roll();
            assert_eq!(r, b.roll());
            assert!((0.0..1.0).contains(&r));
        }
    }

    #[test]
    fn test_daypart_weights() {
        let policy = FeaturedDaypartPolicy::new(FeaturedPolicy::default());
        // p = 0.75 over 12 day hours vs 0.25 over 12 night hours
        assert_eq!(policy.acceptance_weight(at(10, 0)), 1.0);
        assert!((policy.acceptance_weight(at(22, 0)) - 1.0 / 3.0).abs() < 1e-9);

        assert!(policy.accept(at(10, 0), 0.99));
        assert!(policy.accept(at(22, 0), 0.2));
        assert!(!policy.accept(at(22, 0), 0.5));
    }

    #[test]
    fn test_daypart_converges_to_ratio() {
        let policy = FeaturedDaypartPolicy::new(FeaturedPolicy::default());
        let mut random = SeededRandom::new(7);
        let (mut day, mut night) = (0u32, 0u32);

        for _ in 0..500 {
            for hour in 0..24 {
                let slot = at(hour, 0);
                if policy.accept(slot, random.roll()) {
                    if (6..18).contains(&hour) {
                        day += 1;
                    } else {
                        night += 1;
                    }
                }
            }
        }

        let ratio = f64::from(day) / f64::from(day + night);
        assert!((ratio - 0.75).abs() < 0.03, "ratio {ratio}");
    }
}
