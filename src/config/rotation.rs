//! Rotation policy configuration
//!
//! User documents are partial: every key is optional and merged over the
//! hard-coded defaults one key at a time. A key that is present but malformed
//! falls back to its default with a warning; it never fails the whole load.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::{Asset, ContentType};
use crate::scheduler::rotation::RotationCategory;

// ============================================================================
// Defaults
// ============================================================================

/// Rotation order used when the document has none (or an invalid one)
pub const DEFAULT_ROTATION_ORDER: [RotationCategory; 6] = [
    RotationCategory::Id,
    RotationCategory::Spots,
    RotationCategory::Pkg,
    RotationCategory::ShortForm,
    RotationCategory::Pkg,
    RotationCategory::LongForm,
];

/// Filler categories tried, in order, when rotation cannot fit a gap's remainder
pub const DEFAULT_FILLER_CATEGORIES: [RotationCategory; 3] = [
    RotationCategory::ShortForm,
    RotationCategory::Spots,
    RotationCategory::Id,
];

/// Default replay delay per general category
pub fn default_replay_delays() -> BTreeMap<RotationCategory, ReplayDelay> {
    BTreeMap::from([
        (RotationCategory::Id, ReplayDelay::new(9.0, 2.0)),
        (RotationCategory::Spots, ReplayDelay::new(12.0, 3.0)),
        (RotationCategory::ShortForm, ReplayDelay::new(24.0, 6.0)),
        (RotationCategory::LongForm, ReplayDelay::new(96.0, 24.0)),
    ])
}

// ============================================================================
// Policy Blocks
// ============================================================================

/// Minimum spacing between airings of the same asset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayDelay {
    /// Hours required after the first airing
    pub base_delay_hours: f64,

    /// Extra hours per lifetime airing
    pub per_airing_increment_hours: f64,
}

impl ReplayDelay {
    /// Create a replay delay
    pub const fn new(base_delay_hours: f64, per_airing_increment_hours: f64) -> Self {
        Self {
            base_delay_hours,
            per_airing_increment_hours,
        }
    }

    /// Required hours since the last airing for an asset with this many airings
    pub fn threshold_hours(&self, total_airings: u32) -> f64 {
        self.base_delay_hours + self.per_airing_increment_hours * f64::from(total_airings)
    }
}

/// Featured content policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeaturedPolicy {
    /// Minimum hours between featured placements in one run
    pub minimum_spacing_hours: f64,

    /// First daytime hour (inclusive)
    pub daytime_start_hour: u32,

    /// End of daytime (exclusive)
    pub daytime_end_hour: u32,

    /// Target share of featured placements that land in daytime
    pub daytime_probability: f64,

    /// Multiplier applied to the replay delay of featured assets
    pub replay_delay_factor: f64,
}

impl Default for FeaturedPolicy {
    fn default() -> Self {
        Self {
            minimum_spacing_hours: 2.0,
            daytime_start_hour: 6,
            daytime_end_hour: 18,
            daytime_probability: 0.75,
            replay_delay_factor: 0.5,
        }
    }
}

impl FeaturedPolicy {
    /// Check if a slot start falls in the daytime window
    pub fn is_daytime(&self, at: NaiveDateTime) -> bool {
        let hour = at.hour();
        hour >= self.daytime_start_hour && hour < self.daytime_end_hour
    }

    /// Length of the daytime window in hours
    pub fn daytime_hours(&self) -> u32 {
        self.daytime_end_hour.saturating_sub(self.daytime_start_hour)
    }
}

/// Age of a meeting recording relative to the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelevanceTier {
    Fresh,
    Relevant,
    Archive,
    Expired,
}

impl RelevanceTier {
    /// Multiplier applied to the featured boost
    pub fn weight(&self) -> f64 {
        match self {
            Self::Fresh => 1.0,
            Self::Relevant => 0.6,
            Self::Archive => 0.25,
            Self::Expired => 0.0,
        }
    }
}

/// Day thresholds for meeting relevance decay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRelevance {
    /// Up to this many days old: fresh
    pub fresh_days: u32,

    /// Up to this many days old: relevant
    pub relevant_days: u32,

    /// Up to this many days old: archive; beyond: expired
    pub archive_days: u32,
}

impl Default for MeetingRelevance {
    fn default() -> Self {
        Self {
            fresh_days: 2,
            relevant_days: 7,
            archive_days: 30,
        }
    }
}

impl MeetingRelevance {
    /// Classify a meeting recorded on `recorded_on` as seen from `today`
    ///
    /// Meetings without a recording date never expire.
    pub fn tier(&self, recorded_on: Option<NaiveDate>, today: NaiveDate) -> RelevanceTier {
        let Some(recorded_on) = recorded_on else {
            return RelevanceTier::Fresh;
        };
        let age = (today - recorded_on).num_days().max(0);

        if age <= i64::from(self.fresh_days) {
            RelevanceTier::Fresh
        } else if age <= i64::from(self.relevant_days) {
            RelevanceTier::Relevant
        } else if age <= i64::from(self.archive_days) {
            RelevanceTier::Archive
        } else {
            RelevanceTier::Expired
        }
    }
}

/// How gaps are finished off once rotation cannot fit the remainder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapFillPolicy {
    /// Leftover seconds that still count as a filled gap
    pub tolerance_seconds: u32,

    /// Categories tried in order for leftover time
    pub filler_categories: Vec<RotationCategory>,
}

impl Default for GapFillPolicy {
    fn default() -> Self {
        Self {
            tolerance_seconds: 5,
            filler_categories: DEFAULT_FILLER_CATEGORIES.to_vec(),
        }
    }
}

// ============================================================================
// Rotation Config
// ============================================================================

/// Effective rotation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Category tokens in rotation order; repeats allowed
    pub order: Vec<RotationCategory>,

    /// Replay delay per category token
    pub replay_delays: BTreeMap<RotationCategory, ReplayDelay>,

    pub featured: FeaturedPolicy,

    pub meeting_relevance: MeetingRelevance,

    pub gap_fill: GapFillPolicy,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            order: DEFAULT_ROTATION_ORDER.to_vec(),
            replay_delays: default_replay_delays(),
            featured: FeaturedPolicy::default(),
            meeting_relevance: MeetingRelevance::default(),
            gap_fill: GapFillPolicy::default(),
        }
    }
}

impl RotationConfig {
    /// Replay delay for an asset
    ///
    /// A content-specific entry (e.g. `pkg`) wins over the asset's duration
    /// category entry.
    pub fn replay_delay_for(&self, asset: &Asset) -> ReplayDelay {
        let specific = content_token(asset.content_type).and_then(|t| self.replay_delays.get(&t));
        let general = general_token(asset).and_then(|t| self.replay_delays.get(&t));

        specific
            .or(general)
            .copied()
            .unwrap_or_else(|| default_delay_for(general_token(asset)))
    }

    /// Build from a parsed document, collecting warnings for rejected keys
    pub fn from_table(table: &toml::Table) -> (Self, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();
        let overlay = RotationOverlay::from_table(table, &mut warnings);
        let config = Self::default().merge(overlay, &mut warnings);
        (config, warnings)
    }

    /// Apply an overlay over this configuration, key by key
    pub fn merge(mut self, overlay: RotationOverlay, warnings: &mut Vec<ConfigWarning>) -> Self {
        if let Some(tokens) = overlay.order {
            match parse_tokens(&tokens) {
                Ok(order) if !order.is_empty() => self.order = order,
                Ok(_) => warn_key(warnings, "rotation.order", "order is empty"),
                Err(bad) => warn_key(warnings, "rotation.order", format!("unknown category '{bad}'")),
            }
        }

        for (token, delay) in overlay.replay_delays {
            let key = format!("replay_delays.{token}");
            let category = match RotationCategory::from_id(&token) {
                Ok(c) => c,
                Err(_) => {
                    warn_key(warnings, &key, format!("unknown category '{token}'"));
                    continue;
                }
            };

            let mut entry = self
                .replay_delays
                .get(&category)
                .copied()
                .unwrap_or_else(|| self.inherited_delay(category));

            if let Some(hours) = delay.base_delay_hours {
                if is_non_negative(hours) {
                    entry.base_delay_hours = hours;
                } else {
                    warn_key(warnings, format!("{key}.base_delay_hours"), "must be >= 0");
                }
            }
            if let Some(hours) = delay.per_airing_increment_hours {
                if is_non_negative(hours) {
                    entry.per_airing_increment_hours = hours;
                } else {
                    warn_key(
                        warnings,
                        format!("{key}.per_airing_increment_hours"),
                        "must be >= 0",
                    );
                }
            }
            self.replay_delays.insert(category, entry);
        }

        self.featured = merge_featured(self.featured, overlay.featured, warnings);
        self.meeting_relevance =
            merge_relevance(self.meeting_relevance, overlay.meeting_relevance, warnings);

        if let Some(tolerance) = overlay.gap_fill.tolerance_seconds {
            self.gap_fill.tolerance_seconds = tolerance;
        }
        if let Some(tokens) = overlay.gap_fill.filler_categories {
            match parse_tokens(&tokens) {
                Ok(categories) => self.gap_fill.filler_categories = categories,
                Err(bad) => warn_key(
                    warnings,
                    "gap_fill.filler_categories",
                    format!("unknown category '{bad}'"),
                ),
            }
        }

        self
    }

    /// Delay a content-specific token starts from before its own keys apply
    fn inherited_delay(&self, category: RotationCategory) -> ReplayDelay {
        let parent = category.parent().unwrap_or(category);
        self.replay_delays
            .get(&parent)
            .copied()
            .unwrap_or_else(|| default_delay_for(Some(parent)))
    }
}

fn content_token(content_type: ContentType) -> Option<RotationCategory> {
    RotationCategory::all()
        .into_iter()
        .find(|c| c.content_type() == Some(content_type))
}

fn general_token(asset: &Asset) -> Option<RotationCategory> {
    let duration = asset.duration_category();
    RotationCategory::all()
        .into_iter()
        .find(|c| c.duration_category() == Some(duration))
}

fn default_delay_for(category: Option<RotationCategory>) -> ReplayDelay {
    let defaults = default_replay_delays();
    category
        .and_then(|c| defaults.get(&c).copied())
        .unwrap_or(ReplayDelay::new(24.0, 6.0))
}

fn merge_featured(
    mut policy: FeaturedPolicy,
    overlay: FeaturedOverlay,
    warnings: &mut Vec<ConfigWarning>,
) -> FeaturedPolicy {
    if let Some(hours) = overlay.minimum_spacing_hours {
        if is_non_negative(hours) {
            policy.minimum_spacing_hours = hours;
        } else {
            warn_key(warnings, "featured.minimum_spacing_hours", "must be >= 0");
        }
    }

    let start = overlay.daytime_start_hour.filter(|&hour| {
        let ok = hour <= 24;
        if !ok {
            warn_key(warnings, "featured.daytime_start_hour", "must be within 0..=24");
        }
        ok
    });
    let end = overlay.daytime_end_hour.filter(|&hour| {
        let ok = hour <= 24;
        if !ok {
            warn_key(warnings, "featured.daytime_end_hour", "must be within 0..=24");
        }
        ok
    });
    [policy.daytime_start_hour, policy.daytime_end_hour] = revert_conflicting(
        ["featured.daytime_start_hour", "featured.daytime_end_hour"],
        [policy.daytime_start_hour, policy.daytime_end_hour],
        [start, end],
        |[start, end]| start < end,
        "daytime window must start before it ends",
        warnings,
    );

    if let Some(p) = overlay.daytime_probability {
        if (0.0..=1.0).contains(&p) {
            policy.daytime_probability = p;
        } else {
            warn_key(warnings, "featured.daytime_probability", "must be within [0, 1]");
        }
    }

    if let Some(factor) = overlay.replay_delay_factor {
        if (0.0..=1.0).contains(&factor) {
            policy.replay_delay_factor = factor;
        } else {
            warn_key(warnings, "featured.replay_delay_factor", "must be within [0, 1]");
        }
    }

    policy
}

fn merge_relevance(
    relevance: MeetingRelevance,
    overlay: MeetingRelevanceOverlay,
    warnings: &mut Vec<ConfigWarning>,
) -> MeetingRelevance {
    let [fresh_days, relevant_days, archive_days] = revert_conflicting(
        [
            "meeting_relevance.fresh_days",
            "meeting_relevance.relevant_days",
            "meeting_relevance.archive_days",
        ],
        [
            relevance.fresh_days,
            relevance.relevant_days,
            relevance.archive_days,
        ],
        [overlay.fresh_days, overlay.relevant_days, overlay.archive_days],
        |[fresh, relevant, archive]| fresh < relevant && relevant < archive,
        "tiers must satisfy fresh_days < relevant_days < archive_days",
        warnings,
    );

    MeetingRelevance {
        fresh_days,
        relevant_days,
        archive_days,
    }
}

/// Apply user values for keys that must agree with each other
///
/// When the combination breaks `valid`, the fewest user keys are put back to
/// their current values (earlier keys first) and each reverted key gets its
/// own warning. Keys the user left out are never warned about.
fn revert_conflicting<const N: usize>(
    keys: [&str; N],
    current: [u32; N],
    user: [Option<u32>; N],
    valid: impl Fn([u32; N]) -> bool,
    reason: &str,
    warnings: &mut Vec<ConfigWarning>,
) -> [u32; N] {
    let given: u32 = (0..N)
        .filter(|&i| user[i].is_some())
        .fold(0, |mask, i| mask | (1u32 << i));

    // Masks of reverted keys, fewest reverted first
    let mut masks: Vec<u32> = (0..(1u32 << N)).filter(|m| m & !given == 0).collect();
    masks.sort_by_key(|m| m.count_ones());

    for mask in masks {
        let mut values = current;
        for i in 0..N {
            if mask & (1u32 << i) == 0 {
                if let Some(value) = user[i] {
                    values[i] = value;
                }
            }
        }
        if valid(values) {
            for (i, key) in keys.iter().enumerate() {
                if mask & (1u32 << i) != 0 {
                    warn_key(warnings, *key, reason);
                }
            }
            return values;
        }
    }

    current
}

fn parse_tokens(tokens: &[String]) -> Result<Vec<RotationCategory>, String> {
    tokens
        .iter()
        .map(|t| RotationCategory::from_id(t).map_err(|_| t.clone()))
        .collect()
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

// ============================================================================
// Overlay
// ============================================================================

/// A key that was present but rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// Dotted key path
    pub key: String,

    /// Why it was rejected
    pub reason: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.reason)
    }
}

pub(crate) fn warn_key(
    warnings: &mut Vec<ConfigWarning>,
    key: impl Into<String>,
    reason: impl Into<String>,
) {
    let warning = ConfigWarning {
        key: key.into(),
        reason: reason.into(),
    };
    tracing::warn!(key = %warning.key, reason = %warning.reason, "Invalid configuration value, using default");
    warnings.push(warning);
}

/// Look up a sub-table; a non-table value is rejected
pub(crate) fn section<'a>(
    table: &'a toml::Table,
    name: &str,
    warnings: &mut Vec<ConfigWarning>,
) -> Option<&'a toml::Table> {
    match table.get(name) {
        None => None,
        Some(toml::Value::Table(t)) => Some(t),
        Some(_) => {
            warn_key(warnings, name, "expected a table");
            None
        }
    }
}

/// Deserialize one key; a value of the wrong shape is rejected
pub(crate) fn value<T: DeserializeOwned>(
    table: Option<&toml::Table>,
    path: &str,
    key: &str,
    warnings: &mut Vec<ConfigWarning>,
) -> Option<T> {
    let raw = table?.get(key)?;
    match raw.clone().try_into::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            warn_key(warnings, format!("{path}.{key}"), e.to_string().trim().to_string());
            None
        }
    }
}

/// Replay delay keys as found in a document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayDelayOverlay {
    pub base_delay_hours: Option<f64>,
    pub per_airing_increment_hours: Option<f64>,
}

/// Featured keys as found in a document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeaturedOverlay {
    pub minimum_spacing_hours: Option<f64>,
    pub daytime_start_hour: Option<u32>,
    pub daytime_end_hour: Option<u32>,
    pub daytime_probability: Option<f64>,
    pub replay_delay_factor: Option<f64>,
}

/// Meeting relevance keys as found in a document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeetingRelevanceOverlay {
    pub fresh_days: Option<u32>,
    pub relevant_days: Option<u32>,
    pub archive_days: Option<u32>,
}

/// Gap fill keys as found in a document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GapFillOverlay {
    pub tolerance_seconds: Option<u32>,
    pub filler_categories: Option<Vec<String>>,
}

/// Every rotation key a document may set, all optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RotationOverlay {
    pub order: Option<Vec<String>>,
    #[serde(default)]
    pub replay_delays: BTreeMap<String, ReplayDelayOverlay>,
    #[serde(default)]
    pub featured: FeaturedOverlay,
    #[serde(default)]
    pub meeting_relevance: MeetingRelevanceOverlay,
    #[serde(default)]
    pub gap_fill: GapFillOverlay,
}

impl RotationOverlay {
    /// Extract keys one at a time so a bad key only loses itself
    pub fn from_table(table: &toml::Table, warnings: &mut Vec<ConfigWarning>) -> Self {
        let rotation = section(table, "rotation", warnings);

        let mut replay_delays = BTreeMap::new();
        if let Some(delays) = section(table, "replay_delays", warnings) {
            for (token, entry) in delays {
                let path = format!("replay_delays.{token}");
                let Some(entry) = entry.as_table() else {
                    warn_key(warnings, &path, "expected a table");
                    continue;
                };
                replay_delays.insert(
                    token.clone(),
                    ReplayDelayOverlay {
                        base_delay_hours: value(Some(entry), &path, "base_delay_hours", warnings),
                        per_airing_increment_hours: value(
                            Some(entry),
                            &path,
                            "per_airing_increment_hours",
                            warnings,
                        ),
                    },
                );
            }
        }

        let featured = section(table, "featured", warnings);
        let relevance = section(table, "meeting_relevance", warnings);
        let gap_fill = section(table, "gap_fill", warnings);

        Self {
            order: value(rotation, "rotation", "order", warnings),
            replay_delays,
            featured: FeaturedOverlay {
                minimum_spacing_hours: value(featured, "featured", "minimum_spacing_hours", warnings),
                daytime_start_hour: value(featured, "featured", "daytime_start_hour", warnings),
                daytime_end_hour: value(featured, "featured", "daytime_end_hour", warnings),
                daytime_probability: value(featured, "featured", "daytime_probability", warnings),
                replay_delay_factor: value(featured, "featured", "replay_delay_factor", warnings),
            },
            meeting_relevance: MeetingRelevanceOverlay {
                fresh_days: value(relevance, "meeting_relevance", "fresh_days", warnings),
                relevant_days: value(relevance, "meeting_relevance", "relevant_days", warnings),
                archive_days: value(relevance, "meeting_relevance", "archive_days", warnings),
            },
            gap_fill: GapFillOverlay {
                tolerance_seconds: value(gap_fill, "gap_fill", "tolerance_seconds", warnings),
                filler_categories: value(gap_fill, "gap_fill", "filler_categories", warnings),
            },
        }
    }
}
