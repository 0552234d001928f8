// Core data structures for the airtime rotation engine

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::scheduler::rotation::RotationCategory;

// ============================================================================
// Content Type
// ============================================================================

/// Editorial content type code attached to every asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Public meeting coverage
    #[serde(rename = "mtg")]
    Meeting,
    /// Produced news package
    #[serde(rename = "pkg")]
    Package,
    /// Public service announcement
    Psa,
    /// Station promo
    Promo,
    /// Short interstitial bump
    Bump,
    /// Any code the ingestion pipeline emits that the core does not special-case
    #[serde(other)]
    Other,
}

impl ContentType {
    /// Get the short code used in storage and configuration
    pub fn code(&self) -> &'static str {
        match self {
            Self::Meeting => "mtg",
            Self::Package => "pkg",
            Self::Psa => "psa",
            Self::Promo => "promo",
            Self::Bump => "bump",
            Self::Other => "other",
        }
    }

    /// Parse from a stored code; unknown codes map to `Other`
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "mtg" | "meeting" => Self::Meeting,
            "pkg" | "package" => Self::Package,
            "psa" => Self::Psa,
            "promo" => Self::Promo,
            "bump" => Self::Bump,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Duration Category
// ============================================================================

/// Coarse bucket derived from an asset's running time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationCategory {
    /// Station IDs, under 16 seconds
    Id,
    /// Spots and PSAs, under two minutes
    Spots,
    /// Short-form programming, under twenty minutes
    ShortForm,
    /// Everything longer
    LongForm,
}

impl DurationCategory {
    /// Upper bound (exclusive) for `id`
    pub const ID_MAX_SECS: u32 = 16;
    /// Upper bound (exclusive) for `spots`
    pub const SPOTS_MAX_SECS: u32 = 120;
    /// Upper bound (exclusive) for `short_form`
    pub const SHORT_FORM_MAX_SECS: u32 = 1200;

    /// Derive the category from a duration in seconds
    pub fn from_duration(duration_secs: u32) -> Self {
        if duration_secs < Self::ID_MAX_SECS {
            Self::Id
        } else if duration_secs < Self::SPOTS_MAX_SECS {
            Self::Spots
        } else if duration_secs < Self::SHORT_FORM_MAX_SECS {
            Self::ShortForm
        } else {
            Self::LongForm
        }
    }

    /// Get the configuration token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Spots => "spots",
            Self::ShortForm => "short_form",
            Self::LongForm => "long_form",
        }
    }

    /// Get all categories, shortest first
    pub fn all() -> Vec<Self> {
        vec![Self::Id, Self::Spots, Self::ShortForm, Self::LongForm]
    }
}

impl fmt::Display for DurationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Timeslot Bucket
// ============================================================================

/// Quarter-day bucket used for per-timeslot replay counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeslotBucket {
    /// 00:00 - 05:59
    Overnight,
    /// 06:00 - 11:59
    Morning,
    /// 12:00 - 17:59
    Afternoon,
    /// 18:00 - 23:59
    Evening,
}

impl TimeslotBucket {
    /// Bucket containing the given wall-clock time
    pub fn from_time(at: NaiveDateTime) -> Self {
        match at.hour() {
            0..=5 => Self::Overnight,
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            _ => Self::Evening,
        }
    }

    /// Get storage key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overnight => "overnight",
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        }
    }

    /// Parse from storage key
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "overnight" => Some(Self::Overnight),
            "morning" => Some(Self::Morning),
            "afternoon" => Some(Self::Afternoon),
            "evening" => Some(Self::Evening),
            _ => None,
        }
    }
}

// ============================================================================
// Asset and Scheduling Metadata
// ============================================================================

/// A content item as supplied by the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Stable identifier
    pub id: String,

    /// Human-readable title
    #[serde(default)]
    pub title: String,

    /// Content type code
    pub content_type: ContentType,

    /// Running time in seconds
    pub duration_secs: u32,

    /// Editorial theme (used for adjacency diversity)
    #[serde(default)]
    pub theme: Option<String>,

    /// Audience engagement score from analytics
    #[serde(default)]
    pub engagement_score: Option<f64>,

    /// Last date the asset may air
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,

    /// First date the asset may air
    #[serde(default)]
    pub go_live_date: Option<NaiveDate>,

    /// Date the content was recorded (meeting date for relevance decay)
    #[serde(default)]
    pub recorded_on: Option<NaiveDate>,
}

impl Asset {
    /// Create an asset with the required fields only
    pub fn new(id: impl Into<String>, content_type: ContentType, duration_secs: u32) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            content_type,
            duration_secs,
            theme: None,
            engagement_score: None,
            expiry_date: None,
            go_live_date: None,
            recorded_on: None,
        }
    }

    /// Set theme
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    /// Set recording date
    pub fn with_recorded_on(mut self, date: NaiveDate) -> Self {
        self.recorded_on = Some(date);
        self
    }

    /// Derived duration category
    pub fn duration_category(&self) -> DurationCategory {
        DurationCategory::from_duration(self.duration_secs)
    }
}

/// Scheduling state kept alongside each asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingMetadata {
    /// Operator switch for rotation eligibility
    pub available_for_scheduling: bool,

    /// Contractual end of airing rights
    #[serde(default)]
    pub content_expiry_date: Option<NaiveDate>,

    /// Most recent placement anywhere in the schedule
    #[serde(default)]
    pub last_scheduled_at: Option<NaiveDateTime>,

    /// Most recent placement per timeslot bucket
    #[serde(default)]
    pub timeslot_last_scheduled: HashMap<TimeslotBucket, NaiveDateTime>,

    /// Lifetime airing count
    #[serde(default)]
    pub total_airings: u32,

    /// Airing count per timeslot bucket
    #[serde(default)]
    pub timeslot_airings: HashMap<TimeslotBucket, u32>,

    /// Editorially featured (breaking news, campaigns)
    #[serde(default)]
    pub featured: bool,

    /// Editorial priority, used as a tie-breaker
    #[serde(default)]
    pub priority_score: f64,
}

impl Default for SchedulingMetadata {
    fn default() -> Self {
        Self {
            available_for_scheduling: true,
            content_expiry_date: None,
            last_scheduled_at: None,
            timeslot_last_scheduled: HashMap::new(),
            total_airings: 0,
            timeslot_airings: HashMap::new(),
            featured: false,
            priority_score: 0.0,
        }
    }
}

impl SchedulingMetadata {
    /// Apply one placement to the counters
    ///
    /// `last_scheduled_at` only moves forward so that filling an earlier gap
    /// after a later one never rewinds it.
    pub fn apply_placement(&mut self, placed_at: NaiveDateTime) {
        let bucket = TimeslotBucket::from_time(placed_at);

        self.last_scheduled_at = Some(match self.last_scheduled_at {
            Some(prev) if prev > placed_at => prev,
            _ => placed_at,
        });
        self.total_airings += 1;

        *self.timeslot_airings.entry(bucket).or_insert(0) += 1;
        let slot_last = self.timeslot_last_scheduled.entry(bucket).or_insert(placed_at);
        if *slot_last < placed_at {
            *slot_last = placed_at;
        }
    }
}

/// An asset together with its scheduling metadata, as returned by a repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub asset: Asset,
    pub metadata: SchedulingMetadata,
}

impl Candidate {
    /// Create a candidate with default metadata
    pub fn new(asset: Asset) -> Self {
        Self {
            asset,
            metadata: SchedulingMetadata::default(),
        }
    }

    /// Set featured flag
    pub fn featured(mut self, featured: bool) -> Self {
        self.metadata.featured = featured;
        self
    }

    /// Set last placement and airing count
    pub fn with_history(mut self, last_scheduled_at: NaiveDateTime, total_airings: u32) -> Self {
        self.metadata.last_scheduled_at = Some(last_scheduled_at);
        self.metadata.total_airings = total_airings;
        self
    }

    /// Asset identifier
    pub fn id(&self) -> &str {
        &self.asset.id
    }

    /// Check if airing rights have lapsed on a date
    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        let asset_expired = self.asset.expiry_date.is_some_and(|d| d < date);
        let rights_expired = self.metadata.content_expiry_date.is_some_and(|d| d < date);
        asset_expired || rights_expired
    }

    /// Check if the asset has gone live by a date
    pub fn is_live_on(&self, date: NaiveDate) -> bool {
        self.asset.go_live_date.map_or(true, |d| d <= date)
    }

    /// Eligibility filter shared by every repository implementation
    pub fn is_eligible(&self, category: RotationCategory, context: &SlotContext) -> bool {
        let date = context.start.date();

        self.metadata.available_for_scheduling
            && !self.is_expired_on(date)
            && self.is_live_on(date)
            && category.matches(&self.asset)
            && self.asset.duration_secs <= context.available_secs
            && !context.excluded_ids.iter().any(|id| id == &self.asset.id)
    }
}

// ============================================================================
// Slot Context
// ============================================================================

/// What a repository needs to know to filter candidates for one slot
#[derive(Debug, Clone)]
pub struct SlotContext {
    /// Target start time of the slot
    pub start: NaiveDateTime,

    /// Seconds still free in the enclosing gap
    pub available_secs: u32,

    /// Assets that must not be returned (already used in the run)
    pub excluded_ids: Vec<String>,
}

// ============================================================================
// Schedule Gaps and Items
// ============================================================================

/// A compact record of something already on the schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedItem {
    pub asset_id: String,
    pub category: DurationCategory,
    pub content_type: ContentType,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub featured: bool,
    pub start: NaiveDateTime,
}

/// A contiguous unfilled window in a schedule or template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleGap {
    /// Optional operator label (template block name)
    #[serde(default)]
    pub label: Option<String>,

    /// Gap start
    pub start: NaiveDateTime,

    /// Free seconds
    pub duration_secs: u32,

    /// Items immediately before the gap, for theme lookback
    #[serde(default)]
    pub preceding: Vec<PlacedItem>,
}

impl ScheduleGap {
    /// Create a gap with no lookback
    pub fn new(start: NaiveDateTime, duration_secs: u32) -> Self {
        Self {
            label: None,
            start,
            duration_secs,
            preceding: Vec::new(),
        }
    }

    /// Read a JSON array of gaps from a file
    pub fn load_file(path: impl AsRef<Path>) -> crate::error::Result<Vec<Self>> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Set label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a preceding item
    pub fn with_preceding(mut self, item: PlacedItem) -> Self {
        self.preceding.push(item);
        self
    }

    /// Gap end
    pub fn end(&self) -> NaiveDateTime {
        self.start + chrono::Duration::seconds(i64::from(self.duration_secs))
    }
}

/// How a placement relates to the rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementKind {
    /// Filled the category rotation asked for; rotation advanced
    Rotation,
    /// Filled from the parent category; rotation did not move
    Fallback,
    /// Filled leftover time outside the rotation; rotation did not move
    Filler,
}

/// A scheduling policy that was knowingly relaxed for a placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyRelaxation {
    /// Placed inside its minimum replay delay
    ReplayDelay {
        threshold_hours: f64,
        elapsed_hours: f64,
    },
    /// Package placed with the theme of an earlier package and no long-form between
    PackageTheme { theme: String },
}

/// The output unit of the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledItem {
    /// 1-based position within the run
    pub sequence: u32,
    pub asset_id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub duration_secs: u32,
    pub content_type: ContentType,
    pub duration_category: DurationCategory,
    #[serde(default)]
    pub theme: Option<String>,
    /// Category the rotation asked for
    pub requested_category: RotationCategory,
    /// Category the asset was found under
    pub placed_category: RotationCategory,
    pub kind: PlacementKind,
    pub score: f64,
    /// Counted as a featured placement (boosted and spacing-gated)
    pub featured: bool,
    #[serde(default)]
    pub relaxations: Vec<PolicyRelaxation>,
}

impl ScheduledItem {
    /// Scheduled end
    pub fn end(&self) -> NaiveDateTime {
        self.start + chrono::Duration::seconds(i64::from(self.duration_secs))
    }

    /// Lookback view of this item
    pub fn as_placed(&self) -> PlacedItem {
        PlacedItem {
            asset_id: self.asset_id.clone(),
            category: self.duration_category,
            content_type: self.content_type,
            theme: self.theme.clone(),
            featured: self.featured,
            start: self.start,
        }
    }
}
