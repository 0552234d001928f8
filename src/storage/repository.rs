//! Repository Pattern for the asset catalog
//!
//! The scheduling core only talks to storage through two narrow traits:
//! - [`CandidateRepository`]: eligible assets for a category and slot
//! - [`UsageRecorder`]: persists each placement, idempotent on retry
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Selection Engine                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │        CandidateRepository + UsageRecorder                  │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                         │
//!                    ▼                         ▼
//!          ┌─────────────────┐       ┌─────────────────┐
//!          │     SQLite      │       │    In-memory    │
//!          │  SqliteCatalog  │       │ InMemoryCatalog │
//!          └─────────────────┘       └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use airtime::storage::{CatalogStore, SqliteCatalog, InMemoryCatalog};
//!
//! // Production: use SQLite
//! let catalog = SqliteCatalog::new("data/airtime.db")?;
//!
//! // Testing: use the in-memory catalog
//! let catalog = InMemoryCatalog::new();
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;

use super::error::{StorageError, StorageResult};
use crate::models::{Asset, Candidate, ContentType, SchedulingMetadata, SlotContext, TimeslotBucket};
use crate::scheduler::rotation::RotationCategory;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ============================================================================
// Repository Traits
// ============================================================================

/// Source of candidates for one slot
pub trait CandidateRepository: Send + Sync {
    /// Assets that are available, unexpired, live, in the category, fit the
    /// free duration and are not excluded
    ///
    /// Results are ordered by asset id.
    fn find_eligible(
        &self,
        category: RotationCategory,
        context: &SlotContext,
    ) -> StorageResult<Vec<Candidate>>;
}

/// Sink for placement decisions
pub trait UsageRecorder: Send + Sync {
    /// Persist one placement
    ///
    /// Recording the same `(asset_id, placed_at)` twice updates the counters
    /// once.
    fn record(
        &self,
        asset_id: &str,
        placed_at: NaiveDateTime,
        category: RotationCategory,
    ) -> StorageResult<()>;
}

/// A catalog that can also be loaded and inspected
pub trait CatalogStore: CandidateRepository + UsageRecorder {
    /// Insert or update an asset
    ///
    /// Editorial metadata (availability, rights expiry, featured, priority) is
    /// overwritten; airing history of an existing asset is kept.
    fn upsert(&self, candidate: &Candidate) -> StorageResult<()>;

    /// Get one asset with its metadata
    fn get(&self, id: &str) -> StorageResult<Option<Candidate>>;

    /// Number of assets in the catalog
    fn count(&self) -> StorageResult<usize>;

    /// Insert or update many assets
    fn import(&self, candidates: &[Candidate]) -> StorageResult<usize> {
        for candidate in candidates {
            self.upsert(candidate)?;
        }
        Ok(candidates.len())
    }
}

// ============================================================================
// Import Format
// ============================================================================

/// One entry of a JSON catalog file
///
/// Asset fields sit at the top level; scheduling metadata is optional.
#[derive(Debug, Deserialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub asset: Asset,

    #[serde(default)]
    pub scheduling: Option<SchedulingMetadata>,
}

impl From<CatalogEntry> for Candidate {
    fn from(entry: CatalogEntry) -> Self {
        Candidate {
            asset: entry.asset,
            metadata: entry.scheduling.unwrap_or_default(),
        }
    }
}

/// Parse a JSON array of catalog entries
pub fn parse_catalog(json: &str) -> StorageResult<Vec<Candidate>> {
    let entries: Vec<CatalogEntry> =
        serde_json::from_str(json).map_err(|e| StorageError::Import(e.to_string()))?;
    Ok(entries.into_iter().map(Candidate::from).collect())
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of the catalog
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

/// Raw row before date parsing
struct CandidateRow {
    id: String,
    title: String,
    content_type: String,
    duration_secs: u32,
    theme: Option<String>,
    engagement_score: Option<f64>,
    expiry_date: Option<String>,
    go_live_date: Option<String>,
    recorded_on: Option<String>,
    available: bool,
    content_expiry_date: Option<String>,
    last_scheduled_at: Option<String>,
    total_airings: u32,
    featured: bool,
    priority_score: f64,
}

const SELECT_CANDIDATE: &str = r#"
    SELECT a.id, a.title, a.content_type, a.duration_secs, a.theme,
           a.engagement_score, a.expiry_date, a.go_live_date, a.recorded_on,
           m.available_for_scheduling, m.content_expiry_date, m.last_scheduled_at,
           m.total_airings, m.featured, m.priority_score
    FROM assets a
    JOIN scheduling_metadata m ON m.asset_id = a.id
"#;

impl SqliteCatalog {
    /// Open (or create) a catalog database
    pub fn new(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::unavailable(format!("{}: {e}", parent.display())))?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let catalog = Self {
            conn: Mutex::new(conn),
        };
        catalog.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite catalog initialized");
        Ok(catalog)
    }

    /// Create in-memory catalog (for testing)
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let catalog = Self {
            conn: Mutex::new(conn),
        };
        catalog.create_schema()?;
        Ok(catalog)
    }

    /// Create database schema
    fn create_schema(&self) -> StorageResult<()> {
        let conn = self.conn.lock()?;
        conn.execute_batch(
            r#"
                PRAGMA foreign_keys = ON;

                CREATE TABLE IF NOT EXISTS assets (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    content_type TEXT NOT NULL,
                    duration_secs INTEGER NOT NULL,
                    theme TEXT,
                    engagement_score REAL,
                    expiry_date TEXT,
                    go_live_date TEXT,
                    recorded_on TEXT
                );

                CREATE TABLE IF NOT EXISTS scheduling_metadata (
                    asset_id TEXT PRIMARY KEY REFERENCES assets(id) ON DELETE CASCADE,
                    available_for_scheduling INTEGER NOT NULL DEFAULT 1,
                    content_expiry_date TEXT,
                    last_scheduled_at TEXT,
                    total_airings INTEGER NOT NULL DEFAULT 0,
                    featured INTEGER NOT NULL DEFAULT 0,
                    priority_score REAL NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS timeslot_usage (
                    asset_id TEXT NOT NULL REFERENCES assets(id) ON DELETE CASCADE,
                    bucket TEXT NOT NULL,
                    airings INTEGER NOT NULL DEFAULT 0,
                    last_scheduled_at TEXT,
                    PRIMARY KEY (asset_id, bucket)
                );

                CREATE TABLE IF NOT EXISTS placements (
                    asset_id TEXT NOT NULL REFERENCES assets(id) ON DELETE CASCADE,
                    placed_at TEXT NOT NULL,
                    category TEXT NOT NULL,
                    recorded_at TEXT NOT NULL,
                    PRIMARY KEY (asset_id, placed_at)
                );

                CREATE INDEX IF NOT EXISTS idx_assets_content_type
                    ON assets(content_type);

                CREATE INDEX IF NOT EXISTS idx_assets_duration
                    ON assets(duration_secs);
                "#,
        )?;

        Ok(())
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CandidateRow> {
        Ok(CandidateRow {
            id: row.get(0)?,
            title: row.get(1)?,
            content_type: row.get(2)?,
            duration_secs: row.get(3)?,
            theme: row.get(4)?,
            engagement_score: row.get(5)?,
            expiry_date: row.get(6)?,
            go_live_date: row.get(7)?,
            recorded_on: row.get(8)?,
            available: row.get(9)?,
            content_expiry_date: row.get(10)?,
            last_scheduled_at: row.get(11)?,
            total_airings: row.get(12)?,
            featured: row.get(13)?,
            priority_score: row.get(14)?,
        })
    }

    /// Decode a row and attach its timeslot counters
    fn hydrate(conn: &Connection, row: CandidateRow) -> StorageResult<Candidate> {
        let id = row.id;
        let asset = Asset {
            title: row.title,
            content_type: ContentType::from_code(&row.content_type),
            duration_secs: row.duration_secs,
            theme: row.theme,
            engagement_score: row.engagement_score,
            expiry_date: parse_date(&id, "expiry_date", row.expiry_date)?,
            go_live_date: parse_date(&id, "go_live_date", row.go_live_date)?,
            recorded_on: parse_date(&id, "recorded_on", row.recorded_on)?,
            id: id.clone(),
        };

        let mut metadata = SchedulingMetadata {
            available_for_scheduling: row.available,
            content_expiry_date: parse_date(&id, "content_expiry_date", row.content_expiry_date)?,
            last_scheduled_at: parse_datetime(&id, "last_scheduled_at", row.last_scheduled_at)?,
            total_airings: row.total_airings,
            featured: row.featured,
            priority_score: row.priority_score,
            ..SchedulingMetadata::default()
        };

        let mut stmt = conn.prepare_cached(
            "SELECT bucket, airings, last_scheduled_at FROM timeslot_usage WHERE asset_id = ?1",
        )?;
        let usage = stmt
            .query_map(params![id], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, u32>(1)?,
                    r.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (bucket, airings, last) in usage {
            let bucket = TimeslotBucket::parse(&bucket)
                .ok_or_else(|| StorageError::corrupt(&id, "bucket", &bucket))?;
            metadata.timeslot_airings.insert(bucket, airings);
            if let Some(at) = parse_datetime(&id, "timeslot_last_scheduled", last)? {
                metadata.timeslot_last_scheduled.insert(bucket, at);
            }
        }

        Ok(Candidate { asset, metadata })
    }
}

fn parse_date(id: &str, field: &'static str, value: Option<String>) -> StorageResult<Option<NaiveDate>> {
    value
        .map(|v| NaiveDate::parse_from_str(&v, DATE_FORMAT).map_err(|_| StorageError::corrupt(id, field, v)))
        .transpose()
}

fn parse_datetime(
    id: &str,
    field: &'static str,
    value: Option<String>,
) -> StorageResult<Option<NaiveDateTime>> {
    value
        .map(|v| {
            NaiveDateTime::parse_from_str(&v, DATETIME_FORMAT)
                .map_err(|_| StorageError::corrupt(id, field, v))
        })
        .transpose()
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn format_datetime(at: NaiveDateTime) -> String {
    at.format(DATETIME_FORMAT).to_string()
}

impl CandidateRepository for SqliteCatalog {
    fn find_eligible(
        &self,
        category: RotationCategory,
        context: &SlotContext,
    ) -> StorageResult<Vec<Candidate>> {
        let conn = self.conn.lock()?;
        let today = context.start.date().format(DATE_FORMAT).to_string();

        // Coarse filter in SQL; the shared eligibility check decides
        let query = format!(
            "{SELECT_CANDIDATE}
             WHERE m.available_for_scheduling = 1
               AND a.duration_secs <= ?1
               AND (a.expiry_date IS NULL OR a.expiry_date >= ?2)
               AND (m.content_expiry_date IS NULL OR m.content_expiry_date >= ?2)
               AND (a.go_live_date IS NULL OR a.go_live_date <= ?2)
             ORDER BY a.id"
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(params![context.available_secs, today], Self::read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut candidates = Vec::new();
        for row in rows {
            let candidate = Self::hydrate(&conn, row)?;
            if candidate.is_eligible(category, context) {
                candidates.push(candidate);
            }
        }

        tracing::trace!(
            category = %category,
            count = candidates.len(),
            "SQLite candidates loaded"
        );
        Ok(candidates)
    }
}

impl UsageRecorder for SqliteCatalog {
    fn record(
        &self,
        asset_id: &str,
        placed_at: NaiveDateTime,
        category: RotationCategory,
    ) -> StorageResult<()> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;

        let known: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM assets WHERE id = ?1)",
            params![asset_id],
            |row| row.get(0),
        )?;
        if !known {
            return Err(StorageError::UnknownAsset {
                id: asset_id.to_string(),
            });
        }

        let placed = format_datetime(placed_at);
        let inserted = tx.execute(
            r#"
                INSERT OR IGNORE INTO placements (asset_id, placed_at, category, recorded_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            params![asset_id, placed, category.id(), Utc::now().to_rfc3339()],
        )?;

        if inserted == 0 {
            tracing::debug!(asset_id, placed_at = %placed, "Placement already recorded");
            return Ok(());
        }

        tx.execute(
            r#"
                UPDATE scheduling_metadata SET
                    total_airings = total_airings + 1,
                    last_scheduled_at = CASE
                        WHEN last_scheduled_at IS NULL OR last_scheduled_at < ?2 THEN ?2
                        ELSE last_scheduled_at
                    END
                WHERE asset_id = ?1
                "#,
            params![asset_id, placed],
        )?;

        tx.execute(
            r#"
                INSERT INTO timeslot_usage (asset_id, bucket, airings, last_scheduled_at)
                VALUES (?1, ?2, 1, ?3)
                ON CONFLICT(asset_id, bucket) DO UPDATE SET
                    airings = airings + 1,
                    last_scheduled_at = MAX(COALESCE(last_scheduled_at, ''), excluded.last_scheduled_at)
                "#,
            params![asset_id, TimeslotBucket::from_time(placed_at).as_str(), placed],
        )?;

        tx.commit()?;
        Ok(())
    }
}

impl CatalogStore for SqliteCatalog {
    fn upsert(&self, candidate: &Candidate) -> StorageResult<()> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        upsert_in(&tx, candidate)?;
        tx.commit()?;
        Ok(())
    }

    fn get(&self, id: &str) -> StorageResult<Option<Candidate>> {
        let conn = self.conn.lock()?;
        let query = format!("{SELECT_CANDIDATE} WHERE a.id = ?1");
        let row = conn
            .query_row(&query, params![id], Self::read_row)
            .optional()?;

        row.map(|r| Self::hydrate(&conn, r)).transpose()
    }

    fn count(&self) -> StorageResult<usize> {
        let conn = self.conn.lock()?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM assets", [], |row| row.get(0))?;
        Ok(total as usize)
    }

    fn import(&self, candidates: &[Candidate]) -> StorageResult<usize> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        for candidate in candidates {
            upsert_in(&tx, candidate)?;
        }
        tx.commit()?;

        tracing::info!(count = candidates.len(), "Catalog imported");
        Ok(candidates.len())
    }
}

fn upsert_in(conn: &Connection, candidate: &Candidate) -> StorageResult<()> {
    let asset = &candidate.asset;
    let meta = &candidate.metadata;

    conn.execute(
        r#"
            INSERT INTO assets (id, title, content_type, duration_secs, theme,
                                engagement_score, expiry_date, go_live_date, recorded_on)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                content_type = excluded.content_type,
                duration_secs = excluded.duration_secs,
                theme = excluded.theme,
                engagement_score = excluded.engagement_score,
                expiry_date = excluded.expiry_date,
                go_live_date = excluded.go_live_date,
                recorded_on = excluded.recorded_on
            "#,
        params![
            asset.id,
            asset.title,
            asset.content_type.code(),
            asset.duration_secs,
            asset.theme,
            asset.engagement_score,
            format_date(asset.expiry_date),
            format_date(asset.go_live_date),
            format_date(asset.recorded_on),
        ],
    )?;

    let inserted = conn.execute(
        r#"
            INSERT INTO scheduling_metadata (asset_id, available_for_scheduling, content_expiry_date,
                                             last_scheduled_at, total_airings, featured, priority_score)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(asset_id) DO NOTHING
            "#,
        params![
            asset.id,
            meta.available_for_scheduling,
            format_date(meta.content_expiry_date),
            meta.last_scheduled_at.map(format_datetime),
            meta.total_airings,
            meta.featured,
            meta.priority_score,
        ],
    )?;

    if inserted == 0 {
        conn.execute(
            r#"
                UPDATE scheduling_metadata SET
                    available_for_scheduling = ?2,
                    content_expiry_date = ?3,
                    featured = ?4,
                    priority_score = ?5
                WHERE asset_id = ?1
                "#,
            params![
                asset.id,
                meta.available_for_scheduling,
                format_date(meta.content_expiry_date),
                meta.featured,
                meta.priority_score,
            ],
        )?;
        return Ok(());
    }

    for (bucket, airings) in &meta.timeslot_airings {
        conn.execute(
            r#"
                INSERT OR REPLACE INTO timeslot_usage (asset_id, bucket, airings, last_scheduled_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            params![
                asset.id,
                bucket.as_str(),
                airings,
                meta.timeslot_last_scheduled.get(bucket).map(|at| format_datetime(*at)),
            ],
        )?;
    }

    Ok(())
}

// ============================================================================
// In-memory Implementation (for testing)
// ============================================================================

/// A placement seen by [`InMemoryCatalog`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPlacement {
    pub asset_id: String,
    pub placed_at: NaiveDateTime,
    pub category: RotationCategory,
}

/// In-memory catalog
///
/// Useful for testing without database dependencies.
pub struct InMemoryCatalog {
    candidates: RwLock<BTreeMap<String, Candidate>>,
    placements: RwLock<Vec<RecordedPlacement>>,
    seen: RwLock<HashSet<(String, NaiveDateTime)>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            candidates: RwLock::new(BTreeMap::new()),
            placements: RwLock::new(Vec::new()),
            seen: RwLock::new(HashSet::new()),
        }
    }

    /// Create a catalog holding the given candidates
    pub fn with_candidates(candidates: impl IntoIterator<Item = Candidate>) -> Self {
        let catalog = Self::new();
        {
            let mut map = catalog
                .candidates
                .write()
                .unwrap_or_else(|e| e.into_inner());
            for candidate in candidates {
                map.insert(candidate.asset.id.clone(), candidate);
            }
        }
        catalog
    }

    /// Placements recorded so far, in call order
    pub fn placements(&self) -> StorageResult<Vec<RecordedPlacement>> {
        Ok(self.placements.read()?.clone())
    }

    /// Airing count per asset, as the recorder sees it
    pub fn airings(&self) -> StorageResult<HashMap<String, u32>> {
        let candidates = self.candidates.read()?;
        Ok(candidates
            .iter()
            .map(|(id, c)| (id.clone(), c.metadata.total_airings))
            .collect())
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateRepository for InMemoryCatalog {
    fn find_eligible(
        &self,
        category: RotationCategory,
        context: &SlotContext,
    ) -> StorageResult<Vec<Candidate>> {
        let candidates = self.candidates.read()?;
        Ok(candidates
            .values()
            .filter(|c| c.is_eligible(category, context))
            .cloned()
            .collect())
    }
}

impl UsageRecorder for InMemoryCatalog {
    fn record(
        &self,
        asset_id: &str,
        placed_at: NaiveDateTime,
        category: RotationCategory,
    ) -> StorageResult<()> {
        let mut candidates = self.candidates.write()?;
        let candidate = candidates
            .get_mut(asset_id)
            .ok_or_else(|| StorageError::UnknownAsset {
                id: asset_id.to_string(),
            })?;

        if !self.seen.write()?.insert((asset_id.to_string(), placed_at)) {
            return Ok(());
        }

        candidate.metadata.apply_placement(placed_at);
        self.placements.write()?.push(RecordedPlacement {
            asset_id: asset_id.to_string(),
            placed_at,
            category,
        });
        Ok(())
    }
}

impl CatalogStore for InMemoryCatalog {
    fn upsert(&self, candidate: &Candidate) -> StorageResult<()> {
        let mut candidates = self.candidates.write()?;
        match candidates.get_mut(&candidate.asset.id) {
            Some(existing) => {
                existing.asset = candidate.asset.clone();
                existing.metadata.available_for_scheduling =
                    candidate.metadata.available_for_scheduling;
                existing.metadata.content_expiry_date = candidate.metadata.content_expiry_date;
                existing.metadata.featured = candidate.metadata.featured;
                existing.metadata.priority_score = candidate.metadata.priority_score;
            }
            None => {
                candidates.insert(candidate.asset.id.clone(), candidate.clone());
            }
        }
        Ok(())
    }

    fn get(&self, id: &str) -> StorageResult<Option<Candidate>> {
        Ok(self.candidates.read()?.get(id).cloned())
    }

    fn count(&self) -> StorageResult<usize> {
        Ok(self.candidates.read()?.len())
    }
}

// ============================================================================
// Shared Repository Types
// ============================================================================

/// Thread-safe shared catalog
pub type SharedCatalog = Arc<dyn CatalogStore>;

/// Create a shared SQLite catalog
pub fn create_sqlite_catalog(path: impl AsRef<Path>) -> StorageResult<SharedCatalog> {
    Ok(Arc::new(SqliteCatalog::new(path)?))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_catalogs() -> Vec<Box<dyn CatalogStore>> {
        vec![
            Box::new(SqliteCatalog::in_memory().unwrap()),
            Box::new(InMemoryCatalog::new()),
        ]
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn at(h: u32) -> NaiveDateTime {
        day().and_hms_opt(h, 0, 0).unwrap()
    }

    fn context(h: u32, available_secs: u32) -> SlotContext {
        SlotContext {
            start: at(h),
            available_secs,
            excluded_ids: Vec::new(),
        }
    }

    fn seed(catalog: &dyn CatalogStore) {
        let mut expired = Candidate::new(Asset::new("pkg-expired", ContentType::Package, 200));
        expired.asset.expiry_date = day().pred_opt();

        let mut pulled = Candidate::new(Asset::new("pkg-pulled", ContentType::Package, 200));
        pulled.metadata.available_for_scheduling = false;

        let mut upcoming = Candidate::new(Asset::new("pkg-upcoming", ContentType::Package, 200));
        upcoming.asset.go_live_date = day().succ_opt();

        let items = vec![
            Candidate::new(Asset::new("id-1", ContentType::Bump, 10)),
            Candidate::new(Asset::new("spot-1", ContentType::Psa, 30)),
            Candidate::new(Asset::new("pkg-1", ContentType::Package, 240).with_theme("transit")),
            Candidate::new(Asset::new("pkg-2", ContentType::Package, 600)),
            Candidate::new(Asset::new("mtg-1", ContentType::Meeting, 5400)),
            expired,
            pulled,
            upcoming,
        ];
        catalog.import(&items).unwrap();
    }

    #[test]
    fn test_find_eligible_filters() {
        for catalog in create_test_catalogs() {
            seed(catalog.as_ref());

            let found = catalog
                .find_eligible(RotationCategory::Pkg, &context(10, 3600))
                .unwrap();
            let ids: Vec<_> = found.iter().map(|c| c.id().to_string()).collect();
            assert_eq!(ids, vec!["pkg-1", "pkg-2"]);

            let short = catalog
                .find_eligible(RotationCategory::Pkg, &context(10, 300))
                .unwrap();
            assert_eq!(short.len(), 1);
            assert_eq!(short[0].id(), "pkg-1");
            assert_eq!(short[0].asset.theme.as_deref(), Some("transit"));
        }
    }

    #[test]
    fn test_find_eligible_excludes_ids() {
        for catalog in create_test_catalogs() {
            seed(catalog.as_ref());

            let mut ctx = context(10, 3600);
            ctx.excluded_ids.push("pkg-1".to_string());

            let found = catalog.find_eligible(RotationCategory::ShortForm, &ctx).unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].id(), "pkg-2");
        }
    }

    #[test]
    fn test_record_updates_metadata() {
        for catalog in create_test_catalogs() {
            seed(catalog.as_ref());

            catalog.record("spot-1", at(20), RotationCategory::Spots).unwrap();
            catalog.record("spot-1", at(8), RotationCategory::Spots).unwrap();

            let spot = catalog.get("spot-1").unwrap().unwrap();
            assert_eq!(spot.metadata.total_airings, 2);
            assert_eq!(spot.metadata.last_scheduled_at, Some(at(20)));
            assert_eq!(
                spot.metadata.timeslot_airings.get(&TimeslotBucket::Evening),
                Some(&1)
            );
            assert_eq!(
                spot.metadata.timeslot_last_scheduled.get(&TimeslotBucket::Morning),
                Some(&at(8))
            );
        }
    }

    #[test]
    fn test_record_is_idempotent() {
        for catalog in create_test_catalogs() {
            seed(catalog.as_ref());

            catalog.record("id-1", at(9), RotationCategory::Id).unwrap();
            catalog.record("id-1", at(9), RotationCategory::Id).unwrap();

            let id = catalog.get("id-1").unwrap().unwrap();
            assert_eq!(id.metadata.total_airings, 1);
        }
    }

    #[test]
    fn test_record_unknown_asset() {
        for catalog in create_test_catalogs() {
            let err = catalog
                .record("ghost", at(9), RotationCategory::Id)
                .unwrap_err();
            assert!(matches!(err, StorageError::UnknownAsset { .. }));
        }
    }

    #[test]
    fn test_upsert_keeps_history() {
        for catalog in create_test_catalogs() {
            seed(catalog.as_ref());
            catalog.record("pkg-1", at(9), RotationCategory::Pkg).unwrap();

            let mut update = Candidate::new(
                Asset::new("pkg-1", ContentType::Package, 240).with_theme("housing"),
            )
            .featured(true);
            update.metadata.priority_score = 3.0;
            catalog.upsert(&update).unwrap();

            let stored = catalog.get("pkg-1").unwrap().unwrap();
            assert_eq!(stored.metadata.total_airings, 1);
            assert!(stored.metadata.featured);
            assert_eq!(stored.asset.theme.as_deref(), Some("housing"));
            assert_eq!(catalog.count().unwrap(), 8);
        }
    }

    #[test]
    fn test_parse_catalog() {
        let json = r#"[
            {"id": "a", "title": "Council", "content_type": "mtg", "duration_secs": 3600,
             "recorded_on": "2024-03-01",
             "scheduling": {"available_for_scheduling": true, "featured": true}},
            {"id": "b", "content_type": "weather", "duration_secs": 45}
        ]"#;

        let candidates = parse_catalog(json).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].asset.content_type, ContentType::Meeting);
        assert!(candidates[0].metadata.featured);
        assert_eq!(candidates[1].asset.content_type, ContentType::Other);
        assert!(candidates[1].metadata.available_for_scheduling);

        assert!(matches!(parse_catalog("{"), Err(StorageError::Import(_))));
    }

    #[test]
    fn test_in_memory_placements_log() {
        let catalog = InMemoryCatalog::new();
        seed(&catalog);
        catalog.record("id-1", at(9), RotationCategory::Id).unwrap();

        let placements = catalog.placements().unwrap();
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].category, RotationCategory::Id);
        assert_eq!(catalog.airings().unwrap().get("id-1"), Some(&1));
    }
}
