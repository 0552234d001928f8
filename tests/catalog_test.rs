//! Catalog persistence and concurrent runs

mod common;

use std::sync::Arc;

use airtime::config::RotationConfig;
use airtime::models::ScheduleGap;
use airtime::scheduler::{RotationCategory, RunKind, Scheduler};
use airtime::storage::{parse_catalog, CatalogStore, InMemoryCatalog, SqliteCatalog};
use common::*;
use tempfile::TempDir;

const CATALOG_JSON: &str = r#"[
    {"id": "id-1", "title": "Station ID", "content_type": "bump", "duration_secs": 10},
    {"id": "spot-1", "title": "Recycling PSA", "content_type": "psa", "duration_secs": 30,
     "theme": "recycling"},
    {"id": "pkg-1", "title": "Council Recap", "content_type": "pkg", "duration_secs": 300,
     "theme": "council",
     "scheduling": {"available_for_scheduling": true, "featured": true, "priority_score": 2.5}},
    {"id": "mtg-1", "title": "Council Meeting", "content_type": "mtg", "duration_secs": 5400,
     "recorded_on": "2024-03-08"}
]"#;

#[test]
fn test_sqlite_catalog_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db").join("airtime.db");

    {
        let catalog = SqliteCatalog::new(&path).unwrap();
        let imported = catalog.import(&parse_catalog(CATALOG_JSON).unwrap()).unwrap();
        assert_eq!(imported, 4);
    }

    let catalog = SqliteCatalog::new(&path).unwrap();
    assert_eq!(catalog.count().unwrap(), 4);

    let pkg = catalog.get("pkg-1").unwrap().unwrap();
    assert!(pkg.metadata.featured);
    assert_eq!(pkg.metadata.priority_score, 2.5);
    assert_eq!(pkg.asset.theme.as_deref(), Some("council"));

    let meeting = catalog.get("mtg-1").unwrap().unwrap();
    assert_eq!(meeting.asset.recorded_on, Some(on_day(8, 0, 0).date()));
}

#[test]
fn test_schedule_over_sqlite_records_airings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("airtime.db");
    let catalog = Arc::new(SqliteCatalog::new(&path).unwrap());
    catalog.import(&parse_catalog(CATALOG_JSON).unwrap()).unwrap();

    let mut config = RotationConfig::default();
    config.order = vec![RotationCategory::Id, RotationCategory::Spots];

    let mut scheduler = Scheduler::new(catalog.clone(), catalog.clone(), RunKind::Daily).with_seed(3);
    let report = scheduler
        .build_schedule(&[ScheduleGap::new(at(10, 0), 40)], &config)
        .unwrap();
    assert_eq!(report.items.len(), 2);
    drop(scheduler);
    drop(catalog);

    // Counters were committed per placement
    let reopened = SqliteCatalog::new(&path).unwrap();
    for item in &report.items {
        let candidate = reopened.get(&item.asset_id).unwrap().unwrap();
        assert_eq!(candidate.metadata.total_airings, 1);
        assert_eq!(candidate.metadata.last_scheduled_at, Some(item.start));
    }
}

#[test]
fn test_sqlite_and_memory_catalogs_agree() {
    let gaps = vec![
        ScheduleGap::new(at(9, 0), DEFAULT_CYCLE_SECS),
        ScheduleGap::new(at(14, 0), DEFAULT_CYCLE_SECS),
    ];
    let config = RotationConfig::default();

    let memory = catalog(full_inventory());
    let from_memory = neutral_scheduler(&memory, RunKind::Daily)
        .build_schedule(&gaps, &config)
        .unwrap();

    let sqlite = Arc::new(SqliteCatalog::in_memory().unwrap());
    sqlite.import(&full_inventory()).unwrap();
    let from_sqlite = Scheduler::new(sqlite.clone(), sqlite, RunKind::Daily)
        .with_random(Box::new(airtime::scheduler::FixedRandom::neutral()))
        .build_schedule(&gaps, &config)
        .unwrap();

    let ids = |items: &[airtime::ScheduledItem]| {
        items.iter().map(|i| i.asset_id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&from_memory.items), ids(&from_sqlite.items));
}

#[tokio::test]
async fn test_concurrent_runs_keep_independent_rotation() {
    let catalog = Arc::new(InMemoryCatalog::with_candidates(full_inventory()));
    let config = RotationConfig::default();

    let mut handles = Vec::new();
    for (seed, hour) in [(1u64, 6u32), (2, 12), (3, 18)] {
        let catalog = Arc::clone(&catalog);
        let config = config.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let mut scheduler = Scheduler::new(catalog.clone(), catalog, RunKind::Weekly).with_seed(seed);
            scheduler
                .build_schedule(&[ScheduleGap::new(at(hour, 0), 40)], &config)
                .unwrap()
        }));
    }

    for handle in handles {
        let report = handle.await.unwrap();
        // Each run starts its own rotation: an ID, then a spot
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.items[0].requested_category, RotationCategory::Id);
        assert_eq!(report.items[1].requested_category, RotationCategory::Spots);
        assert_eq!(report.rotation.advanced, 2);
    }

    assert_eq!(catalog.placements().unwrap().len(), 6);
}
