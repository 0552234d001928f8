use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use airtime::config::Config;
use airtime::error::AirtimeErrorTrait;
use airtime::models::ScheduleGap;
use airtime::scheduler::{GapStatus, RotationStateMachine, RunKind, ScheduleReport, Scheduler};
use airtime::storage::SqliteCatalog;

/// Arguments of `airtime build`
pub struct BuildParams {
    pub gap_files: Vec<PathBuf>,
    pub kind: RunKind,
    pub seed: Option<u64>,
    pub output: Option<PathBuf>,
}

/// One independent run and what it produced
#[derive(Serialize)]
struct RunOutput {
    run_id: Uuid,
    gap_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    report: ScheduleReport,
}

pub async fn build(config: Arc<Config>, params: BuildParams) -> Result<()> {
    let catalog = Arc::new(
        SqliteCatalog::new(&config.storage.sqlite_path).with_context(|| {
            format!(
                "Failed to open catalog at {}",
                config.storage.sqlite_path.display()
            )
        })?,
    );

    // Each gap file is its own run with its own rotation state
    let mut handles = Vec::with_capacity(params.gap_files.len());
    for (index, path) in params.gap_files.iter().enumerate() {
        let path = path.clone();
        let catalog = Arc::clone(&catalog);
        let rotation = config.rotation.clone();
        let kind = params.kind;
        let seed = params.seed.map(|s| s.wrapping_add(index as u64));
        let gap_file = path.display().to_string();

        let handle = tokio::task::spawn_blocking({
            let gap_file = gap_file.clone();
            move || -> airtime::error::Result<RunOutput> {
                let run_id = Uuid::new_v4();
                let span = tracing::info_span!("run", %run_id, gap_file = %gap_file);
                let _guard = span.enter();

                let gaps = ScheduleGap::load_file(&path)?;
                let mut scheduler = Scheduler::new(catalog.clone(), catalog, kind);
                if let Some(seed) = seed {
                    scheduler = scheduler.with_seed(seed);
                }
                let report = scheduler.build_schedule(&gaps, &rotation)?;

                Ok(RunOutput {
                    run_id,
                    gap_file,
                    seed,
                    report,
                })
            }
        });
        handles.push((gap_file, handle));
    }

    let mut outputs = Vec::with_capacity(handles.len());
    for (gap_file, handle) in handles {
        match handle.await.context("Schedule run task failed")? {
            Ok(run) => outputs.push(run),
            Err(err) => {
                tracing::error!(
                    gap_file = %gap_file,
                    category = err.category().description(),
                    recoverable = err.is_recoverable(),
                    error = %err,
                    "Schedule run failed"
                );
                return Err(err).with_context(|| format!("Schedule run for {gap_file} failed"));
            }
        }
    }

    for run in &outputs {
        let report = &run.report;
        let count = |status: GapStatus| report.gaps.iter().filter(|g| g.status == status).count();

        eprintln!("Run {} ({})", run.run_id, run.gap_file);
        eprintln!("================================");
        eprintln!("  Items placed:    {}", report.items.len());
        eprintln!("  Seconds filled:  {}", report.filled_secs());
        eprintln!(
            "  Gaps:            {} filled, {} partial, {} empty",
            count(GapStatus::Filled),
            count(GapStatus::Partial),
            count(GapStatus::Empty)
        );
        eprintln!("  Relaxations:     {}", report.relaxations);
        eprintln!(
            "  Rotation:        {}",
            RotationStateMachine::from_state(report.rotation).format_position(&config.rotation.order)
        );
    }

    let json = serde_json::to_string_pretty(&outputs).context("Failed to serialize reports")?;
    match params.output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), runs = outputs.len(), "Schedule reports written");
        }
        None => println!("{json}"),
    }

    Ok(())
}
