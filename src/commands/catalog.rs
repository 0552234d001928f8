use anyhow::{Context, Result};
use std::path::Path;

use airtime::config::Config;
use airtime::storage::{create_sqlite_catalog, parse_catalog, SharedCatalog};

fn open(config: &Config) -> Result<SharedCatalog> {
    create_sqlite_catalog(&config.storage.sqlite_path).with_context(|| {
        format!(
            "Failed to open catalog at {}",
            config.storage.sqlite_path.display()
        )
    })
}

/// Import assets from a JSON file into the SQLite catalog
pub async fn import(config: &Config, input: &Path) -> Result<()> {
    let json = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let candidates =
        parse_catalog(&json).with_context(|| format!("Invalid catalog file {}", input.display()))?;

    let catalog = open(config)?;
    let imported = catalog
        .import(&candidates)
        .context("Catalog import failed")?;
    let total = catalog.count()?;

    tracing::info!(imported, total, "Catalog import finished");
    println!("Imported {imported} assets ({total} in catalog)");
    Ok(())
}

/// Print asset counts
pub fn stats(config: &Config) -> Result<()> {
    let catalog = open(config)?;
    let total = catalog.count()?;

    println!("Catalog: {}", config.storage.sqlite_path.display());
    println!("================================");
    println!("  Assets: {total}");
    Ok(())
}
