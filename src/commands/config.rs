use anyhow::{Context, Result};

use airtime::config::{Config, ConfigWarning};

/// Print the effective configuration as TOML
pub fn show(config: &Config, warnings: &[ConfigWarning]) -> Result<()> {
    let rendered = config.to_toml().context("Failed to render configuration")?;
    println!("{rendered}");

    if !warnings.is_empty() {
        eprintln!("Ignored values ({}):", warnings.len());
        for warning in warnings {
            eprintln!("  {warning}");
        }
    }
    Ok(())
}
