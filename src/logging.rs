use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const ENV_FILTER: &str = "PROMPT_CATALOG_LOG";

/// Installs a file-backed subscriber. The terminal belongs to the UI, so logs
/// go to `prompt-catalog.log` under `dir`.
pub fn init(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("prompt-catalog.log"))?;

    let filter = EnvFilter::try_from_env(ENV_FILTER).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()?;
    Ok(())
}
