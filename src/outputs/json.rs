//! JSON snapshot writer.
//!
//! Each category owns exactly one snapshot file, `{data_dir}/{slug}-news.json`,
//! wholly replaced on every successful fetch run. Callers only reach this
//! module after the fetch loop has completed, so a failed run never leaves a
//! partial snapshot behind.

use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

use crate::models::Snapshot;
use crate::sources::DataSource;

/// Write a category's snapshot to its fixed filename, creating the data
/// directory if needed. Returns the path written.
#[instrument(level = "info", skip_all, fields(source = source.slug(), data_dir = %data_dir))]
pub async fn write_snapshot(
    snapshot: &Snapshot,
    source: DataSource,
    data_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(snapshot)?;

    fs::create_dir_all(data_dir).await?;
    let path = Path::new(data_dir).join(source.snapshot_filename());

    fs::write(&path, json).await?;
    info!(path = %path.display(), records = snapshot.total_records, "Wrote snapshot file");

    Ok(path)
}
