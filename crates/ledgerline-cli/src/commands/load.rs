use anyhow::{Context, Result};
use ledgerline_core::model::RawDataset;
use ledgerline_core::schema::Database;
use std::path::Path;

/// Append a raw snapshot to the staging tables.
pub fn run_load(db_path: &Path, file: &Path, replace: bool) -> Result<()> {
    let dataset = RawDataset::load(file)
        .with_context(|| format!("Failed to read snapshot {}", file.display()))?;
    let mut db = Database::open(db_path)?;

    if replace {
        db.clear_raw().context("Failed to clear staging tables")?;
    }
    let loaded = db.load_raw(&dataset).context("Failed to load snapshot")?;
    let counts = db.raw_counts()?;

    println!("✓ Loaded {loaded} rows from {}", file.display());
    println!(
        "  Staging: {} genres, {} artists, {} albums, {} tracks",
        counts.genres, counts.artists, counts.albums, counts.tracks
    );

    Ok(())
}
