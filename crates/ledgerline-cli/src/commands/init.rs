use anyhow::{Context, Result};
use ledgerline_core::schema::Database;
use std::path::Path;

/// Define the schema without touching any data.
pub fn run_init(db_path: &Path) -> Result<()> {
    let mut db = Database::connect(db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    let report = db.define_schema().context("Schema definition failed")?;

    if report.applied.is_empty() {
        println!("✓ Schema already up to date ({} tables)", report.tables_verified);
    } else {
        println!(
            "✓ Applied migrations {:?} ({} tables)",
            report.applied, report.tables_verified
        );
    }
    println!("  Database: {}", db_path.display());

    Ok(())
}
