use anyhow::Result;
use ledgerline_core::schema::Database;
use std::path::Path;

/// Print the most recent operation log entries, newest first.
pub fn show_log(db_path: &Path, limit: usize) -> Result<()> {
    let db = Database::open(db_path)?;
    let entries = db.recent_log_entries(limit)?;

    if entries.is_empty() {
        println!("Operation log is empty");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{:>6}  {}  {:<6}  {} #{}",
            entry.id.get(),
            entry.timestamp,
            entry.operation.as_str(),
            entry.table_name,
            entry.record_id
        );
    }

    Ok(())
}
