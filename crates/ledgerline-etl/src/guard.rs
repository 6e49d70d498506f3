//! Guard stage: install the standing integrity and audit hooks.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use treadle::{Stage, StageContext, StageOutcome};

use ledgerline_core::hooks::{default_hooks, install_hooks};
use ledgerline_core::schema::Database;

use crate::error::stage_failure;

/// Outcome of the guard stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardReport {
    /// Hooks created by this run.
    pub installed: Vec<String>,
    /// Hooks that were already in place.
    pub already_present: usize,
}

/// Install the default hook set in one transaction.
pub fn guard_store(db: &mut Database) -> ledgerline_core::Result<GuardReport> {
    let hooks = default_hooks();
    let tx = db.transaction()?;
    let installed = install_hooks(&tx, &hooks)?;
    tx.commit()?;

    let report = GuardReport {
        already_present: hooks.len() - installed.len(),
        installed,
    };
    log::info!(
        "Guard complete: {} hooks installed, {} already present",
        report.installed.len(),
        report.already_present
    );
    Ok(report)
}

/// The Guard stage.
#[derive(Debug)]
pub struct GuardStage {
    db_path: PathBuf,
}

impl GuardStage {
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }
}

#[async_trait::async_trait]
impl Stage for GuardStage {
    fn name(&self) -> &str {
        "guard"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        ctx: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        let mut db = Database::connect(&self.db_path)
            .map_err(|e| stage_failure("Opening database", e))?;

        let report = guard_store(&mut db).map_err(|e| stage_failure("Guard", e))?;

        let report_json = serde_json::to_value(&report)
            .map_err(|e| stage_failure("Serializing guard report", e))?;
        ctx.metadata.insert("guard".to_string(), report_json);

        Ok(StageOutcome::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerline_core::model::{Album, Artist, Operation};
    use ledgerline_core::Error;

    fn guarded() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        guard_store(&mut db).unwrap();
        db
    }

    #[test]
    fn test_guard_install_is_idempotent() {
        let mut db = Database::open_in_memory().unwrap();

        let first = guard_store(&mut db).unwrap();
        let second = guard_store(&mut db).unwrap();

        assert_eq!(first.installed.len(), 5);
        assert_eq!(first.already_present, 0);
        assert!(second.installed.is_empty());
        assert_eq!(second.already_present, 5);
    }

    #[test]
    fn test_album_with_unknown_artist_is_rejected() {
        let db = guarded();
        let before = db.count("albums").unwrap();

        let err = db
            .insert_album(&Album::new(1, "Ghost", None, 404))
            .unwrap_err();

        assert!(matches!(err, Error::IntegrityViolation(ref m) if m == "Invalid ArtistID"));
        assert_eq!(db.count("albums").unwrap(), before);
    }

    #[test]
    fn test_artist_insert_appends_one_log_entry() {
        let db = guarded();
        assert_eq!(db.count("operation_log").unwrap(), 0);

        db.insert_artist(&Artist::new(7, "Bob")).unwrap();

        let entries = db.recent_log_entries(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, Operation::Insert);
        assert_eq!(entries[0].table_name, "Artists");
        assert_eq!(entries[0].record_id, 7);
    }

    #[test]
    fn test_rejected_album_writes_no_log_entry() {
        let db = guarded();
        db.insert_artist(&Artist::new(1, "Bob")).unwrap();

        assert!(db.insert_album(&Album::new(1, "Ghost", None, 2)).is_err());

        assert_eq!(db.count("operation_log").unwrap(), 1);
    }
}
