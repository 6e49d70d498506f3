use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use treadle::Workflow;

use ledgerline_core::model::RawDataset;
use ledgerline_core::schema::{Database, SchemaReport};

use crate::clean::{clean_store, CleanReport};
use crate::error::{MigrateError, MigrateResult};
use crate::guard::{guard_store, GuardReport};
use crate::normalize::{normalize_store, NormalizeReport};
use crate::{CleanStage, GuardStage, NormalizeStage, SchemaStage};

/// Stage names in execution order.
pub const STAGES: [&str; 4] = ["schema", "clean", "normalize", "guard"];

/// Build the schema → clean → normalize → guard workflow.
///
/// # Errors
/// Returns an error if the workflow cannot be built.
pub fn build_pipeline(db_path: PathBuf) -> treadle::Result<Workflow> {
    Workflow::builder()
        .stage("schema", SchemaStage::new(db_path.clone()))
        .stage("clean", CleanStage::new(db_path.clone()))
        .stage("normalize", NormalizeStage::new(db_path.clone()))
        .stage("guard", GuardStage::new(db_path))
        .dependency("clean", "schema")
        .dependency("normalize", "clean")
        .dependency("guard", "normalize")
        .build()
}

/// Reports from every stage of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub schema: SchemaReport,
    pub clean: CleanReport,
    pub normalize: NormalizeReport,
    pub guard: GuardReport,
}

/// Runs the four stages directly against an open store, without a workflow
/// or state store. Each stage commits on its own; a failing stage rolls back
/// only its own changes and stops the run.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    today: NaiveDate,
}

impl Default for Migration {
    fn default() -> Self {
        Self::new(Utc::now().date_naive())
    }
}

impl Migration {
    /// A migration that evaluates the age predicate against `today`.
    #[must_use]
    pub const fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Run all stages in order.
    ///
    /// # Errors
    /// Returns [`MigrateError::Stage`] naming the first stage that failed.
    pub fn run(&self, db: &mut Database) -> MigrateResult<MigrationReport> {
        let schema = db.define_schema().map_err(MigrateError::stage("schema"))?;
        let clean = clean_store(db).map_err(MigrateError::stage("clean"))?;
        let normalize =
            normalize_store(db, self.today).map_err(MigrateError::stage("normalize"))?;
        let guard = guard_store(db).map_err(MigrateError::stage("guard"))?;

        Ok(MigrationReport {
            schema,
            clean,
            normalize,
            guard,
        })
    }

    /// Open the store at `db_path`, append `snapshot` to the staging tables
    /// if given, then [`run`](Self::run).
    ///
    /// # Errors
    /// Returns [`MigrateError::Database`] when the store cannot be opened or
    /// the snapshot cannot be read or loaded, and [`MigrateError::Stage`]
    /// when a stage fails.
    pub fn run_at(
        &self,
        db_path: &Path,
        snapshot: Option<&Path>,
    ) -> MigrateResult<(Database, MigrationReport)> {
        let mut db = Database::connect(db_path)?;
        if let Some(snapshot) = snapshot {
            let dataset = RawDataset::load(snapshot)?;
            // Staging tables must exist before anything is loaded.
            db.define_schema().map_err(MigrateError::stage("schema"))?;
            let loaded = db.load_raw(&dataset)?;
            log::info!("Loaded {} raw rows from {}", loaded, snapshot.display());
        }
        let report = self.run(&mut db)?;
        Ok((db, report))
    }
}
