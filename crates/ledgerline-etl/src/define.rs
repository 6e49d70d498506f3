//! Schema stage: make sure every managed table exists before data moves.

use std::path::PathBuf;

use treadle::{Stage, StageContext, StageOutcome};

use ledgerline_core::schema::Database;

use crate::error::stage_failure;

/// The Schema stage.
///
/// Runs the pending migrations. An incompatible pre-existing table fails the
/// stage, and the workflow stops before any data is touched.
#[derive(Debug)]
pub struct SchemaStage {
    db_path: PathBuf,
}

impl SchemaStage {
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }
}

#[async_trait::async_trait]
impl Stage for SchemaStage {
    fn name(&self) -> &str {
        "schema"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        ctx: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        let mut db = Database::connect(&self.db_path)
            .map_err(|e| stage_failure("Opening database", e))?;

        let report = db
            .define_schema()
            .map_err(|e| stage_failure("Schema definition", e))?;
        log::info!(
            "Schema ready: {} migrations applied, {} tables verified",
            report.applied.len(),
            report.tables_verified
        );

        let report_json = serde_json::to_value(&report)
            .map_err(|e| stage_failure("Serializing schema report", e))?;
        ctx.metadata.insert("schema".to_string(), report_json);

        Ok(StageOutcome::Complete)
    }
}
