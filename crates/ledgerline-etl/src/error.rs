//! Error types for the migration pipeline.

use thiserror::Error;

/// Errors that abort a migration run.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// A stage failed; its transaction was rolled back.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: ledgerline_core::Error,
    },

    /// An error outside any stage (opening the store, loading input).
    #[error("database error: {0}")]
    Database(#[from] ledgerline_core::Error),
}

impl MigrateError {
    pub(crate) fn stage(stage: &'static str) -> impl FnOnce(ledgerline_core::Error) -> Self {
        move |source| Self::Stage { stage, source }
    }

    /// Name of the failed stage, if the error came from one.
    pub fn failed_stage(&self) -> Option<&'static str> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::Database(_) => None,
        }
    }

    /// Returns `true` when the store's existing schema is incompatible and
    /// nothing further can run against it.
    pub fn is_schema_conflict(&self) -> bool {
        matches!(
            self,
            Self::Stage {
                source: ledgerline_core::Error::Schema { .. },
                ..
            } | Self::Database(ledgerline_core::Error::Schema { .. })
        )
    }
}

/// Convert a core error into the failure treadle records for a stage.
pub(crate) fn stage_failure(stage: &str, err: impl std::fmt::Display) -> treadle::TreadleError {
    treadle::TreadleError::StageExecution(format!("{stage} failed: {err}"))
}

/// Convenience alias for pipeline results.
pub type MigrateResult<T> = std::result::Result<T, MigrateError>;
