use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use treadle::WorkItem;

/// One migration run against a store.
///
/// This is the treadle `WorkItem` that flows through the schema → clean →
/// normalize → guard stages. Every run gets a fresh id so the state store
/// never mistakes it for an earlier, completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationJob {
    id: String,
    /// Path to the SQLite store being migrated.
    pub db_path: PathBuf,
}

impl MigrationJob {
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), db_path)
    }

    #[must_use]
    pub fn with_id(id: impl Into<String>, db_path: PathBuf) -> Self {
        Self {
            id: id.into(),
            db_path,
        }
    }
}

impl WorkItem for MigrationJob {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for MigrationJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.db_path.display(), self.id)
    }
}
