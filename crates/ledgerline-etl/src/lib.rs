//! Migration pipeline stages for ledgerline.
//!
//! Implements the schema, clean, normalize, and guard stages as treadle
//! `Stage` implementations, plus a synchronous [`Migration`] driver that runs
//! the same stages without a workflow.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod clean;
pub mod config;
pub mod define;
pub mod error;
pub mod guard;
pub mod normalize;
pub mod pipeline;
pub mod work_item;

pub use clean::{clean_store, CleanReport, CleanStage};
pub use config::Config;
pub use define::SchemaStage;
pub use error::{MigrateError, MigrateResult};
pub use guard::{guard_store, GuardReport, GuardStage};
pub use normalize::{normalize_store, NormalizeReport, NormalizeStage};
pub use pipeline::{build_pipeline, Migration, MigrationReport, STAGES};
pub use work_item::MigrationJob;
