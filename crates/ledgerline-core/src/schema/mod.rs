pub mod db;
pub mod migrations;
pub mod rows;
pub mod staging;

pub use db::{Database, SchemaReport};
pub use staging::RawCounts;
