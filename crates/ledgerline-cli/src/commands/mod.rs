pub mod config;
pub mod init;
pub mod load;
pub mod migrate;
pub mod normalize_date;
pub mod oplog;
pub mod status;

pub use init::run_init;
pub use load::run_load;
pub use migrate::run_migrate;
pub use normalize_date::normalize_date;
pub use oplog::show_log;
pub use status::show_status;
