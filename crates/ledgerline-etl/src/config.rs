use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for ledgerline.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (LEDGERLINE_* prefix)
/// 3. Config file (~/.config/ledgerline/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite store being migrated.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: LEDGERLINE_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/ledgerline/ledgerline.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Raw snapshot loaded by `migrate` when no `--from` is given.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    /// Where the workflow keeps its stage state. Defaults to `pipeline.db`
    /// next to the database.
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            snapshot_path: None,
            state_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("ledgerline");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration, letting the `--db` flag override the database path.
    pub fn load_with_db_path(db_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::load()?;
        if let Some(db_path) = db_path {
            config.database_path = db_path;
        }
        Ok(config)
    }

    /// The workflow state store path.
    #[must_use]
    pub fn state_store_path(&self) -> PathBuf {
        self.state_path.clone().unwrap_or_else(|| {
            self.database_path
                .parent()
                .map_or_else(|| PathBuf::from("pipeline.db"), |p| p.join("pipeline.db"))
        })
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ledgerline")
        .join("ledgerline.db")
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/ledgerline/config.toml
/// - macOS: ~/Library/Application Support/ledgerline/config.toml
/// - Windows: %APPDATA%\ledgerline\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ledgerline")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Ledgerline Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (LEDGERLINE_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite store holding the staging and normalized tables
#
# Can also be set via:
# - CLI: ledgerline --db /custom/path.db migrate
# - Environment: LEDGERLINE_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/ledgerline.db"

# Raw snapshot (.json or .toml) loaded by 'ledgerline migrate' when no
# --from flag is given
#snapshot_path = "/path/to/snapshot.json"

# Workflow state store
#
# Default: pipeline.db next to the database
#state_path = "/path/to/pipeline.db"
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database_path.ends_with("ledgerline/ledgerline.db"));
        assert!(config.snapshot_path.is_none());
        assert!(config.state_path.is_none());
    }

    #[test]
    fn test_config_load() {
        // Should not fail even if config file doesn't exist
        let result = Config::load();
        assert!(result.is_ok());
    }

    #[test]
    fn test_db_flag_overrides_database_path() {
        let custom_path = PathBuf::from("/tmp/test.db");
        let config = Config::load_with_db_path(Some(custom_path.clone())).unwrap();
        assert_eq!(config.database_path, custom_path);
    }

    #[test]
    fn test_state_store_defaults_next_to_database() {
        let config = Config {
            database_path: PathBuf::from("/data/music/store.db"),
            ..Config::default()
        };
        assert_eq!(
            config.state_store_path(),
            PathBuf::from("/data/music/pipeline.db")
        );

        let explicit = Config {
            state_path: Some(PathBuf::from("/var/state.db")),
            ..config
        };
        assert_eq!(explicit.state_store_path(), PathBuf::from("/var/state.db"));
    }

    #[test]
    fn test_example_config_parses() {
        let parsed: Config = toml::from_str(example_config()).unwrap();
        assert!(parsed.snapshot_path.is_none());
    }
}
