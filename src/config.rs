use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;

/// Settings shared by the migration manager, generator and CLI
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StrataConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default = "default_ledger_table")]
    pub ledger_table: String,
    /// Seconds to wait for the advisory migration lock; 0 disables locking
    #[serde(default)]
    pub lock_timeout_seconds: u64,
}

const CONFIG_FILE: &str = "config/strata.toml";

fn default_database_url() -> String {
    "mysql://root@localhost:3306/strata_dev".to_string()
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_ledger_table() -> String {
    "migrations".to_string()
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            migrations_dir: default_migrations_dir(),
            ledger_table: default_ledger_table(),
            lock_timeout_seconds: 0,
        }
    }
}

impl StrataConfig {
    /// Load from `config/strata.toml` (optional), overridden by `STRATA__*` env vars.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix("STRATA").separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // An unreadable file should not hide env configuration
                log::warn!("failed to load {CONFIG_FILE}, falling back to env: {err}");
                Config::builder()
                    .add_source(Environment::with_prefix("STRATA").separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file ({err}) and env ({env_err})"
                        ))
                    })?
            }
        };

        settings.try_deserialize()
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn lock_timeout(&self) -> Option<std::time::Duration> {
        (self.lock_timeout_seconds > 0)
            .then(|| std::time::Duration::from_secs(self.lock_timeout_seconds))
    }
}
