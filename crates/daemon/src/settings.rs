//! Daemon settings
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! `TRANSCACHE__SECTION__KEY` environment variables.
//!
//! The file is `$TRANSCACHE_CONFIG` if set, otherwise `config.toml` in the
//! platform config directory (e.g. `~/.config/transcache/config.toml`).

use anyhow::{bail, Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use transcache_core::application::constants::{
    DEFAULT_CHUNK_MAX_LEN, DEFAULT_DOCUMENT_PREFIX, DEFAULT_MODEL, DEFERRED_SCHEDULE_DELAY,
    LOCK_TTL, PROGRESS_TTL,
};

const ENV_PREFIX: &str = "TRANSCACHE";
const CONFIG_PATH_VAR: &str = "TRANSCACHE_CONFIG";
const DEFAULT_DB_PATH: &str = "~/.transcache/transcache.db";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite file, `~` is expanded; `:memory:` for a throwaway store
    pub db_path: String,
    pub rpc: RpcSettings,
    pub engine: EngineSettings,
    pub jobs: JobsSettings,
    pub purge: PurgeSettings,
    pub maintenance: MaintenanceSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub base_url: String,
    /// Falls back to `OPENAI_API_KEY` when unset
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout_secs: u64,
    pub check_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsSettings {
    pub chunk_max_len: usize,
    pub inter_chunk_delay_ms: u64,
    pub schedule_delay_secs: u64,
    pub lock_ttl_secs: u64,
    pub progress_ttl_secs: u64,
    pub document_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PurgeSettings {
    /// No purge hook is installed when unset
    pub webhook_url: Option<String>,
    pub token: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaintenanceSettings {
    pub interval_hours: u64,
    pub max_db_size_mb: f64,
    pub max_fragmentation_percent: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `pretty` or `json`
    pub format: String,
    /// Daily-rotated JSON log files go here when set
    pub dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            rpc: RpcSettings::default(),
            engine: EngineSettings::default(),
            jobs: JobsSettings::default(),
            purge: PurgeSettings::default(),
            maintenance: MaintenanceSettings::default(),
            log: LogSettings::default(),
        }
    }
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9627,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 300,
            check_timeout_secs: 10,
        }
    }
}

impl Default for JobsSettings {
    fn default() -> Self {
        Self {
            chunk_max_len: DEFAULT_CHUNK_MAX_LEN,
            inter_chunk_delay_ms: 1000,
            schedule_delay_secs: DEFERRED_SCHEDULE_DELAY.as_secs(),
            lock_ttl_secs: LOCK_TTL.as_secs(),
            progress_ttl_secs: PROGRESS_TTL.as_secs(),
            document_prefix: DEFAULT_DOCUMENT_PREFIX.to_string(),
        }
    }
}

impl Default for PurgeSettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            token: None,
            name: "page-cache".to_string(),
        }
    }
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            interval_hours: 6,
            max_db_size_mb: 500.0,
            max_fragmentation_percent: 30.0,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: "pretty".to_string(),
            dir: None,
        }
    }
}

impl Settings {
    /// Load settings from the config file (if any) and the process environment
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_file_path() {
            builder = builder.add_source(File::from(path).required(false));
        }
        let mut settings = Self::build(builder.add_source(env_source()))?;

        if settings.engine.api_key.is_none() {
            settings.engine.api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        Ok(settings)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Settings = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.jobs.chunk_max_len == 0 {
            bail!("jobs.chunk_max_len must be greater than 0");
        }
        if self.jobs.lock_ttl_secs == 0 || self.jobs.progress_ttl_secs == 0 {
            bail!("jobs.lock_ttl_secs and jobs.progress_ttl_secs must be greater than 0");
        }
        if self.maintenance.interval_hours == 0 {
            bail!("maintenance.interval_hours must be greater than 0");
        }
        if !matches!(self.log.format.as_str(), "pretty" | "json") {
            bail!("log.format must be 'pretty' or 'json', got '{}'", self.log.format);
        }
        Ok(())
    }

    /// Database path with `~` expanded
    pub fn db_path(&self) -> String {
        shellexpand::tilde(&self.db_path).into_owned()
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log
            .dir
            .as_deref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).into_owned()))
    }

    pub fn inter_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.jobs.inter_chunk_delay_ms)
    }

    pub fn schedule_delay(&self) -> Duration {
        Duration::from_secs(self.jobs.schedule_delay_secs)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.jobs.lock_ttl_secs)
    }

    pub fn progress_ttl(&self) -> Duration {
        Duration::from_secs(self.jobs.progress_ttl_secs)
    }

    pub fn maintenance_every(&self) -> Duration {
        Duration::from_secs(self.maintenance.interval_hours * 3600)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
        return Some(PathBuf::from(shellexpand::tilde(&path).into_owned()));
    }
    directories::ProjectDirs::from("", "", "transcache")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_sources() {
        let settings = Settings::build(Config::builder()).unwrap();
        assert_eq!(settings.rpc.port, 9627);
        assert_eq!(settings.engine.model, "gpt-4o-mini");
        assert_eq!(settings.jobs.chunk_max_len, 12_000);
        assert_eq!(settings.lock_ttl(), Duration::from_secs(1800));
        assert_eq!(settings.schedule_delay(), Duration::from_secs(5));
        assert!(settings.purge.webhook_url.is_none());
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let toml = r#"
            db_path = ":memory:"

            [engine]
            model = "gpt-4o"
            api_key = "sk-test"

            [jobs]
            chunk_max_len = 4000
        "#;
        let settings =
            Settings::build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
                .unwrap();

        assert_eq!(settings.db_path(), ":memory:");
        assert_eq!(settings.engine.model, "gpt-4o");
        assert_eq!(settings.engine.api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.jobs.chunk_max_len, 4000);
        // Untouched keys keep their defaults
        assert_eq!(settings.jobs.document_prefix, "doc_");
    }

    #[test]
    fn test_environment_wins_over_file() {
        let toml = "[rpc]\nport = 7000\n";
        let env: HashMap<String, String> = [
            ("TRANSCACHE__RPC__PORT".to_string(), "7100".to_string()),
            ("TRANSCACHE__LOG__FORMAT".to_string(), "json".to_string()),
        ]
        .into_iter()
        .collect();

        let settings = Settings::build(
            Config::builder()
                .add_source(File::from_str(toml, FileFormat::Toml))
                .add_source(env_source().source(Some(env))),
        )
        .unwrap();

        assert_eq!(settings.rpc.port, 7100);
        assert_eq!(settings.log.format, "json");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let toml = "[jobs]\nchunk_max_len = 0\n";
        let err =
            Settings::build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
                .unwrap_err();
        assert!(err.to_string().contains("chunk_max_len"));

        let toml = "[log]\nformat = \"xml\"\n";
        assert!(
            Settings::build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
                .is_err()
        );
    }

    #[test]
    fn test_tilde_is_expanded() {
        let settings = Settings {
            db_path: "~/data/t.db".to_string(),
            ..Settings::default()
        };
        assert!(!settings.db_path().starts_with('~'));
        assert!(settings.db_path().ends_with("data/t.db"));
    }
}
