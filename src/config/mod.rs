//! Configuration module
//!
//! Settings are layered: built-in defaults, then the configuration file,
//! then `UNIT_RUNNER_*` environment variables. Command line flags are
//! applied last by the caller.

mod env;
mod file;

pub use env::{print_env_help, EnvConfig};
pub use file::{read_document, ConfigFile};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::executor::SchedulerConfig;

/// Application configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Heartbeat monitor period in milliseconds
    pub tick_interval_ms: u64,

    /// Timeout for units whose class does not set one
    pub default_timeout_secs: u64,

    /// Maximum units running at once
    pub max_workers: usize,

    /// How long a cancelled unit may keep running before it is abandoned
    pub join_grace_secs: u64,

    pub log_level: String,

    /// Version of the system under test, for reports
    pub version: Option<String>,

    /// Identifier of the test system, for reports
    pub test_system_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            default_timeout_secs: 600,
            max_workers: 4,
            join_grace_secs: 5,
            log_level: "info".to_string(),
            version: None,
            test_system_id: None,
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid by the config file and the environment
    ///
    /// An explicit `path` must exist; otherwise the standard locations are
    /// searched and a missing file is not an error.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let env = EnvConfig::load();
        let file = match path.map(Path::to_path_buf).or_else(|| env.config_file.clone()) {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::load_default()?,
        };

        let mut config = file.app;
        config.apply_env(&env);
        config.validate()?;
        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    /// Overlay the variables that are set
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(tick) = env.tick_interval_ms {
            self.tick_interval_ms = tick;
        }
        if let Some(timeout) = env.default_timeout_secs {
            self.default_timeout_secs = timeout;
        }
        if let Some(workers) = env.max_workers {
            self.max_workers = workers;
        }
        if let Some(grace) = env.join_grace_secs {
            self.join_grace_secs = grace;
        }
        if let Some(level) = &env.log_level {
            self.log_level = level.clone();
        }
        if let Some(version) = &env.version {
            self.version = Some(version.clone());
        }
        if let Some(id) = &env.test_system_id {
            self.test_system_id = Some(id.clone());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms must be greater than zero");
        }
        if self.max_workers == 0 {
            anyhow::bail!("max_workers must be at least 1");
        }
        if self.default_timeout_secs == 0 {
            anyhow::bail!("default_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_workers: self.max_workers,
            tick_interval: self.tick_interval(),
            join_grace: Duration::from_secs(self.join_grace_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.max_workers, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_env_overrides_only_set_values() {
        let mut config = AppConfig::default();
        let env = EnvConfig {
            max_workers: Some(16),
            version: Some("3.1".to_string()),
            ..Default::default()
        };
        config.apply_env(&env);

        assert_eq!(config.max_workers, 16);
        assert_eq!(config.version.as_deref(), Some("3.1"));
        assert_eq!(config.default_timeout_secs, 600);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = AppConfig {
            max_workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scheduler_config() {
        let config = AppConfig {
            tick_interval_ms: 250,
            max_workers: 2,
            join_grace_secs: 1,
            ..Default::default()
        };
        let scheduler = config.scheduler_config();
        assert_eq!(scheduler.max_workers, 2);
        assert_eq!(scheduler.tick_interval, Duration::from_millis(250));
        assert_eq!(scheduler.join_grace, Duration::from_secs(1));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("max_workers: 8\n").unwrap();
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.tick_interval_ms, 1000);
    }
}
