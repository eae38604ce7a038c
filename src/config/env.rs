//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;
use std::path::PathBuf;

/// Environment variable prefix
const ENV_PREFIX: &str = "UNIT_RUNNER";

/// Configuration read from `UNIT_RUNNER_*` variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// UNIT_RUNNER_TICK_MS
    pub tick_interval_ms: Option<u64>,
    /// UNIT_RUNNER_TIMEOUT
    pub default_timeout_secs: Option<u64>,
    /// UNIT_RUNNER_WORKERS
    pub max_workers: Option<usize>,
    /// UNIT_RUNNER_JOIN_GRACE
    pub join_grace_secs: Option<u64>,
    /// UNIT_RUNNER_LOG
    pub log_level: Option<String>,
    /// UNIT_RUNNER_VERSION
    pub version: Option<String>,
    /// UNIT_RUNNER_TSID
    pub test_system_id: Option<String>,
    /// UNIT_RUNNER_CONFIG
    pub config_file: Option<PathBuf>,
    /// UNIT_RUNNER_FORMAT
    pub format: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            tick_interval_ms: get_env_parse("TICK_MS"),
            default_timeout_secs: get_env_parse("TIMEOUT"),
            max_workers: get_env_parse("WORKERS"),
            join_grace_secs: get_env_parse("JOIN_GRACE"),
            log_level: get_env("LOG"),
            version: get_env("VERSION"),
            test_system_id: get_env("TSID"),
            config_file: get_env("CONFIG").map(PathBuf::from),
            format: get_env("FORMAT"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.tick_interval_ms.is_some()
            || self.default_timeout_secs.is_some()
            || self.max_workers.is_some()
            || self.join_grace_secs.is_some()
            || self.log_level.is_some()
            || self.version.is_some()
            || self.test_system_id.is_some()
            || self.config_file.is_some()
            || self.format.is_some()
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_TICK_MS:     {:?}", ENV_PREFIX, self.tick_interval_ms);
        println!("  {}_TIMEOUT:     {:?}", ENV_PREFIX, self.default_timeout_secs);
        println!("  {}_WORKERS:     {:?}", ENV_PREFIX, self.max_workers);
        println!("  {}_JOIN_GRACE:  {:?}", ENV_PREFIX, self.join_grace_secs);
        println!("  {}_LOG:         {:?}", ENV_PREFIX, self.log_level);
        println!("  {}_VERSION:     {:?}", ENV_PREFIX, self.version);
        println!("  {}_TSID:        {:?}", ENV_PREFIX, self.test_system_id);
        println!("  {}_CONFIG:      {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_FORMAT:      {:?}", ENV_PREFIX, self.format);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.trim().parse().ok())
}

/// Builder for setting environment variables in tests
#[cfg(test)]
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

#[cfg(test)]
impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    fn var(mut self, name: &str, value: impl ToString) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_{name}"), value.to_string()));
        self
    }

    pub fn tick_interval_ms(self, ms: u64) -> Self {
        self.var("TICK_MS", ms)
    }

    pub fn timeout(self, secs: u64) -> Self {
        self.var("TIMEOUT", secs)
    }

    pub fn workers(self, workers: usize) -> Self {
        self.var("WORKERS", workers)
    }

    pub fn log_level(self, level: &str) -> Self {
        self.var("LOG", level)
    }

    pub fn version(self, version: &str) -> Self {
        self.var("VERSION", version)
    }

    pub fn test_system_id(self, id: &str) -> Self {
        self.var("TSID", id)
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

#[cfg(test)]
impl Default for EnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that restores environment variables on drop
#[cfg(test)]
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all UNIT_RUNNER environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_TICK_MS      Heartbeat monitor period in milliseconds");
    println!("  {ENV_PREFIX}_TIMEOUT      Default unit timeout in seconds");
    println!("  {ENV_PREFIX}_WORKERS      Maximum units running at once");
    println!("  {ENV_PREFIX}_JOIN_GRACE   Seconds a cancelled unit may keep running");
    println!("  {ENV_PREFIX}_LOG          Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_VERSION      Version of the system under test");
    println!("  {ENV_PREFIX}_TSID         Test system identifier");
    println!("  {ENV_PREFIX}_CONFIG       Path to configuration file");
    println!("  {ENV_PREFIX}_FORMAT       Output format (table, json, csv, summary)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_WORKERS=8");
    println!("  unit-runner run --plan batch.yaml");
}
