//! Parameter feeder pipeline
//!
//! Expands raw tabular input into the parameter rows actually consumed by
//! execution units. A feeder is a strategy selected by tag from the
//! [`FeederRegistry`]; several feeders may be chained per test class.
//!
//! ## Built-in feeders
//!
//! - `identity` - pass-through
//! - `fake` - pass-through, publishes its config string to [`DataStorage`]
//! - `duplicate` - repeats every row N times
//! - `select` - keeps the listed row indices
//! - `random` - draws N rows with replacement

mod duplicate;
mod fake;
mod identity;
mod loader;
mod pipeline;
mod random;
mod select;
mod storage;

pub use duplicate::DuplicateFeeder;
pub use fake::FakeDataFeeder;
pub use identity::IdentityFeeder;
pub use loader::DataSource;
pub use pipeline::FeederPipeline;
pub use random::RandomFeeder;
pub use select::SelectFeeder;
pub use storage::DataStorage;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::ParameterArray;

/// Feeder pipeline errors
#[derive(Error, Debug)]
pub enum FeederError {
    #[error("Unknown feeder: {0}")]
    UnknownFeeder(String),

    #[error("Invalid configuration '{config}' for feeder {feeder} on {class}: {reason}")]
    InvalidConfig {
        feeder: String,
        class: String,
        config: String,
        reason: String,
    },

    #[error(
        "Feeder {feeder} declared {declared} runs for {class} but produced {produced} rows"
    )]
    ConfigurationMismatch {
        feeder: String,
        class: String,
        declared: usize,
        produced: usize,
    },

    #[error("Feeder {feeder} asked for a parameter array of {class} before its run count")]
    CallOrder { feeder: String, class: String },

    #[error("Failed to read data file {path}: {source}")]
    DataFile {
        path: String,
        #[source]
        source: csv::Error,
    },
}

impl FeederError {
    pub(crate) fn invalid_config(
        feeder: &str,
        class: &str,
        config: &str,
        reason: impl Into<String>,
    ) -> Self {
        FeederError::InvalidConfig {
            feeder: feeder.to_string(),
            class: class.to_string(),
            config: config.to_string(),
            reason: reason.into(),
        }
    }
}

/// Strategy turning input rows into per-run parameter rows
///
/// The pipeline calls `init`, then `calculate_runs`, then
/// `calculate_parameter_array`; the produced array must hold exactly the
/// declared number of rows.
pub trait DataFeeder: Send + Sync {
    /// Registry tag of this feeder
    fn tag(&self) -> &'static str;

    /// Prepare internal state from free-form configuration
    fn init(&mut self, class_name: &str, config: &str) -> Result<(), FeederError>;

    /// Number of execution units to create for `input_rows` rows
    fn calculate_runs(&mut self, class_name: &str, input_rows: usize)
        -> Result<usize, FeederError>;

    /// The transformed row set
    fn calculate_parameter_array(
        &mut self,
        class_name: &str,
        input: ParameterArray,
    ) -> Result<ParameterArray, FeederError>;
}

/// One link of a class's feeder chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeederSpec {
    pub kind: String,
    #[serde(default)]
    pub config: String,
}

impl FeederSpec {
    pub fn new(kind: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            config: config.into(),
        }
    }
}

/// Constructor stored in the registry
pub type FeederFactory = fn(&DataStorage) -> Box<dyn DataFeeder>;

/// Lookup table from feeder tag to constructor
#[derive(Clone)]
pub struct FeederRegistry {
    factories: BTreeMap<String, (FeederFactory, &'static str)>,
    storage: DataStorage,
}

impl FeederRegistry {
    /// Registry without any feeder
    pub fn empty(storage: DataStorage) -> Self {
        Self {
            factories: BTreeMap::new(),
            storage,
        }
    }

    /// Registry with all built-in feeders
    pub fn with_builtins(storage: DataStorage) -> Self {
        Self::empty(storage)
            .register("identity", "Pass rows through unchanged", |_| {
                Box::new(IdentityFeeder)
            })
            .register(
                "fake",
                "Pass rows through, publish config as XFakeDataFeeder-<class>",
                |storage| Box::new(FakeDataFeeder::new(storage.clone())),
            )
            .register("duplicate", "Repeat every row N times (config: N)", |_| {
                Box::new(DuplicateFeeder::default())
            })
            .register(
                "select",
                "Keep listed rows (config: 0,2-4)",
                |_| Box::new(SelectFeeder::default()),
            )
            .register(
                "random",
                "Draw N random rows (config: N or N;seed)",
                |_| Box::new(RandomFeeder::default()),
            )
    }

    pub fn register(
        mut self,
        tag: impl Into<String>,
        description: &'static str,
        factory: FeederFactory,
    ) -> Self {
        self.factories.insert(tag.into(), (factory, description));
        self
    }

    /// Build a fresh feeder for a tag
    pub fn create(&self, tag: &str) -> Result<Box<dyn DataFeeder>, FeederError> {
        self.factories
            .get(tag)
            .map(|(factory, _)| factory(&self.storage))
            .ok_or_else(|| FeederError::UnknownFeeder(tag.to_string()))
    }

    /// Tags and descriptions, sorted by tag
    pub fn list(&self) -> Vec<(&str, &'static str)> {
        self.factories
            .iter()
            .map(|(tag, (_, description))| (tag.as_str(), *description))
            .collect()
    }
}

impl Default for FeederRegistry {
    fn default() -> Self {
        Self::with_builtins(DataStorage::default())
    }
}
