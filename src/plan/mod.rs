//! Batch plan input
//!
//! A plan lists the test classes of a batch together with their data rows,
//! feeder chain and blocker settings. Expanding a plan runs every class
//! through the feeder pipeline and yields one execution unit per resolved row.
//!
//! ```yaml
//! classes:
//!   - class: demo.scripted
//!     name: Smoke
//!     id: "1.001"
//!     blocker: db
//!     rows:
//!       - [pass, "200"]
//!       - [fail, "100"]
//!     feeders:
//!       - kind: duplicate
//!         config: "2"
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::read_document;
use crate::feeder::{DataSource, FeederError, FeederPipeline, FeederRegistry, FeederSpec};
use crate::models::{ExecutionUnit, ParameterRow};

/// Reasons a plan cannot be turned into units
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Class {0} appears more than once in the plan")]
    DuplicateClass(String),

    #[error("Class {0} sets both rows and data_file")]
    AmbiguousData(String),

    #[error("Invalid delimiter {delimiter:?} for class {class}: expected one ASCII character")]
    InvalidDelimiter { class: String, delimiter: String },

    #[error("Class {0} sets timeout_secs to 0")]
    InvalidTimeout(String),

    #[error(transparent)]
    Feeder(#[from] FeederError),
}

/// One test class of a batch
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassPlan {
    pub class: String,

    /// Script name shown in reports
    #[serde(default)]
    pub name: Option<String>,

    /// Script id shown in reports
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    /// Overrides the configured default timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub blocker: Option<String>,

    #[serde(default)]
    pub self_enabled_blocker: bool,

    #[serde(default)]
    pub rows: Option<Vec<Vec<String>>>,

    /// Delimited file, relative paths resolve against the plan file
    #[serde(default)]
    pub data_file: Option<PathBuf>,

    #[serde(default)]
    pub delimiter: Option<String>,

    #[serde(default)]
    pub feeders: Vec<FeederSpec>,
}

impl ClassPlan {
    #[cfg(test)]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub fn with_rows<R, S>(mut self, rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows = Some(
            rows.into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
        );
        self
    }

    #[cfg(test)]
    pub fn with_feeder(mut self, kind: impl Into<String>, config: impl Into<String>) -> Self {
        self.feeders.push(FeederSpec::new(kind, config));
        self
    }

    #[cfg(test)]
    pub fn with_blocker(mut self, group: impl Into<String>, self_enabled: bool) -> Self {
        self.blocker = Some(group.into());
        self.self_enabled_blocker = self_enabled;
        self
    }

    fn source(&self, base_dir: Option<&Path>) -> Result<DataSource, PlanError> {
        match (&self.rows, &self.data_file) {
            (Some(_), Some(_)) => Err(PlanError::AmbiguousData(self.class.clone())),
            (Some(rows), None) => Ok(DataSource::Inline(rows.clone())),
            (None, Some(path)) => {
                let path = match base_dir {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => path.clone(),
                };
                Ok(DataSource::File {
                    path,
                    delimiter: self.delimiter_byte()?,
                })
            }
            (None, None) => Ok(DataSource::None),
        }
    }

    fn delimiter_byte(&self) -> Result<u8, PlanError> {
        let Some(delimiter) = &self.delimiter else {
            return Ok(b',');
        };
        let bytes = match delimiter.as_str() {
            "\\t" | "tab" => return Ok(b'\t'),
            other => other.as_bytes(),
        };
        match bytes {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(PlanError::InvalidDelimiter {
                class: self.class.clone(),
                delimiter: delimiter.clone(),
            }),
        }
    }

    /// Per-class timeout override; zero is rejected
    fn timeout(&self) -> Result<Option<Duration>, PlanError> {
        match self.timeout_secs {
            Some(0) => Err(PlanError::InvalidTimeout(self.class.clone())),
            secs => Ok(secs.map(Duration::from_secs)),
        }
    }

    fn build_unit(
        &self,
        row: usize,
        params: ParameterRow,
        default_timeout: Duration,
        timeout: Option<Duration>,
    ) -> ExecutionUnit {
        let mut unit = ExecutionUnit::new(&self.class, row, params, default_timeout);
        if let Some(timeout) = timeout {
            unit = unit.with_timeout(timeout);
        }
        if self.name.is_some() || self.id.is_some() {
            let name = self
                .name
                .clone()
                .unwrap_or_else(|| unit.script_name().to_string());
            let id = self
                .id
                .clone()
                .unwrap_or_else(|| unit.script_id().to_string());
            unit = unit.with_script(name, id);
        }
        if let Some(url) = &self.url {
            unit = unit.with_test_url(url);
        }
        if let Some(group) = &self.blocker {
            unit = unit.with_blocker(group, self.self_enabled_blocker);
        }
        unit
    }
}

/// All classes of one batch, in submission order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    #[serde(default)]
    pub classes: Vec<ClassPlan>,

    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl BatchPlan {
    #[cfg(test)]
    pub fn new(classes: Vec<ClassPlan>) -> Self {
        Self {
            classes,
            base_dir: None,
        }
    }

    /// Load a plan from a YAML or JSON file, chosen by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut plan: Self = read_document(path, "plan")?;
        plan.base_dir = path.parent().map(Path::to_path_buf);
        info!(
            "Loaded plan {} with {} class(es)",
            path.display(),
            plan.classes.len()
        );
        Ok(plan)
    }

    /// Resolve every class into execution units
    ///
    /// Any loading or feeder error aborts the whole batch.
    pub fn expand(
        &self,
        registry: &FeederRegistry,
        default_timeout: Duration,
    ) -> Result<Vec<ExecutionUnit>, PlanError> {
        let pipeline = FeederPipeline::new(registry);
        let mut seen = HashSet::new();
        let mut units = Vec::new();

        for class in &self.classes {
            if !seen.insert(class.class.as_str()) {
                return Err(PlanError::DuplicateClass(class.class.clone()));
            }

            let timeout = class.timeout()?;
            let input = class.source(self.base_dir.as_deref())?.load()?;
            let rows = pipeline.resolve(&class.class, input, &class.feeders)?;

            debug!(
                "{}: {} unit(s), timeout {:?}",
                class.class,
                rows.len(),
                timeout.unwrap_or(default_timeout)
            );
            units.extend(
                rows.rows
                    .into_iter()
                    .enumerate()
                    .map(|(row, params)| class.build_unit(row, params, default_timeout, timeout)),
            );
        }

        info!("Expanded plan into {} execution unit(s)", units.len());
        Ok(units)
    }
}
