//! Derived values handed to the reporting collaborator

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::aggregator::AggregateResult;

const UNDETECTED_VERSION: &str = "undetected";
const UNKNOWN_SYSTEM: &str = "Unknown";

/// Aggregate totals plus timing and run metadata
#[derive(Clone, Debug, Serialize)]
pub struct ReportSummary {
    pub aggregate: AggregateResult,
    pub elapsed_ms: u64,
    pub class_count: usize,
    pub version: Option<String>,
    pub test_system_id: Option<String>,
    pub finished_at: DateTime<Local>,
}

impl ReportSummary {
    pub fn new(aggregate: AggregateResult, elapsed: Duration, class_count: usize) -> Self {
        Self {
            aggregate,
            elapsed_ms: elapsed.as_millis() as u64,
            class_count,
            version: None,
            test_system_id: None,
            finished_at: Local::now(),
        }
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn with_test_system_id(mut self, id: Option<String>) -> Self {
        self.test_system_id = id;
        self
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }

    /// Whole minutes of the elapsed time
    pub fn minutes(&self) -> u64 {
        (self.elapsed_secs() / 60.0).floor() as u64
    }

    /// Remaining seconds, rounded to a whole number
    pub fn seconds(&self) -> u64 {
        (self.elapsed_secs() - (self.minutes() * 60) as f64).round() as u64
    }

    pub fn time_text(&self) -> String {
        format!("{} minutes and {} seconds", self.minutes(), self.seconds())
    }

    /// Key/value view in the layout report templates expect
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        let agg = &self.aggregate;
        let mut props = BTreeMap::new();
        let mut set = |key: &str, value: String| {
            props.insert(key.to_string(), value);
        };

        set("Runned", agg.runned.to_string());
        set("Failed", agg.failed.to_string());
        set("Passed", agg.passed.to_string());
        set("TCdummy", agg.dummy.to_string());
        set("TCnotapplicable", agg.na.to_string());
        set("Time", self.time_text());
        set("SecondsTime", self.elapsed_secs().to_string());
        set(
            "DateTime",
            self.finished_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        set(
            "Version",
            self.version
                .clone()
                .unwrap_or_else(|| UNDETECTED_VERSION.to_string()),
        );
        set(
            "TSID",
            self.test_system_id
                .clone()
                .unwrap_or_else(|| UNKNOWN_SYSTEM.to_string()),
        );
        set("TCSrunned", self.class_count.to_string());
        props
    }
}
