//! Output formatters for batch results
//!
//! Provides table, JSON, CSV and summary output formats.

use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::models::Outcome;
use crate::results::{BatchReport, ReportSummary, UnitReport};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    summary: &'a ReportSummary,
    properties: BTreeMap<String, String>,
    units: &'a [UnitReport],
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format a single unit line
    pub fn format_unit(&self, unit: &UnitReport) -> String {
        let status = match &unit.resolution {
            Some(resolution) => {
                let label = format!("{} {}", resolution.outcome.symbol(), resolution.outcome);
                let label = if resolution.timed_out {
                    format!("{label} (timeout)")
                } else {
                    label
                };
                self.paint(&label, resolution.outcome)
            }
            None => "? UNRESOLVED".to_string(),
        };

        format!(
            "{:30} {:8} {:24} {}",
            unit.id.to_string(),
            unit.script_id,
            truncate(&unit.script_name, 24),
            status
        )
    }

    fn paint(&self, text: &str, outcome: Outcome) -> String {
        if !self.colorize {
            return text.to_string();
        }
        let color = match outcome {
            Outcome::Passed => "32",
            Outcome::Failed => "31",
            Outcome::NotApplicable => "33",
            Outcome::Dummy => "90",
        };
        format!("\x1b[{color}m{text}\x1b[0m")
    }

    /// Format a whole batch
    pub fn format_report(&self, report: &BatchReport, summary: &ReportSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_report_table(report, summary),
            OutputFormat::Json | OutputFormat::JsonPretty => {
                let json = ReportJson {
                    summary,
                    properties: summary.to_properties(),
                    units: &report.units,
                };
                if self.format == OutputFormat::JsonPretty {
                    serde_json::to_string_pretty(&json).unwrap_or_default()
                } else {
                    serde_json::to_string(&json).unwrap_or_default()
                }
            }
            OutputFormat::Csv => self.format_report_csv(report).unwrap_or_default(),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn format_report_table(&self, report: &BatchReport, summary: &ReportSummary) -> String {
        let agg = &summary.aggregate;
        let mut output = String::new();

        output.push_str("\n═══════════════════════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " Batch Results: {} unit(s) in {} class(es)\n",
            report.units.len(),
            summary.class_count
        ));
        output.push_str("═══════════════════════════════════════════════════════════════════════════════\n");

        for unit in &report.units {
            output.push_str(&format!(" {}\n", self.format_unit(unit)));
        }

        output.push_str(" ───────────────────────────────────────────────────────────────────────────────\n");

        let failed = if self.colorize && agg.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", agg.failed)
        } else {
            agg.failed.to_string()
        };
        output.push_str(&format!(
            " Runned: {} | Passed: {} | Failed: {} | N/A: {} | Dummy: {}\n",
            agg.runned, agg.passed, failed, agg.na, agg.dummy
        ));
        if agg.timed_out > 0 || agg.unresolved > 0 {
            output.push_str(&format!(
                " Timed out: {} | Unresolved: {}\n",
                agg.timed_out, agg.unresolved
            ));
        }
        output.push_str(&format!(
            " Pass Rate: {:5.1}% | Time: {}\n",
            agg.pass_rate(),
            summary.time_text()
        ));

        let props = summary.to_properties();
        output.push_str(&format!(
            " Version: {} | Test system: {} | Finished: {}\n",
            props["Version"], props["TSID"], props["DateTime"]
        ));

        output
    }

    fn format_report_csv(&self, report: &BatchReport) -> anyhow::Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "class",
            "row",
            "script_id",
            "script_name",
            "outcome",
            "timed_out",
            "message",
            "original_line",
        ])?;

        for unit in &report.units {
            let (outcome, timed_out, message) = match &unit.resolution {
                Some(r) => (
                    r.outcome.to_string(),
                    r.timed_out.to_string(),
                    r.message.clone().unwrap_or_default(),
                ),
                None => ("UNRESOLVED".to_string(), "false".to_string(), String::new()),
            };
            let row = unit.id.row.to_string();
            writer.write_record([
                unit.id.class_name.as_str(),
                row.as_str(),
                unit.script_id.as_str(),
                unit.script_name.as_str(),
                outcome.as_str(),
                timed_out.as_str(),
                message.as_str(),
                unit.original_line.as_str(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))?;
        Ok(String::from_utf8(bytes)?)
    }

    fn format_summary_brief(&self, summary: &ReportSummary) -> String {
        let agg = &summary.aggregate;
        format!(
            "{}/{} passed ({:.1}%), {} failed, {} N/A, {} dummy in {}",
            agg.passed,
            agg.runned,
            agg.pass_rate(),
            agg.failed,
            agg.na,
            agg.dummy,
            summary.time_text()
        )
    }

    /// Drained output of every unit that produced any
    pub fn format_unit_output(&self, report: &BatchReport) -> String {
        let mut output = String::new();
        for unit in report.units.iter().filter(|u| !u.output.is_empty()) {
            output.push_str(&format!("--- {} ---\n", unit.id));
            output.push_str(&unit.output);
        }
        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Write a batch report to a file
pub fn write_report_to_file(
    path: impl AsRef<Path>,
    report: &BatchReport,
    summary: &ReportSummary,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_report(report, summary);

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
