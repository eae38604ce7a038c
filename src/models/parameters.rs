//! Tabular parameter data consumed by execution units

use serde::{Deserialize, Serialize};

const DEFAULT_DELIMITER: char = ',';

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

/// One resolved parameter row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRow {
    pub values: Vec<String>,

    /// Separator of the source the row was read from
    #[serde(default = "default_delimiter")]
    delimiter: char,
}

impl Default for ParameterRow {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl ParameterRow {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            delimiter: DEFAULT_DELIMITER,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Parameter parsed as a boolean; missing or unparsable values are false
    pub fn flag(&self, index: usize) -> bool {
        self.get(index)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The row as it would appear in the source file
    pub fn original_line(&self) -> String {
        self.values.join(&self.delimiter.to_string())
    }
}

/// Named columns plus the rows feeding a test class
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterArray {
    pub names: Vec<String>,
    pub rows: Vec<ParameterRow>,
}

impl ParameterArray {
    pub fn new(names: Vec<String>, rows: Vec<ParameterRow>) -> Self {
        Self { names, rows }
    }

    /// Build from raw string rows without column names
    pub fn from_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Vec::new(),
            rows: rows.into_iter().map(ParameterRow::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column index for a parameter name
    pub fn column(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_flags() {
        let row = ParameterRow::new(["true", "FALSE", " True ", "x"]);
        assert!(row.flag(0));
        assert!(!row.flag(1));
        assert!(row.flag(2));
        assert!(!row.flag(3));
        assert!(!row.flag(9));
    }

    #[test]
    fn test_original_line() {
        let row = ParameterRow::new(["x", "1"]);
        assert_eq!(row.original_line(), "x,1");

        let row = ParameterRow::new(["pass", "10"]).with_delimiter(';');
        assert_eq!(row.original_line(), "pass;10");
        assert_eq!(ParameterRow::default().original_line(), "");
    }

    #[test]
    fn test_array_from_rows() {
        let array = ParameterArray::from_rows(vec![vec!["x", "1"], vec!["y", "2"]]);
        assert_eq!(array.len(), 2);
        assert_eq!(array.rows[1].get(0), Some("y"));
        assert_eq!(array.column("anything"), None);
    }
}
