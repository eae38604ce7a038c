//! Raw row sources for the feeder pipeline

use std::path::{Path, PathBuf};

use super::FeederError;
use crate::models::{ParameterArray, ParameterRow};

/// Where the raw rows of a test class come from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    /// Not data driven: a single empty row
    None,
    Inline(Vec<Vec<String>>),
    File { path: PathBuf, delimiter: u8 },
}

impl DataSource {
    pub fn load(&self) -> Result<ParameterArray, FeederError> {
        match self {
            DataSource::None => Ok(ParameterArray::new(Vec::new(), vec![ParameterRow::default()])),
            DataSource::Inline(rows) => Ok(ParameterArray::from_rows(rows.clone())),
            DataSource::File { path, delimiter } => load_delimited(path, *delimiter),
        }
    }
}

/// Read a delimited file; the first record names the parameters and
/// lines starting with `#` are skipped
pub fn load_delimited(path: impl AsRef<Path>, delimiter: u8) -> Result<ParameterArray, FeederError> {
    let path = path.as_ref();
    let wrap = |source: csv::Error| FeederError::DataFile {
        path: path.display().to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(wrap)?;

    let names = reader
        .headers()
        .map_err(wrap)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(wrap)?;
        rows.push(ParameterRow::new(record.iter()).with_delimiter(char::from(delimiter)));
    }

    Ok(ParameterArray::new(names, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_csv_with_header_and_comments() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "name,value").unwrap();
        writeln!(file, "# skipped").unwrap();
        writeln!(file, "x, 1").unwrap();
        writeln!(file, "y,2").unwrap();

        let array = load_delimited(file.path(), b',').unwrap();
        assert_eq!(array.names, vec!["name", "value"]);
        assert_eq!(array.len(), 2);
        assert_eq!(array.rows[0], ParameterRow::new(["x", "1"]));
        assert_eq!(array.column("value"), Some(1));
    }

    #[test]
    fn test_load_semicolon_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a;b;c").unwrap();
        writeln!(file, "true;false;true").unwrap();

        let array = DataSource::File {
            path: file.path().to_path_buf(),
            delimiter: b';',
        }
        .load()
        .unwrap();
        assert!(array.rows[0].flag(2));
        assert_eq!(array.rows[0].original_line(), "true;false;true");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_delimited("/nonexistent/rows.csv", b','),
            Err(FeederError::DataFile { .. })
        ));
    }

    #[test]
    fn test_not_data_driven() {
        let array = DataSource::None.load().unwrap();
        assert_eq!(array.len(), 1);
        assert!(array.rows[0].is_empty());
    }
}
