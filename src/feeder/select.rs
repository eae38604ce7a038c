use super::{DataFeeder, FeederError};
use crate::models::ParameterArray;

/// Collapses the input to the listed row indices, in listed order
///
/// Config is a comma separated list of indices and inclusive ranges,
/// e.g. `0,2-4`.
#[derive(Debug, Clone, Default)]
pub struct SelectFeeder {
    indices: Vec<usize>,
    config: String,
}

impl SelectFeeder {
    fn parse(class_name: &str, config: &str) -> Result<Vec<usize>, FeederError> {
        let invalid =
            |reason: &str| FeederError::invalid_config("select", class_name, config, reason);
        let mut indices = Vec::new();

        for part in config.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('-') {
                Some((start, end)) => {
                    let start: usize = start
                        .trim()
                        .parse()
                        .map_err(|_| invalid("bad range start"))?;
                    let end: usize = end.trim().parse().map_err(|_| invalid("bad range end"))?;
                    if end < start {
                        return Err(invalid("range end before start"));
                    }
                    indices.extend(start..=end);
                }
                None => indices.push(part.parse().map_err(|_| invalid("bad row index"))?),
            }
        }

        if indices.is_empty() {
            return Err(invalid("no rows selected"));
        }
        Ok(indices)
    }
}

impl DataFeeder for SelectFeeder {
    fn tag(&self) -> &'static str {
        "select"
    }

    fn init(&mut self, class_name: &str, config: &str) -> Result<(), FeederError> {
        self.indices = Self::parse(class_name, config)?;
        self.config = config.to_string();
        Ok(())
    }

    fn calculate_runs(&mut self, class_name: &str, input_rows: usize) -> Result<usize, FeederError> {
        if let Some(bad) = self.indices.iter().find(|&&i| i >= input_rows) {
            return Err(FeederError::invalid_config(
                self.tag(),
                class_name,
                &self.config,
                format!("row {bad} out of range, only {input_rows} rows"),
            ));
        }
        Ok(self.indices.len())
    }

    fn calculate_parameter_array(
        &mut self,
        _class_name: &str,
        input: ParameterArray,
    ) -> Result<ParameterArray, FeederError> {
        let rows = self
            .indices
            .iter()
            .filter_map(|&i| input.rows.get(i).cloned())
            .collect();
        Ok(ParameterArray::new(input.names, rows))
    }
}
