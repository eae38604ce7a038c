use super::{DataFeeder, FeederError};
use crate::models::ParameterArray;

/// Fans every input row out into N consecutive copies
#[derive(Debug, Clone)]
pub struct DuplicateFeeder {
    times: usize,
}

impl Default for DuplicateFeeder {
    fn default() -> Self {
        Self { times: 1 }
    }
}

impl DataFeeder for DuplicateFeeder {
    fn tag(&self) -> &'static str {
        "duplicate"
    }

    fn init(&mut self, class_name: &str, config: &str) -> Result<(), FeederError> {
        let config = config.trim();
        if config.is_empty() {
            return Ok(());
        }
        self.times = match config.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(FeederError::invalid_config(
                    self.tag(),
                    class_name,
                    config,
                    "expected a positive repeat count",
                ))
            }
        };
        Ok(())
    }

    fn calculate_runs(&mut self, class_name: &str, input_rows: usize) -> Result<usize, FeederError> {
        input_rows.checked_mul(self.times).ok_or_else(|| {
            FeederError::invalid_config(
                self.tag(),
                class_name,
                &self.times.to_string(),
                "repeat count too large",
            )
        })
    }

    fn calculate_parameter_array(
        &mut self,
        _class_name: &str,
        input: ParameterArray,
    ) -> Result<ParameterArray, FeederError> {
        let times = self.times;
        let rows = input
            .rows
            .into_iter()
            .flat_map(|row| std::iter::repeat(row).take(times))
            .collect();
        Ok(ParameterArray::new(input.names, rows))
    }
}
