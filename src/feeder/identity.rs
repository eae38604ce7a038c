use super::{DataFeeder, FeederError};
use crate::models::ParameterArray;

/// Pass-through feeder: one unit per input row, rows unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityFeeder;

impl DataFeeder for IdentityFeeder {
    fn tag(&self) -> &'static str {
        "identity"
    }

    fn init(&mut self, _class_name: &str, _config: &str) -> Result<(), FeederError> {
        Ok(())
    }

    fn calculate_runs(&mut self, _class_name: &str, input_rows: usize) -> Result<usize, FeederError> {
        Ok(input_rows)
    }

    fn calculate_parameter_array(
        &mut self,
        _class_name: &str,
        input: ParameterArray,
    ) -> Result<ParameterArray, FeederError> {
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_runs() {
        let mut feeder = IdentityFeeder;
        assert_eq!(feeder.calculate_runs("c", 5).unwrap(), 5);
        assert_eq!(feeder.calculate_runs("c", 0).unwrap(), 0);
    }

    #[test]
    fn test_identity_array_unchanged() {
        let input = ParameterArray::from_rows(vec![vec!["x", "1"], vec!["y", "2"]]);
        let mut feeder = IdentityFeeder;
        feeder.init("c", "ignored").unwrap();
        let output = feeder.calculate_parameter_array("c", input.clone()).unwrap();
        assert_eq!(output, input);
    }
}
