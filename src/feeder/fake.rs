//! Feeder that hands a single configuration value to the test class
//!
//! Rows pass through unchanged. The configuration string lands in the
//! shared [`DataStorage`] under `XFakeDataFeeder-<class>`, so a later fake
//! feeder in the same chain wins.

use super::{DataFeeder, DataStorage, FeederError};
use crate::models::ParameterArray;

const STORAGE_PREFIX: &str = "XFakeDataFeeder-";

#[derive(Debug)]
pub struct FakeDataFeeder {
    storage: DataStorage,
    parameter: String,
}

impl FakeDataFeeder {
    pub fn new(storage: DataStorage) -> Self {
        Self {
            storage,
            parameter: String::new(),
        }
    }

    /// Storage key a test class reads its fake parameter from
    pub fn storage_key(class_name: &str) -> String {
        format!("{STORAGE_PREFIX}{class_name}")
    }
}

impl DataFeeder for FakeDataFeeder {
    fn tag(&self) -> &'static str {
        "fake"
    }

    fn init(&mut self, _class_name: &str, config: &str) -> Result<(), FeederError> {
        self.parameter = config.to_string();
        Ok(())
    }

    fn calculate_runs(&mut self, _class_name: &str, input_rows: usize) -> Result<usize, FeederError> {
        Ok(input_rows)
    }

    fn calculate_parameter_array(
        &mut self,
        class_name: &str,
        input: ParameterArray,
    ) -> Result<ParameterArray, FeederError> {
        self.storage
            .put(Self::storage_key(class_name), self.parameter.clone());
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publishes_parameter() {
        let storage = DataStorage::new();
        let mut feeder = FakeDataFeeder::new(storage.clone());
        let input = ParameterArray::from_rows(vec![vec!["a"]]);

        feeder.init("demo.scripted", "env=staging").unwrap();
        assert_eq!(feeder.calculate_runs("demo.scripted", 1).unwrap(), 1);
        let output = feeder
            .calculate_parameter_array("demo.scripted", input.clone())
            .unwrap();

        assert_eq!(output, input);
        assert_eq!(
            storage.get("XFakeDataFeeder-demo.scripted"),
            Some("env=staging".to_string())
        );
    }

    #[test]
    fn test_later_feeder_overwrites() {
        let storage = DataStorage::new();
        for value in ["first", "second"] {
            let mut feeder = FakeDataFeeder::new(storage.clone());
            feeder.init("c", value).unwrap();
            feeder.calculate_runs("c", 0).unwrap();
            feeder
                .calculate_parameter_array("c", ParameterArray::default())
                .unwrap();
        }
        assert_eq!(storage.get(&FakeDataFeeder::storage_key("c")), Some("second".to_string()));
    }
}
