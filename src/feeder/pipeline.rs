//! Runs a chain of feeders over the raw rows of one test class

use tracing::{debug, info};

use super::{DataFeeder, FeederError, FeederRegistry, FeederSpec, IdentityFeeder};
use crate::models::ParameterArray;

/// One feeder together with the call-order contract it must follow
pub(crate) struct FeederStage {
    feeder: Box<dyn DataFeeder>,
    declared_runs: Option<usize>,
}

impl FeederStage {
    pub(crate) fn new(feeder: Box<dyn DataFeeder>) -> Self {
        Self {
            feeder,
            declared_runs: None,
        }
    }

    pub(crate) fn init(&mut self, class_name: &str, config: &str) -> Result<(), FeederError> {
        self.feeder.init(class_name, config)
    }

    pub(crate) fn calculate_runs(
        &mut self,
        class_name: &str,
        input_rows: usize,
    ) -> Result<usize, FeederError> {
        let runs = self.feeder.calculate_runs(class_name, input_rows)?;
        self.declared_runs = Some(runs);
        Ok(runs)
    }

    pub(crate) fn calculate_parameter_array(
        &mut self,
        class_name: &str,
        input: ParameterArray,
    ) -> Result<ParameterArray, FeederError> {
        let declared = self.declared_runs.ok_or_else(|| FeederError::CallOrder {
            feeder: self.feeder.tag().to_string(),
            class: class_name.to_string(),
        })?;

        let output = self.feeder.calculate_parameter_array(class_name, input)?;
        if output.len() != declared {
            return Err(FeederError::ConfigurationMismatch {
                feeder: self.feeder.tag().to_string(),
                class: class_name.to_string(),
                declared,
                produced: output.len(),
            });
        }
        Ok(output)
    }
}

/// Resolves per-class parameter rows through the registered feeders
pub struct FeederPipeline<'a> {
    registry: &'a FeederRegistry,
}

impl<'a> FeederPipeline<'a> {
    pub fn new(registry: &'a FeederRegistry) -> Self {
        Self { registry }
    }

    /// Apply `chain` in order; an empty chain passes rows through
    pub fn resolve(
        &self,
        class_name: &str,
        input: ParameterArray,
        chain: &[FeederSpec],
    ) -> Result<ParameterArray, FeederError> {
        if chain.is_empty() {
            return Self::run_stage(
                FeederStage::new(Box::new(IdentityFeeder)),
                class_name,
                "",
                input,
            );
        }

        let mut current = input;
        for spec in chain {
            let feeder = self.registry.create(&spec.kind)?;
            current = Self::run_stage(FeederStage::new(feeder), class_name, &spec.config, current)?;
        }

        info!(
            "Resolved {} parameter rows for {} through {} feeder(s)",
            current.len(),
            class_name,
            chain.len()
        );
        Ok(current)
    }

    fn run_stage(
        mut stage: FeederStage,
        class_name: &str,
        config: &str,
        input: ParameterArray,
    ) -> Result<ParameterArray, FeederError> {
        stage.init(class_name, config)?;
        let runs = stage.calculate_runs(class_name, input.len())?;
        debug!(
            feeder = stage.feeder.tag(),
            "{}: {} input rows -> {} runs",
            class_name,
            input.len(),
            runs
        );
        stage.calculate_parameter_array(class_name, input)
    }
}
