use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{DataFeeder, FeederError};
use crate::models::ParameterArray;

/// Draws N rows with replacement; `N;seed` makes the draw reproducible
#[derive(Debug, Clone, Default)]
pub struct RandomFeeder {
    count: usize,
    seed: Option<u64>,
}

impl DataFeeder for RandomFeeder {
    fn tag(&self) -> &'static str {
        "random"
    }

    fn init(&mut self, class_name: &str, config: &str) -> Result<(), FeederError> {
        let invalid =
            |reason: &str| FeederError::invalid_config("random", class_name, config, reason);

        let (count, seed) = match config.split_once(';') {
            Some((count, seed)) => (count, Some(seed)),
            None => (config, None),
        };
        self.count = count
            .trim()
            .parse()
            .map_err(|_| invalid("expected a row count"))?;
        self.seed = seed
            .map(|s| s.trim().parse().map_err(|_| invalid("expected a numeric seed")))
            .transpose()?;
        Ok(())
    }

    fn calculate_runs(&mut self, _class_name: &str, input_rows: usize) -> Result<usize, FeederError> {
        // Nothing to draw from
        if input_rows == 0 {
            return Ok(0);
        }
        Ok(self.count)
    }

    fn calculate_parameter_array(
        &mut self,
        _class_name: &str,
        input: ParameterArray,
    ) -> Result<ParameterArray, FeederError> {
        if input.is_empty() {
            return Ok(input);
        }
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let rows = (0..self.count)
            .map(|_| input.rows[rng.random_range(0..input.rows.len())].clone())
            .collect();
        Ok(ParameterArray::new(input.names, rows))
    }
}
