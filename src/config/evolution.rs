use super::traits::ConfigSection;
use crate::error::GpTraderError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub num_generations: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub init_min_depth: usize,
    pub init_max_depth: usize,
    pub mutation_min_depth: usize,
    pub mutation_max_depth: usize,
    pub seed: Option<u64>,
    /// Size of the dedicated evaluation pool. `None` uses rayon's global pool.
    pub worker_threads: Option<usize>,
    pub parallel: bool,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 8,
            num_generations: 5,
            crossover_rate: 0.4,
            mutation_rate: 0.5,
            init_min_depth: 1,
            init_max_depth: 5,
            mutation_min_depth: 1,
            mutation_max_depth: 6,
            seed: None,
            worker_threads: None,
            parallel: true,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), GpTraderError> {
        if self.population_size < 2 {
            return Err(GpTraderError::Configuration(
                "Population size must be at least 2".to_string(),
            ));
        }
        if self.num_generations == 0 {
            return Err(GpTraderError::Configuration(
                "Number of generations must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(GpTraderError::Configuration(
                "Mutation rate must be between 0 and 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(GpTraderError::Configuration(
                "Crossover rate must be between 0 and 1".to_string(),
            ));
        }
        if self.init_min_depth > self.init_max_depth {
            return Err(GpTraderError::Configuration(format!(
                "init_min_depth ({}) exceeds init_max_depth ({})",
                self.init_min_depth, self.init_max_depth
            )));
        }
        if self.mutation_min_depth > self.mutation_max_depth {
            return Err(GpTraderError::Configuration(format!(
                "mutation_min_depth ({}) exceeds mutation_max_depth ({})",
                self.mutation_min_depth, self.mutation_max_depth
            )));
        }
        if self.worker_threads == Some(0) {
            return Err(GpTraderError::Configuration(
                "worker_threads must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EvolutionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_depths() {
        let config = EvolutionConfig {
            init_min_depth: 6,
            init_max_depth: 2,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(GpTraderError::Configuration(_))));
    }

    #[test]
    fn test_rejects_rates_out_of_range() {
        let config = EvolutionConfig {
            crossover_rate: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
