use super::{
    backtesting::BacktestingConfig, evolution::EvolutionConfig, grammar::GrammarConfig,
    manager::AppConfig, windows::WindowsConfig,
};
use crate::engines::generation::pareto::ObjectiveConfig;
use crate::error::GpTraderError;
use serde::{Deserialize, Serialize};

/// Validated, immutable parameters of one run. Shared read-only by every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub evolution: EvolutionConfig,
    pub backtesting: BacktestingConfig,
    pub objectives: ObjectiveConfig,
    pub grammar: GrammarConfig,
    pub windows: WindowsConfig,
}

impl RunConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, GpTraderError> {
        config.validate()?;
        Ok(Self {
            evolution: config.evolution.clone(),
            backtesting: config.backtesting.clone(),
            objectives: config.objectives.resolve()?,
            grammar: config.grammar.clone(),
            windows: config.windows.clone(),
        })
    }
}

impl TryFrom<&AppConfig> for RunConfig {
    type Error = GpTraderError;

    fn try_from(config: &AppConfig) -> Result<Self, Self::Error> {
        Self::from_app(config)
    }
}
