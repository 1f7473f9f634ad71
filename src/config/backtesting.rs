use super::traits::ConfigSection;
use crate::error::GpTraderError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestingConfig {
    pub starting_balance: f64,
    /// Annual risk-free rate used by the Sharpe-like ratio.
    pub risk_free_rate: f64,
    /// Performance consistency checkpoints on the training window.
    pub pc_splits: usize,
    /// Performance consistency checkpoints on testing and validation windows.
    pub unseen_pc_splits: usize,
    /// Round the balance to two decimals after every update.
    pub round_to_cents: bool,
}

impl Default for BacktestingConfig {
    fn default() -> Self {
        Self {
            starting_balance: 1000.0,
            risk_free_rate: 0.05,
            pc_splits: 24,
            unseen_pc_splits: 24,
            round_to_cents: false,
        }
    }
}

impl ConfigSection for BacktestingConfig {
    fn section_name() -> &'static str {
        "backtesting"
    }

    fn validate(&self) -> Result<(), GpTraderError> {
        if !(self.starting_balance > 0.0) {
            return Err(GpTraderError::Configuration(
                "Starting balance must be positive".to_string(),
            ));
        }
        if self.pc_splits == 0 || self.unseen_pc_splits == 0 {
            return Err(GpTraderError::Configuration(
                "Performance consistency splits must be at least 1".to_string(),
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(GpTraderError::Configuration(
                "Risk-free rate must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
