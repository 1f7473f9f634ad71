use super::traits::ConfigSection;
use crate::error::GpTraderError;
use serde::{Deserialize, Serialize};

/// Terminal sets for the indicator primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    pub ma_windows: Vec<u32>,
    pub ema_windows: Vec<u32>,
    pub rsi_windows: Vec<u32>,
    /// RSI thresholds are the integers `rsi_bound_min..rsi_bound_max`.
    pub rsi_bound_min: i64,
    pub rsi_bound_max: i64,
    pub macd_slow: Vec<u32>,
    pub macd_fast: Vec<u32>,
    pub macd_signal: Vec<u32>,
    pub so_windows: Vec<u32>,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            ma_windows: vec![5, 10, 20, 30, 50, 100, 200],
            ema_windows: vec![5, 12, 26, 30, 50, 100, 200],
            rsi_windows: vec![7, 14, 28],
            rsi_bound_min: 0,
            rsi_bound_max: 100,
            macd_slow: vec![26, 35],
            macd_fast: vec![5, 12],
            macd_signal: vec![5, 9],
            so_windows: vec![7, 14, 28],
        }
    }
}

impl ConfigSection for GrammarConfig {
    fn section_name() -> &'static str {
        "grammar"
    }

    fn validate(&self) -> Result<(), GpTraderError> {
        let windows = [
            ("ma_windows", &self.ma_windows),
            ("ema_windows", &self.ema_windows),
            ("rsi_windows", &self.rsi_windows),
            ("macd_slow", &self.macd_slow),
            ("macd_fast", &self.macd_fast),
            ("macd_signal", &self.macd_signal),
            ("so_windows", &self.so_windows),
        ];
        for (name, values) in windows {
            if values.iter().any(|&w| w == 0) {
                return Err(GpTraderError::Configuration(format!(
                    "{} must only contain positive windows",
                    name
                )));
            }
        }
        if self.rsi_bound_min > self.rsi_bound_max {
            return Err(GpTraderError::Configuration(
                "rsi_bound_min must not exceed rsi_bound_max".to_string(),
            ));
        }
        Ok(())
    }
}
