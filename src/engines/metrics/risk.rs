// src/engines/metrics/risk.rs

pub struct RiskMetrics;

impl RiskMetrics {
    /// Sharpe-like ratio over invested-day returns:
    /// `(mean - risk_free_rate / periods) / stdev`. Zero when there are no
    /// returns or they have no variance.
    pub fn sharpe_like(daily_returns: &[f64], risk_free_rate: f64, periods: usize) -> f64 {
        if daily_returns.is_empty() || periods == 0 {
            return 0.0;
        }

        let volatility = Self::std_dev(daily_returns);
        if volatility <= f64::EPSILON {
            return 0.0;
        }

        let avg_return = Self::mean(daily_returns);
        (avg_return - risk_free_rate / periods as f64) / volatility
    }

    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Population standard deviation.
    pub fn std_dev(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }

        let mean = Self::mean(values);
        let variance = values.iter()
            .map(|&v| (v - mean).powi(2))
            .sum::<f64>() / values.len() as f64;

        variance.sqrt()
    }
}
