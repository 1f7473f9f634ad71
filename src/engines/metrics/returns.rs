/// Percentage change from `from` to `to`. Zero when `from` is zero.
pub fn percent_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        return 0.0;
    }
    (to - from) / from * 100.0
}

/// How far a strategy's return sits above a benchmark return, relative to the
/// benchmark's magnitude, in percent. Positive exactly when the strategy beat a
/// non-zero benchmark; zero when the benchmark return is zero.
pub fn percent_above_benchmark(strategy_return: f64, benchmark_return: f64) -> f64 {
    if benchmark_return == 0.0 {
        return 0.0;
    }
    (strategy_return - benchmark_return) / benchmark_return.abs() * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_change() {
        assert!((percent_change(100.0, 110.0) - 10.0).abs() < 1e-12);
        assert_eq!(percent_change(0.0, 5.0), 0.0);
    }

    #[test]
    fn test_percent_above_benchmark() {
        assert!((percent_above_benchmark(30.0, 20.0) - 50.0).abs() < 1e-12);
        // Beating a falling benchmark is still a positive excess
        assert!((percent_above_benchmark(10.0, -20.0) - 150.0).abs() < 1e-12);
        assert!(percent_above_benchmark(-30.0, -20.0) < 0.0);
        assert_eq!(percent_above_benchmark(10.0, 0.0), 0.0);
    }
}
