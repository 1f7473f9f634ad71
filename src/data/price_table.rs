use super::window::DateWindow;
use crate::engines::metrics::percent_change;
use crate::error::{GpTraderError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

/// Precomputed indicator column of the price table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndicatorKey {
    Sma(u32),
    Ema(u32),
    Rsi(u32),
    Macd { slow: u32, fast: u32 },
    MacdSignal { signal: u32, slow: u32, fast: u32 },
    /// Stochastic oscillator %K.
    So(u32),
    /// Stochastic oscillator %D (3-period signal of %K).
    SoSignal(u32),
}

impl IndicatorKey {
    pub fn column_name(&self) -> String {
        match self {
            IndicatorKey::Sma(w) => format!("sma_{}", w),
            IndicatorKey::Ema(w) => format!("ema_{}", w),
            IndicatorKey::Rsi(w) => format!("rsi_{}", w),
            IndicatorKey::Macd { slow, fast } => format!("macd_{}_{}", slow, fast),
            IndicatorKey::MacdSignal { signal, slow, fast } => {
                format!("macd_signal_{}_{}_{}", signal, slow, fast)
            }
            IndicatorKey::So(w) => format!("so_{}", w),
            IndicatorKey::SoSignal(w) => format!("so_signal_{}", w),
        }
    }

    /// Parses a column name produced by [`IndicatorKey::column_name`].
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let numbers = |rest: &str| -> Option<Vec<u32>> {
            rest.split('_').map(|p| p.parse::<u32>().ok()).collect()
        };

        if let Some(rest) = name.strip_prefix("macd_signal_") {
            return match numbers(rest)?.as_slice() {
                [signal, slow, fast] => Some(IndicatorKey::MacdSignal {
                    signal: *signal,
                    slow: *slow,
                    fast: *fast,
                }),
                _ => None,
            };
        }
        if let Some(rest) = name.strip_prefix("so_signal_") {
            return rest.parse().ok().map(IndicatorKey::SoSignal);
        }
        if let Some(rest) = name.strip_prefix("macd_") {
            return match numbers(rest)?.as_slice() {
                [slow, fast] => Some(IndicatorKey::Macd {
                    slow: *slow,
                    fast: *fast,
                }),
                _ => None,
            };
        }
        let (prefix, rest) = name.split_once('_')?;
        let window = rest.parse().ok()?;
        match prefix {
            "sma" => Some(IndicatorKey::Sma(window)),
            "ema" => Some(IndicatorKey::Ema(window)),
            "rsi" => Some(IndicatorKey::Rsi(window)),
            "so" => Some(IndicatorKey::So(window)),
            _ => None,
        }
    }
}

impl fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.column_name())
    }
}

/// Chronologically ordered close prices plus precomputed indicator columns.
///
/// Produced once by the data-preparation side and shared read-only for the whole
/// run. Dates are strictly ascending and unique; closes are finite and positive.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    closes: Vec<f64>,
    indicators: HashMap<IndicatorKey, Vec<f64>>,
}

impl PriceTable {
    pub fn new(dates: Vec<NaiveDate>, closes: Vec<f64>) -> Result<Self> {
        if dates.len() != closes.len() {
            return Err(GpTraderError::DataLoading(format!(
                "{} dates but {} close prices",
                dates.len(),
                closes.len()
            )));
        }
        if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(GpTraderError::DataLoading(format!(
                "Dates must be strictly ascending and unique: {} followed by {}",
                pair[0], pair[1]
            )));
        }
        if let Some((i, close)) = closes
            .iter()
            .enumerate()
            .find(|(_, c)| !c.is_finite() || **c <= 0.0)
        {
            return Err(GpTraderError::DataLoading(format!(
                "Malformed close price {} on {}",
                close, dates[i]
            )));
        }

        Ok(Self {
            dates,
            closes,
            indicators: HashMap::new(),
        })
    }

    pub fn with_indicator(mut self, key: IndicatorKey, values: Vec<f64>) -> Result<Self> {
        self.insert_indicator(key, values)?;
        Ok(self)
    }

    pub fn insert_indicator(&mut self, key: IndicatorKey, values: Vec<f64>) -> Result<()> {
        if values.len() != self.dates.len() {
            return Err(GpTraderError::DataLoading(format!(
                "Indicator {} has {} values for {} rows",
                key,
                values.len(),
                self.dates.len()
            )));
        }
        self.indicators.insert(key, values);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn has_indicator(&self, key: IndicatorKey) -> bool {
        self.indicators.contains_key(&key)
    }

    pub fn indicator_keys(&self) -> Vec<IndicatorKey> {
        let mut keys: Vec<_> = self.indicators.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Indicator value on a row. A missing column or row is a data contract violation.
    pub fn indicator(&self, key: IndicatorKey, row: usize) -> Result<f64> {
        let column = self.indicators.get(&key).ok_or_else(|| {
            GpTraderError::MissingData(format!("Indicator column {} not present", key))
        })?;
        column.get(row).copied().ok_or_else(|| {
            GpTraderError::MissingData(format!("Indicator {} has no row {}", key, row))
        })
    }

    /// Fails with the full list of indicator columns that are absent.
    pub fn ensure_indicators(&self, keys: &[IndicatorKey]) -> Result<()> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|k| !self.has_indicator(**k))
            .map(|k| k.column_name())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GpTraderError::MissingData(format!(
                "Price table lacks indicator columns: {}",
                missing.join(", ")
            )))
        }
    }

    /// Row range whose dates fall inside the inclusive window.
    pub fn window_rows(&self, window: &DateWindow) -> Range<usize> {
        let start = self.dates.partition_point(|d| *d < window.start);
        let end = self.dates.partition_point(|d| *d <= window.end);
        start..end.max(start)
    }

    /// Percentage return of holding from the first to the last close of the window.
    /// Zero when the window holds fewer than two rows.
    pub fn buy_and_hold_return(&self, window: &DateWindow) -> f64 {
        let rows = self.window_rows(window);
        if rows.len() < 2 {
            return 0.0;
        }
        percent_change(self.closes[rows.start], self.closes[rows.end - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, day).unwrap()
    }

    #[test]
    fn test_indicator_key_round_trip_names() {
        let keys = [
            IndicatorKey::Sma(5),
            IndicatorKey::Ema(200),
            IndicatorKey::Rsi(14),
            IndicatorKey::Macd { slow: 26, fast: 12 },
            IndicatorKey::MacdSignal {
                signal: 9,
                slow: 26,
                fast: 12,
            },
            IndicatorKey::So(7),
            IndicatorKey::SoSignal(7),
        ];
        for key in keys {
            assert_eq!(IndicatorKey::parse(&key.column_name()), Some(key));
        }
        assert_eq!(IndicatorKey::parse("close"), None);
        assert_eq!(IndicatorKey::parse("macd_26"), None);
    }

    #[test]
    fn test_rejects_unsorted_dates() {
        let result = PriceTable::new(vec![d(2), d(1)], vec![1.0, 2.0]);
        assert!(matches!(result, Err(GpTraderError::DataLoading(_))));
    }

    #[test]
    fn test_rejects_non_positive_close() {
        let result = PriceTable::new(vec![d(1), d(2)], vec![1.0, 0.0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_window_rows_inclusive() {
        let table = PriceTable::new(vec![d(1), d(3), d(5), d(7)], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(table.window_rows(&DateWindow::new(d(3), d(5))), 1..3);
        assert_eq!(table.window_rows(&DateWindow::new(d(2), d(6))), 1..3);
        assert_eq!(table.window_rows(&DateWindow::new(d(8), d(9))), 4..4);
        assert!((table.buy_and_hold_return(&DateWindow::new(d(1), d(7))) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_indicator_is_reported() {
        let table = PriceTable::new(vec![d(1)], vec![1.0])
            .unwrap()
            .with_indicator(IndicatorKey::Sma(5), vec![1.0])
            .unwrap();
        assert!(table.indicator(IndicatorKey::Sma(5), 0).is_ok());
        assert!(matches!(
            table.indicator(IndicatorKey::Ema(5), 0),
            Err(GpTraderError::MissingData(_))
        ));
        let err = table
            .ensure_indicators(&[IndicatorKey::Sma(5), IndicatorKey::Rsi(14)])
            .unwrap_err();
        assert!(err.to_string().contains("rsi_14"));
    }
}
