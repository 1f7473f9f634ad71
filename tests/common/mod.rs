#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use gptrader::config::{GrammarConfig, RunConfig, WindowsConfig};
use gptrader::config::{BacktestingConfig, EvolutionConfig};
use gptrader::data::{DateWindow, IndicatorKey, PriceTable};
use gptrader::engines::generation::{Grammar, Metric, Objective, ObjectiveConfig};
use std::sync::Arc;

pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// One row per calendar day starting at `start`.
pub fn daily_dates(start: NaiveDate, len: usize) -> Vec<NaiveDate> {
    (0..len).map(|i| start + Duration::days(i as i64)).collect()
}

/// Wavy upward price path; deterministic so runs can be compared.
pub fn synthetic_closes(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let t = i as f64;
            100.0 + 0.05 * t + 8.0 * (t / 17.0).sin() + 3.0 * (t / 5.0).cos()
        })
        .collect()
}

fn trailing_mean(closes: &[f64], window: usize) -> Vec<f64> {
    (0..closes.len())
        .map(|i| {
            let from = (i + 1).saturating_sub(window);
            let slice = &closes[from..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

fn exponential_mean(closes: &[f64], window: usize) -> Vec<f64> {
    let alpha = 2.0 / (window as f64 + 1.0);
    let mut out = Vec::with_capacity(closes.len());
    let mut prev = closes[0];
    for &c in closes {
        prev = alpha * c + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

fn oscillator(len: usize, period: f64, phase: f64) -> Vec<f64> {
    (0..len)
        .map(|i| 50.0 + 45.0 * ((i as f64 + phase) / period).sin())
        .collect()
}

/// Column values good enough to drive rules; real indicator math lives upstream.
pub fn indicator_column(key: IndicatorKey, closes: &[f64]) -> Vec<f64> {
    let len = closes.len();
    match key {
        IndicatorKey::Sma(w) => trailing_mean(closes, w as usize),
        IndicatorKey::Ema(w) => exponential_mean(closes, w as usize),
        IndicatorKey::Rsi(w) => oscillator(len, w as f64, 0.0),
        IndicatorKey::Macd { slow, fast } => {
            let s = exponential_mean(closes, slow as usize);
            let f = exponential_mean(closes, fast as usize);
            f.iter().zip(&s).map(|(f, s)| f - s).collect()
        }
        IndicatorKey::MacdSignal { signal, slow, fast } => {
            let s = exponential_mean(closes, slow as usize);
            let f = exponential_mean(closes, fast as usize);
            let macd: Vec<f64> = f.iter().zip(&s).map(|(f, s)| f - s).collect();
            exponential_mean(&macd, signal as usize)
        }
        IndicatorKey::So(w) => oscillator(len, w as f64, 0.0),
        IndicatorKey::SoSignal(w) => oscillator(len, w as f64, -3.0),
    }
}

/// Price table carrying every indicator column the given grammar can reference.
pub fn table_for_grammar(grammar: &GrammarConfig, start: NaiveDate, len: usize) -> PriceTable {
    let closes = synthetic_closes(len);
    let mut table = PriceTable::new(daily_dates(start, len), closes.clone()).unwrap();
    for key in Grammar::from_config(grammar).required_indicators() {
        table
            .insert_indicator(key, indicator_column(key, &closes))
            .unwrap();
    }
    table
}

/// 2018-01-01 through 2021-01-01, matching the default windows.
pub fn full_table() -> Arc<PriceTable> {
    let start = ymd(2018, 1, 1);
    let len = (ymd(2021, 1, 1) - start).num_days() as usize + 1;
    Arc::new(table_for_grammar(&GrammarConfig::default(), start, len))
}

pub fn objectives(metrics: &[Metric]) -> ObjectiveConfig {
    ObjectiveConfig::new(metrics.iter().map(|&m| Objective::new(m)).collect())
}

pub fn small_run_config(seed: u64, generations: usize) -> RunConfig {
    RunConfig {
        evolution: EvolutionConfig {
            population_size: 10,
            num_generations: generations,
            seed: Some(seed),
            ..Default::default()
        },
        backtesting: BacktestingConfig {
            pc_splits: 12,
            unseen_pc_splits: 6,
            ..Default::default()
        },
        objectives: objectives(&[Metric::PercentReturn, Metric::PerformanceConsistency]),
        grammar: GrammarConfig::default(),
        windows: WindowsConfig::default(),
    }
}

pub fn window(start: NaiveDate, end: NaiveDate) -> DateWindow {
    DateWindow::new(start, end)
}
