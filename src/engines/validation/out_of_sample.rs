use crate::data::DateWindow;
use crate::engines::evaluation::Backtester;
use crate::engines::generation::Individual;
use crate::engines::metrics::percent_above_benchmark;
use crate::error::{GpTraderError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Result of replaying one genome on an unseen window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnseenScore {
    pub genome: String,
    pub pc_count: usize,
    pub percent_return: f64,
    /// First training objective of the individual, 0 when it carries none.
    pub training_score: f64,
    pub sharpe: f64,
    pub percent_above_buy_hold: f64,
}

/// Re-scores individuals on a window they were not trained on.
pub struct OutOfSampleEvaluator {
    backtester: Backtester,
    parallel: bool,
}

impl OutOfSampleEvaluator {
    pub fn new(backtester: Backtester, parallel: bool) -> Self {
        Self {
            backtester,
            parallel,
        }
    }

    /// Buy & hold percentage return over `window`.
    pub fn buy_and_hold(&self, window: &DateWindow) -> f64 {
        self.backtester.table().buy_and_hold_return(window)
    }

    /// Scores keyed by canonical genome. Each distinct genome is simulated once;
    /// for duplicates the first occurrence supplies the training score.
    pub fn evaluate(
        &self,
        individuals: &[Individual],
        window: &DateWindow,
        pc_splits: usize,
    ) -> Result<BTreeMap<String, UnseenScore>> {
        let mut seen = HashSet::new();
        let unique: Vec<(String, &Individual)> = individuals
            .iter()
            .filter_map(|ind| {
                let genome = ind.canonical();
                seen.insert(genome.clone()).then_some((genome, ind))
            })
            .collect();

        let buy_and_hold = self.buy_and_hold(window);
        let score = |(genome, individual): &(String, &Individual)| -> Result<UnseenScore> {
            let report = self
                .backtester
                .simulate(individual.tree(), window, pc_splits)
                .map_err(|e| {
                    GpTraderError::Evaluation(format!("Unseen backtest of {} failed: {}", genome, e))
                })?;
            Ok(UnseenScore {
                genome: genome.clone(),
                pc_count: report.pc_count,
                percent_return: report.percent_return,
                training_score: individual.fitness().and_then(|f| f.get(0)).unwrap_or(0.0),
                sharpe: report.sharpe,
                percent_above_buy_hold: percent_above_benchmark(report.percent_return, buy_and_hold),
            })
        };

        let scores: Vec<UnseenScore> = if self.parallel {
            unique.par_iter().map(score).collect::<Result<_>>()?
        } else {
            unique.iter().map(score).collect::<Result<_>>()?
        };

        log::info!(
            "Evaluated {} distinct genomes ({} given) on {}",
            scores.len(),
            individuals.len(),
            window
        );
        Ok(scores.into_iter().map(|s| (s.genome.clone(), s)).collect())
    }
}
