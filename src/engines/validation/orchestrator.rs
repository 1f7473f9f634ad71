use super::out_of_sample::OutOfSampleEvaluator;
use super::ranker::{Ranker, Ranking};
use crate::config::RunConfig;
use crate::engines::evaluation::Backtester;
use crate::engines::generation::Individual;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Out-of-sample results on the testing and validation windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub timestamp: String,
    pub testing: Ranking,
    pub validation: Ranking,
    pub summary: String,
}

/// Replays archived rules on the testing window, ranks them, then re-checks the
/// two chosen candidates on the validation window.
pub struct ValidationOrchestrator {
    evaluator: OutOfSampleEvaluator,
}

impl ValidationOrchestrator {
    pub fn new(backtester: Backtester, parallel: bool) -> Self {
        Self {
            evaluator: OutOfSampleEvaluator::new(backtester, parallel),
        }
    }

    pub fn run(&self, archive: &[Individual], config: &RunConfig) -> Result<ValidationReport> {
        let splits = config.backtesting.unseen_pc_splits;
        let windows = &config.windows;

        let testing_scores = self.evaluator.evaluate(archive, &windows.testing, splits)?;
        let testing = Ranker::rank(
            testing_scores.into_values(),
            self.evaluator.buy_and_hold(&windows.testing),
        );

        let candidates: Vec<Individual> = testing
            .candidates()
            .into_iter()
            .filter_map(|score| {
                archive
                    .iter()
                    .find(|ind| ind.canonical() == score.genome)
                    .cloned()
            })
            .collect();

        let validation_scores = self
            .evaluator
            .evaluate(&candidates, &windows.validation, splits)?;
        let validation = Ranker::rank(
            validation_scores.into_values(),
            self.evaluator.buy_and_hold(&windows.validation),
        );

        let summary = format!(
            "{} of {} rules beat buy & hold ({:.2}%) on testing; {} of {} candidates beat it ({:.2}%) on validation",
            testing.beat_buy_hold,
            testing.entries.len(),
            testing.buy_and_hold_return,
            validation.beat_buy_hold,
            validation.entries.len(),
            validation.buy_and_hold_return,
        );
        log::info!("{}", summary);

        Ok(ValidationReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            testing,
            validation,
            summary,
        })
    }
}
