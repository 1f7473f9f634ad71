use crate::{
    config::BacktestingConfig,
    data::{DateWindow, PriceTable},
    engines::{
        evaluation::{portfolio::SimulationState, ExpressionEvaluator},
        generation::{
            pareto::{FitnessVector, Metric, ObjectiveConfig},
            tree::Node,
        },
        metrics::{percent_change, RiskMetrics},
    },
    error::Result,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Value forced onto trade count and risk exposure when a rule never trades.
pub const NO_TRADE_PENALTY: f64 = 100.0;

/// Every measurable outcome of one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub percent_return: f64,
    pub pc_count: usize,
    pub risk_exposure: f64,
    pub num_trades: f64,
    pub sharpe: f64,
    pub final_balance: f64,
    pub checkpoints_fired: usize,
    pub trading_days: usize,
}

impl SimulationReport {
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::PercentReturn => self.percent_return,
            Metric::PerformanceConsistency => self.pc_count as f64,
            Metric::RiskExposure => self.risk_exposure,
            Metric::NumTrades => self.num_trades,
            Metric::Sharpe => self.sharpe,
        }
    }

    /// Objective values in the order of `objectives`.
    pub fn fitness(&self, objectives: &ObjectiveConfig) -> FitnessVector {
        FitnessVector::new(
            objectives
                .objectives()
                .iter()
                .map(|o| self.metric(o.metric))
                .collect(),
        )
    }

    fn degenerate(starting_balance: f64, trading_days: usize) -> Self {
        Self {
            percent_return: 0.0,
            pc_count: 0,
            risk_exposure: NO_TRADE_PENALTY,
            num_trades: NO_TRADE_PENALTY,
            sharpe: 0.0,
            final_balance: starting_balance,
            checkpoints_fired: 0,
            trading_days,
        }
    }
}

/// Deterministic single-pass simulation of a rule over a price table.
#[derive(Clone)]
pub struct Backtester {
    table: Arc<PriceTable>,
    config: BacktestingConfig,
}

impl Backtester {
    pub fn new(table: Arc<PriceTable>, config: BacktestingConfig) -> Self {
        Self { table, config }
    }

    pub fn table(&self) -> &PriceTable {
        &self.table
    }

    pub fn config(&self) -> &BacktestingConfig {
        &self.config
    }

    /// Score `rule` on `window` as the fitness vector selected by `objectives`.
    pub fn run(
        &self,
        rule: &Node,
        window: &DateWindow,
        objectives: &ObjectiveConfig,
        pc_splits: usize,
    ) -> Result<FitnessVector> {
        Ok(self.simulate(rule, window, pc_splits)?.fitness(objectives))
    }

    /// Simulate `rule` on the rows of `window`. The first row anchors the
    /// consistency baseline and takes the opening decision; risk, returns and
    /// checkpoints are counted on every later row.
    pub fn simulate(&self, rule: &Node, window: &DateWindow, pc_splits: usize) -> Result<SimulationReport> {
        let rows = self.table.window_rows(window);
        let trading_days = rows.len();
        if trading_days < 2 {
            log::warn!(
                "Window {} holds {} rows; nothing to simulate",
                window,
                trading_days
            );
            return Ok(SimulationReport::degenerate(self.config.starting_balance, trading_days));
        }

        let closes = self.table.closes();
        let dates = self.table.dates();
        let checkpoints = window.checkpoints(pc_splits);
        let evaluator = ExpressionEvaluator::new(&self.table);

        let mut state = SimulationState::new(
            self.config.starting_balance,
            closes[rows.start],
            self.config.round_to_cents,
        );
        let mut next_checkpoint = 0;

        // Decision on the anchor row fills at the anchor close
        let invest = evaluator.evaluate_rule(rule, rows.start, state.position)?;
        state.apply_decision(invest, closes[rows.start]);

        for row in rows.start + 1..rows.end {
            let price = closes[row];
            state.mark_to_market(price);

            // At most one checkpoint per tick
            if let Some(&due) = checkpoints.get(next_checkpoint) {
                if dates[row].and_time(NaiveTime::MIN) >= due {
                    state.checkpoint(price);
                    next_checkpoint += 1;
                }
            }

            let invest = evaluator.evaluate_rule(rule, row, state.position)?;
            state.apply_decision(invest, price);

            if state.position {
                state.risk_exposure += 1;
                state.daily_returns.push(percent_change(closes[row - 1], price));
            }
        }

        if state.checkpoints_fired < pc_splits {
            state.checkpoint(closes[rows.end - 1]);
        }
        if state.checkpoints_fired < pc_splits {
            log::warn!(
                "Only {} of {} consistency checkpoints fired on {}",
                state.checkpoints_fired,
                pc_splits,
                window
            );
        }

        let sharpe = RiskMetrics::sharpe_like(
            &state.daily_returns,
            self.config.risk_free_rate,
            trading_days,
        );
        let (num_trades, risk_exposure) = if state.num_trades == 0 {
            (NO_TRADE_PENALTY, NO_TRADE_PENALTY)
        } else {
            (state.num_trades as f64, state.risk_exposure as f64)
        };

        Ok(SimulationReport {
            percent_return: percent_change(self.config.starting_balance, state.balance),
            pc_count: state.pc_count,
            risk_exposure,
            num_trades,
            sharpe,
            final_balance: state.balance,
            checkpoints_fired: state.checkpoints_fired,
            trading_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::IndicatorKey;
    use crate::engines::generation::grammar::PrimitiveOp;
    use crate::engines::generation::pareto::Objective;
    use crate::types::Sort;
    use chrono::{Duration, NaiveDate};

    fn table(closes: &[f64], sma: &[f64]) -> Arc<PriceTable> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let dates = (0..closes.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        Arc::new(
            PriceTable::new(dates, closes.to_vec())
                .unwrap()
                .with_indicator(IndicatorKey::Sma(5), sma.to_vec())
                .unwrap()
                .with_indicator(IndicatorKey::Ema(5), vec![1.0; closes.len()])
                .unwrap(),
        )
    }

    fn window(days: i64) -> DateWindow {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        DateWindow::new(start, start + Duration::days(days))
    }

    // ma(5) > ema(5); ema is pinned at 1.0 so the sma column drives the decision
    fn sma_above_one() -> Node {
        Node::primitive(
            PrimitiveOp::GtFloat,
            vec![
                Node::primitive(
                    PrimitiveOp::Ma,
                    vec![Node::argument(0), Node::terminal(Sort::MaWindow, 5)],
                ),
                Node::primitive(
                    PrimitiveOp::Ema,
                    vec![Node::argument(0), Node::terminal(Sort::EmaWindow, 5)],
                ),
            ],
        )
    }

    #[test]
    fn test_round_trip_trade() {
        // flat, buy at 11, hold, sell at 13, flat
        let closes = [10.0, 11.0, 12.0, 13.0, 12.0];
        let sma = [0.0, 2.0, 2.0, 0.0, 0.0];
        let backtester = Backtester::new(table(&closes, &sma), BacktestingConfig::default());
        let report = backtester.simulate(&sma_above_one(), &window(4), 2).unwrap();

        assert_eq!(report.num_trades, 1.0);
        assert_eq!(report.risk_exposure, 2.0);
        assert!((report.final_balance - 1000.0 * 13.0 / 11.0).abs() < 1e-9);
        let held = [percent_change(10.0, 11.0), percent_change(11.0, 12.0)];
        let expected = RiskMetrics::sharpe_like(&held, 0.05, closes.len());
        assert!((report.sharpe - expected).abs() < 1e-12);
        assert_eq!(report.checkpoints_fired, 2);
    }

    #[test]
    fn test_anchor_row_opens_position() {
        let closes = [10.0, 11.0, 12.0];
        let backtester = Backtester::new(table(&closes, &[2.0; 3]), BacktestingConfig::default());
        let report = backtester.simulate(&sma_above_one(), &window(2), 1).unwrap();

        assert!((report.percent_return - 20.0).abs() < 1e-9);
        assert_eq!(report.num_trades, 1.0);
        assert_eq!(report.risk_exposure, 2.0);
        assert_eq!(report.pc_count, 1);
    }

    #[test]
    fn test_no_trade_penalty() {
        let closes = [10.0, 11.0, 12.0];
        let backtester = Backtester::new(table(&closes, &[0.0; 3]), BacktestingConfig::default());
        let report = backtester.simulate(&sma_above_one(), &window(2), 2).unwrap();
        assert_eq!(report.num_trades, NO_TRADE_PENALTY);
        assert_eq!(report.risk_exposure, NO_TRADE_PENALTY);
        assert_eq!(report.percent_return, 0.0);
        assert_eq!(report.sharpe, 0.0);
    }

    #[test]
    fn test_empty_window_is_degenerate() {
        let closes = [10.0, 11.0];
        let backtester = Backtester::new(table(&closes, &[2.0; 2]), BacktestingConfig::default());
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let report = backtester
            .simulate(&sma_above_one(), &DateWindow::new(start, start), 4)
            .unwrap();
        assert_eq!(report.trading_days, 0);
        assert_eq!(report.num_trades, NO_TRADE_PENALTY);
    }

    #[test]
    fn test_fitness_follows_objective_order() {
        let closes = [10.0, 10.0, 12.0];
        let backtester = Backtester::new(table(&closes, &[2.0; 3]), BacktestingConfig::default());
        let objectives = ObjectiveConfig::new(vec![
            Objective::new(Metric::NumTrades),
            Objective::new(Metric::PercentReturn),
        ]);
        let fitness = backtester
            .run(&sma_above_one(), &window(2), &objectives, 2)
            .unwrap();
        assert_eq!(fitness.get(0), Some(1.0));
        assert!((fitness.get(1).unwrap() - 20.0).abs() < 1e-9);
    }
}
