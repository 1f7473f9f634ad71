pub mod backtester;
pub mod expression;
pub mod portfolio;

pub use backtester::{Backtester, SimulationReport, NO_TRADE_PENALTY};
pub use expression::ExpressionEvaluator;
pub use portfolio::{SimulationState, TradeAction};
