pub mod returns;
pub mod risk;

pub use returns::{percent_above_benchmark, percent_change};
pub use risk::RiskMetrics;
