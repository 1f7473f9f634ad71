pub mod traits;
pub mod evolution;
pub mod backtesting;
pub mod objectives;
pub mod grammar;
pub mod windows;
pub mod manager;
pub mod run;

pub use manager::{AppConfig, ConfigManager};
pub use evolution::EvolutionConfig;
pub use backtesting::BacktestingConfig;
pub use objectives::{ObjectiveSpec, ObjectivesConfig};
pub use grammar::GrammarConfig;
pub use windows::WindowsConfig;
pub use run::RunConfig;
