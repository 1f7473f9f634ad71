pub mod orchestrator;
pub mod out_of_sample;
pub mod ranker;

pub use orchestrator::{ValidationOrchestrator, ValidationReport};
pub use out_of_sample::{OutOfSampleEvaluator, UnseenScore};
pub use ranker::{Ranker, Ranking};
