pub mod archive;
pub mod checkpoint;
pub mod evolution_engine;
pub mod factory;
pub mod grammar;
pub mod individual;
pub mod pareto;
pub mod progress;
pub mod selection;
pub mod stats;
pub mod tree;

pub use archive::ParetoArchive;
pub use checkpoint::Checkpoint;
pub use evolution_engine::{EvolutionEngine, EvolutionOutcome, EvolutionState, ProgressCallback};
pub use factory::{DepthBounds, TreeFactory};
pub use grammar::{Grammar, PrimitiveOp};
pub use individual::Individual;
pub use pareto::{FitnessVector, Metric, Objective, ObjectiveConfig, OptimizationDirection};
pub use progress::{ChannelProgressCallback, ConsoleProgressCallback, ProgressMessage};
pub use selection::Nsga2Selector;
pub use stats::GenerationStats;
pub use tree::Node;
