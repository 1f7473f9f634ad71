use super::archive::ParetoArchive;
use super::individual::Individual;
use super::stats::GenerationStats;
use crate::config::RunConfig;
use crate::error::{GpTraderError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub const CHECKPOINT_VERSION: u32 = 1;

/// Snapshot of a run taken at a generation boundary.
///
/// The RNG state is `(seed, next_generation)`: every generation draws from a
/// stream derived from both, so resuming replays exactly what an uninterrupted
/// run would have done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub seed: u64,
    pub next_generation: usize,
    pub population: Vec<Individual>,
    pub archive: ParetoArchive,
    pub stats: Vec<GenerationStats>,
    pub config: RunConfig,
}

impl Checkpoint {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let checkpoint: Checkpoint = serde_json::from_reader(reader)?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(GpTraderError::Checkpoint(format!(
                "Unsupported checkpoint version {} (expected {})",
                checkpoint.version, CHECKPOINT_VERSION
            )));
        }
        Ok(checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BacktestingConfig, EvolutionConfig, GrammarConfig, WindowsConfig};
    use crate::engines::generation::pareto::{Metric, Objective, ObjectiveConfig};

    fn checkpoint() -> Checkpoint {
        let objectives = ObjectiveConfig::new(vec![
            Objective::new(Metric::PercentReturn),
            Objective::new(Metric::PerformanceConsistency),
        ]);
        Checkpoint {
            version: CHECKPOINT_VERSION,
            seed: 99,
            next_generation: 3,
            population: Vec::new(),
            archive: ParetoArchive::new(objectives.directions()),
            stats: Vec::new(),
            config: RunConfig {
                evolution: EvolutionConfig::default(),
                backtesting: BacktestingConfig::default(),
                objectives,
                grammar: GrammarConfig::default(),
                windows: WindowsConfig::default(),
            },
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let saved = checkpoint();
        saved.save(&path).unwrap();
        assert_eq!(Checkpoint::load(&path).unwrap(), saved);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let mut stale = checkpoint();
        stale.version = CHECKPOINT_VERSION + 1;
        stale.save(&path).unwrap();
        assert!(matches!(
            Checkpoint::load(&path),
            Err(GpTraderError::Checkpoint(_))
        ));
    }
}
