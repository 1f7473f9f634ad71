use crate::config::RunConfig;
use crate::data::PriceTable;
use crate::engines::evaluation::Backtester;
use crate::engines::generation::{
    archive::ParetoArchive,
    checkpoint::{Checkpoint, CHECKPOINT_VERSION},
    factory::{DepthBounds, TreeFactory},
    grammar::{Grammar, ROOT_SORT},
    individual::Individual,
    pareto::FitnessVector,
    selection::Nsga2Selector,
    stats::GenerationStats,
    tree::Node,
};
use crate::error::{GpTraderError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::Arc;

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    fn on_generation_complete(&mut self, stats: &GenerationStats);
    fn on_individual_evaluated(&mut self, evaluated: usize, total: usize);

    /// Checked at every generation boundary.
    fn should_stop(&self) -> bool {
        false
    }
}

/// Population, archive and history between two generations.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionState {
    pub population: Vec<Individual>,
    pub archive: ParetoArchive,
    pub stats: Vec<GenerationStats>,
    pub next_generation: usize,
}

#[derive(Debug, Clone)]
pub struct EvolutionOutcome {
    pub state: EvolutionState,
    pub stopped_early: bool,
}

pub struct EvolutionEngine {
    config: Arc<RunConfig>,
    factory: TreeFactory,
    backtester: Backtester,
    selector: Nsga2Selector,
    pool: Option<rayon::ThreadPool>,
    seed: u64,
}

impl EvolutionEngine {
    /// Validates the grammar against both depth bounds and the price table against
    /// the grammar's indicator needs. Either failure is fatal.
    pub fn new(config: Arc<RunConfig>, table: Arc<PriceTable>) -> Result<Self> {
        let grammar = Grammar::from_config(&config.grammar);
        grammar.validate(config.evolution.init_max_depth)?;
        grammar.validate(config.evolution.mutation_max_depth)?;
        table.ensure_indicators(&grammar.required_indicators())?;

        let pool = match config.evolution.worker_threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| {
                        GpTraderError::Configuration(format!("Failed to build worker pool: {}", e))
                    })?,
            ),
            None => None,
        };

        let seed = config.evolution.seed.unwrap_or_else(rand::random);
        log::info!("Evolution seed: {}", seed);

        Ok(Self {
            factory: TreeFactory::new(Arc::new(grammar)),
            backtester: Backtester::new(table, config.backtesting.clone()),
            selector: Nsga2Selector::new(config.objectives.directions()),
            pool,
            seed,
            config,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn backtester(&self) -> &Backtester {
        &self.backtester
    }

    pub fn factory(&self) -> &TreeFactory {
        &self.factory
    }

    /// Run the configured number of generations from scratch.
    pub fn run<C: ProgressCallback>(&self, callback: &mut C) -> Result<EvolutionOutcome> {
        let state = self.initialize(callback)?;
        self.advance(state, self.config.evolution.num_generations, callback)
    }

    /// Continue a checkpointed run for `additional_generations` more generations.
    pub fn resume<C: ProgressCallback>(
        &self,
        checkpoint: Checkpoint,
        additional_generations: usize,
        callback: &mut C,
    ) -> Result<EvolutionOutcome> {
        if checkpoint.seed != self.seed {
            return Err(GpTraderError::Checkpoint(format!(
                "Checkpoint seed {} does not match engine seed {}",
                checkpoint.seed, self.seed
            )));
        }
        if checkpoint.config.objectives != self.config.objectives {
            return Err(GpTraderError::Checkpoint(
                "Checkpoint was produced with different objectives".to_string(),
            ));
        }

        let target = checkpoint.next_generation + additional_generations;
        let state = EvolutionState {
            population: checkpoint.population,
            archive: checkpoint.archive,
            stats: checkpoint.stats,
            next_generation: checkpoint.next_generation,
        };
        log::info!(
            "Resuming at generation {} for {} more generations",
            state.next_generation,
            additional_generations
        );
        self.advance(state, target, callback)
    }

    /// Generation 0: random population, evaluated and ordered by the selector.
    pub fn initialize<C: ProgressCallback>(&self, callback: &mut C) -> Result<EvolutionState> {
        callback.on_generation_start(0);
        let mut rng = self.generation_rng(0);
        let bounds = DepthBounds::new(
            self.config.evolution.init_min_depth,
            self.config.evolution.init_max_depth,
        );

        let mut population = (0..self.config.evolution.population_size)
            .map(|_| {
                self.factory
                    .generate(ROOT_SORT, bounds, &mut rng)
                    .map(Individual::new)
            })
            .collect::<Result<Vec<_>>>()?;

        let evaluations = self.evaluate_invalid(&mut population, callback)?;
        let size = population.len();
        let population = self.selector.select(population, size)?;
        let archive = ParetoArchive::new(self.config.objectives.directions());

        let stats = GenerationStats::compute(
            0,
            evaluations,
            &population,
            &self.config.objectives,
            archive.len(),
        );
        callback.on_generation_complete(&stats);

        Ok(EvolutionState {
            population,
            archive,
            stats: vec![stats],
            next_generation: 1,
        })
    }

    /// Run generations until `state.next_generation == until` or the callback
    /// asks to stop.
    pub fn advance<C: ProgressCallback>(
        &self,
        mut state: EvolutionState,
        until: usize,
        callback: &mut C,
    ) -> Result<EvolutionOutcome> {
        while state.next_generation < until {
            if callback.should_stop() {
                log::info!("Stop requested before generation {}", state.next_generation);
                return Ok(EvolutionOutcome {
                    state,
                    stopped_early: true,
                });
            }
            self.step(&mut state, callback)?;
        }
        Ok(EvolutionOutcome {
            state,
            stopped_early: false,
        })
    }

    /// One generation: vary, evaluate, select, archive.
    pub fn step<C: ProgressCallback>(&self, state: &mut EvolutionState, callback: &mut C) -> Result<()> {
        let generation = state.next_generation;
        callback.on_generation_start(generation);
        let mut rng = self.generation_rng(generation);

        let mut offspring = self.vary(&state.population, &mut rng)?;
        let evaluations = self.evaluate_invalid(&mut offspring, callback)?;

        let mut combined = std::mem::take(&mut state.population);
        combined.extend(offspring);
        state.population = self
            .selector
            .select(combined, self.config.evolution.population_size)?;

        let admitted = state.archive.update(&state.population);
        log::debug!(
            "Generation {}: {} admitted, archive size {}",
            generation,
            admitted,
            state.archive.len()
        );

        let stats = GenerationStats::compute(
            generation,
            evaluations,
            &state.population,
            &self.config.objectives,
            state.archive.len(),
        );
        callback.on_generation_complete(&stats);
        state.stats.push(stats);
        state.next_generation += 1;
        Ok(())
    }

    /// Offspring batch: crossover on consecutive pairs with the crossover rate,
    /// then an independent mutation draw per slot.
    pub fn vary<R: Rng>(&self, population: &[Individual], rng: &mut R) -> Result<Vec<Individual>> {
        let mut offspring = population.to_vec();
        let evolution = &self.config.evolution;

        for i in (1..offspring.len()).step_by(2) {
            if rng.gen::<f64>() < evolution.crossover_rate {
                let (a, b) =
                    self.factory
                        .crossover(offspring[i - 1].tree(), offspring[i].tree(), rng);
                offspring[i - 1].set_tree(a);
                offspring[i].set_tree(b);
            }
        }

        let bounds = DepthBounds::new(evolution.mutation_min_depth, evolution.mutation_max_depth);
        for child in offspring.iter_mut() {
            if rng.gen::<f64>() < evolution.mutation_rate {
                let mutant = self.factory.mutate(child.tree(), bounds, rng)?;
                child.set_tree(mutant);
            }
        }

        Ok(offspring)
    }

    /// Backtest every individual without cached fitness. Returns how many ran.
    pub fn evaluate_invalid<C: ProgressCallback>(
        &self,
        population: &mut [Individual],
        callback: &mut C,
    ) -> Result<usize> {
        let invalid: Vec<usize> = population
            .iter()
            .enumerate()
            .filter(|(_, ind)| !ind.is_evaluated())
            .map(|(i, _)| i)
            .collect();

        let trees: Vec<_> = invalid.iter().map(|&i| population[i].tree()).collect();
        let fitnesses = self.evaluate_trees(&trees)?;

        let total = invalid.len();
        for (done, (index, fitness)) in invalid.into_iter().zip(fitnesses).enumerate() {
            population[index].set_fitness(fitness);
            callback.on_individual_evaluated(done + 1, total);
        }
        Ok(total)
    }

    fn evaluate_trees(&self, trees: &[&Node]) -> Result<Vec<FitnessVector>> {
        let window = &self.config.windows.training;
        let objectives = &self.config.objectives;
        let splits = self.config.backtesting.pc_splits;
        let evaluate = |tree: &&Node| {
            self.backtester
                .run(tree, window, objectives, splits)
                .map_err(|e| GpTraderError::Evaluation(format!("Backtest of {} failed: {}", tree, e)))
        };

        if !self.config.evolution.parallel {
            return trees.iter().map(evaluate).collect();
        }
        match &self.pool {
            Some(pool) => pool.install(|| trees.par_iter().map(evaluate).collect()),
            None => trees.par_iter().map(evaluate).collect(),
        }
    }

    /// Snapshot the state at a generation boundary.
    pub fn checkpoint(&self, state: &EvolutionState) -> Checkpoint {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            seed: self.seed,
            next_generation: state.next_generation,
            population: state.population.clone(),
            archive: state.archive.clone(),
            stats: state.stats.clone(),
            config: (*self.config).clone(),
        }
    }

    // Independent stream per generation so resumed runs replay identically.
    fn generation_rng(&self, generation: usize) -> StdRng {
        let mixed = self
            .seed
            .wrapping_add((generation as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        StdRng::seed_from_u64(mixed)
    }
}
