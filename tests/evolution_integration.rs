mod common;

use common::{full_table, small_run_config};
use gptrader::data::PriceTable;
use gptrader::engines::generation::pareto::dominates;
use gptrader::engines::generation::{
    ChannelProgressCallback, Checkpoint, EvolutionEngine, GenerationStats, ProgressCallback,
    ProgressMessage,
};
use gptrader::GpTraderError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::Arc;

/// Records what the engine reports
#[derive(Default)]
struct RecordingCallback {
    started: Vec<usize>,
    completed: Vec<usize>,
    evaluated: usize,
}

impl ProgressCallback for RecordingCallback {
    fn on_generation_start(&mut self, generation: usize) {
        self.started.push(generation);
    }

    fn on_generation_complete(&mut self, stats: &GenerationStats) {
        self.completed.push(stats.generation);
    }

    fn on_individual_evaluated(&mut self, _evaluated: usize, _total: usize) {
        self.evaluated += 1;
    }
}

#[test]
fn test_run_completes_requested_generations() {
    let config = Arc::new(small_run_config(11, 4));
    let engine = EvolutionEngine::new(config.clone(), full_table()).unwrap();
    let mut callback = RecordingCallback::default();

    let outcome = engine.run(&mut callback).unwrap();
    let state = outcome.state;

    assert!(!outcome.stopped_early);
    assert_eq!(state.next_generation, 4);
    assert_eq!(state.population.len(), config.evolution.population_size);
    assert!(state.population.iter().all(|ind| ind.is_evaluated()));
    assert_eq!(state.stats.len(), 4);
    assert_eq!(callback.started, vec![0, 1, 2, 3]);
    assert_eq!(callback.completed, vec![0, 1, 2, 3]);
    assert_eq!(
        callback.evaluated,
        state.stats.iter().map(|s| s.evaluations).sum::<usize>()
    );
    // Generation 0 evaluates the whole random population
    assert_eq!(state.stats[0].evaluations, config.evolution.population_size);
}

#[test]
fn test_archive_is_mutually_non_dominated() {
    let config = Arc::new(small_run_config(5, 5));
    let engine = EvolutionEngine::new(config.clone(), full_table()).unwrap();
    let state = engine.run(&mut RecordingCallback::default()).unwrap().state;

    assert!(!state.archive.is_empty());
    let directions = config.objectives.directions();
    let members = state.archive.members();
    for a in members {
        for b in members {
            let (fa, fb) = (a.fitness().unwrap(), b.fitness().unwrap());
            assert!(!dominates(fa.values(), fb.values(), &directions));
        }
    }
    assert_eq!(state.stats.last().unwrap().archive_size, state.archive.len());
}

#[test]
fn test_same_seed_same_outcome() {
    let config = Arc::new(small_run_config(42, 3));
    let table = full_table();

    let first = EvolutionEngine::new(config.clone(), table.clone())
        .unwrap()
        .run(&mut RecordingCallback::default())
        .unwrap();
    let second = EvolutionEngine::new(config, table)
        .unwrap()
        .run(&mut RecordingCallback::default())
        .unwrap();

    assert_eq!(first.state, second.state);
}

#[test]
fn test_worker_pool_does_not_change_results() {
    let table = full_table();
    let mut sequential = small_run_config(9, 3);
    sequential.evolution.parallel = false;
    let mut pooled = small_run_config(9, 3);
    pooled.evolution.worker_threads = Some(2);

    let a = EvolutionEngine::new(Arc::new(sequential), table.clone())
        .unwrap()
        .run(&mut RecordingCallback::default())
        .unwrap();
    let b = EvolutionEngine::new(Arc::new(pooled), table)
        .unwrap()
        .run(&mut RecordingCallback::default())
        .unwrap();

    assert_eq!(a.state.population, b.state.population);
    assert_eq!(a.state.archive, b.state.archive);
}

#[test]
fn test_resume_matches_uninterrupted_run() {
    let table = full_table();
    let uninterrupted = EvolutionEngine::new(Arc::new(small_run_config(21, 4)), table.clone())
        .unwrap()
        .run(&mut RecordingCallback::default())
        .unwrap()
        .state;

    let first_leg = EvolutionEngine::new(Arc::new(small_run_config(21, 2)), table.clone()).unwrap();
    let halfway = first_leg.run(&mut RecordingCallback::default()).unwrap().state;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");
    first_leg.checkpoint(&halfway).save(&path).unwrap();
    let restored = Checkpoint::load(&path).unwrap();
    assert_eq!(restored.next_generation, 2);
    assert_eq!(restored, first_leg.checkpoint(&halfway));

    let second_leg = EvolutionEngine::new(Arc::new(restored.config.clone()), table).unwrap();
    let resumed = second_leg
        .resume(restored, 2, &mut RecordingCallback::default())
        .unwrap()
        .state;

    assert_eq!(resumed, uninterrupted);
}

#[test]
fn test_resume_rejects_different_seed() {
    let table = full_table();
    let engine = EvolutionEngine::new(Arc::new(small_run_config(1, 1)), table.clone()).unwrap();
    let state = engine.run(&mut RecordingCallback::default()).unwrap().state;
    let checkpoint = engine.checkpoint(&state);

    let other = EvolutionEngine::new(Arc::new(small_run_config(2, 1)), table).unwrap();
    let result = other.resume(checkpoint, 1, &mut RecordingCallback::default());
    assert!(matches!(result, Err(GpTraderError::Checkpoint(_))));
}

#[test]
fn test_stop_request_ends_run_at_generation_boundary() {
    let (sender, receiver) = mpsc::channel();
    let mut callback = ChannelProgressCallback::new(sender);
    callback.stop_handle().store(true, Ordering::Relaxed);

    let engine = EvolutionEngine::new(Arc::new(small_run_config(3, 5)), full_table()).unwrap();
    let outcome = engine.run(&mut callback).unwrap();
    drop(callback);

    assert!(outcome.stopped_early);
    assert_eq!(outcome.state.next_generation, 1);

    let messages: Vec<ProgressMessage> = receiver.iter().collect();
    assert_eq!(messages.first(), Some(&ProgressMessage::GenerationStart(0)));
    assert!(messages.iter().any(|m| matches!(
        m,
        ProgressMessage::GenerationComplete(stats) if stats.generation == 0
    )));
    assert!(!messages
        .iter()
        .any(|m| matches!(m, ProgressMessage::GenerationStart(1))));
}

#[test]
fn test_missing_indicator_columns_are_fatal() {
    let start = common::ymd(2018, 1, 1);
    let table = PriceTable::new(
        common::daily_dates(start, 30),
        common::synthetic_closes(30),
    )
    .unwrap();

    let result = EvolutionEngine::new(Arc::new(small_run_config(1, 1)), Arc::new(table));
    assert!(matches!(result.err(), Some(GpTraderError::MissingData(_))));
}

#[test]
fn test_shallow_depth_bound_is_rejected() {
    let mut config = small_run_config(1, 1);
    config.evolution.init_min_depth = 1;
    config.evolution.init_max_depth = 1;

    let result = EvolutionEngine::new(Arc::new(config), full_table());
    assert!(matches!(result.err(), Some(GpTraderError::Generation(_))));
}

#[test]
fn test_crossover_pairs_leave_odd_last_offspring_alone() {
    let mut config = small_run_config(5, 2);
    config.evolution.population_size = 5;
    config.evolution.crossover_rate = 1.0;
    config.evolution.mutation_rate = 0.0;
    let engine = EvolutionEngine::new(Arc::new(config), full_table()).unwrap();
    let state = engine.initialize(&mut RecordingCallback::default()).unwrap();

    let mut rng = StdRng::seed_from_u64(3);
    let offspring = engine.vary(&state.population, &mut rng).unwrap();

    assert_eq!(offspring.len(), 5);
    // Pairs are (0,1) and (2,3); slot 4 has no partner
    assert!(offspring[4].is_evaluated());
    assert_eq!(offspring[4].tree(), state.population[4].tree());
}
