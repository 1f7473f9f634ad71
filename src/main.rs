use anyhow::Context;
use clap::{Parser, Subcommand};
use gptrader::config::{AppConfig, ConfigManager, RunConfig};
use gptrader::data::{CsvConnector, PriceTable};
use gptrader::engines::generation::{
    Checkpoint, ConsoleProgressCallback, EvolutionEngine, EvolutionOutcome,
};
use gptrader::engines::validation::{Ranking, ValidationOrchestrator, ValidationReport};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "gptrader", about = "Evolve and validate GP trading rules")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evolve on the training window, then rank on testing and validation windows
    Run {
        /// CSV with date, close and precomputed indicator columns
        #[arg(long)]
        data: PathBuf,

        /// TOML config file; GPTRADER__SECTION__KEY variables override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Where to write the final checkpoint
        #[arg(long, default_value = "checkpoint.json")]
        checkpoint: PathBuf,

        /// Optional JSON file for the validation report
        #[arg(long)]
        report: Option<PathBuf>,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Override the number of generations
        #[arg(long)]
        generations: Option<usize>,
    },
    /// Continue a checkpointed run
    Resume {
        #[arg(long)]
        data: PathBuf,

        /// Checkpoint to continue from
        #[arg(long)]
        checkpoint: PathBuf,

        /// Additional generations to run
        #[arg(long, default_value = "5")]
        generations: usize,

        /// Where to write the new checkpoint (defaults to overwriting the input)
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Validate config, grammar and data without evolving
    Check {
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            data,
            config,
            checkpoint,
            report,
            seed,
            generations,
        } => {
            let app = load_config(config.as_deref(), seed, generations)?;
            let run_config = Arc::new(RunConfig::from_app(&app)?);
            let table = load_table(&data)?;
            let engine = EvolutionEngine::new(Arc::clone(&run_config), Arc::clone(&table))?;

            let outcome = engine.run(&mut ConsoleProgressCallback)?;
            finish(&engine, outcome, &checkpoint, report.as_deref())
        }
        Command::Resume {
            data,
            checkpoint,
            generations,
            out,
            report,
        } => {
            let saved = Checkpoint::load(&checkpoint)
                .with_context(|| format!("Failed to load checkpoint {}", checkpoint.display()))?;
            let mut run_config = saved.config.clone();
            run_config.evolution.seed = Some(saved.seed);
            let run_config = Arc::new(run_config);
            let table = load_table(&data)?;
            let engine = EvolutionEngine::new(run_config, table)?;

            let outcome = engine.resume(saved, generations, &mut ConsoleProgressCallback)?;
            let target = out.unwrap_or(checkpoint);
            finish(&engine, outcome, &target, report.as_deref())
        }
        Command::Check { data, config } => {
            let app = load_config(config.as_deref(), None, None)?;
            let run_config = Arc::new(RunConfig::from_app(&app)?);
            let frame = CsvConnector::load(&data)?;
            let metadata = CsvConnector::create_metadata(&data, &frame)?;
            let table = Arc::new(CsvConnector::to_price_table(&frame)?);
            EvolutionEngine::new(Arc::clone(&run_config), Arc::clone(&table))?;

            println!("{}", serde_json::to_string_pretty(&metadata)?);
            for (name, window) in [
                ("training", &run_config.windows.training),
                ("testing", &run_config.windows.testing),
                ("validation", &run_config.windows.validation),
            ] {
                println!(
                    "{:<10} {}  rows: {:>5}  buy & hold: {:>8.2}%",
                    name,
                    window,
                    table.window_rows(window).len(),
                    table.buy_and_hold_return(window)
                );
            }
            println!("Configuration, grammar and data are consistent");
            Ok(())
        }
    }
}

fn load_config(
    path: Option<&Path>,
    seed: Option<u64>,
    generations: Option<usize>,
) -> anyhow::Result<AppConfig> {
    let manager = ConfigManager::new();
    if let Some(path) = path {
        manager
            .load_layered(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;
    }
    manager.update(|c| {
        if let Some(seed) = seed {
            c.evolution.seed = Some(seed);
        }
        if let Some(generations) = generations {
            c.evolution.num_generations = generations;
        }
    })?;
    Ok(manager.get()?)
}

fn load_table(path: &Path) -> anyhow::Result<Arc<PriceTable>> {
    let table = CsvConnector::load_price_table(path)
        .with_context(|| format!("Failed to load price data {}", path.display()))?;
    Ok(Arc::new(table))
}

fn finish(
    engine: &EvolutionEngine,
    outcome: EvolutionOutcome,
    checkpoint_path: &Path,
    report_path: Option<&Path>,
) -> anyhow::Result<()> {
    if outcome.stopped_early {
        log::warn!("Run stopped early");
    }
    let state = outcome.state;
    engine.checkpoint(&state).save(checkpoint_path)?;
    log::info!("Checkpoint written to {}", checkpoint_path.display());

    if state.archive.is_empty() {
        log::warn!("Pareto archive is empty; nothing to validate");
        return Ok(());
    }

    let orchestrator =
        ValidationOrchestrator::new(engine.backtester().clone(), engine.config().evolution.parallel);
    let report = orchestrator.run(state.archive.members(), engine.config())?;
    print_report(&report);

    if let Some(path) = report_path {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }
    Ok(())
}

fn print_report(report: &ValidationReport) {
    print_ranking("Testing", &report.testing);
    print_ranking("Validation", &report.validation);
    println!("{}", report.summary);
}

fn print_ranking(title: &str, ranking: &Ranking) {
    println!(
        "\n{} (buy & hold {:.2}%, {} beat it)",
        title, ranking.buy_and_hold_return, ranking.beat_buy_hold
    );
    println!(
        "{:>4} {:>10} {:>10} {:>8} {:>10}  rule",
        "pc", "return%", "train", "sharpe", "vs B&H%"
    );
    for entry in &ranking.entries {
        println!(
            "{:>4} {:>10.2} {:>10.2} {:>8.3} {:>10.2}  {}",
            entry.pc_count,
            entry.percent_return,
            entry.training_score,
            entry.sharpe,
            entry.percent_above_buy_hold,
            entry.genome
        );
    }
    if let Some(best) = &ranking.best_by_pc {
        println!("best by pc:     {}", best.genome);
    }
    if let Some(best) = &ranking.best_by_return {
        println!("best by return: {}", best.genome);
    }
}
