use super::evolution_engine::ProgressCallback;
use super::stats::GenerationStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        log::info!("Generation {} starting...", generation);
    }

    fn on_generation_complete(&mut self, stats: &GenerationStats) {
        let summary: Vec<String> = stats
            .objectives
            .iter()
            .map(|o| format!("{} [{:.3} / {:.3} / {:.3}]", o.metric, o.min, o.mean, o.max))
            .collect();
        log::info!(
            "Generation {} complete. {} evaluations, hypervolume {:.4}, archive size {}",
            stats.generation,
            stats.evaluations,
            stats.hypervolume,
            stats.archive_size
        );
        log::info!("  {}", summary.join(", "));
    }

    fn on_individual_evaluated(&mut self, evaluated: usize, total: usize) {
        if evaluated % 10 == 0 || evaluated == total {
            log::debug!("  Evaluated {}/{} individuals", evaluated, total);
        }
    }
}

/// Messages forwarded by [`ChannelProgressCallback`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart(usize),
    GenerationComplete(GenerationStats),
    IndividualEvaluated { current: usize, total: usize },
}

/// Forwards progress to another thread and lets it request an early stop.
pub struct ChannelProgressCallback {
    sender: Sender<ProgressMessage>,
    stop: Arc<AtomicBool>,
}

impl ChannelProgressCallback {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self {
            sender,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the returned flag stops the run at the next generation boundary.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart(generation));
    }

    fn on_generation_complete(&mut self, stats: &GenerationStats) {
        let _ = self
            .sender
            .send(ProgressMessage::GenerationComplete(stats.clone()));
    }

    fn on_individual_evaluated(&mut self, evaluated: usize, total: usize) {
        let _ = self.sender.send(ProgressMessage::IndividualEvaluated {
            current: evaluated,
            total,
        });
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}
