use super::out_of_sample::UnseenScore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ordered out-of-sample table with the two candidates carried forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub entries: Vec<UnseenScore>,
    pub best_by_pc: Option<UnseenScore>,
    pub best_by_return: Option<UnseenScore>,
    pub buy_and_hold_return: f64,
    pub beat_buy_hold: usize,
}

impl Ranking {
    /// Distinct genomes of the best-by-PC and best-by-return entries.
    pub fn candidates(&self) -> Vec<&UnseenScore> {
        let mut out: Vec<&UnseenScore> = Vec::with_capacity(2);
        for entry in [&self.best_by_pc, &self.best_by_return].into_iter().flatten() {
            if !out.iter().any(|e| e.genome == entry.genome) {
                out.push(entry);
            }
        }
        out
    }
}

pub struct Ranker;

impl Ranker {
    /// Sort by PC count, then return (both descending), then genome text.
    pub fn rank<I>(scores: I, buy_and_hold_return: f64) -> Ranking
    where
        I: IntoIterator<Item = UnseenScore>,
    {
        let mut entries: Vec<UnseenScore> = scores.into_iter().collect();
        entries.sort_by(|a, b| {
            b.pc_count
                .cmp(&a.pc_count)
                .then_with(|| b.percent_return.total_cmp(&a.percent_return))
                .then_with(|| a.genome.cmp(&b.genome))
        });

        let best_by_pc = entries.first().cloned();
        // First maximum in ranked order
        let best_by_return = entries
            .iter()
            .fold(None::<&UnseenScore>, |best, entry| match best {
                Some(b) if b.percent_return.total_cmp(&entry.percent_return) != Ordering::Less => {
                    Some(b)
                }
                _ => Some(entry),
            })
            .cloned();
        // Return strictly above buy & hold; agrees with a positive excess
        // whenever the benchmark is non-zero
        let beat_buy_hold = entries
            .iter()
            .filter(|e| e.percent_return > buy_and_hold_return)
            .count();

        Ranking {
            entries,
            best_by_pc,
            best_by_return,
            buy_and_hold_return,
            beat_buy_hold,
        }
    }
}
