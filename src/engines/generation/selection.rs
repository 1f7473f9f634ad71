use super::individual::Individual;
use super::pareto::{
    calculate_crowding_distance, crowding_order, fast_non_dominated_sort, MultiObjectiveIndividual,
    OptimizationDirection,
};
use crate::error::{GpTraderError, Result};

/// Outcome of ranking a pool: chosen indices plus per-member rank and crowding.
#[derive(Debug, Clone)]
pub struct SelectionReport {
    pub selected: Vec<usize>,
    pub ranked: Vec<MultiObjectiveIndividual<usize>>,
    /// Front that had to be truncated, if any.
    pub truncated_front: Option<Vec<usize>>,
}

/// NSGA-II environmental selection.
#[derive(Debug, Clone)]
pub struct Nsga2Selector {
    directions: Vec<OptimizationDirection>,
}

impl Nsga2Selector {
    pub fn new(directions: Vec<OptimizationDirection>) -> Self {
        Self { directions }
    }

    pub fn directions(&self) -> &[OptimizationDirection] {
        &self.directions
    }

    /// Keep `target_size` individuals (or all of them if fewer). Whole fronts are
    /// taken in order; the first overflowing front is cut by descending crowding
    /// distance, ties keeping the original order.
    pub fn select(&self, combined: Vec<Individual>, target_size: usize) -> Result<Vec<Individual>> {
        let objectives = combined
            .iter()
            .map(|individual| {
                individual
                    .fitness()
                    .map(|f| f.values().to_vec())
                    .ok_or_else(|| {
                        GpTraderError::Evaluation(format!(
                            "Cannot select unevaluated individual {}",
                            individual.canonical()
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let report = self.rank(objectives, target_size);
        let mut slots: Vec<Option<Individual>> = combined.into_iter().map(Some).collect();
        Ok(report
            .selected
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect())
    }

    /// Index-level selection over raw objective vectors.
    pub fn rank(&self, objectives: Vec<Vec<f64>>, target_size: usize) -> SelectionReport {
        let mut ranked: Vec<MultiObjectiveIndividual<usize>> = objectives
            .into_iter()
            .enumerate()
            .map(|(i, values)| MultiObjectiveIndividual::new(i, values))
            .collect();

        let target = target_size.min(ranked.len());
        let fronts = fast_non_dominated_sort(&mut ranked, &self.directions);

        let mut selected = Vec::with_capacity(target);
        let mut truncated_front = None;
        for front in fronts {
            if selected.len() >= target {
                break;
            }
            calculate_crowding_distance(&mut ranked, &front);
            if selected.len() + front.len() <= target {
                selected.extend_from_slice(&front);
                continue;
            }

            let remaining = target - selected.len();
            selected.extend(crowding_order(&ranked, &front).into_iter().take(remaining));
            truncated_front = Some(front);
        }

        SelectionReport {
            selected,
            ranked,
            truncated_front,
        }
    }
}
