use super::individual::Individual;
use super::pareto::{Metric, ObjectiveConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveStats {
    pub metric: Metric,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

/// Summary of one generation for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    /// Backtests run in this generation (cache hits excluded).
    pub evaluations: usize,
    pub objectives: Vec<ObjectiveStats>,
    pub hypervolume: f64,
    pub archive_size: usize,
}

impl GenerationStats {
    pub fn compute(
        generation: usize,
        evaluations: usize,
        population: &[Individual],
        config: &ObjectiveConfig,
        archive_size: usize,
    ) -> Self {
        let fitnesses: Vec<&[f64]> = population
            .iter()
            .filter_map(|ind| ind.fitness().map(|f| f.values()))
            .collect();

        let objectives = config
            .objectives()
            .iter()
            .enumerate()
            .map(|(i, objective)| {
                let values: Vec<f64> = fitnesses.iter().filter_map(|f| f.get(i).copied()).collect();
                let (min, max) = values
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
                let mean = if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                };
                ObjectiveStats {
                    metric: objective.metric,
                    min: if values.is_empty() { 0.0 } else { min },
                    mean,
                    max: if values.is_empty() { 0.0 } else { max },
                }
            })
            .collect();

        let points: Vec<Vec<f64>> = fitnesses.iter().map(|f| config.to_minimisation(f)).collect();
        let hypervolume = hypervolume(&points, &config.reference_point());

        Self {
            generation,
            evaluations,
            objectives,
            hypervolume,
            archive_size,
        }
    }
}

/// Exact hypervolume dominated by `points` and bounded by `reference`, all in
/// minimisation space. Points not strictly below the reference in every
/// coordinate contribute nothing.
pub fn hypervolume(points: &[Vec<f64>], reference: &[f64]) -> f64 {
    let dims = reference.len();
    let inside: Vec<&[f64]> = points
        .iter()
        .filter(|p| p.len() == dims && p.iter().zip(reference).all(|(v, r)| v < r))
        .map(Vec::as_slice)
        .collect();
    slice_volume(inside, reference)
}

// Sweep along the last coordinate, recursing on the projection of the points
// already passed.
fn slice_volume(mut points: Vec<&[f64]>, reference: &[f64]) -> f64 {
    let dims = reference.len();
    if points.is_empty() || dims == 0 {
        return 0.0;
    }
    if dims == 1 {
        let best = points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
        return reference[0] - best;
    }

    let last = dims - 1;
    points.sort_by(|a, b| a[last].total_cmp(&b[last]));

    let mut volume = 0.0;
    for i in 0..points.len() {
        let upper = points.get(i + 1).map_or(reference[last], |p| p[last]);
        let height = upper - points[i][last];
        if height <= 0.0 {
            continue;
        }
        let projected: Vec<&[f64]> = points[..=i].iter().map(|p| &p[..last]).collect();
        volume += height * slice_volume(projected, &reference[..last]);
    }
    volume
}
