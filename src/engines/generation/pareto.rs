/// Pareto optimization utilities for multi-objective evolution
/// Implements NSGA-II style fast non-dominated sorting and crowding distance

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Defines whether a metric should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationDirection {
    Maximize,
    Minimize,
}

/// Measurable outcome of a backtest that can be selected as an objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    PercentReturn,
    PerformanceConsistency,
    RiskExposure,
    NumTrades,
    Sharpe,
}

impl Metric {
    pub fn all() -> [Metric; 5] {
        [
            Metric::PercentReturn,
            Metric::PerformanceConsistency,
            Metric::RiskExposure,
            Metric::NumTrades,
            Metric::Sharpe,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::PercentReturn => "percent_return",
            Metric::PerformanceConsistency => "performance_consistency",
            Metric::RiskExposure => "risk_exposure",
            Metric::NumTrades => "num_trades",
            Metric::Sharpe => "sharpe",
        }
    }

    pub fn default_direction(&self) -> OptimizationDirection {
        match self {
            Metric::PercentReturn | Metric::PerformanceConsistency | Metric::Sharpe => {
                OptimizationDirection::Maximize
            }
            Metric::RiskExposure | Metric::NumTrades => OptimizationDirection::Minimize,
        }
    }

    /// Hypervolume reference value for this metric.
    pub fn default_reference(&self) -> f64 {
        match self {
            Metric::PercentReturn | Metric::PerformanceConsistency | Metric::Sharpe => 0.0,
            Metric::RiskExposure | Metric::NumTrades => 500.0,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for a single objective in multi-objective optimization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub metric: Metric,
    pub direction: OptimizationDirection,
    pub reference: f64,
}

impl Objective {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            direction: metric.default_direction(),
            reference: metric.default_reference(),
        }
    }
}

/// Ordered set of active objectives. Fixes the length and meaning of every
/// [`FitnessVector`] produced during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveConfig {
    objectives: Vec<Objective>,
}

impl ObjectiveConfig {
    pub fn new(objectives: Vec<Objective>) -> Self {
        Self { objectives }
    }

    pub fn len(&self) -> usize {
        self.objectives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty()
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    pub fn directions(&self) -> Vec<OptimizationDirection> {
        self.objectives.iter().map(|o| o.direction).collect()
    }

    pub fn position(&self, metric: Metric) -> Option<usize> {
        self.objectives.iter().position(|o| o.metric == metric)
    }

    /// Maps a fitness vector into minimisation space, where lower is better for
    /// every component.
    pub fn to_minimisation(&self, values: &[f64]) -> Vec<f64> {
        self.objectives
            .iter()
            .zip(values)
            .map(|(objective, &value)| match objective.direction {
                OptimizationDirection::Minimize => value,
                OptimizationDirection::Maximize => -value,
            })
            .collect()
    }

    /// Reference point in minimisation space.
    pub fn reference_point(&self) -> Vec<f64> {
        let references: Vec<f64> = self.objectives.iter().map(|o| o.reference).collect();
        self.to_minimisation(&references)
    }
}

/// Ordered objective values of one evaluated individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FitnessVector(Vec<f64>);

impl FitnessVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    pub fn dominates(&self, other: &FitnessVector, directions: &[OptimizationDirection]) -> bool {
        dominates(&self.0, &other.0, directions)
    }
}

impl fmt::Display for FitnessVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| format!("{:.4}", v)).collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// Individual with multiple objective values
#[derive(Debug, Clone)]
pub struct MultiObjectiveIndividual<T> {
    pub data: T,
    pub objectives: Vec<f64>,
    pub rank: usize,           // Pareto rank (0 = best frontier)
    pub crowding_distance: f64, // Diversity measure
}

impl<T> MultiObjectiveIndividual<T> {
    pub fn new(data: T, objectives: Vec<f64>) -> Self {
        Self {
            data,
            objectives,
            rank: 0,
            crowding_distance: 0.0,
        }
    }
}

/// `a` dominates `b` when it is no worse on every objective and strictly better
/// on at least one. Vectors whose lengths disagree with `directions` never
/// dominate; NaN compares as a tie.
pub fn dominates(a: &[f64], b: &[f64], directions: &[OptimizationDirection]) -> bool {
    if a.len() != b.len() || a.len() != directions.len() {
        return false;
    }

    let mut strictly_better = false;
    for ((x, y), direction) in a.iter().zip(b).zip(directions) {
        let ordering = match direction {
            OptimizationDirection::Maximize => x.partial_cmp(y),
            OptimizationDirection::Minimize => y.partial_cmp(x),
        };
        match ordering {
            Some(Ordering::Less) => return false,
            Some(Ordering::Greater) => strictly_better = true,
            _ => {}
        }
    }
    strictly_better
}

/// Partition `individuals` into Pareto fronts, best first, and record each
/// member's front index in `rank`. Indices inside a front are ascending.
pub fn fast_non_dominated_sort<T>(
    individuals: &mut [MultiObjectiveIndividual<T>],
    directions: &[OptimizationDirection],
) -> Vec<Vec<usize>> {
    let n = individuals.len();
    let mut dominated_by_count = vec![0usize; n];
    let mut dominates_list: Vec<Vec<usize>> = vec![Vec::new(); n];

    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (&individuals[i].objectives, &individuals[j].objectives);
            if dominates(a, b, directions) {
                dominates_list[i].push(j);
                dominated_by_count[j] += 1;
            } else if dominates(b, a, directions) {
                dominates_list[j].push(i);
                dominated_by_count[i] += 1;
            }
        }
    }

    let mut fronts = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| dominated_by_count[i] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            individuals[i].rank = fronts.len();
            for &j in &dominates_list[i] {
                dominated_by_count[j] -= 1;
                if dominated_by_count[j] == 0 {
                    next.push(j);
                }
            }
        }
        next.sort_unstable();
        fronts.push(current);
        current = next;
    }
    fronts
}

/// Crowding distance of every member of one front, normalised per objective.
/// The extremes of each objective get `f64::INFINITY`; fronts of one or two
/// members are all extremes.
pub fn calculate_crowding_distance<T>(
    individuals: &mut [MultiObjectiveIndividual<T>],
    front: &[usize],
) {
    for &idx in front {
        individuals[idx].crowding_distance = 0.0;
    }
    if front.len() <= 2 {
        for &idx in front {
            individuals[idx].crowding_distance = f64::INFINITY;
        }
        return;
    }

    let last = front.len() - 1;
    let num_objectives = individuals[front[0]].objectives.len();
    for objective in 0..num_objectives {
        let value = |individuals: &[MultiObjectiveIndividual<T>], idx: usize| {
            individuals[idx].objectives[objective]
        };
        let mut sorted = front.to_vec();
        sorted.sort_by(|&a, &b| value(individuals, a).total_cmp(&value(individuals, b)));

        individuals[sorted[0]].crowding_distance = f64::INFINITY;
        individuals[sorted[last]].crowding_distance = f64::INFINITY;

        let span = value(individuals, sorted[last]) - value(individuals, sorted[0]);
        if span.abs() < 1e-10 {
            continue;
        }
        for window in sorted.windows(3) {
            let gap = value(individuals, window[2]) - value(individuals, window[0]);
            individuals[window[1]].crowding_distance += gap / span;
        }
    }
}

/// Members of `front` ordered by descending crowding distance. The sort is
/// stable, so equal distances keep their order within the front.
pub fn crowding_order<T>(individuals: &[MultiObjectiveIndividual<T>], front: &[usize]) -> Vec<usize> {
    let mut ordered = front.to_vec();
    ordered.sort_by(|&a, &b| {
        individuals[b]
            .crowding_distance
            .total_cmp(&individuals[a].crowding_distance)
    });
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominance_maximize() {
        let directions = vec![OptimizationDirection::Maximize, OptimizationDirection::Maximize];

        // A is better in both objectives
        assert!(dominates(&[10.0, 20.0], &[5.0, 10.0], &directions));

        // A is better in one, equal in other
        assert!(dominates(&[10.0, 20.0], &[10.0, 10.0], &directions));

        // A is better in one, worse in other - no dominance
        assert!(!dominates(&[10.0, 5.0], &[5.0, 10.0], &directions));

        // Equal in both - no dominance
        assert!(!dominates(&[10.0, 20.0], &[10.0, 20.0], &directions));
    }

    #[test]
    fn test_dominance_mixed() {
        let directions = vec![OptimizationDirection::Maximize, OptimizationDirection::Minimize];

        assert!(dominates(&[10.0, 5.0], &[5.0, 10.0], &directions));
        assert!(!dominates(&[10.0, 15.0], &[5.0, 10.0], &directions));
    }

    #[test]
    fn test_fast_non_dominated_sort() {
        let directions = vec![OptimizationDirection::Maximize, OptimizationDirection::Maximize];

        let mut individuals = vec![
            MultiObjectiveIndividual::new(0, vec![1.0, 5.0]),  // Front 0
            MultiObjectiveIndividual::new(1, vec![3.0, 3.0]),  // Front 0
            MultiObjectiveIndividual::new(2, vec![5.0, 1.0]),  // Front 0
            MultiObjectiveIndividual::new(3, vec![2.0, 2.0]),  // Front 1
            MultiObjectiveIndividual::new(4, vec![1.0, 1.0]),  // Front 2
        ];

        let fronts = fast_non_dominated_sort(&mut individuals, &directions);

        assert_eq!(fronts, vec![vec![0, 1, 2], vec![3], vec![4]]);
        assert_eq!(individuals[3].rank, 1);
        assert_eq!(individuals[4].rank, 2);
    }

    #[test]
    fn test_crowding_distance() {
        let directions = vec![OptimizationDirection::Maximize, OptimizationDirection::Maximize];

        let mut individuals = vec![
            MultiObjectiveIndividual::new(0, vec![1.0, 5.0]),
            MultiObjectiveIndividual::new(1, vec![3.0, 3.0]),
            MultiObjectiveIndividual::new(2, vec![5.0, 1.0]),
        ];

        let fronts = fast_non_dominated_sort(&mut individuals, &directions);
        calculate_crowding_distance(&mut individuals, &fronts[0]);

        assert!(individuals[0].crowding_distance.is_infinite());
        assert!(individuals[2].crowding_distance.is_infinite());
        assert!((individuals[1].crowding_distance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_minimisation_space() {
        let config = ObjectiveConfig::new(vec![
            Objective::new(Metric::PercentReturn),
            Objective::new(Metric::RiskExposure),
        ]);
        assert_eq!(config.to_minimisation(&[12.0, 40.0]), vec![-12.0, 40.0]);
        assert_eq!(config.reference_point(), vec![-0.0, 500.0]);
        assert_eq!(config.position(Metric::RiskExposure), Some(1));
        assert_eq!(config.position(Metric::Sharpe), None);
    }

    #[test]
    fn test_fitness_vector_serialises_as_list() {
        let fitness = FitnessVector::new(vec![1.5, 3.0]);
        assert_eq!(serde_json::to_string(&fitness).unwrap(), "[1.5,3.0]");
    }

    #[test]
    fn test_crowding_order_keeps_front_order_on_ties() {
        let mut individuals: Vec<_> = (0..5)
            .map(|i| MultiObjectiveIndividual::new(i, vec![i as f64]))
            .collect();
        for (idx, distance) in [(0, 0.5), (1, f64::INFINITY), (2, 0.5), (3, 2.0), (4, f64::INFINITY)] {
            individuals[idx].crowding_distance = distance;
        }
        assert_eq!(crowding_order(&individuals, &[0, 1, 2, 3, 4]), vec![1, 4, 3, 0, 2]);
        assert_eq!(crowding_order(&individuals, &[2, 0]), vec![2, 0]);
    }

    #[test]
    fn test_nan_never_dominates() {
        let directions = vec![OptimizationDirection::Maximize, OptimizationDirection::Maximize];
        assert!(!dominates(&[f64::NAN, 1.0], &[0.0, 1.0], &directions));
        assert!(dominates(&[f64::NAN, 2.0], &[f64::NAN, 1.0], &directions));
    }
}
