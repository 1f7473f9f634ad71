use super::traits::ConfigSection;
use crate::engines::generation::pareto::{Metric, Objective, ObjectiveConfig, OptimizationDirection};
use crate::error::GpTraderError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One explicitly configured objective. Direction and reference fall back to the
/// metric's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveSpec {
    pub metric: Metric,
    #[serde(default)]
    pub direction: Option<OptimizationDirection>,
    #[serde(default)]
    pub reference: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectivesConfig {
    /// Numbered objective combination (1..=11).
    #[serde(default)]
    pub preset: Option<u8>,
    #[serde(default)]
    pub metrics: Vec<ObjectiveSpec>,
}

impl Default for ObjectivesConfig {
    fn default() -> Self {
        Self {
            preset: Some(1),
            metrics: Vec::new(),
        }
    }
}

pub fn preset_metrics(preset: u8) -> Option<&'static [Metric]> {
    use Metric::*;
    let metrics: &'static [Metric] = match preset {
        1 => &[PercentReturn, PerformanceConsistency],
        2 => &[PercentReturn, PerformanceConsistency, RiskExposure],
        3 => &[PercentReturn, PerformanceConsistency, RiskExposure, NumTrades],
        4 => &[PerformanceConsistency, RiskExposure],
        5 => &[PercentReturn, Sharpe],
        6 => &[PercentReturn, PerformanceConsistency, Sharpe],
        7 => &[PercentReturn, RiskExposure],
        8 => &[PercentReturn, NumTrades],
        9 => &[PercentReturn, RiskExposure, NumTrades],
        10 => &[PercentReturn, Sharpe, RiskExposure, NumTrades],
        11 => &[PerformanceConsistency, Sharpe, RiskExposure, NumTrades],
        _ => return None,
    };
    Some(metrics)
}

impl ObjectivesConfig {
    /// Build the active objective set. Fails on unknown presets, duplicates or an
    /// empty selection.
    pub fn resolve(&self) -> Result<ObjectiveConfig, GpTraderError> {
        let objectives: Vec<Objective> = match (self.preset, self.metrics.is_empty()) {
            (Some(_), false) => {
                return Err(GpTraderError::Configuration(
                    "Specify either an objective preset or explicit metrics, not both".to_string(),
                ))
            }
            (Some(preset), true) => preset_metrics(preset)
                .ok_or_else(|| {
                    GpTraderError::Configuration(format!(
                        "Unknown objective preset {} (expected 1..=11)",
                        preset
                    ))
                })?
                .iter()
                .map(|&metric| Objective::new(metric))
                .collect(),
            (None, true) => {
                return Err(GpTraderError::Configuration(
                    "No objectives selected".to_string(),
                ))
            }
            (None, false) => self
                .metrics
                .iter()
                .map(|spec| Objective {
                    metric: spec.metric,
                    direction: spec.direction.unwrap_or_else(|| spec.metric.default_direction()),
                    reference: spec.reference.unwrap_or_else(|| spec.metric.default_reference()),
                })
                .collect(),
        };

        let mut seen = HashSet::new();
        for objective in &objectives {
            if !seen.insert(objective.metric) {
                return Err(GpTraderError::Configuration(format!(
                    "Objective {} selected twice",
                    objective.metric
                )));
            }
            if !objective.reference.is_finite() {
                return Err(GpTraderError::Configuration(format!(
                    "Reference point for {} must be finite",
                    objective.metric
                )));
            }
        }

        Ok(ObjectiveConfig::new(objectives))
    }
}

impl ConfigSection for ObjectivesConfig {
    fn section_name() -> &'static str {
        "objectives"
    }

    fn validate(&self) -> Result<(), GpTraderError> {
        self.resolve().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_resolves() {
        for preset in 1..=11 {
            let config = ObjectivesConfig {
                preset: Some(preset),
                metrics: Vec::new(),
            };
            let resolved = config.resolve().unwrap();
            assert!(resolved.len() >= 2);
        }
    }

    #[test]
    fn test_unknown_preset_is_fatal() {
        let config = ObjectivesConfig {
            preset: Some(12),
            metrics: Vec::new(),
        };
        assert!(matches!(config.resolve(), Err(GpTraderError::Configuration(_))));
    }

    #[test]
    fn test_preset_three_directions() {
        let config = ObjectivesConfig {
            preset: Some(3),
            metrics: Vec::new(),
        };
        let directions = config.resolve().unwrap().directions();
        assert_eq!(
            directions,
            vec![
                OptimizationDirection::Maximize,
                OptimizationDirection::Maximize,
                OptimizationDirection::Minimize,
                OptimizationDirection::Minimize,
            ]
        );
    }

    #[test]
    fn test_explicit_metrics_with_override() {
        let config = ObjectivesConfig {
            preset: None,
            metrics: vec![
                ObjectiveSpec {
                    metric: Metric::Sharpe,
                    direction: None,
                    reference: Some(-1.0),
                },
                ObjectiveSpec {
                    metric: Metric::NumTrades,
                    direction: Some(OptimizationDirection::Maximize),
                    reference: None,
                },
            ],
        };
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.objectives()[0].reference, -1.0);
        assert_eq!(resolved.objectives()[1].direction, OptimizationDirection::Maximize);
        assert_eq!(resolved.objectives()[1].reference, 500.0);
    }

    #[test]
    fn test_duplicate_metric_rejected() {
        let spec = ObjectiveSpec {
            metric: Metric::PercentReturn,
            direction: None,
            reference: None,
        };
        let config = ObjectivesConfig {
            preset: None,
            metrics: vec![spec.clone(), spec],
        };
        assert!(config.resolve().is_err());
    }
}
