use super::individual::Individual;
use super::pareto::OptimizationDirection;
use serde::{Deserialize, Serialize};

/// Individuals that no other observed individual dominates, kept for the whole run.
///
/// A member leaves only when a newcomer dominates it. Newcomers whose fitness
/// equals a member's are treated as duplicates and dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoArchive {
    members: Vec<Individual>,
    directions: Vec<OptimizationDirection>,
}

impl ParetoArchive {
    pub fn new(directions: Vec<OptimizationDirection>) -> Self {
        Self {
            members: Vec::new(),
            directions,
        }
    }

    /// Offer a batch of evaluated individuals. Returns how many were admitted.
    pub fn update(&mut self, candidates: &[Individual]) -> usize {
        let mut admitted = 0;
        for candidate in candidates {
            if self.try_admit(candidate) {
                admitted += 1;
            }
        }
        admitted
    }

    fn try_admit(&mut self, candidate: &Individual) -> bool {
        let Some(fitness) = candidate.fitness() else {
            log::debug!("Skipping unevaluated individual {}", candidate.canonical());
            return false;
        };

        let rejected = self.members.iter().any(|member| {
            member.fitness().map_or(false, |existing| {
                existing == fitness || existing.dominates(fitness, &self.directions)
            })
        });
        if rejected {
            return false;
        }

        let directions = &self.directions;
        self.members.retain(|member| {
            member
                .fitness()
                .map_or(true, |existing| !fitness.dominates(existing, directions))
        });
        self.members.push(candidate.clone());
        true
    }

    pub fn members(&self) -> &[Individual] {
        &self.members
    }

    pub fn directions(&self) -> &[OptimizationDirection] {
        &self.directions
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn into_members(self) -> Vec<Individual> {
        self.members
    }
}
