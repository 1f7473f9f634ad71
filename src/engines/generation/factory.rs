use super::grammar::Grammar;
use super::tree::Node;
use crate::error::{GpTraderError, Result};
use crate::types::Sort;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;

/// Inclusive depth bounds for tree generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthBounds {
    pub min: usize,
    pub max: usize,
}

impl DepthBounds {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

/// Grammar-constrained generation, crossover and mutation of typed trees.
#[derive(Debug, Clone)]
pub struct TreeFactory {
    grammar: Arc<Grammar>,
}

impl TreeFactory {
    pub fn new(grammar: Arc<Grammar>) -> Self {
        Self { grammar }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Grow a tree producing `target`. A target height is drawn from the bounds;
    /// terminals are taken once it is reached, or with the grammar's terminal
    /// ratio after the minimum depth. Primitives are only chosen when their
    /// subtree still fits under `bounds.max`.
    pub fn generate<R: Rng>(&self, target: Sort, bounds: DepthBounds, rng: &mut R) -> Result<Node> {
        let height = rng.gen_range(bounds.min..=bounds.max.max(bounds.min));
        self.grow(target, 0, height, bounds, rng)
    }

    fn grow<R: Rng>(
        &self,
        sort: Sort,
        depth: usize,
        height: usize,
        bounds: DepthBounds,
        rng: &mut R,
    ) -> Result<Node> {
        let want_terminal = depth >= height
            || (depth >= bounds.min && rng.gen::<f64>() < self.grammar.terminal_ratio());

        if want_terminal {
            if let Some(node) = self.pick_terminal(sort, rng) {
                return Ok(node);
            }
        }

        let budget = bounds.max.saturating_sub(depth);
        let eligible: Vec<_> = self
            .grammar
            .primitives_for(sort)
            .iter()
            .copied()
            .filter(|&op| {
                self.grammar
                    .primitive_min_depth(op)
                    .map_or(false, |needed| needed <= budget)
            })
            .collect();

        match eligible.choose(rng) {
            Some(&op) => {
                let children = op
                    .inputs()
                    .iter()
                    .map(|&child| self.grow(child, depth + 1, height, bounds, rng))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Node::primitive(op, children))
            }
            None => self.pick_terminal(sort, rng).ok_or_else(|| {
                GpTraderError::Generation(format!(
                    "Sort {} cannot be produced at depth {} within max depth {}",
                    sort, depth, bounds.max
                ))
            }),
        }
    }

    fn pick_terminal<R: Rng>(&self, sort: Sort, rng: &mut R) -> Option<Node> {
        let values = self.grammar.terminals_for(sort);
        let argument = self.grammar.argument_for(sort);
        let choices = values.len() + usize::from(argument.is_some());
        if choices == 0 {
            return None;
        }
        let pick = rng.gen_range(0..choices);
        match (values.get(pick), argument) {
            (Some(&value), _) => Some(Node::terminal(sort, value)),
            (None, Some(index)) => Some(Node::argument(index)),
            (None, None) => None,
        }
    }

    /// One-point subtree crossover. The root is never swapped; the position in `a`
    /// is drawn among nodes whose sort also occurs in `b`, the position in `b`
    /// among its nodes of that sort. Without overlap both parents come back as-is.
    pub fn crossover<R: Rng>(&self, a: &Node, b: &Node, rng: &mut R) -> (Node, Node) {
        let sorts_a = a.sorts();
        let sorts_b = b.sorts();
        if sorts_a.len() < 2 || sorts_b.len() < 2 {
            return (a.clone(), b.clone());
        }

        let candidates: Vec<usize> = (1..sorts_a.len())
            .filter(|&i| sorts_b[1..].contains(&sorts_a[i]))
            .collect();
        let Some(&index_a) = candidates.choose(rng) else {
            return (a.clone(), b.clone());
        };
        let sort = sorts_a[index_a];
        let matching: Vec<usize> = (1..sorts_b.len()).filter(|&i| sorts_b[i] == sort).collect();
        let Some(&index_b) = matching.choose(rng) else {
            return (a.clone(), b.clone());
        };

        let (Some(sub_a), Some(sub_b)) = (a.subtree(index_a), b.subtree(index_b)) else {
            return (a.clone(), b.clone());
        };
        let (sub_a, sub_b) = (sub_a.clone(), sub_b.clone());

        let mut child_a = a.clone();
        let mut child_b = b.clone();
        // Sorts match by construction so neither replacement can fail.
        if child_a.replace_subtree(index_a, sub_b).is_err()
            || child_b.replace_subtree(index_b, sub_a).is_err()
        {
            return (a.clone(), b.clone());
        }
        (child_a, child_b)
    }

    /// Replace a uniformly chosen node (root included) by a fresh subtree of the
    /// same sort.
    pub fn mutate<R: Rng>(&self, tree: &Node, bounds: DepthBounds, rng: &mut R) -> Result<Node> {
        let index = rng.gen_range(0..tree.size());
        let sort = tree
            .subtree(index)
            .map(Node::sort)
            .ok_or_else(|| GpTraderError::Generation(format!("No subtree at {}", index)))?;
        let replacement = self.generate(sort, bounds, rng)?;
        let mut mutant = tree.clone();
        mutant.replace_subtree(index, replacement)?;
        Ok(mutant)
    }
}
