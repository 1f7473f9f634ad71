use super::pareto::FitnessVector;
use super::tree::Node;
use serde::{Deserialize, Serialize};

/// A candidate trading rule: one owned tree plus its cached fitness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    tree: Node,
    fitness: Option<FitnessVector>,
}

impl Individual {
    pub fn new(tree: Node) -> Self {
        Self {
            tree,
            fitness: None,
        }
    }

    pub fn with_fitness(tree: Node, fitness: FitnessVector) -> Self {
        Self {
            tree,
            fitness: Some(fitness),
        }
    }

    pub fn tree(&self) -> &Node {
        &self.tree
    }

    /// Replace the genome. Cached fitness is dropped unless the tree is unchanged.
    pub fn set_tree(&mut self, tree: Node) {
        if tree != self.tree {
            self.tree = tree;
            self.fitness = None;
        }
    }

    pub fn fitness(&self) -> Option<&FitnessVector> {
        self.fitness.as_ref()
    }

    pub fn set_fitness(&mut self, fitness: FitnessVector) {
        self.fitness = Some(fitness);
    }

    pub fn invalidate(&mut self) {
        self.fitness = None;
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Canonical rendered expression, used as the identity of a genome.
    pub fn canonical(&self) -> String {
        self.tree.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::grammar::PrimitiveOp;
    use crate::types::Sort;

    fn rule(window: i64) -> Node {
        Node::primitive(
            PrimitiveOp::LtFloat,
            vec![
                Node::primitive(
                    PrimitiveOp::Ma,
                    vec![Node::argument(0), Node::terminal(Sort::MaWindow, window)],
                ),
                Node::primitive(
                    PrimitiveOp::Ema,
                    vec![Node::argument(0), Node::terminal(Sort::EmaWindow, 12)],
                ),
            ],
        )
    }

    #[test]
    fn test_set_tree_invalidates_only_on_change() {
        let mut individual = Individual::with_fitness(rule(5), FitnessVector::new(vec![1.0, 2.0]));
        individual.set_tree(rule(5));
        assert!(individual.is_evaluated());
        individual.set_tree(rule(10));
        assert!(!individual.is_evaluated());
        assert_eq!(individual.canonical(), "lt(ma(Date, 10), ema(Date, 12))");
    }
}
