use super::grammar::{PrimitiveOp, ARGUMENT_NAMES, ARGUMENT_SORTS};
use crate::error::{GpTraderError, Result};
use crate::types::Sort;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed rule tree. Children of a primitive appear in the order of its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Node {
    Primitive { op: PrimitiveOp, children: Vec<Node> },
    Terminal { sort: Sort, value: i64 },
    Argument { index: usize },
}

impl Node {
    pub fn primitive(op: PrimitiveOp, children: Vec<Node>) -> Self {
        Node::Primitive { op, children }
    }

    pub fn terminal(sort: Sort, value: i64) -> Self {
        Node::Terminal { sort, value }
    }

    pub fn argument(index: usize) -> Self {
        Node::Argument { index }
    }

    /// Output sort of this node.
    pub fn sort(&self) -> Sort {
        match self {
            Node::Primitive { op, .. } => op.output(),
            Node::Terminal { sort, .. } => *sort,
            Node::Argument { index } => ARGUMENT_SORTS.get(*index).copied().unwrap_or(Sort::Bool),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Node::Primitive { children, .. } => 1 + children.iter().map(Node::size).sum::<usize>(),
            _ => 1,
        }
    }

    /// Height of the tree; a lone terminal has depth 0.
    pub fn depth(&self) -> usize {
        match self {
            Node::Primitive { children, .. } => {
                1 + children.iter().map(Node::depth).max().unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Sort of every node in pre-order.
    pub fn sorts(&self) -> Vec<Sort> {
        let mut out = Vec::with_capacity(self.size());
        self.collect_sorts(&mut out);
        out
    }

    fn collect_sorts(&self, out: &mut Vec<Sort>) {
        out.push(self.sort());
        if let Node::Primitive { children, .. } = self {
            for child in children {
                child.collect_sorts(out);
            }
        }
    }

    /// Pre-order depth of every node, root at 0.
    pub fn node_depths(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.size());
        self.collect_depths(0, &mut out);
        out
    }

    fn collect_depths(&self, depth: usize, out: &mut Vec<usize>) {
        out.push(depth);
        if let Node::Primitive { children, .. } = self {
            for child in children {
                child.collect_depths(depth + 1, out);
            }
        }
    }

    /// Subtree at a pre-order position.
    pub fn subtree(&self, index: usize) -> Option<&Node> {
        if index == 0 {
            return Some(self);
        }
        let mut offset = 1;
        if let Node::Primitive { children, .. } = self {
            for child in children {
                let size = child.size();
                if index < offset + size {
                    return child.subtree(index - offset);
                }
                offset += size;
            }
        }
        None
    }

    fn subtree_mut(&mut self, index: usize) -> Option<&mut Node> {
        if index == 0 {
            return Some(self);
        }
        let mut offset = 1;
        if let Node::Primitive { children, .. } = self {
            for child in children.iter_mut() {
                let size = child.size();
                if index < offset + size {
                    return child.subtree_mut(index - offset);
                }
                offset += size;
            }
        }
        None
    }

    /// Replaces the subtree at a pre-order position and returns the old one.
    /// The replacement must carry the same sort.
    pub fn replace_subtree(&mut self, index: usize, replacement: Node) -> Result<Node> {
        let target = self.subtree_mut(index).ok_or_else(|| {
            GpTraderError::Generation(format!("No subtree at position {}", index))
        })?;
        if target.sort() != replacement.sort() {
            return Err(GpTraderError::TypeMismatch {
                expected: target.sort().to_string(),
                actual: replacement.sort().to_string(),
            });
        }
        Ok(std::mem::replace(target, replacement))
    }

    /// Checks every parent/child sort pairing and that the root produces `expected`.
    pub fn type_check(&self, expected: Sort) -> Result<()> {
        if self.sort() != expected {
            return Err(GpTraderError::TypeMismatch {
                expected: expected.to_string(),
                actual: self.sort().to_string(),
            });
        }
        match self {
            Node::Primitive { op, children } => {
                if children.len() != op.arity() {
                    return Err(GpTraderError::TypeMismatch {
                        expected: format!("{} arguments for {}", op.arity(), op.name()),
                        actual: children.len().to_string(),
                    });
                }
                for (child, &sort) in children.iter().zip(op.inputs()) {
                    child.type_check(sort)?;
                }
                Ok(())
            }
            Node::Argument { index } if *index >= ARGUMENT_SORTS.len() => {
                Err(GpTraderError::TypeMismatch {
                    expected: format!("argument index below {}", ARGUMENT_SORTS.len()),
                    actual: index.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Canonical prefix rendering, e.g. `lt(ma(Date, 5), ema(Date, 12))`.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Primitive { op, children } => {
                write!(f, "{}(", op.name())?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
            Node::Terminal { value, .. } => write!(f, "{}", value),
            Node::Argument { index } => {
                f.write_str(ARGUMENT_NAMES.get(*index).copied().unwrap_or("ARG?"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        // and_(lt(ma(Date, 5), ema(Date, 12)), not_(gt(0, so(Date, 14))))
        Node::primitive(
            PrimitiveOp::And,
            vec![
                Node::primitive(
                    PrimitiveOp::LtFloat,
                    vec![
                        Node::primitive(
                            PrimitiveOp::Ma,
                            vec![Node::argument(0), Node::terminal(Sort::MaWindow, 5)],
                        ),
                        Node::primitive(
                            PrimitiveOp::Ema,
                            vec![Node::argument(0), Node::terminal(Sort::EmaWindow, 12)],
                        ),
                    ],
                ),
                Node::primitive(
                    PrimitiveOp::Not,
                    vec![Node::primitive(
                        PrimitiveOp::GtSo,
                        vec![
                            Node::terminal(Sort::SoBound, 0),
                            Node::primitive(
                                PrimitiveOp::So,
                                vec![Node::argument(0), Node::terminal(Sort::SoWindow, 14)],
                            ),
                        ],
                    )],
                ),
            ],
        )
    }

    #[test]
    fn test_render_and_shape() {
        let tree = sample();
        assert_eq!(
            tree.to_string(),
            "and_(lt(ma(Date, 5), ema(Date, 12)), not_(gt(0, so(Date, 14))))"
        );
        assert_eq!(tree.size(), 14);
        assert_eq!(tree.depth(), 4);
        assert!(tree.type_check(Sort::Bool).is_ok());
    }

    #[test]
    fn test_subtree_indexing_follows_preorder() {
        let tree = sample();
        let sorts = tree.sorts();
        for (i, sort) in sorts.iter().enumerate() {
            assert_eq!(tree.subtree(i).map(Node::sort), Some(*sort));
        }
        assert_eq!(tree.subtree(2).map(|n| n.to_string()), Some("ma(Date, 5)".to_string()));
        assert!(tree.subtree(sorts.len()).is_none());
        assert_eq!(tree.node_depths()[3], 3);
    }

    #[test]
    fn test_replace_subtree_requires_same_sort() {
        let mut tree = sample();
        let old = tree
            .replace_subtree(2, Node::primitive(
                PrimitiveOp::Ma,
                vec![Node::argument(0), Node::terminal(Sort::MaWindow, 200)],
            ))
            .unwrap();
        assert_eq!(old.to_string(), "ma(Date, 5)");
        assert!(tree.to_string().starts_with("and_(lt(ma(Date, 200)"));

        let err = tree.replace_subtree(2, Node::argument(1));
        assert!(matches!(err, Err(GpTraderError::TypeMismatch { .. })));
    }

    #[test]
    fn test_type_check_rejects_wrong_child() {
        let tree = Node::primitive(
            PrimitiveOp::Not,
            vec![Node::terminal(Sort::RsiBound, 30)],
        );
        assert!(tree.type_check(Sort::Bool).is_err());
    }
}
