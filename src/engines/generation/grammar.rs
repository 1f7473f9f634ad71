//! Closed registry of primitives and terminals per [`Sort`].

use crate::config::GrammarConfig;
use crate::data::IndicatorKey;
use crate::error::{GpTraderError, Result};
use crate::types::Sort;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Sorts of the two external arguments of every rule: `ARG0` is the date being
/// simulated, `ARG1` the current position flag.
pub const ARGUMENT_SORTS: [Sort; 2] = [Sort::Date, Sort::Position];

pub const ARGUMENT_NAMES: [&str; 2] = ["Date", "Position"];

/// Sort of every rule root.
pub const ROOT_SORT: Sort = Sort::Bool;

/// Typed functions available to rule trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveOp {
    IfThenElse,
    And,
    Or,
    Not,
    LtFloat,
    GtFloat,
    RsiBelow,
    RsiAbove,
    LtMacd,
    GtMacd,
    LtSo,
    GtSo,
    Ma,
    Ema,
    Rsi,
    Macd,
    So,
}

impl PrimitiveOp {
    pub fn all() -> &'static [PrimitiveOp] {
        use PrimitiveOp::*;
        &[
            IfThenElse, And, Or, Not, LtFloat, GtFloat, RsiBelow, RsiAbove, LtMacd, GtMacd,
            LtSo, GtSo, Ma, Ema, Rsi, Macd, So,
        ]
    }

    /// Name used in the canonical rendering. Comparison variants share `lt`/`gt`
    /// and are told apart by their argument sorts.
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveOp::IfThenElse => "if_then_else",
            PrimitiveOp::And => "and_",
            PrimitiveOp::Or => "or_",
            PrimitiveOp::Not => "not_",
            PrimitiveOp::LtFloat
            | PrimitiveOp::RsiBelow
            | PrimitiveOp::LtMacd
            | PrimitiveOp::LtSo => "lt",
            PrimitiveOp::GtFloat
            | PrimitiveOp::RsiAbove
            | PrimitiveOp::GtMacd
            | PrimitiveOp::GtSo => "gt",
            PrimitiveOp::Ma => "ma",
            PrimitiveOp::Ema => "ema",
            PrimitiveOp::Rsi => "rsi",
            PrimitiveOp::Macd => "macd",
            PrimitiveOp::So => "so",
        }
    }

    pub fn inputs(&self) -> &'static [Sort] {
        use Sort::*;
        match self {
            PrimitiveOp::IfThenElse => &[Position, RsiAbove, RsiBelow],
            PrimitiveOp::And | PrimitiveOp::Or => &[Bool, Bool],
            PrimitiveOp::Not => &[Bool],
            PrimitiveOp::LtFloat | PrimitiveOp::GtFloat => &[Float, Float],
            PrimitiveOp::RsiBelow | PrimitiveOp::RsiAbove => &[RsiValue, RsiBound],
            PrimitiveOp::LtMacd | PrimitiveOp::GtMacd => &[MacdBound, MacdValue],
            PrimitiveOp::LtSo | PrimitiveOp::GtSo => &[SoBound, SoValue],
            PrimitiveOp::Ma => &[Date, MaWindow],
            PrimitiveOp::Ema => &[Date, EmaWindow],
            PrimitiveOp::Rsi => &[Date, RsiWindow],
            PrimitiveOp::Macd => &[Date, MacdSlow, MacdFast, MacdSignal],
            PrimitiveOp::So => &[Date, SoWindow],
        }
    }

    pub fn output(&self) -> Sort {
        match self {
            PrimitiveOp::IfThenElse
            | PrimitiveOp::And
            | PrimitiveOp::Or
            | PrimitiveOp::Not
            | PrimitiveOp::LtFloat
            | PrimitiveOp::GtFloat
            | PrimitiveOp::LtMacd
            | PrimitiveOp::GtMacd
            | PrimitiveOp::LtSo
            | PrimitiveOp::GtSo => Sort::Bool,
            PrimitiveOp::RsiBelow => Sort::RsiBelow,
            PrimitiveOp::RsiAbove => Sort::RsiAbove,
            PrimitiveOp::Ma | PrimitiveOp::Ema => Sort::Float,
            PrimitiveOp::Rsi => Sort::RsiValue,
            PrimitiveOp::Macd => Sort::MacdValue,
            PrimitiveOp::So => Sort::SoValue,
        }
    }

    pub fn arity(&self) -> usize {
        self.inputs().len()
    }
}

/// Startup-validated mapping from each [`Sort`] to the primitives producing it and
/// the terminal values it may take.
#[derive(Debug, Clone)]
pub struct Grammar {
    primitives: BTreeMap<Sort, Vec<PrimitiveOp>>,
    terminals: BTreeMap<Sort, Vec<i64>>,
    min_depths: BTreeMap<Sort, usize>,
    terminal_ratio: f64,
}

impl Grammar {
    /// Grammar over every primitive, with terminal sets taken from configuration.
    pub fn from_config(config: &GrammarConfig) -> Self {
        let widen = |values: &[u32]| values.iter().map(|&v| i64::from(v)).collect::<Vec<_>>();

        let mut terminals = BTreeMap::new();
        terminals.insert(Sort::MaWindow, widen(&config.ma_windows));
        terminals.insert(Sort::EmaWindow, widen(&config.ema_windows));
        terminals.insert(Sort::RsiWindow, widen(&config.rsi_windows));
        terminals.insert(
            Sort::RsiBound,
            (config.rsi_bound_min..config.rsi_bound_max).collect(),
        );
        terminals.insert(Sort::MacdSlow, widen(&config.macd_slow));
        terminals.insert(Sort::MacdFast, widen(&config.macd_fast));
        terminals.insert(Sort::MacdSignal, widen(&config.macd_signal));
        terminals.insert(Sort::MacdBound, vec![0]);
        terminals.insert(Sort::SoWindow, widen(&config.so_windows));
        terminals.insert(Sort::SoBound, vec![0]);
        terminals.retain(|_, values: &mut Vec<i64>| !values.is_empty());

        Self::new(PrimitiveOp::all(), terminals)
    }

    pub fn new(primitives: &[PrimitiveOp], terminals: BTreeMap<Sort, Vec<i64>>) -> Self {
        let mut by_sort: BTreeMap<Sort, Vec<PrimitiveOp>> = BTreeMap::new();
        for &op in primitives {
            by_sort.entry(op.output()).or_default().push(op);
        }

        let terminal_count: usize =
            terminals.values().map(Vec::len).sum::<usize>() + ARGUMENT_SORTS.len();
        let total = terminal_count + primitives.len();
        let terminal_ratio = if total == 0 {
            0.0
        } else {
            terminal_count as f64 / total as f64
        };

        let mut grammar = Self {
            primitives: by_sort,
            terminals,
            min_depths: BTreeMap::new(),
            terminal_ratio,
        };
        grammar.min_depths = grammar.compute_min_depths();
        grammar
    }

    // Fixed point: a sort with a terminal has depth 0, otherwise the cheapest
    // producing primitive decides.
    fn compute_min_depths(&self) -> BTreeMap<Sort, usize> {
        let mut depths: BTreeMap<Sort, usize> = Sort::all()
            .iter()
            .copied()
            .filter(|&sort| self.has_terminal(sort))
            .map(|sort| (sort, 0))
            .collect();

        loop {
            let mut changed = false;
            for (&sort, ops) in &self.primitives {
                let best = ops
                    .iter()
                    .filter_map(|op| Self::op_depth(op, &depths))
                    .min();
                if let Some(best) = best {
                    let current = depths.get(&sort).copied();
                    if current.map_or(true, |c| best < c) {
                        depths.insert(sort, best);
                        changed = true;
                    }
                }
            }
            if !changed {
                return depths;
            }
        }
    }

    fn op_depth(op: &PrimitiveOp, depths: &BTreeMap<Sort, usize>) -> Option<usize> {
        op.inputs()
            .iter()
            .map(|s| depths.get(s).copied())
            .collect::<Option<Vec<_>>>()
            .map(|children| 1 + children.into_iter().max().unwrap_or(0))
    }

    pub fn primitives_for(&self, sort: Sort) -> &[PrimitiveOp] {
        self.primitives.get(&sort).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn terminals_for(&self, sort: Sort) -> &[i64] {
        self.terminals.get(&sort).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Index of the external argument carrying `sort`, if any.
    pub fn argument_for(&self, sort: Sort) -> Option<usize> {
        ARGUMENT_SORTS.iter().position(|&s| s == sort)
    }

    pub fn has_terminal(&self, sort: Sort) -> bool {
        !self.terminals_for(sort).is_empty() || self.argument_for(sort).is_some()
    }

    /// Shallowest tree height able to produce `sort`; `None` if unreachable.
    pub fn min_depth(&self, sort: Sort) -> Option<usize> {
        self.min_depths.get(&sort).copied()
    }

    /// Depth needed by a primitive node, counting the node itself.
    pub fn primitive_min_depth(&self, op: PrimitiveOp) -> Option<usize> {
        Self::op_depth(&op, &self.min_depths)
    }

    /// Share of terminals among all grammar members, used by grow generation.
    pub fn terminal_ratio(&self) -> f64 {
        self.terminal_ratio
    }

    /// Sorts that can occur in a tree rooted at `root`.
    pub fn reachable_sorts(&self, root: Sort) -> BTreeSet<Sort> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(sort) = stack.pop() {
            if !seen.insert(sort) {
                continue;
            }
            for op in self.primitives_for(sort) {
                if self.primitive_min_depth(*op).is_some() {
                    stack.extend(op.inputs().iter().copied());
                }
            }
        }
        seen
    }

    /// Fails when some sort reachable from the root cannot be built within
    /// `max_depth`. Runs once at startup for every depth bound in use.
    pub fn validate(&self, max_depth: usize) -> Result<()> {
        for sort in self.reachable_sorts(ROOT_SORT) {
            match self.min_depth(sort) {
                Some(depth) if depth <= max_depth => {}
                Some(depth) => {
                    return Err(GpTraderError::Generation(format!(
                        "Sort {} needs depth {} but the bound is {}",
                        sort, depth, max_depth
                    )))
                }
                None => {
                    return Err(GpTraderError::Generation(format!(
                        "Sort {} has neither a terminal nor a buildable primitive",
                        sort
                    )))
                }
            }
        }
        Ok(())
    }

    /// Indicator columns the interpreter may read for this terminal set.
    pub fn required_indicators(&self) -> Vec<IndicatorKey> {
        let windows = |sort: Sort| -> Vec<u32> {
            self.terminals_for(sort)
                .iter()
                .filter_map(|&v| u32::try_from(v).ok())
                .collect()
        };
        let reachable = self.reachable_sorts(ROOT_SORT);
        let mut keys = BTreeSet::new();

        if reachable.contains(&Sort::MaWindow) {
            keys.extend(windows(Sort::MaWindow).into_iter().map(IndicatorKey::Sma));
        }
        if reachable.contains(&Sort::EmaWindow) {
            keys.extend(windows(Sort::EmaWindow).into_iter().map(IndicatorKey::Ema));
        }
        if reachable.contains(&Sort::RsiWindow) {
            keys.extend(windows(Sort::RsiWindow).into_iter().map(IndicatorKey::Rsi));
        }
        if reachable.contains(&Sort::MacdValue) {
            for &slow in &windows(Sort::MacdSlow) {
                for &fast in &windows(Sort::MacdFast) {
                    keys.insert(IndicatorKey::Macd { slow, fast });
                    for &signal in &windows(Sort::MacdSignal) {
                        keys.insert(IndicatorKey::MacdSignal { signal, slow, fast });
                    }
                }
            }
        }
        if reachable.contains(&Sort::SoValue) {
            for window in windows(Sort::SoWindow) {
                keys.insert(IndicatorKey::So(window));
                keys.insert(IndicatorKey::SoSignal(window));
            }
        }
        keys.into_iter().collect()
    }
}
