use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag constraining which primitives and terminals may appear at a tree position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sort {
    Bool,
    Float,
    Position,
    Date,
    MaWindow,
    EmaWindow,
    RsiWindow,
    RsiBound,
    RsiValue,
    RsiBelow,
    RsiAbove,
    MacdSlow,
    MacdFast,
    MacdSignal,
    MacdValue,
    MacdBound,
    SoWindow,
    SoValue,
    SoBound,
}

impl Sort {
    pub fn all() -> &'static [Sort] {
        &[
            Sort::Bool,
            Sort::Float,
            Sort::Position,
            Sort::Date,
            Sort::MaWindow,
            Sort::EmaWindow,
            Sort::RsiWindow,
            Sort::RsiBound,
            Sort::RsiValue,
            Sort::RsiBelow,
            Sort::RsiAbove,
            Sort::MacdSlow,
            Sort::MacdFast,
            Sort::MacdSignal,
            Sort::MacdValue,
            Sort::MacdBound,
            Sort::SoWindow,
            Sort::SoValue,
            Sort::SoBound,
        ]
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Value produced while interpreting a rule tree for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Float(f64),
    Integer(i64),
    /// Row index of the date currently being simulated.
    Date(usize),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Float(_) => "float",
            Value::Integer(_) => "integer",
            Value::Date(_) => "date",
        }
    }
}
