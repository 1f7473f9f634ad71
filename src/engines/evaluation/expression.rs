use crate::{
    data::{IndicatorKey, PriceTable},
    engines::generation::{grammar::PrimitiveOp, tree::Node},
    error::{GpTraderError, Result},
    types::Value,
};

/// Tree-walking interpreter for rule trees over one price table.
pub struct ExpressionEvaluator<'a> {
    table: &'a PriceTable,
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(table: &'a PriceTable) -> Self {
        Self { table }
    }

    /// Decide for one tick: `true` means "be invested".
    pub fn evaluate_rule(&self, rule: &Node, row: usize, position: bool) -> Result<bool> {
        as_bool(self.evaluate(rule, row, position)?)
    }

    pub fn evaluate(&self, node: &Node, row: usize, position: bool) -> Result<Value> {
        match node {
            Node::Argument { index: 0 } => Ok(Value::Date(row)),
            Node::Argument { index: 1 } => Ok(Value::Bool(position)),
            Node::Argument { index } => Err(GpTraderError::Evaluation(format!(
                "Unknown argument index {}",
                index
            ))),
            Node::Terminal { value, .. } => Ok(Value::Integer(*value)),
            Node::Primitive { op, children } => self.apply(*op, children, row, position),
        }
    }

    fn apply(&self, op: PrimitiveOp, args: &[Node], row: usize, position: bool) -> Result<Value> {
        if args.len() != op.arity() {
            return Err(GpTraderError::Evaluation(format!(
                "{} expects {} arguments, got {}",
                op.name(),
                op.arity(),
                args.len()
            )));
        }
        let eval = |i: usize| self.evaluate(&args[i], row, position);

        let value = match op {
            PrimitiveOp::IfThenElse => {
                if as_bool(eval(0)?)? {
                    Value::Bool(as_bool(eval(1)?)?)
                } else {
                    Value::Bool(as_bool(eval(2)?)?)
                }
            }
            PrimitiveOp::And => Value::Bool(as_bool(eval(0)?)? && as_bool(eval(1)?)?),
            PrimitiveOp::Or => Value::Bool(as_bool(eval(0)?)? || as_bool(eval(1)?)?),
            PrimitiveOp::Not => Value::Bool(!as_bool(eval(0)?)?),
            PrimitiveOp::LtFloat
            | PrimitiveOp::RsiBelow
            | PrimitiveOp::LtMacd
            | PrimitiveOp::LtSo => Value::Bool(as_number(eval(0)?)? < as_number(eval(1)?)?),
            PrimitiveOp::GtFloat
            | PrimitiveOp::RsiAbove
            | PrimitiveOp::GtMacd
            | PrimitiveOp::GtSo => Value::Bool(as_number(eval(0)?)? > as_number(eval(1)?)?),
            PrimitiveOp::Ma => {
                let date = as_date(eval(0)?)?;
                Value::Float(self.table.indicator(IndicatorKey::Sma(as_window(eval(1)?)?), date)?)
            }
            PrimitiveOp::Ema => {
                let date = as_date(eval(0)?)?;
                Value::Float(self.table.indicator(IndicatorKey::Ema(as_window(eval(1)?)?), date)?)
            }
            PrimitiveOp::Rsi => {
                let date = as_date(eval(0)?)?;
                Value::Float(self.table.indicator(IndicatorKey::Rsi(as_window(eval(1)?)?), date)?)
            }
            PrimitiveOp::Macd => {
                let date = as_date(eval(0)?)?;
                let slow = as_window(eval(1)?)?;
                let fast = as_window(eval(2)?)?;
                let signal = as_window(eval(3)?)?;
                let macd = self.table.indicator(IndicatorKey::Macd { slow, fast }, date)?;
                let line = self
                    .table
                    .indicator(IndicatorKey::MacdSignal { signal, slow, fast }, date)?;
                Value::Float(macd - line)
            }
            PrimitiveOp::So => {
                let date = as_date(eval(0)?)?;
                let window = as_window(eval(1)?)?;
                let k = self.table.indicator(IndicatorKey::So(window), date)?;
                let d = self.table.indicator(IndicatorKey::SoSignal(window), date)?;
                Value::Float(k - d)
            }
        };
        Ok(value)
    }
}

fn mismatch(expected: &str, actual: Value) -> GpTraderError {
    GpTraderError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.kind().to_string(),
    }
}

fn as_bool(value: Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(mismatch("bool", other)),
    }
}

// Comparisons mix indicator floats with integer bounds.
fn as_number(value: Value) -> Result<f64> {
    match value {
        Value::Float(f) => Ok(f),
        Value::Integer(i) => Ok(i as f64),
        other => Err(mismatch("number", other)),
    }
}

fn as_date(value: Value) -> Result<usize> {
    match value {
        Value::Date(row) => Ok(row),
        other => Err(mismatch("date", other)),
    }
}

fn as_window(value: Value) -> Result<u32> {
    match value {
        Value::Integer(i) => u32::try_from(i)
            .map_err(|_| GpTraderError::Evaluation(format!("Invalid indicator window {}", i))),
        other => Err(mismatch("integer", other)),
    }
}
