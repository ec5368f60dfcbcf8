//! Formula evaluator
//!
//! Evaluates ASTs against a [`CellProvider`]. Evaluation is infallible at
//! the API level: runtime failures (bad operand types, division by zero,
//! unresolved references) are produced as [`CellError`] *values*, which the
//! caller stores in the cell like any other result.

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::functions;
use cadsheet_core::{CellAddress, CellError, CellRange, CellValue};
use std::cmp::Ordering;

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
    /// Rectangular block of values produced by a range argument
    Array(Vec<Vec<Value>>),
}

impl Value {
    /// Convert to number, if possible
    ///
    /// Empty coerces to 0, booleans to 0/1, numeric strings parse.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(true) => Some(1.0),
            Value::Boolean(false) => Some(0.0),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Empty => Some(0.0),
            _ => None,
        }
    }

    /// Convert to boolean, if possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Number(n) => Some(*n != 0.0),
            Value::Empty => Some(false),
            _ => None,
        }
    }

    /// Convert to display text (numbers drop a trailing `.0`)
    pub fn as_text(&self) -> String {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Value::Text(s) => s.clone(),
            Value::Boolean(true) => "TRUE".to_string(),
            Value::Boolean(false) => "FALSE".to_string(),
            Value::Error(e) => e.to_string(),
            Value::Empty => String::new(),
            Value::Array(_) => CellError::TypeMismatch.to_string(),
        }
    }

    /// Get the error if this is one
    pub fn error(&self) -> Option<CellError> {
        match self {
            Value::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }
}

impl From<&CellValue> for Value {
    fn from(value: &CellValue) -> Self {
        match value.effective_value() {
            CellValue::Empty => Value::Empty,
            CellValue::Number(n) => Value::Number(*n),
            CellValue::String(s) => Value::Text(s.as_str().to_string()),
            CellValue::Boolean(b) => Value::Boolean(*b),
            CellValue::Error(e) => Value::Error(*e),
            // effective_value never returns a Formula
            CellValue::Formula { .. } => Value::Empty,
        }
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Empty => CellValue::Empty,
            Value::Number(n) => CellValue::Number(n),
            Value::Text(s) => CellValue::string(s),
            Value::Boolean(b) => CellValue::Boolean(b),
            Value::Error(e) => CellValue::Error(e),
            // A bare array has no single-cell representation
            Value::Array(_) => CellValue::Error(CellError::TypeMismatch),
        }
    }
}

/// The evaluator's window onto the document
///
/// The recalculation engine implements this over the sheet so that the
/// evaluator itself never touches storage, merges, or the alias registry
/// directly.
pub trait CellProvider {
    /// Current effective value of a cell (merge-resolved)
    fn cell_value(&self, addr: CellAddress) -> Value;

    /// Resolve an alias to the cell it is bound to
    fn alias_target(&self, name: &str) -> Option<CellAddress>;
}

/// Read a referenced cell, converting stored errors into a propagated
/// reference-class error: dependents of a failed cell see `#REF!`, never the
/// upstream error kind and never a stale value.
fn read_cell(ctx: &dyn CellProvider, addr: CellAddress) -> Value {
    match ctx.cell_value(addr) {
        Value::Error(_) => Value::Error(CellError::Unresolved),
        v => v,
    }
}

fn read_range(ctx: &dyn CellProvider, range: CellRange) -> Value {
    let mut rows = Vec::with_capacity(range.row_count() as usize);
    for row in range.start.row..=range.end.row {
        let mut cols = Vec::with_capacity(range.col_count() as usize);
        for col in range.start.col..=range.end.col {
            cols.push(read_cell(ctx, CellAddress::new(row, col)));
        }
        rows.push(cols);
    }
    Value::Array(rows)
}

/// Evaluate a formula expression against the given provider
pub fn evaluate(expr: &Expr, ctx: &dyn CellProvider) -> Value {
    match expr {
        Expr::Number(n) => Value::Number(*n),
        Expr::Text(s) => Value::Text(s.clone()),
        Expr::Boolean(b) => Value::Boolean(*b),
        Expr::Error(e) => Value::Error(*e),

        Expr::CellRef(addr) => read_cell(ctx, *addr),
        Expr::RangeRef(range) => read_range(ctx, *range),
        Expr::AliasRef(name) => match ctx.alias_target(name) {
            Some(addr) => read_cell(ctx, addr),
            None => Value::Error(CellError::Unresolved),
        },

        Expr::UnaryOp { op, operand } => {
            let value = evaluate(operand, ctx);
            if value.is_error() {
                return value;
            }
            match op {
                UnaryOperator::Negate => match value.as_number() {
                    Some(n) => Value::Number(-n),
                    None => Value::Error(CellError::TypeMismatch),
                },
            }
        }

        Expr::BinaryOp { op, left, right } => {
            let lhs = evaluate(left, ctx);
            if lhs.is_error() {
                return lhs;
            }
            let rhs = evaluate(right, ctx);
            if rhs.is_error() {
                return rhs;
            }
            evaluate_binary_op(*op, &lhs, &rhs)
        }

        Expr::Function { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, ctx));
            }
            functions::call(name, &values)
        }
    }
}

fn evaluate_binary_op(op: BinaryOperator, lhs: &Value, rhs: &Value) -> Value {
    use BinaryOperator::*;

    match op {
        Add | Subtract | Multiply | Divide | Power => {
            let (Some(l), Some(r)) = (lhs.as_number(), rhs.as_number()) else {
                return Value::Error(CellError::TypeMismatch);
            };
            match op {
                Add => Value::Number(l + r),
                Subtract => Value::Number(l - r),
                Multiply => Value::Number(l * r),
                Divide => {
                    if r == 0.0 {
                        Value::Error(CellError::DivByZero)
                    } else {
                        Value::Number(l / r)
                    }
                }
                Power => {
                    let result = l.powf(r);
                    if result.is_finite() {
                        Value::Number(result)
                    } else {
                        Value::Error(CellError::TypeMismatch)
                    }
                }
                _ => unreachable!(),
            }
        }

        Concat => {
            if matches!(lhs, Value::Array(_)) || matches!(rhs, Value::Array(_)) {
                return Value::Error(CellError::TypeMismatch);
            }
            Value::Text(format!("{}{}", lhs.as_text(), rhs.as_text()))
        }

        Equal => Value::Boolean(compare_values(lhs, rhs) == Some(Ordering::Equal)),
        NotEqual => Value::Boolean(compare_values(lhs, rhs) != Some(Ordering::Equal)),
        LessThan | LessEqual | GreaterThan | GreaterEqual => {
            let Some(ordering) = compare_values(lhs, rhs) else {
                return Value::Error(CellError::TypeMismatch);
            };
            Value::Boolean(match op {
                LessThan => ordering == Ordering::Less,
                LessEqual => ordering != Ordering::Greater,
                GreaterThan => ordering == Ordering::Greater,
                GreaterEqual => ordering != Ordering::Less,
                _ => unreachable!(),
            })
        }
    }
}

/// Compare two values for relational operators
///
/// Numbers (and things that coerce to numbers) compare numerically, strings
/// compare case-insensitively. Incomparable pairs yield `None`.
fn compare_values(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (lhs.as_number(), rhs.as_number()) {
        return l.partial_cmp(&r);
    }

    if let (Value::Text(l), Value::Text(r)) = (lhs, rhs) {
        return Some(l.to_lowercase().cmp(&r.to_lowercase()));
    }

    None
}
