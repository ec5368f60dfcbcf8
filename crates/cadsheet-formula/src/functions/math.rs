//! Math and aggregate functions

use crate::evaluator::Value;
use cadsheet_core::CellError;

/// Flatten arguments into the numbers an aggregate operates on
///
/// Scalar arguments must coerce to numbers. Inside range arguments the usual
/// spreadsheet rules apply: numbers count, text/booleans/empties are
/// skipped, errors propagate.
fn collect_numbers(args: &[Value]) -> Result<Vec<f64>, CellError> {
    let mut numbers = Vec::new();

    for arg in args {
        match arg {
            Value::Error(e) => return Err(*e),
            Value::Array(rows) => {
                for row in rows {
                    for cell in row {
                        match cell {
                            Value::Error(e) => return Err(*e),
                            Value::Number(n) => numbers.push(*n),
                            _ => {}
                        }
                    }
                }
            }
            scalar => match scalar.as_number() {
                Some(n) => numbers.push(n),
                None => return Err(CellError::TypeMismatch),
            },
        }
    }

    Ok(numbers)
}

/// Extract a single scalar numeric argument
fn scalar_number(arg: &Value) -> Result<f64, CellError> {
    match arg {
        Value::Error(e) => Err(*e),
        Value::Array(_) => Err(CellError::TypeMismatch),
        v => v.as_number().ok_or(CellError::TypeMismatch),
    }
}

fn number_or_error(result: Result<f64, CellError>) -> Value {
    match result {
        Ok(n) => Value::Number(n),
        Err(e) => Value::Error(e),
    }
}

pub fn fn_sum(args: &[Value]) -> Value {
    number_or_error(collect_numbers(args).map(|ns| ns.iter().sum()))
}

pub fn fn_average(args: &[Value]) -> Value {
    match collect_numbers(args) {
        Ok(ns) if ns.is_empty() => Value::Error(CellError::DivByZero),
        Ok(ns) => Value::Number(ns.iter().sum::<f64>() / ns.len() as f64),
        Err(e) => Value::Error(e),
    }
}

pub fn fn_min(args: &[Value]) -> Value {
    match collect_numbers(args) {
        Ok(ns) if ns.is_empty() => Value::Number(0.0),
        Ok(ns) => Value::Number(ns.iter().copied().fold(f64::INFINITY, f64::min)),
        Err(e) => Value::Error(e),
    }
}

pub fn fn_max(args: &[Value]) -> Value {
    match collect_numbers(args) {
        Ok(ns) if ns.is_empty() => Value::Number(0.0),
        Ok(ns) => Value::Number(ns.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        Err(e) => Value::Error(e),
    }
}

pub fn fn_count(args: &[Value]) -> Value {
    match collect_numbers(args) {
        Ok(ns) => Value::Number(ns.len() as f64),
        Err(e) => Value::Error(e),
    }
}

pub fn fn_abs(args: &[Value]) -> Value {
    number_or_error(scalar_number(&args[0]).map(f64::abs))
}

pub fn fn_round(args: &[Value]) -> Value {
    let value = match scalar_number(&args[0]) {
        Ok(n) => n,
        Err(e) => return Value::Error(e),
    };
    let digits = match args.get(1) {
        Some(arg) => match scalar_number(arg) {
            Ok(d) => d.trunc() as i32,
            Err(e) => return Value::Error(e),
        },
        None => 0,
    };

    let factor = 10f64.powi(digits);
    Value::Number((value * factor).round() / factor)
}

pub fn fn_sqrt(args: &[Value]) -> Value {
    match scalar_number(&args[0]) {
        Ok(n) if n < 0.0 => Value::Error(CellError::TypeMismatch),
        Ok(n) => Value::Number(n.sqrt()),
        Err(e) => Value::Error(e),
    }
}

pub fn fn_mod(args: &[Value]) -> Value {
    let (n, d) = match (scalar_number(&args[0]), scalar_number(&args[1])) {
        (Ok(n), Ok(d)) => (n, d),
        (Err(e), _) | (_, Err(e)) => return Value::Error(e),
    };
    if d == 0.0 {
        return Value::Error(CellError::DivByZero);
    }
    // Sign follows the divisor
    Value::Number(n - d * (n / d).floor())
}

pub fn fn_int(args: &[Value]) -> Value {
    number_or_error(scalar_number(&args[0]).map(f64::floor))
}
