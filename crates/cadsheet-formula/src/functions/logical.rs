//! Logical functions

use crate::evaluator::Value;
use cadsheet_core::CellError;

/// Flatten arguments into booleans
///
/// Scalars must coerce; inside ranges, only booleans and numbers
/// participate, text and empties are skipped, errors propagate.
fn collect_bools(args: &[Value]) -> Result<Vec<bool>, CellError> {
    let mut bools = Vec::new();

    for arg in args {
        match arg {
            Value::Error(e) => return Err(*e),
            Value::Array(rows) => {
                for row in rows {
                    for cell in row {
                        match cell {
                            Value::Error(e) => return Err(*e),
                            Value::Boolean(b) => bools.push(*b),
                            Value::Number(n) => bools.push(*n != 0.0),
                            _ => {}
                        }
                    }
                }
            }
            scalar => match scalar.as_bool() {
                Some(b) => bools.push(b),
                None => return Err(CellError::TypeMismatch),
            },
        }
    }

    Ok(bools)
}

pub fn fn_if(args: &[Value]) -> Value {
    let condition = match &args[0] {
        Value::Error(e) => return Value::Error(*e),
        v => match v.as_bool() {
            Some(b) => b,
            None => return Value::Error(CellError::TypeMismatch),
        },
    };

    if condition {
        args[1].clone()
    } else {
        args.get(2).cloned().unwrap_or(Value::Boolean(false))
    }
}

pub fn fn_and(args: &[Value]) -> Value {
    match collect_bools(args) {
        Ok(bools) if bools.is_empty() => Value::Error(CellError::TypeMismatch),
        Ok(bools) => Value::Boolean(bools.into_iter().all(|b| b)),
        Err(e) => Value::Error(e),
    }
}

pub fn fn_or(args: &[Value]) -> Value {
    match collect_bools(args) {
        Ok(bools) if bools.is_empty() => Value::Error(CellError::TypeMismatch),
        Ok(bools) => Value::Boolean(bools.into_iter().any(|b| b)),
        Err(e) => Value::Error(e),
    }
}

pub fn fn_not(args: &[Value]) -> Value {
    match &args[0] {
        Value::Error(e) => Value::Error(*e),
        v => match v.as_bool() {
            Some(b) => Value::Boolean(!b),
            None => Value::Error(CellError::TypeMismatch),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_if() {
        assert_eq!(
            fn_if(&[
                Value::Boolean(true),
                Value::Number(1.0),
                Value::Number(2.0)
            ]),
            Value::Number(1.0)
        );
        assert_eq!(
            fn_if(&[Value::Boolean(false), Value::Number(1.0)]),
            Value::Boolean(false)
        );
        // Numbers coerce to conditions
        assert_eq!(
            fn_if(&[Value::Number(0.0), Value::Number(1.0), Value::Number(2.0)]),
            Value::Number(2.0)
        );
        assert_eq!(
            fn_if(&[Value::Text("x".into()), Value::Number(1.0)]),
            Value::Error(CellError::TypeMismatch)
        );
    }

    #[test]
    fn test_and_or_not() {
        assert_eq!(
            fn_and(&[Value::Boolean(true), Value::Number(1.0)]),
            Value::Boolean(true)
        );
        assert_eq!(
            fn_and(&[Value::Boolean(true), Value::Boolean(false)]),
            Value::Boolean(false)
        );
        assert_eq!(
            fn_or(&[Value::Boolean(false), Value::Number(2.0)]),
            Value::Boolean(true)
        );
        assert_eq!(fn_not(&[Value::Boolean(false)]), Value::Boolean(true));
    }

    #[test]
    fn test_error_propagation() {
        assert_eq!(
            fn_and(&[Value::Error(CellError::DivByZero)]),
            Value::Error(CellError::DivByZero)
        );
    }
}
