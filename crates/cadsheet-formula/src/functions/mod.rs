//! Built-in formula functions

pub mod logical;
pub mod math;

use crate::evaluator::Value;
use cadsheet_core::CellError;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Function implementation signature
///
/// Arguments arrive fully evaluated; range arguments appear as
/// [`Value::Array`].
pub type FunctionImpl = fn(&[Value]) -> Value;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

/// Function registry
pub struct FunctionRegistry {
    functions: HashMap<&'static str, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register_math_functions();
        registry.register_logical_functions();

        registry
    }

    /// Look up a function by (case-insensitive) name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name.to_uppercase().as_str())
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    fn register_math_functions(&mut self) {
        self.register(FunctionDef {
            name: "SUM",
            min_args: 1,
            max_args: None,
            implementation: math::fn_sum,
        });
        self.register(FunctionDef {
            name: "AVERAGE",
            min_args: 1,
            max_args: None,
            implementation: math::fn_average,
        });
        self.register(FunctionDef {
            name: "MIN",
            min_args: 1,
            max_args: None,
            implementation: math::fn_min,
        });
        self.register(FunctionDef {
            name: "MAX",
            min_args: 1,
            max_args: None,
            implementation: math::fn_max,
        });
        self.register(FunctionDef {
            name: "COUNT",
            min_args: 1,
            max_args: None,
            implementation: math::fn_count,
        });
        self.register(FunctionDef {
            name: "ABS",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_abs,
        });
        self.register(FunctionDef {
            name: "ROUND",
            min_args: 1,
            max_args: Some(2),
            implementation: math::fn_round,
        });
        self.register(FunctionDef {
            name: "SQRT",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_sqrt,
        });
        self.register(FunctionDef {
            name: "MOD",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_mod,
        });
        self.register(FunctionDef {
            name: "INT",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_int,
        });
    }

    fn register_logical_functions(&mut self) {
        self.register(FunctionDef {
            name: "IF",
            min_args: 2,
            max_args: Some(3),
            implementation: logical::fn_if,
        });
        self.register(FunctionDef {
            name: "AND",
            min_args: 1,
            max_args: None,
            implementation: logical::fn_and,
        });
        self.register(FunctionDef {
            name: "OR",
            min_args: 1,
            max_args: None,
            implementation: logical::fn_or,
        });
        self.register(FunctionDef {
            name: "NOT",
            min_args: 1,
            max_args: Some(1),
            implementation: logical::fn_not,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global function registry (lazily initialized)
static REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Get the shared registry of built-in functions
pub fn registry() -> &'static FunctionRegistry {
    REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Call a built-in function with evaluated arguments
///
/// Unknown names are a reference-class error; arity violations are type
/// errors. Both are values, not panics — like every runtime failure.
pub fn call(name: &str, args: &[Value]) -> Value {
    let Some(def) = registry().get(name) else {
        return Value::Error(CellError::Unresolved);
    };

    if args.len() < def.min_args {
        return Value::Error(CellError::TypeMismatch);
    }
    if let Some(max) = def.max_args {
        if args.len() > max {
            return Value::Error(CellError::TypeMismatch);
        }
    }

    (def.implementation)(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert!(registry().get("sum").is_some());
        assert!(registry().get("Sum").is_some());
        assert!(registry().get("SUM").is_some());
        assert!(registry().get("BOGUS").is_none());
    }

    #[test]
    fn test_arity_violations() {
        assert_eq!(
            call("ABS", &[]),
            Value::Error(CellError::TypeMismatch)
        );
        assert_eq!(
            call("ABS", &[Value::Number(1.0), Value::Number(2.0)]),
            Value::Error(CellError::TypeMismatch)
        );
    }

    #[test]
    fn test_unknown_function_is_unresolved() {
        assert_eq!(
            call("NOSUCHFN", &[Value::Number(1.0)]),
            Value::Error(CellError::Unresolved)
        );
    }
}
