//! # cadsheet-formula
//!
//! Formula machinery for cadsheet:
//! - Formula parsing (text → AST) with reference extraction and rewriting
//! - Dependency graph (who reads whom, reverse closure for dirty tracking)
//! - AST evaluation against a [`CellProvider`]
//! - Built-in functions (aggregates over ranges, scalar math, logic)
//!
//! Parsing and evaluation are pure: neither touches the cell store. The
//! document layer wires them to the grid and drives recalculation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cadsheet_formula::{evaluate, parse_formula};
//!
//! let ast = parse_formula("=SUM(A1:A10)*rate")?;
//! let value = evaluate(&ast, &provider);
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;

pub use ast::{BinaryOperator, Expr, Reference, UnaryOperator};
pub use dependency::DependencyGraph;
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, CellProvider, Value};
pub use parser::parse_formula;
