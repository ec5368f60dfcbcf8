//! Formula Abstract Syntax Tree types
//!
//! The AST is the canonical form of a formula between edits: structural
//! edits rewrite references here (never the source text), and the display
//! impl regenerates source from the rewritten tree.

use cadsheet_core::{CellAddress, CellError, CellRange};
use std::fmt;

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal
    Text(String),
    /// Boolean literal
    Boolean(bool),
    /// Error literal (appears when a reference was severed by a structural
    /// edit and the formula was rewritten to `#REF!`)
    Error(CellError),

    // === References ===
    /// Single cell reference by address
    CellRef(CellAddress),
    /// Single cell reference by alias
    AliasRef(String),
    /// Rectangular range reference (only valid as a function argument)
    RangeRef(CellRange),

    // === Operators ===
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    // === Function call ===
    Function { name: String, args: Vec<Expr> },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Text
    Concat,
}

impl BinaryOperator {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Concat => "&",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
}

/// A reference extracted from a formula
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    Cell(CellAddress),
    Alias(String),
    Range(CellRange),
}

impl Expr {
    /// Collect every cell, alias, and range reference in the expression
    pub fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references(&self, refs: &mut Vec<Reference>) {
        match self {
            Expr::CellRef(addr) => refs.push(Reference::Cell(*addr)),
            Expr::AliasRef(name) => refs.push(Reference::Alias(name.clone())),
            Expr::RangeRef(range) => refs.push(Reference::Range(*range)),
            Expr::UnaryOp { operand, .. } => operand.collect_references(refs),
            Expr::BinaryOp { left, right, .. } => {
                left.collect_references(refs);
                right.collect_references(refs);
            }
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.collect_references(refs);
                }
            }
            Expr::Number(_) | Expr::Text(_) | Expr::Boolean(_) | Expr::Error(_) => {}
        }
    }

    /// Check whether the expression contains a reference to the given alias
    pub fn references_alias(&self, name: &str) -> bool {
        match self {
            Expr::AliasRef(n) => n == name,
            Expr::UnaryOp { operand, .. } => operand.references_alias(name),
            Expr::BinaryOp { left, right, .. } => {
                left.references_alias(name) || right.references_alias(name)
            }
            Expr::Function { args, .. } => args.iter().any(|a| a.references_alias(name)),
            _ => false,
        }
    }

    /// Rewrite cell and range references in place
    ///
    /// `cell_map` / `range_map` return the reference's new target, or `None`
    /// when the target was destroyed — the node then collapses to a `#REF!`
    /// error literal. Returns `true` if anything changed.
    pub fn rewrite_refs(
        &mut self,
        cell_map: &impl Fn(CellAddress) -> Option<CellAddress>,
        range_map: &impl Fn(CellRange) -> Option<CellRange>,
    ) -> bool {
        match self {
            Expr::CellRef(addr) => match cell_map(*addr) {
                Some(new_addr) if new_addr == *addr => false,
                Some(new_addr) => {
                    *addr = new_addr;
                    true
                }
                None => {
                    *self = Expr::Error(CellError::Unresolved);
                    true
                }
            },
            Expr::RangeRef(range) => match range_map(*range) {
                Some(new_range) if new_range == *range => false,
                Some(new_range) => {
                    *range = new_range;
                    true
                }
                None => {
                    *self = Expr::Error(CellError::Unresolved);
                    true
                }
            },
            Expr::UnaryOp { operand, .. } => operand.rewrite_refs(cell_map, range_map),
            Expr::BinaryOp { left, right, .. } => {
                let l = left.rewrite_refs(cell_map, range_map);
                let r = right.rewrite_refs(cell_map, range_map);
                l || r
            }
            Expr::Function { args, .. } => {
                let mut changed = false;
                for arg in args {
                    changed |= arg.rewrite_refs(cell_map, range_map);
                }
                changed
            }
            Expr::Number(_)
            | Expr::Text(_)
            | Expr::Boolean(_)
            | Expr::Error(_)
            | Expr::AliasRef(_) => false,
        }
    }

    /// Regenerate full formula source text, including the leading marker
    pub fn to_formula_string(&self) -> String {
        format!("={}", self)
    }

    /// Binding strength for parenthesization when printing
    fn precedence(&self) -> u8 {
        match self {
            Expr::BinaryOp { op, .. } => match op {
                BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterEqual => 1,
                BinaryOperator::Concat => 2,
                BinaryOperator::Add | BinaryOperator::Subtract => 3,
                BinaryOperator::Multiply | BinaryOperator::Divide => 4,
                BinaryOperator::Power => 5,
            },
            Expr::UnaryOp { .. } => 6,
            _ => 7,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Text(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Expr::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Expr::Error(e) => write!(f, "{}", e),
            Expr::CellRef(addr) => write!(f, "{}", addr),
            Expr::AliasRef(name) => write!(f, "{}", name),
            Expr::RangeRef(range) => {
                // A degenerate range still prints both corners
                write!(f, "{}:{}", range.start, range.end)
            }
            Expr::UnaryOp { op, operand } => {
                let sym = match op {
                    UnaryOperator::Negate => "-",
                };
                if operand.precedence() < self.precedence() {
                    write!(f, "{}({})", sym, operand)
                } else {
                    write!(f, "{}{}", sym, operand)
                }
            }
            Expr::BinaryOp { op, left, right } => {
                let prec = self.precedence();
                let right_assoc = matches!(op, BinaryOperator::Power);

                let left_parens =
                    left.precedence() < prec || (left.precedence() == prec && right_assoc);
                let right_parens =
                    right.precedence() < prec || (right.precedence() == prec && !right_assoc);

                if left_parens {
                    write!(f, "({})", left)?;
                } else {
                    write!(f, "{}", left)?;
                }
                write!(f, "{}", op.symbol())?;
                if right_parens {
                    write!(f, "({})", right)
                } else {
                    write!(f, "{}", right)
                }
            }
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn test_references_collection() {
        let expr = Expr::BinaryOp {
            op: BinaryOperator::Add,
            left: Box::new(Expr::CellRef(addr("A1"))),
            right: Box::new(Expr::Function {
                name: "SUM".into(),
                args: vec![
                    Expr::RangeRef(CellRange::parse("B1:B3").unwrap()),
                    Expr::AliasRef("rate".into()),
                ],
            }),
        };

        let refs = expr.references();
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0], Reference::Cell(addr("A1")));
        assert_eq!(
            refs[1],
            Reference::Range(CellRange::parse("B1:B3").unwrap())
        );
        assert_eq!(refs[2], Reference::Alias("rate".into()));
    }

    #[test]
    fn test_rewrite_refs_shift() {
        let mut expr = Expr::BinaryOp {
            op: BinaryOperator::Multiply,
            left: Box::new(Expr::CellRef(addr("A3"))),
            right: Box::new(Expr::Number(2.0)),
        };

        let changed = expr.rewrite_refs(
            &|a| Some(CellAddress::new(a.row + 1, a.col)),
            &|r| Some(r),
        );

        assert!(changed);
        assert_eq!(expr.to_formula_string(), "=A4*2");
    }

    #[test]
    fn test_rewrite_refs_severed_becomes_ref_error() {
        let mut expr = Expr::CellRef(addr("A1"));
        let changed = expr.rewrite_refs(&|_| None, &|r| Some(r));

        assert!(changed);
        assert_eq!(expr, Expr::Error(CellError::Unresolved));
        assert_eq!(expr.to_formula_string(), "=#REF!");
    }

    #[test]
    fn test_display_parenthesization() {
        // (1+2)*3 keeps parens, 1+2*3 does not add them
        let sum = Expr::BinaryOp {
            op: BinaryOperator::Add,
            left: Box::new(Expr::Number(1.0)),
            right: Box::new(Expr::Number(2.0)),
        };
        let product = Expr::BinaryOp {
            op: BinaryOperator::Multiply,
            left: Box::new(sum.clone()),
            right: Box::new(Expr::Number(3.0)),
        };
        assert_eq!(product.to_formula_string(), "=(1+2)*3");

        let plus = Expr::BinaryOp {
            op: BinaryOperator::Add,
            left: Box::new(Expr::Number(1.0)),
            right: Box::new(Expr::BinaryOp {
                op: BinaryOperator::Multiply,
                left: Box::new(Expr::Number(2.0)),
                right: Box::new(Expr::Number(3.0)),
            }),
        };
        assert_eq!(plus.to_formula_string(), "=1+2*3");
    }

    #[test]
    fn test_display_escapes_quotes() {
        let expr = Expr::Text("say \"hi\"".into());
        assert_eq!(expr.to_string(), "\"say \"\"hi\"\"\"");
    }
}
