//! Formula parser
//!
//! A recursive descent parser with standard operator precedence:
//! comparison < concatenation < add/subtract < multiply/divide < power <
//! unary minus. Parsing is pure — it never consults the sheet or the
//! dependency graph — and deterministic: identical source always yields a
//! structurally identical AST.

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use cadsheet_core::{CellAddress, CellError, CellRange};

/// Parse a formula string into an AST
///
/// The source must start with `=`. Ranges (`A1:B2`) are accepted only as
/// direct function arguments; anywhere else they are a syntax error.
///
/// # Example
/// ```rust
/// use cadsheet_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1:A10)").unwrap();
/// let ast = parse_formula("=IF(rate>0,\"yes\",\"no\")").unwrap();
/// ```
pub fn parse_formula(source: &str) -> FormulaResult<Expr> {
    let body = source
        .trim()
        .strip_prefix('=')
        .ok_or_else(|| FormulaError::syntax("formula must start with '='"))?;

    let tokens = tokenize(body)?;
    let mut parser = Parser { tokens, pos: 0 };

    let expr = parser.parse_expression()?;

    if let Some(tok) = parser.peek() {
        return Err(FormulaError::Syntax(format!(
            "unexpected input after expression: {:?}",
            tok
        )));
    }

    validate_range_placement(&expr, false)?;
    Ok(expr)
}

/// Ranges are aggregate-function arguments, never standalone values
fn validate_range_placement(expr: &Expr, range_allowed: bool) -> FormulaResult<()> {
    match expr {
        Expr::RangeRef(range) => {
            if range_allowed {
                Ok(())
            } else {
                Err(FormulaError::Syntax(format!(
                    "range {} is only valid as a function argument",
                    range
                )))
            }
        }
        Expr::UnaryOp { operand, .. } => validate_range_placement(operand, false),
        Expr::BinaryOp { left, right, .. } => {
            validate_range_placement(left, false)?;
            validate_range_placement(right, false)
        }
        Expr::Function { args, .. } => {
            for arg in args {
                validate_range_placement(arg, true)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Boolean(bool),
    ErrorLit(CellError),
    Ident(String),
    CellRef(CellAddress),

    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,
    LeftParen,
    RightParen,
}

/// Scan formula body text into tokens
fn tokenize(input: &str) -> FormulaResult<Vec<Token>> {
    let mut lexer = Lexer {
        input,
        pos: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl Lexer<'_> {
    fn run(&mut self) -> FormulaResult<()> {
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else { break };

            let token = match c {
                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '*' => self.single(Token::Star),
                '/' => self.single(Token::Slash),
                '^' => self.single(Token::Caret),
                '&' => self.single(Token::Ampersand),
                ':' => self.single(Token::Colon),
                ',' => self.single(Token::Comma),
                '(' => self.single(Token::LeftParen),
                ')' => self.single(Token::RightParen),
                '=' => self.single(Token::Equal),
                '<' => {
                    self.advance();
                    match self.peek() {
                        Some('=') => self.single(Token::LessEqual),
                        Some('>') => self.single(Token::NotEqual),
                        _ => Token::LessThan,
                    }
                }
                '>' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.single(Token::GreaterEqual)
                    } else {
                        Token::GreaterThan
                    }
                }
                '"' => self.scan_string()?,
                '#' => self.scan_error_literal()?,
                c if c.is_ascii_digit() || c == '.' => self.scan_number()?,
                c if c.is_ascii_alphabetic() || c == '_' => self.scan_word(),
                c => {
                    return Err(FormulaError::Syntax(format!(
                        "unknown character '{}' in formula",
                        c
                    )))
                }
            };

            self.tokens.push(token);
        }
        Ok(())
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn scan_string(&mut self) -> FormulaResult<Token> {
        self.advance(); // opening quote

        let mut s = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    // "" is an escaped quote
                    if self.peek() == Some('"') {
                        s.push('"');
                        self.advance();
                    } else {
                        return Ok(Token::Text(s));
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => return Err(FormulaError::syntax("unterminated string literal")),
            }
        }
    }

    fn scan_error_literal(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // '#'
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '!' || c == '/')
        {
            self.advance();
        }

        let text = &self.input[start..self.pos];
        CellError::from_str(text)
            .map(Token::ErrorLit)
            .ok_or_else(|| FormulaError::Syntax(format!("unknown error literal '{}'", text)))
    }

    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek().is_some_and(|c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::Syntax(format!("invalid number '{}'", text)))
    }

    fn scan_word(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        let text = &self.input[start..self.pos];

        // A following '(' means this word names a function, even if it
        // would otherwise read as an address or boolean (e.g. LOG10)
        let calls_function = {
            let rest = self.input[self.pos..].trim_start();
            rest.starts_with('(')
        };

        if !calls_function {
            match text.to_ascii_uppercase().as_str() {
                "TRUE" => return Token::Boolean(true),
                "FALSE" => return Token::Boolean(false),
                _ => {}
            }
            if looks_like_address(text) {
                if let Ok(addr) = CellAddress::parse(text) {
                    return Token::CellRef(addr);
                }
            }
        }

        Token::Ident(text.to_string())
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }
}

/// Letters followed by digits, nothing else
fn looks_like_address(text: &str) -> bool {
    let letters = text.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    if letters == 0 || letters == text.len() {
        return false;
    }
    text.chars().skip(letters).all(|c| c.is_ascii_digit())
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        match self.peek() {
            Some(tok) if tok == expected => {
                self.consume();
                Ok(())
            }
            other => Err(FormulaError::Syntax(format!(
                "expected {:?}, got {:?}",
                expected, other
            ))),
        }
    }

    fn parse_expression(&mut self) -> FormulaResult<Expr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = match self.peek() {
                Some(Token::Equal) => BinaryOperator::Equal,
                Some(Token::NotEqual) => BinaryOperator::NotEqual,
                Some(Token::LessThan) => BinaryOperator::LessThan,
                Some(Token::LessEqual) => BinaryOperator::LessEqual,
                Some(Token::GreaterThan) => BinaryOperator::GreaterThan,
                Some(Token::GreaterEqual) => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume();
            let right = self.parse_concatenation()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_concatenation(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_additive()?;

        while self.peek() == Some(&Token::Ampersand) {
            self.consume();
            let right = self.parse_additive()?;
            left = Expr::BinaryOp {
                op: BinaryOperator::Concat,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOperator::Add,
                Some(Token::Minus) => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume();
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_exponent()?;

        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOperator::Multiply,
                Some(Token::Slash) => BinaryOperator::Divide,
                _ => break,
            };

            self.consume();
            let right = self.parse_exponent()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_exponent(&mut self) -> FormulaResult<Expr> {
        let left = self.parse_unary()?;

        if self.peek() == Some(&Token::Caret) {
            self.consume();
            let right = self.parse_exponent()?; // Right associative
            return Ok(Expr::BinaryOp {
                op: BinaryOperator::Power,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<Expr> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                let operand = self.parse_unary()?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Negate,
                    operand: Box::new(operand),
                })
            }
            // Prefix plus is a no-op
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_range(),
        }
    }

    fn parse_range(&mut self) -> FormulaResult<Expr> {
        let left = self.parse_primary()?;

        if self.peek() == Some(&Token::Colon) {
            self.consume();
            let right = self.parse_primary()?;

            return match (&left, &right) {
                (Expr::CellRef(start), Expr::CellRef(end)) => {
                    Ok(Expr::RangeRef(CellRange::new(*start, *end)))
                }
                _ => Err(FormulaError::syntax(
                    "range corners must be cell addresses",
                )),
            };
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> FormulaResult<Expr> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Text(s)) => Ok(Expr::Text(s)),
            Some(Token::Boolean(b)) => Ok(Expr::Boolean(b)),
            Some(Token::ErrorLit(e)) => Ok(Expr::Error(e)),
            Some(Token::CellRef(addr)) => Ok(Expr::CellRef(addr)),

            Some(Token::LeftParen) => {
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Ok(Expr::AliasRef(name))
                }
            }

            other => Err(FormulaError::Syntax(format!(
                "unexpected token: {:?}",
                other
            ))),
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<Expr> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();
        if self.peek() != Some(&Token::RightParen) {
            args.push(self.parse_expression()?);

            while self.peek() == Some(&Token::Comma) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&Token::RightParen)?;

        Ok(Expr::Function {
            name: name.to_uppercase(),
            args,
        })
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
    fn test_parse_literals() {
        assert_eq!(parse_formula("=42").unwrap(), Expr::Number(42.0));
        assert_eq!(parse_formula("=3.14").unwrap(), Expr::Number(3.14));
        assert_eq!(parse_formula("=1e10").unwrap(), Expr::Number(1e10));
        assert_eq!(parse_formula("=.5").unwrap(), Expr::Number(0.5));
        assert_eq!(
            parse_formula("=\"Hello\"").unwrap(),
            Expr::Text("Hello".into())
        );
        assert_eq!(
            parse_formula("=\"a \"\"b\"\"\"").unwrap(),
            Expr::Text("a \"b\"".into())
        );
        assert_eq!(parse_formula("=TRUE").unwrap(), Expr::Boolean(true));
        assert_eq!(parse_formula("=false").unwrap(), Expr::Boolean(false));
        assert_eq!(
            parse_formula("=#REF!").unwrap(),
            Expr::Error(CellError::Unresolved)
        );
        assert_eq!(
            parse_formula("=#DIV/0!").unwrap(),
            Expr::Error(CellError::DivByZero)
        );
    }

    #[test]
    fn test_parse_precedence() {
        // 1+2*3 parses as 1+(2*3)
        let Expr::BinaryOp { op, left, right } = parse_formula("=1+2*3").unwrap() else {
            panic!("expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::Add);
        assert_eq!(*left, Expr::Number(1.0));
        assert!(matches!(
            *right,
            Expr::BinaryOp {
                op: BinaryOperator::Multiply,
                ..
            }
        ));

        // 2^3^2 is right-associative: 2^(3^2)
        let Expr::BinaryOp { op, left, right } = parse_formula("=2^3^2").unwrap() else {
            panic!("expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::Power);
        assert_eq!(*left, Expr::Number(2.0));
        assert!(matches!(
            *right,
            Expr::BinaryOp {
                op: BinaryOperator::Power,
                ..
            }
        ));

        // -2^2 binds the minus tighter: (-2)^2
        let Expr::BinaryOp { op, left, .. } = parse_formula("=-2^2").unwrap() else {
            panic!("expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::Power);
        assert!(matches!(*left, Expr::UnaryOp { .. }));
    }

    #[test]
    fn test_parse_parentheses() {
        let Expr::BinaryOp { op, left, right } = parse_formula("=(1+2)*3").unwrap() else {
            panic!("expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::Multiply);
        assert!(matches!(
            *left,
            Expr::BinaryOp {
                op: BinaryOperator::Add,
                ..
            }
        ));
        assert_eq!(*right, Expr::Number(3.0));
    }

    #[test]
    fn test_parse_references() {
        assert_eq!(parse_formula("=A1").unwrap(), Expr::CellRef(addr("A1")));
        assert_eq!(
            parse_formula("=rate").unwrap(),
            Expr::AliasRef("rate".into())
        );
        assert_eq!(
            parse_formula("=my_alias_name").unwrap(),
            Expr::AliasRef("my_alias_name".into())
        );
    }

    #[test]
    fn test_parse_function_with_range() {
        let Expr::Function { name, args } = parse_formula("=SUM(A1:A10)").unwrap() else {
            panic!("expected Function");
        };
        assert_eq!(name, "SUM");
        assert_eq!(args.len(), 1);
        assert_eq!(
            args[0],
            Expr::RangeRef(CellRange::parse("A1:A10").unwrap())
        );
    }

    #[test]
    fn test_function_name_is_uppercased() {
        let Expr::Function { name, .. } = parse_formula("=sum(A1:A2)").unwrap() else {
            panic!("expected Function");
        };
        assert_eq!(name, "SUM");
    }

    #[test]
    fn test_parse_nested_function() {
        let Expr::Function { name, args } =
            parse_formula("=IF(A1>0,SUM(B1:B10),0)").unwrap()
        else {
            panic!("expected Function");
        };
        assert_eq!(name, "IF");
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_range_outside_function_rejected() {
        assert!(parse_formula("=A1:B2").is_err());
        assert!(parse_formula("=A1:B2+1").is_err());
        assert!(parse_formula("=SUM(A1:B2)+A1:B2").is_err());
        // Nested inside an argument expression is still not a direct argument
        assert!(parse_formula("=SUM(1+A1:B2)").is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_formula("1+2").is_err()); // missing marker
        assert!(parse_formula("=").is_err());
        assert!(parse_formula("=1+").is_err());
        assert!(parse_formula("=(1+2").is_err());
        assert!(parse_formula("=1)").is_err());
        assert!(parse_formula("=SUM(1,)").is_err());
        assert!(parse_formula("=\"abc").is_err());
        assert!(parse_formula("=1 ?").is_err());
        assert!(parse_formula("=#BOGUS!").is_err());
        assert!(parse_formula("=A1:rate").is_err());
    }

    #[test]
    fn test_parse_comparison_chain() {
        let Expr::BinaryOp { op, .. } = parse_formula("=A1<>B1").unwrap() else {
            panic!("expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::NotEqual);

        let Expr::BinaryOp { op, .. } = parse_formula("=A1>=5").unwrap() else {
            panic!("expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::GreaterEqual);
    }

    #[test]
    fn test_parse_concat() {
        let Expr::BinaryOp { op, .. } = parse_formula("=\"a\"&\"b\"").unwrap() else {
            panic!("expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::Concat);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let source = "=IF(AND(A1>0,rate<100),SUM(B1:B10)*rate,-A1^2)";
        assert_eq!(
            parse_formula(source).unwrap(),
            parse_formula(source).unwrap()
        );
    }

    #[test]
    fn test_display_roundtrip() {
        for source in [
            "=1+2*3",
            "=(1+2)*3",
            "=-A1^2",
            "=SUM(A1:B10,rate)",
            "=IF(A1>=5,\"big\",\"small\")",
            "=1-(2-3)",
            "=2^(3^2)",
            "=\"a\"&\"b\"&\"c\"",
        ] {
            let ast = parse_formula(source).unwrap();
            let printed = ast.to_formula_string();
            let reparsed = parse_formula(&printed).unwrap();
            assert_eq!(ast, reparsed, "roundtrip failed for {}", source);
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// A small strategy over well-formed formula source text
        fn formula_source() -> impl Strategy<Value = String> {
            let leaf = prop_oneof![
                (0u32..1000).prop_map(|n| n.to_string()),
                (1u32..99, 0u16..26).prop_map(|(row, col)| format!(
                    "{}{}",
                    (b'A' + col as u8) as char,
                    row
                )),
                Just("rate".to_string()),
                Just("TRUE".to_string()),
            ];
            leaf.prop_recursive(3, 16, 2, |inner| {
                let op = prop_oneof![Just("+"), Just("-"), Just("*"), Just("/")];
                (inner.clone(), op, inner)
                    .prop_map(|(l, op, r)| format!("({}{}{})", l, op, r))
            })
            .prop_map(|body| format!("={}", body))
        }

        proptest! {
            #[test]
            fn parse_twice_yields_identical_ast(source in formula_source()) {
                let first = parse_formula(&source).unwrap();
                let second = parse_formula(&source).unwrap();
                prop_assert_eq!(first, second);
            }

            #[test]
            fn display_roundtrips_structurally(source in formula_source()) {
                let ast = parse_formula(&source).unwrap();
                let reparsed = parse_formula(&ast.to_formula_string()).unwrap();
                prop_assert_eq!(ast, reparsed);
            }
        }
    }
}
