//! Recursive-descent parser.
//!
//! Precedence, low to high:
//!
//! ```text
//! statement   := expression [ ('=' | op'=') statement ]
//! expression  := 'lambda' ... | or_test [ 'if' ... ] [ ':=' expression ]
//! or_test     := and_test ('or' and_test)*
//! and_test    := not_test ('and' not_test)*
//! not_test    := 'not' not_test | comparison
//! comparison  := bitwise (cmp_op bitwise)*
//! bitwise     := arith (('&' | '|' | '<<' | '>>') arith)*
//! arith       := term (('+' | '-') term)*
//! term        := factor (('*' | '/' | '%' | '//') factor)*
//! factor      := ('+' | '-') factor | '~' factor | power
//! power       := postfix [ ('^' | '**') factor ]
//! postfix     := atom ( '(' args ')' | '.' NAME | '[' ... ']' )*
//! atom        := NUMBER | NAME | STRING+ | '(' ... ')' | '[' ... ']' | '{' ... '}'
//! ```
//!
//! Everything above `bitwise` and every bracketed form except plain
//! grouping produce [`Expr::Unsupported`]; they are parsed only far enough
//! to be named.
//!
//! Input longer than [`MAX_INPUT_CHARS`] or nested deeper than
//! [`MAX_NESTING`] is refused before it can exhaust the stack.

use crate::ast::{BinaryOp, Construct, Expr, UnaryOp};
use crate::error::{EvalError, EvalResult};
use crate::lexer::{Token, TokenKind, tokenize};

const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Longest input the parser accepts, in characters.
pub const MAX_INPUT_CHARS: usize = 1000;

/// Deepest recursion the grammar may reach. Each parenthesis, call or unary
/// sign costs one level.
pub const MAX_NESTING: usize = 100;

/// Parses `input` into an expression tree.
pub fn parse(input: &str) -> EvalResult<Expr> {
    if input.chars().nth(MAX_INPUT_CHARS).is_some() {
        return Err(EvalError::parse(MAX_INPUT_CHARS, "expression too long"));
    }

    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        idx: 0,
        depth: 0,
    };

    if parser.check(&TokenKind::Eof) {
        return Err(EvalError::parse(0, "empty expression"));
    }

    let expr = parser.statement()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    idx: usize,
    depth: usize,
}

impl Parser {
    // =========================================================================
    // Token helpers
    // =========================================================================

    fn peek(&self) -> &Token {
        // The token list always ends with Eof and `bump` never moves past it.
        &self.tokens[self.idx.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn pos(&self) -> usize {
        self.peek().pos
    }

    fn bump(&mut self) {
        if !self.check(&TokenKind::Eof) {
            self.idx += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.kind(), TokenKind::Ident(word) if word == keyword)
    }

    fn unexpected(&self) -> EvalError {
        let found = match self.kind() {
            TokenKind::Eof => return EvalError::parse(self.pos(), "unexpected end of expression"),
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Ident(word) => format!("'{word}'"),
            TokenKind::Str => "string".to_string(),
            other => format!("{other:?}").to_lowercase(),
        };
        EvalError::parse(self.pos(), format!("unexpected {found}"))
    }

    fn expect_eof(&self) -> EvalResult<()> {
        if self.check(&TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Runs `rule` one nesting level deeper.
    fn nested(&mut self, rule: fn(&mut Self) -> EvalResult<Expr>) -> EvalResult<Expr> {
        if self.depth >= MAX_NESTING {
            return Err(EvalError::parse(self.pos(), "expression nested too deeply"));
        }
        self.depth += 1;
        let expr = rule(self);
        self.depth -= 1;
        expr
    }

    // =========================================================================
    // Skipping unsupported spans
    // =========================================================================

    /// Consumes tokens until `stop` matches at bracket depth zero.
    /// The stopping token is left in place. Returns whether a `for`
    /// keyword was seen at depth zero.
    fn skip_until(&mut self, stop: impl Fn(&TokenKind) -> bool) -> EvalResult<bool> {
        let mut open: Vec<(TokenKind, usize)> = Vec::new();
        let mut saw_for = false;

        loop {
            let kind = self.kind().clone();
            if open.is_empty() && stop(&kind) {
                return Ok(saw_for);
            }
            match kind {
                TokenKind::Eof => {
                    let pos = open.last().map(|(_, p)| *p).unwrap_or(self.pos());
                    return Err(EvalError::parse(pos, "unbalanced brackets"));
                }
                TokenKind::LParen => open.push((TokenKind::RParen, self.pos())),
                TokenKind::LBracket => open.push((TokenKind::RBracket, self.pos())),
                TokenKind::LBrace => open.push((TokenKind::RBrace, self.pos())),
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => match open.pop() {
                    Some((expected, _)) if expected == kind => {}
                    _ => return Err(EvalError::parse(self.pos(), "mismatched bracket")),
                },
                TokenKind::Ident(ref word) if open.is_empty() && word == "for" => saw_for = true,
                _ => {}
            }
            self.bump();
        }
    }

    /// Consumes the rest of a bracketed form whose opener was just consumed,
    /// including the closer. Returns whether it was a comprehension.
    fn skip_bracketed(&mut self, close: TokenKind) -> EvalResult<bool> {
        let saw_for = self.skip_until(|kind| {
            matches!(
                kind,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace
            )
        })?;

        if self.check(&close) {
            self.bump();
            Ok(saw_for)
        } else {
            Err(EvalError::parse(self.pos(), "mismatched bracket"))
        }
    }

    fn skip_to_delimiter(&mut self) -> EvalResult<()> {
        self.skip_until(|kind| {
            matches!(
                kind,
                TokenKind::RParen
                    | TokenKind::RBracket
                    | TokenKind::RBrace
                    | TokenKind::Comma
                    | TokenKind::Eof
            )
        })
        .map(|_| ())
    }

    // =========================================================================
    // Grammar
    // =========================================================================

    fn statement(&mut self) -> EvalResult<Expr> {
        let target = self.expression()?;
        if matches!(self.kind(), TokenKind::Assign | TokenKind::AugAssign) {
            self.bump();
            self.nested(Self::statement)?;
            return Ok(Expr::Unsupported(Construct::Assignment));
        }
        Ok(target)
    }

    fn expression(&mut self) -> EvalResult<Expr> {
        if self.at_keyword("lambda") {
            self.bump();
            self.skip_until(|kind| matches!(kind, TokenKind::Colon | TokenKind::Eof))?;
            if !self.check(&TokenKind::Colon) {
                return Err(EvalError::parse(self.pos(), "expected ':' in lambda"));
            }
            self.bump();
            self.skip_to_delimiter()?;
            return Ok(Expr::Unsupported(Construct::Lambda));
        }

        let expr = self.or_test()?;

        if self.at_keyword("if") {
            self.skip_to_delimiter()?;
            return Ok(Expr::Unsupported(Construct::Conditional));
        }
        if self.check(&TokenKind::Walrus) {
            self.bump();
            self.nested(Self::expression)?;
            return Ok(Expr::Unsupported(Construct::Assignment));
        }
        Ok(expr)
    }

    fn or_test(&mut self) -> EvalResult<Expr> {
        let mut left = self.and_test()?;
        while self.at_keyword("or") {
            self.bump();
            self.and_test()?;
            left = Expr::Unsupported(Construct::BooleanOperation);
        }
        Ok(left)
    }

    fn and_test(&mut self) -> EvalResult<Expr> {
        let mut left = self.not_test()?;
        while self.at_keyword("and") {
            self.bump();
            self.not_test()?;
            left = Expr::Unsupported(Construct::BooleanOperation);
        }
        Ok(left)
    }

    fn not_test(&mut self) -> EvalResult<Expr> {
        if self.at_keyword("not") {
            self.bump();
            self.nested(Self::not_test)?;
            return Ok(Expr::Unsupported(Construct::BooleanOperation));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> EvalResult<Expr> {
        let mut left = self.bitwise()?;
        loop {
            if self.check(&TokenKind::Compare) || self.at_keyword("in") {
                self.bump();
            } else if self.at_keyword("is") {
                self.bump();
                if self.at_keyword("not") {
                    self.bump();
                }
            } else if self.at_keyword("not") {
                self.bump();
                if !self.at_keyword("in") {
                    return Err(self.unexpected());
                }
                self.bump();
            } else {
                return Ok(left);
            }
            self.bitwise()?;
            left = Expr::Unsupported(Construct::Comparison);
        }
    }

    fn bitwise(&mut self) -> EvalResult<Expr> {
        let mut left = self.arith()?;
        while self.check(&TokenKind::Bitwise) {
            self.bump();
            self.arith()?;
            left = Expr::Unsupported(Construct::BitwiseOperation);
        }
        Ok(left)
    }

    fn arith(&mut self) -> EvalResult<Expr> {
        let mut left = self.term()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.term()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn term(&mut self) -> EvalResult<Expr> {
        let mut left = self.factor()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                TokenKind::DoubleSlash => {
                    self.bump();
                    self.factor()?;
                    left = Expr::Unsupported(Construct::FloorDivision);
                    continue;
                }
                _ => return Ok(left),
            };
            self.bump();
            let right = self.factor()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn factor(&mut self) -> EvalResult<Expr> {
        let op = match self.kind() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Tilde => {
                self.bump();
                self.nested(Self::factor)?;
                return Ok(Expr::Unsupported(Construct::BitwiseOperation));
            }
            _ => return self.power(),
        };
        self.bump();
        let operand = self.nested(Self::factor)?;
        Ok(Expr::unary(op, operand))
    }

    fn power(&mut self) -> EvalResult<Expr> {
        let base = self.postfix()?;
        if matches!(self.kind(), TokenKind::Caret | TokenKind::DoubleStar) {
            self.bump();
            let exponent = self.nested(Self::factor)?;
            return Ok(Expr::binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> EvalResult<Expr> {
        let mut expr = self.atom()?;
        loop {
            match self.kind() {
                TokenKind::LParen => {
                    self.bump();
                    let args = self.call_args()?;
                    expr = match expr {
                        Expr::Name(name) => Expr::Call { name, args },
                        unsupported @ Expr::Unsupported(_) => unsupported,
                        _ => Expr::Unsupported(Construct::IndirectCall),
                    };
                }
                TokenKind::Dot => {
                    self.bump();
                    if !matches!(self.kind(), TokenKind::Ident(_)) {
                        return Err(self.unexpected());
                    }
                    self.bump();
                    expr = Expr::Unsupported(Construct::AttributeAccess);
                }
                TokenKind::LBracket => {
                    self.bump();
                    self.skip_bracketed(TokenKind::RBracket)?;
                    expr = Expr::Unsupported(Construct::Subscript);
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Parses call arguments after the opening parenthesis.
    fn call_args(&mut self) -> EvalResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RParen) {
            self.bump();
            return Ok(args);
        }

        loop {
            args.push(self.call_arg()?);

            match self.kind() {
                TokenKind::RParen => {
                    self.bump();
                    return Ok(args);
                }
                TokenKind::Comma => {
                    self.bump();
                    if self.check(&TokenKind::RParen) {
                        self.bump();
                        return Ok(args);
                    }
                }
                TokenKind::Ident(word) if word == "for" => {
                    self.skip_bracketed(TokenKind::RParen)?;
                    return Ok(vec![Expr::Unsupported(Construct::Comprehension)]);
                }
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn call_arg(&mut self) -> EvalResult<Expr> {
        if matches!(self.kind(), TokenKind::Star | TokenKind::DoubleStar) {
            self.bump();
            self.nested(Self::expression)?;
            return Ok(Expr::Unsupported(Construct::StarredArgument));
        }

        let arg = self.nested(Self::expression)?;
        if self.check(&TokenKind::Assign) && matches!(arg, Expr::Name(_)) {
            self.bump();
            self.nested(Self::expression)?;
            return Ok(Expr::Unsupported(Construct::KeywordArgument));
        }
        Ok(arg)
    }

    fn atom(&mut self) -> EvalResult<Expr> {
        match self.kind().clone() {
            TokenKind::Number(value) => {
                self.bump();
                Ok(Expr::Literal(value))
            }
            TokenKind::Ident(word) => {
                if KEYWORDS.contains(&word.as_str()) {
                    return Err(self.unexpected());
                }
                self.bump();
                Ok(Expr::Name(word))
            }
            TokenKind::Str => {
                while self.check(&TokenKind::Str) {
                    self.bump();
                }
                Ok(Expr::Unsupported(Construct::StringLiteral))
            }
            TokenKind::LParen => {
                self.bump();
                if self.check(&TokenKind::RParen) {
                    self.bump();
                    return Ok(Expr::Unsupported(Construct::Collection));
                }
                let inner = self.nested(Self::expression)?;
                match self.kind() {
                    TokenKind::RParen => {
                        self.bump();
                        Ok(inner)
                    }
                    TokenKind::Comma => {
                        self.skip_bracketed(TokenKind::RParen)?;
                        Ok(Expr::Unsupported(Construct::Collection))
                    }
                    TokenKind::Ident(word) if word == "for" => {
                        self.skip_bracketed(TokenKind::RParen)?;
                        Ok(Expr::Unsupported(Construct::Comprehension))
                    }
                    _ => Err(self.unexpected()),
                }
            }
            TokenKind::LBracket => {
                self.bump();
                let comprehension = self.skip_bracketed(TokenKind::RBracket)?;
                Ok(Expr::Unsupported(if comprehension {
                    Construct::Comprehension
                } else {
                    Construct::Collection
                }))
            }
            TokenKind::LBrace => {
                self.bump();
                let comprehension = self.skip_bracketed(TokenKind::RBrace)?;
                Ok(Expr::Unsupported(if comprehension {
                    Construct::Comprehension
                } else {
                    Construct::Collection
                }))
            }
            _ => Err(self.unexpected()),
        }
    }
}
