//! Expression tree.

use std::fmt;

/// Binary operators of the arithmetic grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

/// Unary operators of the arithmetic grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
}

/// Syntax that was recognised but falls outside the arithmetic grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    Assignment,
    AttributeAccess,
    Subscript,
    Lambda,
    Comprehension,
    StringLiteral,
    Comparison,
    BooleanOperation,
    Conditional,
    Collection,
    FloorDivision,
    BitwiseOperation,
    KeywordArgument,
    StarredArgument,
    IndirectCall,
}

impl Construct {
    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::AttributeAccess => "attribute access",
            Self::Subscript => "subscript",
            Self::Lambda => "lambda",
            Self::Comprehension => "comprehension",
            Self::StringLiteral => "string literal",
            Self::Comparison => "comparison",
            Self::BooleanOperation => "boolean operation",
            Self::Conditional => "conditional expression",
            Self::Collection => "collection literal",
            Self::FloorDivision => "floor division",
            Self::BitwiseOperation => "bitwise operation",
            Self::KeywordArgument => "keyword argument",
            Self::StarredArgument => "starred argument",
            Self::IndirectCall => "call on a non-name",
        }
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Literal(f64),
    /// Bare name, resolved against the constant allow-list.
    Name(String),
    /// Unary operation.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Binary operation.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Function call by name.
    Call { name: String, args: Vec<Expr> },
    /// Recognised but unsupported syntax.
    Unsupported(Construct),
}

impl Expr {
    pub(crate) fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub(crate) fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}
