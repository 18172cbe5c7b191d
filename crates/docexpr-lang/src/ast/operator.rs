use std::fmt::{self, Display, Formatter};

use super::node::ExprType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Modulo,
    Divide,
    Multiply,
    Add,
    Subtract,
    Like,
    Between,
    In,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    NotEqual,
    Equal,
}

impl BinaryOp {
    pub fn expr_type(&self) -> ExprType {
        match self {
            BinaryOp::Modulo => ExprType::Modulo,
            BinaryOp::Divide => ExprType::Divide,
            BinaryOp::Multiply => ExprType::Multiply,
            BinaryOp::Add => ExprType::Add,
            BinaryOp::Subtract => ExprType::Subtract,
            BinaryOp::Like => ExprType::Like,
            BinaryOp::Between => ExprType::Between,
            BinaryOp::In => ExprType::In,
            BinaryOp::GreaterThan => ExprType::GreaterThan,
            BinaryOp::GreaterThanOrEqual => ExprType::GreaterThanOrEqual,
            BinaryOp::LessThan => ExprType::LessThan,
            BinaryOp::LessThanOrEqual => ExprType::LessThanOrEqual,
            BinaryOp::NotEqual => ExprType::NotEqual,
            BinaryOp::Equal => ExprType::Equal,
        }
    }

    /// Name used in evaluation error messages.
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Modulo => "MOD",
            BinaryOp::Divide => "DIVIDE",
            BinaryOp::Multiply => "MULTIPLY",
            BinaryOp::Add => "ADD",
            BinaryOp::Subtract => "MINUS",
            BinaryOp::Like => "LIKE",
            BinaryOp::Between => "BETWEEN",
            BinaryOp::In => "IN",
            BinaryOp::GreaterThan => "GT",
            BinaryOp::GreaterThanOrEqual => "GTE",
            BinaryOp::LessThan => "LT",
            BinaryOp::LessThanOrEqual => "LTE",
            BinaryOp::NotEqual => "NEQ",
            BinaryOp::Equal => "EQ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    Any,
    All,
}

impl Display for Quantifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Quantifier::Any => write!(f, "ANY"),
            Quantifier::All => write!(f, "ALL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Binary(BinaryOp, Option<Quantifier>),
    Logic(LogicOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorDef {
    /// Lookup key: the operator symbol, optionally prefixed with `ANY ` / `ALL `.
    pub key: &'static str,
    /// Separator written between operands in canonical source.
    pub source: &'static str,
    pub operator: Operator,
    /// Reduction level, 0 binds tightest.
    pub level: u8,
}

impl OperatorDef {
    #[inline]
    pub fn is_between(&self) -> bool {
        matches!(self.operator, Operator::Binary(BinaryOp::Between, _))
    }

    pub fn expr_type(&self) -> ExprType {
        match self.operator {
            Operator::Binary(op, _) => op.expr_type(),
            Operator::Logic(LogicOp::And) => ExprType::And,
            Operator::Logic(LogicOp::Or) => ExprType::Or,
        }
    }
}

macro_rules! binary {
    ($key:expr, $source:expr, $op:ident, $quantifier:expr, $level:expr) => {
        OperatorDef {
            key: $key,
            source: $source,
            operator: Operator::Binary(BinaryOp::$op, $quantifier),
            level: $level,
        }
    };
}

const ANY: Option<Quantifier> = Some(Quantifier::Any);
const ALL: Option<Quantifier> = Some(Quantifier::All);

pub const MAX_LEVEL: u8 = 33;

/// Every operator in precedence order. Each row is its own level, so
/// precedence is total: `10 - 2 + 3` applies `+` first.
pub static OPERATORS: [OperatorDef; 34] = [
    binary!("%", "%", Modulo, None, 0),
    binary!("/", "/", Divide, None, 1),
    binary!("*", "*", Multiply, None, 2),
    binary!("+", "+", Add, None, 3),
    binary!("-", "-", Subtract, None, 4),
    binary!("LIKE", " LIKE ", Like, None, 5),
    binary!("BETWEEN", " BETWEEN ", Between, None, 6),
    binary!("IN", " IN ", In, None, 7),
    binary!(">", ">", GreaterThan, None, 8),
    binary!(">=", ">=", GreaterThanOrEqual, None, 9),
    binary!("<", "<", LessThan, None, 10),
    binary!("<=", "<=", LessThanOrEqual, None, 11),
    binary!("!=", "!=", NotEqual, None, 12),
    binary!("=", "=", Equal, None, 13),
    binary!("ANY LIKE", " ANY LIKE ", Like, ANY, 14),
    binary!("ANY BETWEEN", " ANY BETWEEN ", Between, ANY, 15),
    binary!("ANY IN", " ANY IN ", In, ANY, 16),
    binary!("ANY >", " ANY>", GreaterThan, ANY, 17),
    binary!("ANY >=", " ANY>=", GreaterThanOrEqual, ANY, 18),
    binary!("ANY <", " ANY<", LessThan, ANY, 19),
    binary!("ANY <=", " ANY<=", LessThanOrEqual, ANY, 20),
    binary!("ANY !=", " ANY!=", NotEqual, ANY, 21),
    binary!("ANY =", " ANY=", Equal, ANY, 22),
    binary!("ALL LIKE", " ALL LIKE ", Like, ALL, 23),
    binary!("ALL BETWEEN", " ALL BETWEEN ", Between, ALL, 24),
    binary!("ALL IN", " ALL IN ", In, ALL, 25),
    binary!("ALL >", " ALL>", GreaterThan, ALL, 26),
    binary!("ALL >=", " ALL>=", GreaterThanOrEqual, ALL, 27),
    binary!("ALL <", " ALL<", LessThan, ALL, 28),
    binary!("ALL <=", " ALL<=", LessThanOrEqual, ALL, 29),
    binary!("ALL !=", " ALL!=", NotEqual, ALL, 30),
    binary!("ALL =", " ALL=", Equal, ALL, 31),
    OperatorDef {
        key: "AND",
        source: " AND ",
        operator: Operator::Logic(LogicOp::And),
        level: 32,
    },
    OperatorDef {
        key: "OR",
        source: " OR ",
        operator: Operator::Logic(LogicOp::Or),
        level: MAX_LEVEL,
    },
];

pub fn lookup(key: &str) -> Option<&'static OperatorDef> {
    OPERATORS.iter().find(|op| op.key.eq_ignore_ascii_case(key))
}
