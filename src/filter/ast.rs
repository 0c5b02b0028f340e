//! Abstract syntax tree for dashboard filter expressions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    /// Simple comparison: key op value
    Comparison(Filter),
    /// Logical combination of expressions
    Logical {
        /// How the operands combine
        op: LogicalOp,
        /// Left operand
        left: Box<FilterExpression>,
        /// Right operand
        right: Box<FilterExpression>,
    },
    /// Parenthesized expression
    Group(Box<FilterExpression>),
    /// Match all (empty expression)
    All,
}

/// One root-node filter as sent with a topology request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    /// Attribute key the filter applies to
    pub key: String,
    /// Comparison operator
    pub operator: Operator,
    /// Right hand side
    pub value: Value,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// Equals
    Equals,
    /// Not equals
    NotEquals,
    /// Greater than
    GreaterThan,
    /// Greater than or equal
    GreaterThanOrEqualTo,
    /// Less than
    LessThan,
    /// Less than or equal
    LessThanOrEqualTo,
    /// Regex match
    Like,
    /// Contains substring
    Contains,
}

/// Filter values
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// String literal
    String(String),
    /// Integer
    Integer(i64),
    /// Boolean
    Boolean(bool),
    /// Duration in milliseconds
    DurationMillis { millis: u64 },
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// Both operands must match
    And,
    /// Either operand must match
    Or,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Equals => write!(f, "="),
            Operator::NotEquals => write!(f, "!="),
            Operator::GreaterThan => write!(f, ">"),
            Operator::GreaterThanOrEqualTo => write!(f, ">="),
            Operator::LessThan => write!(f, "<"),
            Operator::LessThanOrEqualTo => write!(f, "<="),
            Operator::Like => write!(f, "=~"),
            Operator::Contains => write!(f, "contains"),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.key, self.operator, self.value)
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpression::Comparison(filter) => write!(f, "{}", filter),
            FilterExpression::Logical { op, left, right } => {
                write!(f, "{} {} {}", left, op, right)
            },
            FilterExpression::Group(inner) => write!(f, "({})", inner),
            FilterExpression::All => write!(f, "*"),
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "&&"),
            LogicalOp::Or => write!(f, "||"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::DurationMillis { millis } => write!(f, "{}ms", millis),
        }
    }
}
