//! Query operators for record matching
//!
//! An [`Operator`] plus its operand values compiles into a [`Matcher`],
//! which is then applied to every candidate value. Compiling up front
//! validates operand arity once per query and compiles regex patterns once
//! instead of once per value.

use regex::Regex;

use crate::model::Value;
use crate::store::{StoreError, StoreResult};

/// Comparison operator for `find` queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEquals,
    LessThan,
    LessThanOrEquals,
    /// Inclusive low bound, exclusive high bound.
    Between,
    /// Pattern match against `Text` values; non-text values never match.
    Regex,
    NotRegex,
}

impl Operator {
    /// Compiles this operator with its operands.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidQuery`] if the operand count is wrong
    /// for the operator, if a regex operand is not text, or if the pattern
    /// fails to compile.
    pub fn matcher(self, operands: &[Value]) -> StoreResult<Matcher> {
        let kind = match self {
            Operator::Between => {
                let (low, high) = match operands {
                    [low, high] => (low.clone(), high.clone()),
                    _ => {
                        return Err(StoreError::InvalidQuery(format!(
                            "BETWEEN takes exactly 2 operands, got {}",
                            operands.len()
                        )))
                    }
                };
                MatcherKind::Between(low, high)
            }
            Operator::Regex | Operator::NotRegex => {
                let pattern = match operands {
                    [Value::Text(pattern)] => pattern,
                    [_] => {
                        return Err(StoreError::InvalidQuery(
                            "regex operand must be a text value".to_string(),
                        ))
                    }
                    _ => {
                        return Err(StoreError::InvalidQuery(format!(
                            "regex operators take exactly 1 operand, got {}",
                            operands.len()
                        )))
                    }
                };
                let regex = Regex::new(pattern)
                    .map_err(|e| StoreError::InvalidQuery(format!("bad pattern: {}", e)))?;
                if self == Operator::Regex {
                    MatcherKind::Regex(regex)
                } else {
                    MatcherKind::NotRegex(regex)
                }
            }
            _ => {
                let operand = match operands {
                    [operand] => operand.clone(),
                    _ => {
                        return Err(StoreError::InvalidQuery(format!(
                            "{:?} takes exactly 1 operand, got {}",
                            self,
                            operands.len()
                        )))
                    }
                };
                match self {
                    Operator::Equals => MatcherKind::Equals(operand),
                    Operator::NotEquals => MatcherKind::NotEquals(operand),
                    Operator::GreaterThan => MatcherKind::GreaterThan(operand),
                    Operator::GreaterThanOrEquals => MatcherKind::GreaterThanOrEquals(operand),
                    Operator::LessThan => MatcherKind::LessThan(operand),
                    Operator::LessThanOrEquals => MatcherKind::LessThanOrEquals(operand),
                    // Handled in the arms above
                    Operator::Between | Operator::Regex | Operator::NotRegex => unreachable!(),
                }
            }
        };
        Ok(Matcher { kind })
    }
}

/// A compiled operator, ready to test values.
#[derive(Debug)]
pub struct Matcher {
    kind: MatcherKind,
}

#[derive(Debug)]
enum MatcherKind {
    Equals(Value),
    NotEquals(Value),
    GreaterThan(Value),
    GreaterThanOrEquals(Value),
    LessThan(Value),
    LessThanOrEquals(Value),
    Between(Value, Value),
    Regex(Regex),
    NotRegex(Regex),
}

impl Matcher {
    /// Whether `value` satisfies the compiled operator.
    pub fn matches(&self, value: &Value) -> bool {
        match &self.kind {
            MatcherKind::Equals(operand) => value == operand,
            MatcherKind::NotEquals(operand) => value != operand,
            MatcherKind::GreaterThan(operand) => value > operand,
            MatcherKind::GreaterThanOrEquals(operand) => value >= operand,
            MatcherKind::LessThan(operand) => value < operand,
            MatcherKind::LessThanOrEquals(operand) => value <= operand,
            MatcherKind::Between(low, high) => value >= low && value < high,
            MatcherKind::Regex(regex) => value.as_text().is_some_and(|t| regex.is_match(t)),
            MatcherKind::NotRegex(regex) => value.as_text().is_some_and(|t| !regex.is_match(t)),
        }
    }
}
