//! Predicate evaluation
//!
//! Three-valued: a comparison with a NULL side is unknown, and unknown rows
//! do not match. Text is compared byte-wise; no numeric coercion happens.
//! An operator the engine does not understand evaluates to false.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use regex::{Regex, RegexBuilder};

use super::errors::{EngineError, EngineResult};
use super::expr::{ColumnRef, Expr, Operand, ParameterBindings};
use super::types::Value;

/// Comparison operators understood by the reference engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
}

impl Comparator {
    /// Parses operator text; keywords are case-insensitive
    pub fn parse(op: &str) -> Option<Self> {
        let normalized = op
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        match normalized.as_str() {
            "=" | "==" => Some(Comparator::Eq),
            "!=" | "<>" => Some(Comparator::Ne),
            "<" => Some(Comparator::Lt),
            "<=" => Some(Comparator::Le),
            ">" => Some(Comparator::Gt),
            ">=" => Some(Comparator::Ge),
            "LIKE" => Some(Comparator::Like),
            "NOT LIKE" => Some(Comparator::NotLike),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "!=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Like => "LIKE",
            Comparator::NotLike => "NOT LIKE",
        }
    }
}

/// Evaluates one query's predicate against many rows
pub(crate) struct Evaluator<'q> {
    bindings: &'q ParameterBindings,
    /// Compiled LIKE patterns; `None` when the pattern cannot be compiled
    patterns: HashMap<String, Option<Regex>>,
    unknown_operators: BTreeSet<String>,
}

impl<'q> Evaluator<'q> {
    pub(crate) fn new(bindings: &'q ParameterBindings) -> Self {
        Self {
            bindings,
            patterns: HashMap::new(),
            unknown_operators: BTreeSet::new(),
        }
    }

    /// Operators seen so far that evaluated to false for being unknown
    pub(crate) fn unknown_operators(&self) -> &BTreeSet<String> {
        &self.unknown_operators
    }

    /// True only if the predicate is definitely true for the row
    pub(crate) fn matches<'r, F>(&mut self, expr: &Expr, resolve: &F) -> EngineResult<bool>
    where
        F: Fn(&ColumnRef) -> EngineResult<&'r Value>,
    {
        Ok(self.truth(expr, resolve)? == Some(true))
    }

    fn truth<'r, F>(&mut self, expr: &Expr, resolve: &F) -> EngineResult<Option<bool>>
    where
        F: Fn(&ColumnRef) -> EngineResult<&'r Value>,
    {
        match expr {
            Expr::And(children) => {
                let mut result = Some(true);
                for child in children {
                    match self.truth(child, resolve)? {
                        Some(false) => return Ok(Some(false)),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                Ok(result)
            }
            Expr::Or(children) => {
                let mut result = Some(false);
                for child in children {
                    match self.truth(child, resolve)? {
                        Some(true) => return Ok(Some(true)),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                Ok(result)
            }
            Expr::Compare { left, op, right } => {
                let bindings = self.bindings;
                let left = resolve_operand(bindings, left, resolve)?;
                let right = resolve_operand(bindings, right, resolve)?;
                Ok(self.compare(op, left, right))
            }
        }
    }

    fn compare(&mut self, op: &str, left: &Value, right: &Value) -> Option<bool> {
        let comparator = match Comparator::parse(op) {
            Some(c) => c,
            None => {
                self.unknown_operators.insert(op.to_string());
                return Some(false);
            }
        };

        let (l, r) = match (left.comparable_bytes(), right.comparable_bytes()) {
            (Some(l), Some(r)) => (l, r),
            _ => return None,
        };

        let result = match comparator {
            Comparator::Eq => l == r,
            Comparator::Ne => l != r,
            Comparator::Lt => l.cmp(r) == Ordering::Less,
            Comparator::Le => l.cmp(r) != Ordering::Greater,
            Comparator::Gt => l.cmp(r) == Ordering::Greater,
            Comparator::Ge => l.cmp(r) != Ordering::Less,
            Comparator::Like | Comparator::NotLike => {
                let text = String::from_utf8_lossy(l);
                let pattern = String::from_utf8_lossy(r);
                let matched = self.like(&text, &pattern);
                if comparator == Comparator::Like {
                    matched
                } else {
                    !matched
                }
            }
        };
        Some(result)
    }

    fn like(&mut self, text: &str, pattern: &str) -> bool {
        let regex = self
            .patterns
            .entry(pattern.to_string())
            .or_insert_with(|| like_to_regex(pattern));
        match regex {
            Some(regex) => regex.is_match(text),
            None => false,
        }
    }
}

fn resolve_operand<'a, 'r: 'a, F>(
    bindings: &'a ParameterBindings,
    operand: &'a Operand,
    resolve: &F,
) -> EngineResult<&'a Value>
where
    F: Fn(&ColumnRef) -> EngineResult<&'r Value>,
{
    match operand {
        Operand::Column(column) => resolve(column),
        Operand::Literal(value) => Ok(value),
        Operand::Param(name) => bindings
            .get(name)
            .ok_or_else(|| EngineError::UnboundParameter(name.clone())),
    }
}

/// Compile a LIKE pattern: `%` any run, `_` any one char, case-insensitive
fn like_to_regex(pattern: &str) -> Option<Regex> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for c in pattern.chars() {
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            c => source.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
    }
    source.push('$');

    RegexBuilder::new(&source)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .ok()
}
