//! Predicate expressions and parameter bindings
//!
//! This is the hand-off format between query translation and the engine:
//! a tree of comparisons joined by AND/OR, whose operands are qualified
//! columns, literals or named parameters resolved through
//! `ParameterBindings`.

use std::collections::BTreeMap;
use std::fmt;

use super::types::Value;

/// Column qualified by a table alias
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(ColumnRef),
    Literal(Value),
    /// Named parameter, resolved through the query's bindings
    Param(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(c) => write!(f, "{}", c),
            Operand::Literal(v) => write!(f, "{}", v),
            Operand::Param(name) => write!(f, ":{}", name),
        }
    }
}

/// Boolean predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Compare {
        left: Operand,
        /// Operator text, forwarded as given
        op: String,
        right: Operand,
    },
}

impl Expr {
    /// Comparison between two operands
    pub fn compare(left: Operand, op: impl Into<String>, right: Operand) -> Self {
        Expr::Compare {
            left,
            op: op.into(),
            right,
        }
    }

    /// Number of comparison leaves
    pub fn leaf_count(&self) -> usize {
        match self {
            Expr::And(children) | Expr::Or(children) => children.iter().map(Expr::leaf_count).sum(),
            Expr::Compare { .. } => 1,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::And(children) | Expr::Or(children) => {
                let joiner = if matches!(self, Expr::And(_)) { " AND " } else { " OR " };
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", joiner)?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
            Expr::Compare { left, op, right } => write!(f, "{} {} {}", left, op, right),
        }
    }
}

/// Values bound to named parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBindings {
    values: BTreeMap<String, Value>,
}

impl ParameterBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to `name`, replacing any previous binding
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bindings in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_display() {
        let path = ColumnRef::new("p", "path");
        let value = ColumnRef::new("p", "value_raw");
        let expr = Expr::Or(vec![
            Expr::And(vec![
                Expr::compare(Operand::Column(path.clone()), "=", Operand::Literal(Value::from("a.b"))),
                Expr::compare(Operand::Column(value), "<", Operand::Param("p1".into())),
            ]),
            Expr::compare(Operand::Column(path), "=", Operand::Literal(Value::from("c"))),
        ]);

        assert_eq!(
            expr.to_string(),
            "((p.path = 'a.b' AND p.value_raw < :p1) OR p.path = 'c')"
        );
        assert_eq!(expr.leaf_count(), 3);
    }

    #[test]
    fn test_bindings() {
        let mut bindings = ParameterBindings::new();
        assert!(bindings.is_empty());
        bindings.bind("b", Value::from("2"));
        bindings.bind("a", Value::Null);
        assert_eq!(bindings.len(), 2);
        assert!(bindings.contains("a"));
        assert_eq!(bindings.get("b"), Some(&Value::from("2")));
        let names: Vec<_> = bindings.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
