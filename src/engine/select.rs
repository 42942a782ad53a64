//! The single query shape the engine executes
//!
//! `SELECT columns FROM from [INNER JOIN ...] [WHERE predicate]
//!  [GROUP BY ...] [LIMIT max_results]`

use super::expr::{ColumnRef, Expr, ParameterBindings};

/// Table with the alias columns are qualified by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
        }
    }
}

/// Inner equi-join: `JOIN table ON left = right`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub table: TableRef,
    pub left: ColumnRef,
    pub right: ColumnRef,
}

impl Join {
    pub fn inner(table: TableRef, left: ColumnRef, right: ColumnRef) -> Self {
        Self { table, left, right }
    }
}

/// Select statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub columns: Vec<ColumnRef>,
    pub predicate: Option<Expr>,
    pub bindings: ParameterBindings,
    pub group_by: Vec<ColumnRef>,
    pub max_results: Option<u64>,
}

impl SelectQuery {
    /// Selects from a single table
    pub fn new(table: TableRef) -> Self {
        Self {
            from: table,
            joins: Vec::new(),
            columns: Vec::new(),
            predicate: None,
            bindings: ParameterBindings::new(),
            group_by: Vec::new(),
            max_results: None,
        }
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn select(mut self, column: ColumnRef) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the WHERE predicate and the values of its parameters
    pub fn filter(mut self, predicate: Expr, bindings: ParameterBindings) -> Self {
        self.predicate = Some(predicate);
        self.bindings = bindings;
        self
    }

    pub fn group_by(mut self, column: ColumnRef) -> Self {
        self.group_by.push(column);
        self
    }

    pub fn limit(mut self, max_results: u64) -> Self {
        self.max_results = Some(max_results);
        self
    }
}
