//! Query AST structures

use crate::document::Scalar;

/// One node of a query tree
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    And(AndStatement),
    Or(OrStatement),
    Where(WhereStatement),
}

impl From<AndStatement> for Statement {
    fn from(statement: AndStatement) -> Self {
        Statement::And(statement)
    }
}

impl From<OrStatement> for Statement {
    fn from(statement: OrStatement) -> Self {
        Statement::Or(statement)
    }
}

impl From<WhereStatement> for Statement {
    fn from(statement: WhereStatement) -> Self {
        Statement::Where(statement)
    }
}

/// Conjunction of child statements. Empty means no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AndStatement {
    terms: Vec<Statement>,
}

impl AndStatement {
    /// Creates an empty conjunction
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a child statement
    pub fn add(&mut self, statement: impl Into<Statement>) -> &mut Self {
        self.terms.push(statement.into());
        self
    }

    /// Appends several child statements in order
    pub fn add_all<I, S>(&mut self, statements: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Statement>,
    {
        self.terms.extend(statements.into_iter().map(Into::into));
        self
    }

    /// Consuming variant of `add`
    pub fn with(mut self, statement: impl Into<Statement>) -> Self {
        self.add(statement);
        self
    }

    /// Child statements in insertion order
    pub fn terms(&self) -> &[Statement] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }
}

/// Disjunction of child statements. Empty means no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrStatement {
    terms: Vec<Statement>,
}

impl OrStatement {
    /// Creates an empty disjunction
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a child statement
    pub fn add(&mut self, statement: impl Into<Statement>) -> &mut Self {
        self.terms.push(statement.into());
        self
    }

    /// Appends several child statements in order
    pub fn add_all<I, S>(&mut self, statements: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Statement>,
    {
        self.terms.extend(statements.into_iter().map(Into::into));
        self
    }

    /// Consuming variant of `add`
    pub fn with(mut self, statement: impl Into<Statement>) -> Self {
        self.add(statement);
        self
    }

    /// Child statements in insertion order
    pub fn terms(&self) -> &[Statement] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }
}

/// Leaf comparison: `path <operator> value`
#[derive(Debug, Clone, PartialEq)]
pub struct WhereStatement {
    path: String,
    operator: String,
    value: Scalar,
}

impl WhereStatement {
    /// Create a comparison with an arbitrary operator
    pub fn new(path: impl Into<String>, operator: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self {
            path: path.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    pub fn eq(path: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::new(path, "=", value)
    }

    pub fn ne(path: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::new(path, "!=", value)
    }

    pub fn lt(path: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::new(path, "<", value)
    }

    pub fn le(path: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::new(path, "<=", value)
    }

    pub fn gt(path: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::new(path, ">", value)
    }

    pub fn ge(path: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::new(path, ">=", value)
    }

    /// Pattern match with `%` and `_` wildcards
    pub fn like(path: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(path, "LIKE", Scalar::String(pattern.into()))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn value(&self) -> &Scalar {
        &self.value
    }
}

/// A query: root conjunction plus optional result cap
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    root: AndStatement,
    max_document_count: Option<u64>,
}

impl Query {
    /// Creates a query with an empty root conjunction and no cap
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a statement to the root conjunction
    pub fn where_and(mut self, statement: impl Into<Statement>) -> Self {
        self.root.add(statement);
        self
    }

    /// Sets the maximum number of returned documents
    pub fn with_max_document_count(mut self, count: u64) -> Self {
        self.max_document_count = Some(count);
        self
    }

    /// Sets or clears the maximum number of returned documents
    pub fn set_max_document_count(&mut self, count: Option<u64>) {
        self.max_document_count = count;
    }

    pub fn max_document_count(&self) -> Option<u64> {
        self.max_document_count
    }

    pub fn root_and(&self) -> &AndStatement {
        &self.root
    }

    pub fn root_and_mut(&mut self) -> &mut AndStatement {
        &mut self.root
    }
}
