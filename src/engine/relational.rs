//! The relational store contract

use super::errors::EngineResult;
use super::select::SelectQuery;
use super::types::{Row, TableDefinition, Value};

/// Minimal relational storage engine used by the document store.
///
/// Statements issued outside `begin_transaction`/`commit` are autocommitted.
pub trait RelationalStore {
    /// Opens a transaction. Nested transactions are not supported.
    fn begin_transaction(&mut self) -> EngineResult<()>;

    /// Makes all work since `begin_transaction` permanent
    fn commit(&mut self) -> EngineResult<()>;

    /// Discards all work since `begin_transaction`
    fn rollback(&mut self) -> EngineResult<()>;

    /// Returns true while a transaction is open
    fn in_transaction(&self) -> bool;

    /// Inserts one row; unspecified columns are NULL
    fn insert_row(&mut self, table: &str, values: &[(&str, Value)]) -> EngineResult<()>;

    /// Deletes rows whose columns equal all of `matches`; returns the count
    fn delete_rows(&mut self, table: &str, matches: &[(&str, Value)]) -> EngineResult<usize>;

    /// Runs a select, returning rows in `query.columns` order
    fn execute_query(&self, query: &SelectQuery) -> EngineResult<Vec<Row>>;

    /// Creates the table unless it exists; returns true if it was created
    fn ensure_table_exists(&mut self, definition: &TableDefinition) -> EngineResult<bool>;
}
