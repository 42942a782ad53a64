//! Relational engine boundary for pathdoc
//!
//! The document store talks to its storage through `RelationalStore`, a
//! minimal contract: transactions, unkeyed row inserts/deletes, one
//! join + filter + group-by + limit query shape, and idempotent table
//! creation.
//!
//! Two implementations ship with the crate:
//!
//! - `MemoryEngine`: tables held in memory, snapshot transactions,
//!   primary/foreign key enforcement with ON DELETE CASCADE
//! - `JournaledEngine`: a `MemoryEngine` whose committed work is appended to
//!   a checksummed journal file and replayed on open
//!
//! # Invariants
//!
//! - A failed or rolled back transaction leaves no trace
//! - Comparisons involving NULL never match
//! - Unknown comparison operators never match

mod errors;
mod eval;
mod expr;
mod journal;
mod journaled;
mod memory;
mod relational;
mod select;
mod types;

pub use errors::{EngineError, EngineResult};
pub use eval::Comparator;
pub use expr::{ColumnRef, Expr, Operand, ParameterBindings};
pub use journal::{JournalOp, JournalReader, JournalRecord, JournalWriter};
pub use journaled::JournaledEngine;
pub use memory::MemoryEngine;
pub use relational::RelationalStore;
pub use select::{Join, SelectQuery, TableRef};
pub use types::{ColumnDefinition, ColumnType, ForeignKey, IndexDefinition, OnDelete, Row, TableDefinition, Value};
