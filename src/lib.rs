//! pathdoc - a document store on top of a relational engine
//!
//! Documents are stored whole as blobs and indexed by their flattened
//! `(path, value)` leaves, so nested fields can be queried with plain
//! relational predicates.
//!
//! ```ignore
//! use pathdoc::document::Node;
//! use pathdoc::engine::MemoryEngine;
//! use pathdoc::query::{Query, WhereStatement};
//! use pathdoc::store::DocumentStore;
//!
//! let mut store = DocumentStore::new(MemoryEngine::new());
//! store.init_data_structure()?;
//! let id = store.store(&Node::from(serde_json::json!({"person": {"age": 26}})))?;
//! let found = store.search_by_query(&Query::new().where_and(WhereStatement::eq("person.age", 26)))?;
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod flatten;
pub mod ids;
pub mod observability;
pub mod query;
pub mod store;
pub mod translate;
