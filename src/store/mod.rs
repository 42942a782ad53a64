//! Document store for pathdoc
//!
//! Documents are kept as encoded blobs in a data table. Each leaf of a
//! document also becomes a row of the path table, `(data_id, path,
//! value_raw)`, which is what queries filter on: a query selects the data
//! rows joined to at least one matching path row, grouped by document.
//!
//! # Invariants
//!
//! - A document and its index rows are written in one transaction
//! - Index rows are exactly the flattening of the current blob
//! - Documents that cannot be flattened never reach the engine

mod document_store;
mod errors;
mod schema;

pub use document_store::{DocumentId, DocumentStore};
pub use errors::{StoreError, StoreResult};
pub use schema::{
    StoreSchema, DATA_ALIAS, DATA_COLUMN, DATA_ID_COLUMN, ID_COLUMN, ID_LENGTH, PATH_ALIAS, PATH_COLUMN,
    PATH_VALUE_INDEX, VALUE_COLUMN,
};
