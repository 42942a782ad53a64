//! Query model for pathdoc
//!
//! A query is a boolean tree of AND/OR statements over `WhereStatement`
//! leaves, rooted in an `AndStatement`, plus an optional cap on the number
//! of returned documents.
//!
//! The model is pure data. Operators are opaque strings forwarded verbatim
//! to the relational engine; nothing is validated here.

mod ast;

pub use ast::{AndStatement, OrStatement, Query, Statement, WhereStatement};
