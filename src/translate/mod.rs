//! Query translation for pathdoc
//!
//! Turns a `Query` tree into an engine predicate over the path table plus
//! parameter bindings. Every `WhereStatement` becomes
//! `path = '<path>' AND value_raw <op> :param`, with one fresh parameter per
//! leaf; groups become AND/OR of their translated children.
//!
//! Translation cannot fail. Unknown operators and mistyped paths yield
//! predicates that simply never match.

mod translator;

pub use translator::{QueryTranslator, Translation};
