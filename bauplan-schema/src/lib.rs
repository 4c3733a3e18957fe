//! The schema collaborator of the `bauplan` codec: a [`Value`] model covering the
//! encodable domain, a [`Schema`] sum type describing shapes, and a non-throwing
//! [`Schema::safe_parse`] validator.
//!
//! The codec consumes exactly four capabilities from this crate: classify a node by
//! matching on the [`Schema`] variant, enumerate its children, ask the
//! [`Schema::is_optional`]/[`Schema::is_nullable`] predicates, and validate a candidate
//! value. Nothing in here knows about bytes.
//!
//! # Examples
//!
//! ```
//! use bauplan_schema::{Schema, Value};
//! use std::collections::BTreeMap;
//!
//! let schema = Schema::object(vec![
//!     ("name", Schema::String),
//!     ("age", Schema::Number.optional()),
//! ]);
//! let value = Value::Record(BTreeMap::from([
//!     ("name".to_string(), Value::Str("Jessica".to_string())),
//! ]));
//! let parsed = schema.safe_parse(&value).unwrap();
//! assert_eq!(value, parsed);
//! ```

mod schema;
mod validate;
mod value;

pub use schema::*;
pub use validate::*;
pub use value::*;
