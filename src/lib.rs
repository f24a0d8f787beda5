//! # qail-stmt-key — Canonical statement-cache keys
//!
//! Turns a "prepare a statement" call (SQL text plus an optional tail of
//! result-set, column-hint or generated-key arguments) into one canonical,
//! hashable key, and makes sure equal calls always get the *same* key
//! instance.
//!
//! ## Quick Example
//!
//! ```
//! use qail_stmt_key::prelude::*;
//!
//! let conn = ConnectionId::next();
//! let a = resolve_key(conn, "SELECT * FROM users", false, &[])?;
//! let b = resolve_key(conn, "SELECT * FROM users", false, &[])?;
//! assert!(a.ptr_eq(&b));
//!
//! let args = [PrepareArg::IntArray(vec![1, 2])];
//! let hinted = resolve_key(conn, "INSERT INTO users VALUES ($1)", false, &args)?;
//! assert_eq!(hinted.column_indexes(), Some(&[1, 2][..]));
//! # Ok::<(), qail_stmt_key::KeyError>(())
//! ```
//!
//! ## Layers
//!
//! | Module     | Role                                              |
//! |------------|---------------------------------------------------|
//! | `shape`    | Decode the trailing arguments of a prepare call   |
//! | `key`      | Key record (value equality) and canonical handle  |
//! | `coalesce` | Weak table returning one instance per value       |
//! | `resolver` | Spare-record reuse and the process-wide entry     |

pub mod coalesce;
pub mod config;
pub mod error;
pub mod key;
pub mod resolver;
pub mod shape;
pub mod types;

pub use coalesce::{Coalescer, Interned};
pub use config::CoalescerConfig;
pub use error::{KeyError, KeyResult};
pub use key::{CanonicalKey, StatementCacheKey};
pub use resolver::{
    KeyResolver, ResolverStats, global_stats, init_global, resolve_key, resolve_key_shape,
};
pub use shape::{CallShape, PrepareArg};
pub use types::{
    AutoGeneratedKeys, ConnectionId, Holdability, PrepareMethod, ResultSetConcurrency,
    ResultSetType,
};

pub mod prelude {
    pub use crate::error::*;
    pub use crate::key::CanonicalKey;
    pub use crate::resolver::{KeyResolver, resolve_key, resolve_key_shape};
    pub use crate::shape::{CallShape, PrepareArg};
    pub use crate::types::*;
}
