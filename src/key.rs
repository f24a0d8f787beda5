//! Statement-cache key record and its canonical handle.
//!
//! [`StatementCacheKey`] holds the normalized fields of one prepare call and
//! compares by value. [`CanonicalKey`] is the shared handle handed out by the
//! resolver; it compares by identity, which is only sound because every
//! handle comes out of the coalescer (one instance per distinct value).

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use crate::shape::CallShape;
use crate::types::{
    AutoGeneratedKeys, ConnectionId, Holdability, ResultSetConcurrency, ResultSetType,
};

/// Normalized fields of a prepare call plus a hash memoized at init time.
///
/// At most one of `column_indexes`, `column_names` and `autogenerated_keys`
/// is set; [`CallShape`] guarantees it.
#[derive(Debug, Clone)]
pub struct StatementCacheKey {
    connection: ConnectionId,
    text: String,
    is_callable: bool,
    result_set_type: ResultSetType,
    result_set_concurrency: ResultSetConcurrency,
    column_indexes: Option<Vec<i32>>,
    column_names: Option<Vec<String>>,
    autogenerated_keys: Option<AutoGeneratedKeys>,
    holdability: Option<Holdability>,
    cached_hash: u64,
}

impl StatementCacheKey {
    /// Build a key for the given call.
    pub fn new(
        connection: ConnectionId,
        text: &str,
        is_callable: bool,
        shape: &CallShape<'_>,
    ) -> Self {
        let mut key = Self::blank();
        key.reinitialize(connection, text, is_callable, shape);
        key
    }

    /// An empty record, used as scratch space before its first initialization.
    pub(crate) fn blank() -> Self {
        Self {
            connection: ConnectionId::from_raw(0),
            text: String::new(),
            is_callable: false,
            result_set_type: ResultSetType::ForwardOnly,
            result_set_concurrency: ResultSetConcurrency::ReadOnly,
            column_indexes: None,
            column_names: None,
            autogenerated_keys: None,
            holdability: None,
            cached_hash: 0,
        }
    }

    /// Overwrite every field in place and recompute the hash.
    ///
    /// Existing text and column buffers are reused when the new call needs
    /// them. Published keys sit behind a shared `Arc`, so this can only reach
    /// a record nobody else observes.
    pub fn reinitialize(
        &mut self,
        connection: ConnectionId,
        text: &str,
        is_callable: bool,
        shape: &CallShape<'_>,
    ) {
        self.connection = connection;
        self.text.clear();
        self.text.push_str(text);
        self.is_callable = is_callable;
        self.result_set_type = shape.result_set_type();
        self.result_set_concurrency = shape.result_set_concurrency();
        assign_slice(&mut self.column_indexes, shape.column_indexes());
        assign_slice(&mut self.column_names, shape.column_names());
        self.autogenerated_keys = shape.autogenerated_keys();
        self.holdability = shape.holdability();
        self.cached_hash = self.compute_hash();
    }

    fn compute_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.connection.hash(&mut hasher);
        self.text.hash(&mut hasher);
        self.is_callable.hash(&mut hasher);
        self.result_set_type.hash(&mut hasher);
        self.result_set_concurrency.hash(&mut hasher);
        self.column_indexes.hash(&mut hasher);
        self.column_names.hash(&mut hasher);
        self.autogenerated_keys.hash(&mut hasher);
        self.holdability.hash(&mut hasher);
        hasher.finish()
    }

    /// Field-by-field comparison; the memoized hash is only a shortcut.
    pub fn value_eq(&self, other: &Self) -> bool {
        self.cached_hash == other.cached_hash
            && self.connection == other.connection
            && self.is_callable == other.is_callable
            && self.result_set_type == other.result_set_type
            && self.result_set_concurrency == other.result_set_concurrency
            && self.autogenerated_keys == other.autogenerated_keys
            && self.holdability == other.holdability
            && self.text == other.text
            && self.column_indexes == other.column_indexes
            && self.column_names == other.column_names
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_callable(&self) -> bool {
        self.is_callable
    }

    pub fn result_set_type(&self) -> ResultSetType {
        self.result_set_type
    }

    pub fn result_set_concurrency(&self) -> ResultSetConcurrency {
        self.result_set_concurrency
    }

    pub fn column_indexes(&self) -> Option<&[i32]> {
        self.column_indexes.as_deref()
    }

    pub fn column_names(&self) -> Option<&[String]> {
        self.column_names.as_deref()
    }

    pub fn autogenerated_keys(&self) -> Option<AutoGeneratedKeys> {
        self.autogenerated_keys
    }

    pub fn holdability(&self) -> Option<Holdability> {
        self.holdability
    }

    #[inline]
    pub fn cached_hash(&self) -> u64 {
        self.cached_hash
    }
}

impl PartialEq for StatementCacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.value_eq(other)
    }
}

impl Eq for StatementCacheKey {}

impl Hash for StatementCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.cached_hash);
    }
}

impl fmt::Display for StatementCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {:?}/{:?}",
            self.connection,
            if self.is_callable { "call" } else { "prepare" },
            self.result_set_type,
            self.result_set_concurrency
        )?;
        if let Some(indexes) = &self.column_indexes {
            write!(f, " columns={:?}", indexes)?;
        }
        if let Some(names) = &self.column_names {
            write!(f, " columns={:?}", names)?;
        }
        if let Some(mode) = self.autogenerated_keys {
            write!(f, " keys={:?}", mode)?;
        }
        if let Some(holdability) = self.holdability {
            write!(f, " hold={:?}", holdability)?;
        }
        write!(f, ": {}", self.text)
    }
}

fn assign_slice<T: Clone>(slot: &mut Option<Vec<T>>, src: Option<&[T]>) {
    let Some(src) = src else {
        *slot = None;
        return;
    };
    match slot {
        Some(buf) => {
            buf.clear();
            buf.extend_from_slice(src);
        }
        None => *slot = Some(src.to_vec()),
    }
}

/// Shared handle to the single canonical instance of a key value.
///
/// Equality and hashing are by identity. Only compare handles obtained from
/// the same resolver; use [`StatementCacheKey::value_eq`] for anything else.
#[derive(Clone)]
pub struct CanonicalKey(pub(crate) Arc<StatementCacheKey>);

impl CanonicalKey {
    /// True when both handles point at the same instance.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live handles to this instance.
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl Deref for CanonicalKey {
    type Target = StatementCacheKey;

    fn deref(&self) -> &StatementCacheKey {
        &self.0
    }
}

impl PartialEq for CanonicalKey {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for CanonicalKey {}

impl Hash for CanonicalKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.cached_hash);
    }
}

impl fmt::Debug for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CanonicalKey").field(&*self.0).finish()
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}
