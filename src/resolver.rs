//! Key resolution with a reused scratch record.
//!
//! A warm statement cache mostly asks for keys that already exist, so the
//! resolver keeps one spare record, rewrites it in place for every lookup and
//! offers it to the coalescer. Only when the spare gets promoted to canonical
//! is a new spare allocated; a hit costs no allocation at all.
//!
//! [`KeyResolver`] needs `&mut self`, so whoever owns it provides the single
//! lock the whole reinitialize/intern/replace sequence runs under.
//! [`resolve_key`] does that with a process-wide mutex.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::coalesce::{Coalescer, Interned};
use crate::config::CoalescerConfig;
use crate::error::{KeyError, KeyResult};
use crate::key::{CanonicalKey, StatementCacheKey};
use crate::shape::{CallShape, PrepareArg};
use crate::types::{ConnectionId, PrepareMethod};

/// Counters for a resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    /// Successful resolutions.
    pub lookups: u64,
    /// Resolutions that promoted the spare to canonical.
    pub interned: u64,
    /// Resolutions answered by an existing canonical key.
    pub coalesced: u64,
    /// Spare records allocated to replace a promoted one.
    pub scratch_allocations: u64,
    /// Calls rejected by the shape decoder.
    pub failures: u64,
}

impl ResolverStats {
    /// Share of lookups answered without interning, as a percentage.
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            (self.coalesced as f64 / self.lookups as f64) * 100.0
        }
    }
}

/// Turns prepare calls into canonical keys.
pub struct KeyResolver {
    coalescer: Coalescer,
    spare: Arc<StatementCacheKey>,
    stats: ResolverStats,
}

impl KeyResolver {
    pub fn new() -> Self {
        Self::from_parts(Coalescer::default())
    }

    pub fn with_config(config: CoalescerConfig) -> KeyResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(Coalescer::new(&config)))
    }

    fn from_parts(coalescer: Coalescer) -> Self {
        Self {
            coalescer,
            spare: Arc::new(StatementCacheKey::blank()),
            stats: ResolverStats::default(),
        }
    }

    /// Decode the raw trailing arguments and resolve the canonical key.
    pub fn resolve(
        &mut self,
        connection: ConnectionId,
        text: &str,
        is_callable: bool,
        args: &[PrepareArg],
    ) -> KeyResult<CanonicalKey> {
        let method = PrepareMethod::from_callable(is_callable);
        let shape = match CallShape::decode(method, args) {
            Ok(shape) => shape,
            Err(e) => {
                self.stats.failures += 1;
                tracing::warn!("Cannot build statement key on {}: {}", connection, e);
                return Err(e);
            }
        };
        Ok(self.resolve_shape(connection, text, is_callable, &shape))
    }

    /// Resolve the canonical key for an already decoded call shape.
    pub fn resolve_shape(
        &mut self,
        connection: ConnectionId,
        text: &str,
        is_callable: bool,
        shape: &CallShape<'_>,
    ) -> CanonicalKey {
        // The spare is never shared: promotion replaces it below.
        Arc::make_mut(&mut self.spare).reinitialize(connection, text, is_callable, shape);
        self.stats.lookups += 1;

        match self.coalescer.intern(&self.spare) {
            Interned::New(key) => {
                self.spare = Arc::new(StatementCacheKey::blank());
                self.stats.interned += 1;
                self.stats.scratch_allocations += 1;
                tracing::trace!("Interned statement key {}", key);
                key
            }
            Interned::Existing(key) => {
                self.stats.coalesced += 1;
                tracing::trace!("Coalesced statement key {}", key);
                key
            }
        }
    }

    /// Prune dead entries from the store now.
    pub fn sweep(&mut self) -> usize {
        self.coalescer.sweep()
    }

    pub fn coalescer(&self) -> &Coalescer {
        &self.coalescer
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }
}

impl Default for KeyResolver {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: OnceLock<Mutex<KeyResolver>> = OnceLock::new();

fn global() -> &'static Mutex<KeyResolver> {
    GLOBAL.get_or_init(|| Mutex::new(KeyResolver::new()))
}

/// Configure the process-wide resolver. Must run before the first
/// [`resolve_key`]; fails if the resolver already exists.
pub fn init_global(config: CoalescerConfig) -> KeyResult<()> {
    let resolver = KeyResolver::with_config(config)?;
    GLOBAL.set(Mutex::new(resolver)).map_err(|_| {
        KeyError::Config("statement key resolver is already initialized".to_string())
    })
}

/// Resolve a prepare call to its canonical key using the process-wide resolver.
///
/// Keys compare by identity, so a statement cache must only hold keys
/// obtained here (or from one shared [`KeyResolver`]).
pub fn resolve_key(
    connection: ConnectionId,
    text: &str,
    is_callable: bool,
    args: &[PrepareArg],
) -> KeyResult<CanonicalKey> {
    global().lock().resolve(connection, text, is_callable, args)
}

/// Like [`resolve_key`] for call sites that know their overload statically.
pub fn resolve_key_shape(
    connection: ConnectionId,
    text: &str,
    is_callable: bool,
    shape: &CallShape<'_>,
) -> CanonicalKey {
    global().lock().resolve_shape(connection, text, is_callable, shape)
}

/// Counters of the process-wide resolver.
pub fn global_stats() -> ResolverStats {
    global().lock().stats()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Holdability, ResultSetConcurrency, ResultSetType};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_warm_lookup_reuses_spare() {
        let mut resolver = KeyResolver::new();
        let conn = ConnectionId::next();

        let first = resolver.resolve(conn, "SELECT * FROM t", false, &[]).unwrap();
        let spare = Arc::as_ptr(&resolver.spare);

        for _ in 0..100 {
            let again = resolver.resolve(conn, "SELECT * FROM t", false, &[]).unwrap();
            assert!(again.ptr_eq(&first));
        }

        // coalesced hits rewrote the same spare in place and never replaced it
        assert_eq!(Arc::as_ptr(&resolver.spare), spare);
        assert_eq!(
            resolver.stats(),
            ResolverStats {
                lookups: 101,
                interned: 1,
                coalesced: 100,
                scratch_allocations: 1,
                failures: 0,
            }
        );
    }

    #[test]
    fn test_promoted_spare_is_frozen() {
        let mut resolver = KeyResolver::new();
        let conn = ConnectionId::next();

        let a = resolver.resolve(conn, "SELECT 1", false, &[]).unwrap();
        let b = resolver.resolve(conn, "SELECT 2", true, &[]).unwrap();

        // b's lookup rewrote a fresh spare, not a
        assert_eq!(a.text(), "SELECT 1");
        assert!(!a.is_callable());
        assert_eq!(b.text(), "SELECT 2");
        assert!(b.is_callable());
        assert_ne!(a, b);
    }

    #[test]
    fn test_resolve_shape_matches_decoded_args() {
        let mut resolver = KeyResolver::new();
        let conn = ConnectionId::next();

        let decoded = resolver
            .resolve(
                conn,
                "SELECT * FROM t",
                false,
                &[
                    PrepareArg::Int(ResultSetType::SCROLL_INSENSITIVE),
                    PrepareArg::Int(ResultSetConcurrency::UPDATABLE),
                    PrepareArg::Int(Holdability::HOLD_CURSORS_OVER_COMMIT),
                ],
            )
            .unwrap();
        let typed = resolver.resolve_shape(
            conn,
            "SELECT * FROM t",
            false,
            &CallShape::Holdable {
                kind: ResultSetType::ScrollInsensitive,
                concurrency: ResultSetConcurrency::Updatable,
                holdability: Holdability::HoldCursors,
            },
        );
        assert!(typed.ptr_eq(&decoded));
    }

    #[test]
    fn test_failure_leaves_state_usable() {
        let mut resolver = KeyResolver::new();
        let conn = ConnectionId::next();

        let err = resolver
            .resolve(conn, "SELECT 1", false, &[PrepareArg::Null])
            .unwrap_err();
        assert!(err.is_shape_error());
        assert_eq!(resolver.stats().failures, 1);
        assert_eq!(resolver.stats().lookups, 0);

        let key = resolver.resolve(conn, "SELECT 1", false, &[]).unwrap();
        assert_eq!(key.text(), "SELECT 1");
    }

    #[test]
    fn test_with_config_validates() {
        let config = CoalescerConfig::new().initial_capacity(usize::MAX);
        assert!(KeyResolver::with_config(config).is_err());

        let config = CoalescerConfig::new().sweep_interval(0);
        assert!(matches!(
            KeyResolver::with_config(config),
            Err(KeyError::Config(_))
        ));
    }

    #[test]
    fn test_hit_rate() {
        let stats = ResolverStats {
            lookups: 4,
            coalesced: 3,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 75.0);
        assert_eq!(ResolverStats::default().hit_rate(), 0.0);
    }
}
