//! Value types carried by a statement-cache key.
//!
//! Codes follow the JDBC `ResultSet` / `Statement` constants so that
//! drivers speaking that convention can pass their raw integers through.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{KeyError, KeyResult};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a physical connection.
///
/// Two ids are equal only if they were handed out for the same connection;
/// the pool assigns one with [`ConnectionId::next`] when it opens a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate a fresh, process-unique identity.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap an identity issued elsewhere (e.g. a backend process id).
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Which prepare method produced the statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrepareMethod {
    PrepareStatement,
    PrepareCall,
}

impl PrepareMethod {
    /// Map a driver method name; anything but `prepareCall` is a plain prepare.
    pub fn from_name(name: &str) -> Self {
        if name == "prepareCall" {
            Self::PrepareCall
        } else {
            Self::PrepareStatement
        }
    }

    pub fn from_callable(is_callable: bool) -> Self {
        if is_callable {
            Self::PrepareCall
        } else {
            Self::PrepareStatement
        }
    }

    pub fn is_callable(self) -> bool {
        matches!(self, Self::PrepareCall)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::PrepareStatement => "prepareStatement",
            Self::PrepareCall => "prepareCall",
        }
    }
}

/// Cursor movement allowed on the result set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResultSetType {
    #[default]
    ForwardOnly,
    ScrollInsensitive,
    ScrollSensitive,
}

impl ResultSetType {
    pub const FORWARD_ONLY: i32 = 1003;
    pub const SCROLL_INSENSITIVE: i32 = 1004;
    pub const SCROLL_SENSITIVE: i32 = 1005;

    pub fn from_code(code: i32) -> KeyResult<Self> {
        match code {
            Self::FORWARD_ONLY => Ok(Self::ForwardOnly),
            Self::SCROLL_INSENSITIVE => Ok(Self::ScrollInsensitive),
            Self::SCROLL_SENSITIVE => Ok(Self::ScrollSensitive),
            other => Err(KeyError::invalid_constant("result set type", other)),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::ForwardOnly => Self::FORWARD_ONLY,
            Self::ScrollInsensitive => Self::SCROLL_INSENSITIVE,
            Self::ScrollSensitive => Self::SCROLL_SENSITIVE,
        }
    }
}

/// Whether rows of the result set may be updated in place.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResultSetConcurrency {
    #[default]
    ReadOnly,
    Updatable,
}

impl ResultSetConcurrency {
    pub const READ_ONLY: i32 = 1007;
    pub const UPDATABLE: i32 = 1008;

    pub fn from_code(code: i32) -> KeyResult<Self> {
        match code {
            Self::READ_ONLY => Ok(Self::ReadOnly),
            Self::UPDATABLE => Ok(Self::Updatable),
            other => Err(KeyError::invalid_constant("result set concurrency", other)),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::ReadOnly => Self::READ_ONLY,
            Self::Updatable => Self::UPDATABLE,
        }
    }
}

/// What happens to open cursors on commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Holdability {
    HoldCursors,
    CloseCursors,
}

impl Holdability {
    pub const HOLD_CURSORS_OVER_COMMIT: i32 = 1;
    pub const CLOSE_CURSORS_AT_COMMIT: i32 = 2;

    pub fn from_code(code: i32) -> KeyResult<Self> {
        match code {
            Self::HOLD_CURSORS_OVER_COMMIT => Ok(Self::HoldCursors),
            Self::CLOSE_CURSORS_AT_COMMIT => Ok(Self::CloseCursors),
            other => Err(KeyError::invalid_constant("result set holdability", other)),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::HoldCursors => Self::HOLD_CURSORS_OVER_COMMIT,
            Self::CloseCursors => Self::CLOSE_CURSORS_AT_COMMIT,
        }
    }
}

/// Generated-key retrieval mode requested at prepare time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AutoGeneratedKeys {
    Return,
    NoReturn,
}

impl AutoGeneratedKeys {
    pub const RETURN_GENERATED_KEYS: i32 = 1;
    pub const NO_GENERATED_KEYS: i32 = 2;

    pub fn from_code(code: i32) -> KeyResult<Self> {
        match code {
            Self::RETURN_GENERATED_KEYS => Ok(Self::Return),
            Self::NO_GENERATED_KEYS => Ok(Self::NoReturn),
            other => Err(KeyError::invalid_constant("autogenerated keys", other)),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Return => Self::RETURN_GENERATED_KEYS,
            Self::NoReturn => Self::NO_GENERATED_KEYS,
        }
    }
}
