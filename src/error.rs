//! Error types for statement-key resolution.

use thiserror::Error;

/// The main error type for key resolution.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The trailing arguments match no known prepare overload.
    ///
    /// Usually means the driver API grew an overload this layer does not decode yet.
    #[error("Unsupported call shape for {method}: {detail}")]
    UnsupportedCallShape { method: &'static str, detail: String },

    /// A trailing integer is not a valid code for the field it encodes.
    #[error("Invalid {field} constant: {value}")]
    InvalidConstant { field: &'static str, value: i32 },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeyError {
    /// Create an unsupported call shape error.
    pub fn unsupported(method: &'static str, detail: impl Into<String>) -> Self {
        Self::UnsupportedCallShape {
            method,
            detail: detail.into(),
        }
    }

    /// Create an invalid constant error.
    pub fn invalid_constant(field: &'static str, value: i32) -> Self {
        Self::InvalidConstant { field, value }
    }

    /// True for failures caused by the shape or content of a prepare call.
    ///
    /// The statement cache turns these into a miss-with-error and caches nothing.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedCallShape { .. } | Self::InvalidConstant { .. }
        )
    }
}

/// Result type alias for key resolution.
pub type KeyResult<T> = Result<T, KeyError>;
