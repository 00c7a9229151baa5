//! Custom error types with exit codes

use thiserror::Error;

/// Main error type for devrig operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RigError {
    /// Configuration Error - missing or invalid configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Variable Error - a variable could not be resolved
    #[error("Variable error: {message}")]
    Variable { message: String },

    /// Expression Error - a config expression failed to execute
    #[error("Expression error: {message}")]
    Expression { message: String },

    /// Patch Error - a profile patch operation failed
    #[error("Patch error: {message}")]
    Patch { message: String },

    /// Runtime Error - a runtime variable could not be resolved
    #[error("Runtime variable error: {message}")]
    Runtime { message: String },

    /// Dependency Error - a dependency failed to load
    #[error("Dependency error: {message}")]
    Dependency { message: String },
}

impl RigError {
    /// Get the appropriate exit code for this error type
    #[must_use]
    #[inline]
    pub const fn exit_code(&self) -> i32 {
        match *self {
            Self::Configuration { .. } => 1,
            Self::Variable { .. } => 2,
            Self::Expression { .. } => 3,
            Self::Patch { .. } => 4,
            Self::Runtime { .. } => 5,
            Self::Dependency { .. } => 6,
        }
    }

    /// Create a configuration error
    #[inline]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a variable error
    #[inline]
    pub fn variable<S: Into<String>>(message: S) -> Self {
        Self::Variable {
            message: message.into(),
        }
    }

    /// Create an expression error
    #[inline]
    pub fn expression<S: Into<String>>(message: S) -> Self {
        Self::Expression {
            message: message.into(),
        }
    }

    /// Create a patch error
    #[inline]
    pub fn patch<S: Into<String>>(message: S) -> Self {
        Self::Patch {
            message: message.into(),
        }
    }

    /// Create a runtime variable error
    #[inline]
    pub fn runtime<S: Into<String>>(message: S) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    /// Create a dependency error
    #[inline]
    pub fn dependency<S: Into<String>>(message: S) -> Self {
        Self::Dependency {
            message: message.into(),
        }
    }
}
