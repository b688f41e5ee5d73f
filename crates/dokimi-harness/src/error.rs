//! Error types for the Dokimi testing harness.

use thiserror::Error;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors that can occur while setting up or running a harnessed example.
///
/// All of these are programmer errors in test setup; none are recovered
/// automatically. They abort the current example's setup phase, and namespace
/// restoration still runs for anything already installed.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Attempted to patch a namespace name already bound to a value the
    /// harness does not own.
    #[error("Namespace `{namespace}` already has a non-harness binding for `{name}`")]
    Conflict {
        /// Label of the namespace involved.
        namespace: String,
        /// The contested name.
        name: String,
    },

    /// A declaration was misconfigured: a parent reference that does not
    /// resolve to a usable type, or an invalid identifier.
    #[error("Invalid configuration for `{name}`: {reason}")]
    Configuration {
        /// Name of the declaration at fault.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A name could not be resolved anywhere in the scope chain.
    #[error("No definition for `{name}` in the current scope chain")]
    Lookup {
        /// The missing name.
        name: String,
    },

    /// Host framework error.
    #[error(transparent)]
    Core(#[from] dokimi_core::Error),
}
