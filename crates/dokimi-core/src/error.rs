//! Error types for Dokimi core operations.
//!
//! This module defines the error types used throughout the `dokimi-core` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Dokimi core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A namespace name is already bound to a value the harness does not own.
    #[error("Name `{name}` in namespace `{namespace}` is already bound to a non-harness value")]
    Conflict {
        /// Label of the namespace involved.
        namespace: String,
        /// The contested name.
        name: String,
    },

    /// A type lookup against a namespace failed.
    #[error("No type named `{name}` is registered in namespace `{namespace}`")]
    UnknownType {
        /// Label of the namespace searched.
        namespace: String,
        /// The missing name.
        name: String,
    },

    /// A resource declaration requested an action outside its type's allowed set.
    #[error("Resource type `{resource}` does not allow action `{action}`")]
    ActionNotAllowed {
        /// Name of the resource type.
        resource: String,
        /// The rejected action.
        action: String,
    },

    /// A provider has no implementation for a requested action.
    #[error("Provider `{provider}` has no implementation for action `{action}`")]
    MissingAction {
        /// Name of the provider type.
        provider: String,
        /// The unimplemented action.
        action: String,
    },

    /// A provider action body failed during convergence.
    #[error("Action `{action}` on `{resource}[{identifier}]` failed: {reason}")]
    ActionFailed {
        /// The action that failed.
        action: String,
        /// Resource type name.
        resource: String,
        /// Instance identifier.
        identifier: String,
        /// Reason reported by the action body.
        reason: String,
    },

    /// An in-provider assertion did not hold.
    #[error("Provider assertion failed: {message}")]
    AssertionFailed {
        /// Description of the failed assertion.
        message: String,
    },

    /// An in-provider assertion was made but the provider type was built
    /// without assertion support.
    #[error("Provider `{provider}` was built without assertion support")]
    AssertionsUnavailable {
        /// Name of the provider type.
        provider: String,
    },

    /// Failed to read an attribute file.
    #[error("Failed to read attribute file {path}: {source}")]
    AttributeFileError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML error.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_conflict() {
        let err = Error::Conflict {
            namespace: "resources".to_string(),
            name: "widget".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Name `widget` in namespace `resources` is already bound to a non-harness value"
        );
    }

    #[test]
    fn test_error_display_unknown_type() {
        let err = Error::UnknownType {
            namespace: "providers".to_string(),
            name: "widget".to_string(),
        };
        assert!(err.to_string().contains("No type named `widget`"));
    }

    #[test]
    fn test_error_display_action_failed() {
        let err = Error::ActionFailed {
            action: "run".to_string(),
            resource: "widget".to_string(),
            identifier: "x".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Action `run` on `widget[x]` failed: boom"
        );
    }

    #[test]
    fn test_error_display_assertions_unavailable() {
        let err = Error::AssertionsUnavailable {
            provider: "widget".to_string(),
        };
        assert!(err.to_string().contains("without assertion support"));
    }
}
