//! Error types for the diff engine.

use crate::inspect::InspectError;

/// Message shared by the unsafe-migration error and the CLI warning line.
pub const UNSAFE_MESSAGE: &str =
    "destructive statements generated. Use the --unsafe flag to suppress this error.";

/// Errors that can occur while diffing, rendering or applying changes.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// Destructive statements are present while the safety gate is closed.
    #[error("{}", UNSAFE_MESSAGE)]
    UnsafeMigration,

    /// State was read before the step that produces it ran.
    #[error("{what} is not available before {step}")]
    AccessBeforeReady {
        /// The piece of state that was requested.
        what: &'static str,
        /// The step that has to run first.
        step: &'static str,
    },

    /// An object kind name that the change registry does not know.
    #[error("Unknown object kind: {0}")]
    UnknownKind(String),

    /// Invalid configuration or snapshot state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Failure reported by the introspection collaborator, passed through as-is.
    #[error(transparent)]
    Inspect(#[from] InspectError),
}

/// Result type for diff operations.
pub type Result<T> = std::result::Result<T, DiffError>;
