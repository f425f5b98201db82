//! Typed workspace errors.

use thiserror::Error;

/// Host-visible failures of workspace operations. Malformed *content* is
/// never an error; it surfaces as syntax-error data and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    /// The operation named a path no document is registered under.
    #[error("no document at `{path}`")]
    DocumentNotFound { path: String },
}
