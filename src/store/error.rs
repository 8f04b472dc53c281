//! Error types for the order store.

use thiserror::Error;

/// Failures the backend can report. The order cache passes them through without
/// interpreting them.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// The request never reached the backend or the connection dropped.
    #[error("Network error: {0}")]
    Network(String),

    /// The session is missing or not allowed to read these rows.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The referenced row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend refused the request (constraint, malformed filter, ...).
    #[error("Request rejected: {0}")]
    Rejected(String),
}
