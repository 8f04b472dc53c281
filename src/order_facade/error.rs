use crate::store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the order cache.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FacadeError {
    #[error("Order cache closed")]
    ActorClosed,
    #[error("Order cache dropped response channel")]
    ActorDropped,
    #[error("Guest id must not be empty")]
    InvalidGuestId,
    #[error("Order store did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Order store error: {0}")]
    Store(#[from] StoreError),
    #[error("Order cache task failed: {0}")]
    TaskFailed(String),
}
