//! # Guest Order Cache
//!
//! Keeps each guest's orders in memory and keeps them current while the guest has
//! a live subscription open.
//!
//! ## Pieces
//!
//! - [`OrderFacadeActor`]: the single task that owns the cache and talks to the store.
//! - [`OrderBook`]: the per-guest table itself, published to readers as snapshots.
//! - [`FacadeRequest`]: the messages the client sends to the task.
//! - [`FacadeError`]: everything a cache call can fail with.
//!
//! ## Lifecycle of a guest entry
//!
//! ```text
//! absent --load--> loaded --ensure--> loaded + subscribed
//!    ^                                        |
//!    +----------------- clear ----------------+
//! ```
//!
//! A load that fails leaves the entry as it was. Status changes only ever patch
//! orders already in the entry; new orders show up on the next load.

pub mod actor;
pub mod book;
pub mod error;
pub mod message;

pub use actor::OrderFacadeActor;
pub use book::{OrderBook, PatchOutcome};
pub use error::FacadeError;
pub use message::{FacadeRequest, FacadeStats, Response};

use crate::clients::OrderFacadeClient;
use crate::config::FacadeConfig;

/// Creates the order cache task and its client. The task does nothing until
/// [`OrderFacadeActor::run`] is spawned with a store.
pub fn new(config: &FacadeConfig) -> (OrderFacadeActor, OrderFacadeClient) {
    OrderFacadeActor::new(config)
}
