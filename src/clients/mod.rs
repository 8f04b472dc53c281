//! Handles for talking to the running order cache.

pub mod order_facade_client;

pub use order_facade_client::*;
