//! # Order Store Boundary
//!
//! The order cache never talks to the backend directly. Everything it needs from
//! the hosted database and its realtime feed goes through the [`OrderStore`] trait,
//! which is injected when the cache is built so tests can substitute fakes.
//!
//! ## Implementations
//!
//! - [`InMemoryOrderStore`]: a working in-process store for the demo and system tests.
//! - [`MockOrderStore`]: an expectation queue for isolating the cache in unit tests.
//!
//! ## Live updates
//!
//! Live updates arrive over a message channel. Opening a subscription hands the
//! store a [`StatusSink`]; the store pushes every status change for that guest into
//! it until the subscription is closed.

pub mod error;
pub mod memory;
pub mod mock;

pub use error::StoreError;
pub use memory::InMemoryOrderStore;
pub use mock::MockOrderStore;

use crate::model::{GuestId, OrderStatusChange, OrderWithDetails};
use async_trait::async_trait;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identifies one opened subscription, so events from a closed one can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub_{}", self.0)
    }
}

/// A status change tagged with the subscription that delivered it.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    pub subscription: SubscriptionId,
    pub guest_id: GuestId,
    pub change: OrderStatusChange,
}

/// Where a store delivers live status changes for one guest.
#[derive(Debug, Clone)]
pub struct StatusSink {
    subscription: SubscriptionId,
    guest_id: GuestId,
    events: mpsc::UnboundedSender<StatusEvent>,
}

impl StatusSink {
    pub fn new(
        subscription: SubscriptionId,
        guest_id: GuestId,
        events: mpsc::UnboundedSender<StatusEvent>,
    ) -> Self {
        Self {
            subscription,
            guest_id,
            events,
        }
    }

    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    pub fn guest_id(&self) -> &GuestId {
        &self.guest_id
    }

    /// Delivers one change. Returns `false` once nobody is listening any more.
    pub fn push(&self, change: OrderStatusChange) -> bool {
        self.events
            .send(StatusEvent {
                subscription: self.subscription,
                guest_id: self.guest_id.clone(),
                change,
            })
            .is_ok()
    }
}

/// An open live-feed subscription, returned by the store and handed back to close it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    pub guest_id: GuestId,
    /// Name of the backend channel carrying the feed.
    pub channel: String,
}

impl SubscriptionHandle {
    pub fn for_sink(sink: &StatusSink) -> Self {
        Self {
            id: sink.subscription(),
            guest_id: sink.guest_id().clone(),
            channel: format!("guest-orders-{}", sink.guest_id()),
        }
    }
}

/// The two capabilities the order cache consumes from the backend.
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Full current order list for a guest, joined with guest and drink details.
    async fn fetch_orders_for_guest(
        &self,
        guest_id: &GuestId,
    ) -> Result<Vec<OrderWithDetails>, StoreError>;

    /// Opens a live feed of status changes for a guest's orders.
    async fn subscribe_to_guest_order_updates(
        &self,
        guest_id: &GuestId,
        sink: StatusSink,
    ) -> Result<SubscriptionHandle, StoreError>;

    /// Closes a feed. Closing an unknown or already closed handle is a no-op.
    async fn unsubscribe(&self, handle: SubscriptionHandle);
}

#[async_trait]
impl<S: OrderStore + ?Sized> OrderStore for Arc<S> {
    async fn fetch_orders_for_guest(
        &self,
        guest_id: &GuestId,
    ) -> Result<Vec<OrderWithDetails>, StoreError> {
        (**self).fetch_orders_for_guest(guest_id).await
    }

    async fn subscribe_to_guest_order_updates(
        &self,
        guest_id: &GuestId,
        sink: StatusSink,
    ) -> Result<SubscriptionHandle, StoreError> {
        (**self).subscribe_to_guest_order_updates(guest_id, sink).await
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) {
        (**self).unsubscribe(handle).await
    }
}
