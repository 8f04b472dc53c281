//! # Mock Order Store
//!
//! An [`OrderStore`] driven by a queue of expectations, for testing the order cache
//! without any backend.
//!
//! ## When to use the mock vs the in-memory store
//!
//! | Feature | MockOrderStore | InMemoryOrderStore |
//! |---------|----------------|--------------------|
//! | **State** | None (scripted responses) | Real rows and live feeds |
//! | **Error injection** | Any error on any call | Fetch failures only |
//! | **Latency** | Scriptable per call | Instant |
//! | **Use case** | Unit testing the cache's bookkeeping | End-to-end guest sessions |
//!
//! ## Example
//!
//! ```rust
//! use pour_decisions::model::GuestId;
//! use pour_decisions::store::{MockOrderStore, OrderStore, StoreError};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MockOrderStore::new();
//!     store.expect_fetch("g1").return_err(StoreError::Network("offline".into()));
//!
//!     let result = store.fetch_orders_for_guest(&GuestId::from("g1")).await;
//!     assert!(matches!(result, Err(StoreError::Network(_))));
//!     store.verify();
//! }
//! ```

use crate::model::{GuestId, OrderWithDetails};
use crate::store::{OrderStore, StatusSink, StoreError, SubscriptionHandle};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// Represents an expected call to the mock store.
enum Expectation {
    Fetch {
        guest_id: GuestId,
        delay: Option<Duration>,
        response: Result<Vec<OrderWithDetails>, StoreError>,
    },
    Subscribe {
        guest_id: GuestId,
        delay: Option<Duration>,
        response: Result<(), StoreError>,
    },
}

#[derive(Default)]
struct Recorded {
    sinks: HashMap<GuestId, StatusSink>,
    subscribes: usize,
    unsubscribed: Vec<SubscriptionHandle>,
}

/// A mock store with expectation tracking for fluent testing.
///
/// Calls must arrive in the order the expectations were queued. A call with no
/// matching expectation panics.
#[derive(Clone, Default)]
pub struct MockOrderStore {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockOrderStore {
    /// Creates a new mock store with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects a `fetch_orders_for_guest` call.
    pub fn expect_fetch(&self, guest_id: impl Into<GuestId>) -> FetchExpectationBuilder {
        FetchExpectationBuilder {
            guest_id: guest_id.into(),
            delay: None,
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a `subscribe_to_guest_order_updates` call.
    pub fn expect_subscribe(&self, guest_id: impl Into<GuestId>) -> SubscribeExpectationBuilder {
        SubscribeExpectationBuilder {
            guest_id: guest_id.into(),
            delay: None,
            expectations: self.expectations.clone(),
        }
    }

    /// The sink handed over by the most recent successful subscribe for `guest_id`.
    pub fn sink_for(&self, guest_id: &str) -> Option<StatusSink> {
        self.recorded
            .lock()
            .unwrap()
            .sinks
            .get(&GuestId::from(guest_id))
            .cloned()
    }

    /// Number of subscriptions the store registered.
    pub fn subscribe_count(&self) -> usize {
        self.recorded.lock().unwrap().subscribes
    }

    /// Handles passed to `unsubscribe`, in call order.
    pub fn unsubscribed(&self) -> Vec<SubscriptionHandle> {
        self.recorded.lock().unwrap().unsubscribed.clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }

    fn next_expectation(&self) -> Option<Expectation> {
        self.expectations.lock().unwrap().pop_front()
    }
}

/// Builder for `fetch` expectations.
pub struct FetchExpectationBuilder {
    guest_id: GuestId,
    delay: Option<Duration>,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl FetchExpectationBuilder {
    /// Holds the response back for `delay` before returning it.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, orders: Vec<OrderWithDetails>) {
        self.push(Ok(orders));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: StoreError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Vec<OrderWithDetails>, StoreError>) {
        let mut exps = self.expectations.lock().unwrap();
        exps.push_back(Expectation::Fetch {
            guest_id: self.guest_id,
            delay: self.delay,
            response,
        });
    }
}

/// Builder for `subscribe` expectations.
pub struct SubscribeExpectationBuilder {
    guest_id: GuestId,
    delay: Option<Duration>,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl SubscribeExpectationBuilder {
    /// Registers the sink right away but holds the handle back for `delay`.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the expectation to open the subscription.
    pub fn return_ok(self) {
        self.push(Ok(()));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: StoreError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<(), StoreError>) {
        let mut exps = self.expectations.lock().unwrap();
        exps.push_back(Expectation::Subscribe {
            guest_id: self.guest_id,
            delay: self.delay,
            response,
        });
    }
}

#[async_trait]
impl OrderStore for MockOrderStore {
    async fn fetch_orders_for_guest(
        &self,
        guest_id: &GuestId,
    ) -> Result<Vec<OrderWithDetails>, StoreError> {
        match self.next_expectation() {
            Some(Expectation::Fetch {
                guest_id: expected,
                delay,
                response,
            }) if &expected == guest_id => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                response
            }
            _ => panic!("Unexpected fetch for {guest_id} or expectation mismatch"),
        }
    }

    async fn subscribe_to_guest_order_updates(
        &self,
        guest_id: &GuestId,
        sink: StatusSink,
    ) -> Result<SubscriptionHandle, StoreError> {
        match self.next_expectation() {
            Some(Expectation::Subscribe {
                guest_id: expected,
                delay,
                response,
            }) if &expected == guest_id => {
                response?;
                let handle = SubscriptionHandle::for_sink(&sink);
                {
                    let mut recorded = self.recorded.lock().unwrap();
                    recorded.subscribes += 1;
                    recorded.sinks.insert(guest_id.clone(), sink);
                }
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(handle)
            }
            _ => panic!("Unexpected subscribe for {guest_id} or expectation mismatch"),
        }
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.recorded.lock().unwrap().unsubscribed.push(handle);
    }
}
