use crate::model::{GuestId, OrderWithDetails};
use crate::order_facade::{FacadeError, FacadeRequest, FacadeStats, OrderBook, Response};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, instrument};

/// Client for the guest order cache.
///
/// Cheap to clone. Writes are queued to the cache task; writes for one guest are
/// answered in order. [`get_orders_for_guest`](Self::get_orders_for_guest) reads
/// the latest published snapshot without waiting on the task.
///
/// Dropping the future of a write after it was queued does not cancel it. The
/// task still finishes the write and only the reply is lost.
#[derive(Clone)]
pub struct OrderFacadeClient {
    sender: mpsc::Sender<FacadeRequest>,
    snapshot: watch::Receiver<Arc<OrderBook>>,
}

impl OrderFacadeClient {
    pub fn new(
        sender: mpsc::Sender<FacadeRequest>,
        snapshot: watch::Receiver<Arc<OrderBook>>,
    ) -> Self {
        Self { sender, snapshot }
    }

    /// Fetches the guest's orders from the store and replaces the cached list.
    ///
    /// Returns how many orders are now cached for the guest. On error the
    /// previous entry, if any, stays in place.
    #[instrument(skip(self))]
    pub async fn load_orders_for_guest(&self, guest_id: &GuestId) -> Result<usize, FacadeError> {
        let guest_id = validated(guest_id)?;
        self.request(|respond_to| FacadeRequest::Load {
            guest_id,
            respond_to,
        })
        .await
    }

    /// The cached orders of a guest, empty when nothing was loaded.
    pub fn get_orders_for_guest(&self, guest_id: &GuestId) -> Vec<OrderWithDetails> {
        self.snapshot.borrow().orders_for(guest_id).to_vec()
    }

    /// Opens a live subscription for the guest unless one is already held.
    ///
    /// When the store refuses, nothing is recorded and a later call tries again.
    #[instrument(skip(self))]
    pub async fn ensure_guest_subscription(&self, guest_id: &GuestId) -> Result<(), FacadeError> {
        let guest_id = validated(guest_id)?;
        self.request(|respond_to| FacadeRequest::EnsureSubscription {
            guest_id,
            respond_to,
        })
        .await
    }

    /// Closes the guest's subscription if there is one. Cached orders stay.
    #[instrument(skip(self))]
    pub async fn teardown_guest_subscription(&self, guest_id: &GuestId) -> Result<(), FacadeError> {
        self.request(|respond_to| FacadeRequest::TeardownSubscription {
            guest_id: guest_id.clone(),
            respond_to,
        })
        .await
    }

    /// Closes the guest's subscription and drops the cached orders.
    #[instrument(skip(self))]
    pub async fn clear_guest_orders(&self, guest_id: &GuestId) -> Result<(), FacadeError> {
        self.request(|respond_to| FacadeRequest::Clear {
            guest_id: guest_id.clone(),
            respond_to,
        })
        .await
    }

    /// Subscribes and then loads, the way a guest screen opens.
    ///
    /// Subscribing first means a change made while the fetch is in flight is
    /// either in the fetched list or delivered after it.
    #[instrument(skip(self))]
    pub async fn open_guest_session(&self, guest_id: &GuestId) -> Result<usize, FacadeError> {
        self.ensure_guest_subscription(guest_id).await?;
        self.load_orders_for_guest(guest_id).await
    }

    /// Counters from the cache task. Replies once no store call is in flight,
    /// after every earlier request and every live event already delivered, so
    /// tests can use it as a barrier.
    pub async fn stats(&self) -> Result<FacadeStats, FacadeError> {
        self.request(|respond_to| FacadeRequest::Stats { respond_to })
            .await
    }

    /// Stops the cache for every clone of this client.
    ///
    /// Requests already queued still run. Replies once the task has closed its
    /// open subscriptions; later calls fail with [`FacadeError::ActorClosed`].
    #[instrument(skip(self))]
    pub async fn close(&self) -> Result<(), FacadeError> {
        self.request(|respond_to| FacadeRequest::Close { respond_to })
            .await
    }

    /// A receiver that is notified whenever the cache changes from now on.
    pub fn subscribe_changes(&self) -> watch::Receiver<Arc<OrderBook>> {
        let mut changes = self.snapshot.clone();
        changes.borrow_and_update();
        changes
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Response<T>) -> FacadeRequest,
    ) -> Result<T, FacadeError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FacadeError::ActorClosed)?;
        response.await.map_err(|_| FacadeError::ActorDropped)?
    }
}

fn validated(guest_id: &GuestId) -> Result<GuestId, FacadeError> {
    if guest_id.is_empty() {
        debug!("Rejected empty guest id");
        return Err(FacadeError::InvalidGuestId);
    }
    Ok(guest_id.clone())
}
