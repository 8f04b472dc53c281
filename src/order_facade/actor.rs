use crate::clients::OrderFacadeClient;
use crate::config::FacadeConfig;
use crate::model::{GuestId, OrderStatusChange, OrderWithDetails};
use crate::order_facade::{
    FacadeError, FacadeRequest, FacadeStats, OrderBook, PatchOutcome, Response,
};
use crate::store::{OrderStore, StatusEvent, StatusSink, SubscriptionHandle, SubscriptionId};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

enum Inbox {
    Event(StatusEvent),
    Done(Completion),
    Joined(Result<(), JoinError>),
    Request(FacadeRequest),
    Closed,
}

/// How a store call that ran off the loop ended.
enum Completion {
    Loaded {
        guest_id: GuestId,
        result: Result<Vec<OrderWithDetails>, FacadeError>,
        respond_to: Response<usize>,
    },
    Subscribed {
        guest_id: GuestId,
        result: Result<SubscriptionHandle, FacadeError>,
        respond_to: Response<()>,
    },
    Unsubscribed {
        guest_id: GuestId,
        respond_to: Response<()>,
    },
    /// The call's task ended without reporting (it panicked).
    Aborted { guest_id: GuestId },
}

/// Bookkeeping for a guest with a store call in flight.
#[derive(Default)]
struct GuestWork {
    /// Requests for this guest that arrived while the call was running.
    waiting: VecDeque<FacadeRequest>,
    /// Status changes seen while the call was running, replayed over a fresh load.
    replay: Vec<OrderStatusChange>,
    /// Subscription being opened, whose events are accepted before it is recorded.
    opening: Option<SubscriptionId>,
}

/// Sends the call's completion back to the loop, or `Aborted` if the task dies first.
struct CallGuard {
    guest_id: GuestId,
    done: mpsc::UnboundedSender<Completion>,
    reported: bool,
}

impl CallGuard {
    fn report(mut self, completion: Completion) {
        self.reported = true;
        let _ = self.done.send(completion);
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        if !self.reported {
            let _ = self.done.send(Completion::Aborted {
                guest_id: self.guest_id.clone(),
            });
        }
    }
}

/// The task that owns the guest order cache.
///
/// # Concurrency Model
/// Requests, live status events and store-call completions are handled one at a
/// time on a single task, so the book and the subscription table need no locks.
/// Readers never wait on this task: after every change the book is published
/// through a `watch` channel and [`OrderFacadeClient::get_orders_for_guest`]
/// reads the latest snapshot.
///
/// Store calls run on their own tasks and report back as completions, so a slow
/// fetch for one guest never holds up another guest's requests or events. Calls
/// for the same guest run one after another: a request that arrives while its
/// guest has a call in flight waits for that call to finish. Status changes that
/// arrive during a reload are applied right away and applied again on top of the
/// fresh list when it lands.
pub struct OrderFacadeActor {
    receiver: mpsc::Receiver<FacadeRequest>,
    events: mpsc::UnboundedReceiver<StatusEvent>,
    events_tx: mpsc::UnboundedSender<StatusEvent>,
    completions: mpsc::UnboundedReceiver<Completion>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    calls: JoinSet<()>,
    book: OrderBook,
    snapshot: watch::Sender<Arc<OrderBook>>,
    subscriptions: HashMap<GuestId, SubscriptionHandle>,
    work: HashMap<GuestId, GuestWork>,
    deferred_stats: Vec<Response<FacadeStats>>,
    close_waiters: Vec<Response<()>>,
    next_subscription: u64,
    call_timeout: Duration,
}

impl OrderFacadeActor {
    pub fn new(config: &FacadeConfig) -> (Self, OrderFacadeClient) {
        let (sender, receiver) = mpsc::channel(config.buffer_size);
        let (events_tx, events) = mpsc::unbounded_channel();
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (snapshot, snapshot_rx) = watch::channel(Arc::new(OrderBook::new()));
        let actor = Self {
            receiver,
            events,
            events_tx,
            completions,
            completions_tx,
            calls: JoinSet::new(),
            book: OrderBook::new(),
            snapshot,
            subscriptions: HashMap::new(),
            work: HashMap::new(),
            deferred_stats: Vec::new(),
            close_waiters: Vec::new(),
            next_subscription: 0,
            call_timeout: config.call_timeout,
        };
        let client = OrderFacadeClient::new(sender, snapshot_rx);
        (actor, client)
    }

    /// Runs the cache until every client is dropped or one asks it to close, then
    /// lets calls in flight finish and closes the subscriptions that are still open.
    ///
    /// # Store Injection
    /// The store is handed over here rather than in [`OrderFacadeActor::new`], so a
    /// client can exist before the backend is wired up.
    pub async fn run<S: OrderStore>(mut self, store: S) {
        let store = Arc::new(store);
        let mut accepting = true;
        info!("Order cache started");

        while accepting || !self.work.is_empty() {
            // Live events first, then finished store calls, then new requests
            let next = tokio::select! {
                biased;
                Some(event) = self.events.recv() => Inbox::Event(event),
                Some(done) = self.completions.recv() => Inbox::Done(done),
                Some(joined) = self.calls.join_next(), if !self.calls.is_empty() => Inbox::Joined(joined),
                msg = self.receiver.recv(), if accepting => match msg {
                    Some(msg) => Inbox::Request(msg),
                    None => Inbox::Closed,
                },
            };
            match next {
                Inbox::Event(event) => self.apply_event(event),
                Inbox::Done(done) => self.complete(done, &store),
                Inbox::Joined(joined) => log_joined(joined),
                Inbox::Request(msg) => self.handle(msg, &store),
                Inbox::Closed => accepting = false,
            }
        }

        // Cleanups of subscriptions that opened after their caller timed out
        while let Some(joined) = self.calls.join_next().await {
            log_joined(joined);
        }

        let open: Vec<_> = self.subscriptions.drain().map(|(_, handle)| handle).collect();
        for handle in open {
            store.unsubscribe(handle).await;
        }
        info!(cached_guests = self.book.len(), "Shutdown");

        for respond_to in self.close_waiters.drain(..) {
            let _ = respond_to.send(Ok(()));
        }
    }

    fn handle<S: OrderStore>(&mut self, msg: FacadeRequest, store: &Arc<S>) {
        if let Some(guest_id) = msg.guest_id() {
            if let Some(work) = self.work.get_mut(guest_id) {
                debug!(%guest_id, waiting = work.waiting.len() + 1, "Queued behind store call");
                work.waiting.push_back(msg);
                return;
            }
        }
        self.start(msg, store);
    }

    fn start<S: OrderStore>(&mut self, msg: FacadeRequest, store: &Arc<S>) {
        match msg {
            FacadeRequest::Load { guest_id, respond_to } => {
                debug!(%guest_id, "Load");
                let guard = self.begin(&guest_id);
                let store = Arc::clone(store);
                let limit = self.call_timeout;
                self.calls.spawn(async move {
                    let result =
                        match tokio::time::timeout(limit, store.fetch_orders_for_guest(&guest_id)).await {
                            Ok(fetched) => fetched.map_err(FacadeError::from),
                            Err(_) => Err(FacadeError::Timeout(limit)),
                        };
                    guard.report(Completion::Loaded {
                        guest_id,
                        result,
                        respond_to,
                    });
                });
            }
            FacadeRequest::EnsureSubscription { guest_id, respond_to } => {
                if let Some(handle) = self.subscriptions.get(&guest_id) {
                    debug!(%guest_id, subscription = %handle.id, "Already subscribed");
                    let _ = respond_to.send(Ok(()));
                    return;
                }
                self.open_subscription(guest_id, respond_to, store);
            }
            FacadeRequest::TeardownSubscription { guest_id, respond_to } => {
                self.teardown(guest_id, respond_to, store);
            }
            FacadeRequest::Clear { guest_id, respond_to } => {
                if self.book.remove(&guest_id).is_some() {
                    self.publish();
                }
                info!(%guest_id, size = self.book.len(), "Cleared");
                self.teardown(guest_id, respond_to, store);
            }
            FacadeRequest::Stats { respond_to } => {
                if self.work.is_empty() {
                    let _ = respond_to.send(Ok(self.stats()));
                } else {
                    self.deferred_stats.push(respond_to);
                }
            }
            FacadeRequest::Close { respond_to } => {
                info!(in_flight = self.work.len(), "Close requested");
                self.receiver.close();
                self.close_waiters.push(respond_to);
            }
        }
    }

    fn open_subscription<S: OrderStore>(
        &mut self,
        guest_id: GuestId,
        respond_to: Response<()>,
        store: &Arc<S>,
    ) {
        self.next_subscription += 1;
        let subscription = SubscriptionId(self.next_subscription);
        let guard = self.begin(&guest_id);
        if let Some(work) = self.work.get_mut(&guest_id) {
            work.opening = Some(subscription);
        }

        let sink = StatusSink::new(subscription, guest_id.clone(), self.events_tx.clone());
        let store = Arc::clone(store);
        let limit = self.call_timeout;
        self.calls.spawn(async move {
            let mut call = store.subscribe_to_guest_order_updates(&guest_id, sink);
            match tokio::time::timeout(limit, &mut call).await {
                Ok(result) => guard.report(Completion::Subscribed {
                    guest_id: guest_id.clone(),
                    result: result.map_err(FacadeError::from),
                    respond_to,
                }),
                Err(_) => {
                    guard.report(Completion::Subscribed {
                        guest_id: guest_id.clone(),
                        result: Err(FacadeError::Timeout(limit)),
                        respond_to,
                    });
                    // The store may still open the feed; close it once it does
                    if let Ok(handle) = call.await {
                        warn!(%guest_id, subscription = %handle.id, "Closing subscription that opened after timeout");
                        store.unsubscribe(handle).await;
                    }
                }
            }
        });
    }

    fn teardown<S: OrderStore>(
        &mut self,
        guest_id: GuestId,
        respond_to: Response<()>,
        store: &Arc<S>,
    ) {
        let Some(handle) = self.subscriptions.remove(&guest_id) else {
            debug!(%guest_id, "No subscription to tear down");
            let _ = respond_to.send(Ok(()));
            return;
        };

        info!(%guest_id, subscription = %handle.id, "Unsubscribing");
        let guard = self.begin(&guest_id);
        let store = Arc::clone(store);
        self.calls.spawn(async move {
            store.unsubscribe(handle).await;
            guard.report(Completion::Unsubscribed {
                guest_id,
                respond_to,
            });
        });
    }

    /// Marks the guest busy until the returned guard reports.
    fn begin(&mut self, guest_id: &GuestId) -> CallGuard {
        self.work.entry(guest_id.clone()).or_default();
        CallGuard {
            guest_id: guest_id.clone(),
            done: self.completions_tx.clone(),
            reported: false,
        }
    }

    fn complete<S: OrderStore>(&mut self, done: Completion, store: &Arc<S>) {
        let guest_id = match done {
            Completion::Loaded {
                guest_id,
                result,
                respond_to,
            } => {
                let result = result.map(|orders| self.replace_loaded(&guest_id, orders));
                match &result {
                    Ok(size) => info!(%guest_id, size, "Loaded"),
                    Err(e) => warn!(%guest_id, error = %e, "Load failed"),
                }
                let _ = respond_to.send(result);
                guest_id
            }
            Completion::Subscribed {
                guest_id,
                result,
                respond_to,
            } => {
                let result = result.map(|handle| {
                    info!(%guest_id, subscription = %handle.id, channel = %handle.channel, "Subscribed");
                    self.subscriptions.insert(guest_id.clone(), handle);
                });
                if let Err(e) = &result {
                    warn!(%guest_id, error = %e, "Subscribe failed");
                }
                let _ = respond_to.send(result);
                guest_id
            }
            Completion::Unsubscribed {
                guest_id,
                respond_to,
            } => {
                let _ = respond_to.send(Ok(()));
                guest_id
            }
            Completion::Aborted { guest_id } => {
                error!(%guest_id, "Store call ended without a result");
                guest_id
            }
        };
        self.release(&guest_id, store);
    }

    fn replace_loaded(&mut self, guest_id: &GuestId, orders: Vec<OrderWithDetails>) -> usize {
        let size = orders.len();
        self.book.replace(guest_id.clone(), orders);

        let replay = self
            .work
            .get_mut(guest_id)
            .map(|work| std::mem::take(&mut work.replay))
            .unwrap_or_default();
        for change in &replay {
            self.book.apply_status_change(guest_id, change);
        }
        if !replay.is_empty() {
            debug!(%guest_id, replayed = replay.len(), "Replayed status changes over fresh load");
        }

        self.publish();
        size
    }

    /// The guest's call is over: start its next waiting request, if any.
    fn release<S: OrderStore>(&mut self, guest_id: &GuestId, store: &Arc<S>) {
        let Some(mut finished) = self.work.remove(guest_id) else {
            return;
        };
        while let Some(msg) = finished.waiting.pop_front() {
            self.start(msg, store);
            if let Some(next) = self.work.get_mut(guest_id) {
                next.waiting = std::mem::take(&mut finished.waiting);
                break;
            }
        }

        if self.work.is_empty() && !self.deferred_stats.is_empty() {
            let stats = self.stats();
            for respond_to in self.deferred_stats.drain(..) {
                let _ = respond_to.send(Ok(stats));
            }
        }
    }

    fn apply_event(&mut self, event: StatusEvent) {
        let StatusEvent {
            subscription,
            guest_id,
            change,
        } = event;

        let current = self.subscriptions.get(&guest_id).map(|handle| handle.id);
        let opening = self.work.get(&guest_id).and_then(|work| work.opening);
        if current != Some(subscription) && opening != Some(subscription) {
            debug!(%guest_id, %subscription, "Dropped event from closed subscription");
            return;
        }

        if let Some(work) = self.work.get_mut(&guest_id) {
            work.replay.push(change.clone());
        }

        match self.book.apply_status_change(&guest_id, &change) {
            PatchOutcome::Applied => {
                info!(%guest_id, order_id = %change.order_id, status = %change.status, "Status changed");
                self.publish();
            }
            outcome => {
                debug!(%guest_id, order_id = %change.order_id, ?outcome, "Status change ignored");
            }
        }
    }

    fn stats(&self) -> FacadeStats {
        FacadeStats {
            cached_guests: self.book.len(),
            active_subscriptions: self.subscriptions.len(),
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(Arc::new(self.book.clone()));
    }
}

fn log_joined(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Store call task failed");
    }
}
