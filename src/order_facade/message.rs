use crate::model::GuestId;
use crate::order_facade::FacadeError;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by the cache.
pub type Response<T> = oneshot::Sender<Result<T, FacadeError>>;

/// Counters reported by [`FacadeRequest::Stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FacadeStats {
    /// Guests with an entry in the cache, including loaded-but-empty ones.
    pub cached_guests: usize,
    /// Live subscriptions currently held.
    pub active_subscriptions: usize,
}

/// Requests handled by the order cache task.
///
/// Requests for one guest run in arrival order, each finishing before the next
/// starts. Requests for different guests do not wait on each other. Reads do not
/// go through here; they are served from the published snapshot.
#[derive(Debug)]
pub enum FacadeRequest {
    Load {
        guest_id: GuestId,
        respond_to: Response<usize>,
    },
    EnsureSubscription {
        guest_id: GuestId,
        respond_to: Response<()>,
    },
    TeardownSubscription {
        guest_id: GuestId,
        respond_to: Response<()>,
    },
    Clear {
        guest_id: GuestId,
        respond_to: Response<()>,
    },
    Stats {
        respond_to: Response<FacadeStats>,
    },
    /// Stops the cache for every client, even while clones are still alive.
    Close {
        respond_to: Response<()>,
    },
}

impl FacadeRequest {
    /// The guest a request is about, if it is about one.
    pub fn guest_id(&self) -> Option<&GuestId> {
        match self {
            FacadeRequest::Load { guest_id, .. }
            | FacadeRequest::EnsureSubscription { guest_id, .. }
            | FacadeRequest::TeardownSubscription { guest_id, .. }
            | FacadeRequest::Clear { guest_id, .. } => Some(guest_id),
            FacadeRequest::Stats { .. } | FacadeRequest::Close { .. } => None,
        }
    }
}
