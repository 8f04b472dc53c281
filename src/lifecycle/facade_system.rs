use crate::clients::OrderFacadeClient;
use crate::config::FacadeConfig;
use crate::order_facade::FacadeError;
use crate::store::OrderStore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Owns the running order cache task.
///
/// # Example
///
/// ```ignore
/// let system = FacadeSystem::new(InMemoryOrderStore::new(), &FacadeConfig::default());
///
/// let guest = GuestId::from("guest_1");
/// system.client.open_guest_session(&guest).await?;
/// let orders = system.client.get_orders_for_guest(&guest);
///
/// system.shutdown().await?;
/// ```
pub struct FacadeSystem {
    /// Client for the order cache. Clone it freely.
    pub client: OrderFacadeClient,

    handle: JoinHandle<()>,
}

impl FacadeSystem {
    /// Spawns the order cache on the current runtime, backed by `store`.
    pub fn new<S: OrderStore>(store: S, config: &FacadeConfig) -> Self {
        let (actor, client) = crate::order_facade::new(config);
        let handle = tokio::spawn(actor.run(store));
        info!(buffer = config.buffer_size, timeout = ?config.call_timeout, "Order cache spawned");
        Self { client, handle }
    }

    /// Stops the cache and waits for it to close its open subscriptions.
    ///
    /// Clones of [`client`](Self::client) handed out elsewhere do not keep the
    /// task alive; their later calls fail with [`FacadeError::ActorClosed`].
    pub async fn shutdown(self) -> Result<(), FacadeError> {
        info!("Shutting down order cache...");
        match self.client.close().await {
            Ok(()) | Err(FacadeError::ActorClosed) => {}
            Err(e) => warn!(error = %e, "Close request went unanswered"),
        }
        drop(self.client);

        if let Err(e) = self.handle.await {
            error!("Order cache task failed: {:?}", e);
            return Err(FacadeError::TaskFailed(e.to_string()));
        }

        info!("Order cache shutdown complete.");
        Ok(())
    }
}
