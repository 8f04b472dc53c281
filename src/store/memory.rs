//! # In-Memory Order Store
//!
//! A complete [`OrderStore`] that keeps rows in process. It stands in for the hosted
//! backend in the demo binary and the full-system tests: orders can be placed and
//! moved through their lifecycle, and every status change is pushed to the live
//! feeds of the guest who owns the order.

use crate::model::{
    Drink, GuestId, GuestSummary, MediaResolver, Order, OrderCreate, OrderId, OrderStatus,
    OrderStatusChange, OrderWithDetails, Room, RoomCode,
};
use crate::store::{OrderStore, StatusSink, StoreError, SubscriptionHandle, SubscriptionId};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

#[derive(Default)]
struct StoreState {
    /// Rows in placement order.
    orders: Vec<OrderWithDetails>,
    guests: HashMap<GuestId, GuestSummary>,
    drinks: HashMap<String, Drink>,
    sinks: HashMap<SubscriptionId, StatusSink>,
    rooms: HashMap<RoomCode, Room>,
    next_order: u32,
    next_room: u32,
    queued_failures: VecDeque<StoreError>,
}

/// In-process order store with a working live feed.
#[derive(Default)]
pub struct InMemoryOrderStore {
    state: Mutex<StoreState>,
    media: Option<MediaResolver>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves drink images and guest avatars on every fetch, like the hosted read path.
    pub fn with_media(mut self, media: MediaResolver) -> Self {
        self.media = Some(media);
        self
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_guest(&self, guest_id: impl Into<GuestId>, guest: GuestSummary) {
        self.state().guests.insert(guest_id.into(), guest);
    }

    pub fn add_drink(&self, drink: Drink) {
        self.state().drinks.insert(drink.id.clone(), drink);
    }

    /// Opens a room under a fresh code no other room holds.
    pub fn create_room(&self, name: impl Into<String>) -> Room {
        let mut state = self.state();
        let code = loop {
            let code = RoomCode::generate();
            if !state.rooms.contains_key(&code) {
                break code;
            }
        };
        state.next_room += 1;
        let room = Room {
            id: format!("room_{}", state.next_room),
            code: code.clone(),
            name: name.into(),
        };
        state.rooms.insert(code, room.clone());
        info!(room_id = %room.id, code = %room.code, "Room created");
        room
    }

    /// The room a guest joins by typing `code`. Case is ignored.
    pub fn room_by_code(&self, code: &str) -> Result<Room, StoreError> {
        let not_found = || StoreError::NotFound(format!("Room with code {code} not found"));
        let parsed = RoomCode::parse(code).map_err(|_| not_found())?;
        self.state().rooms.get(&parsed).cloned().ok_or_else(not_found)
    }

    /// Places a new order. It starts out `queued`.
    pub fn place_order(&self, params: OrderCreate) -> Result<OrderId, StoreError> {
        let mut state = self.state();
        let guest = state
            .guests
            .get(&params.guest_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("guest {}", params.guest_id)))?;
        let drink = state
            .drinks
            .get(&params.drink_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("drink {}", params.drink_id)))?;
        if drink.room_id != params.room_id {
            return Err(StoreError::Rejected(format!(
                "drink {} is not on the menu of room {}",
                drink.id, params.room_id
            )));
        }

        state.next_order += 1;
        let id = OrderId(format!("order_{}", state.next_order));
        let order = Order {
            id: id.clone(),
            guest_id: params.guest_id,
            drink_id: params.drink_id,
            room_id: params.room_id,
            status: OrderStatus::Queued,
            created_at: Utc::now(),
            notes: params.notes,
        };
        state.orders.push(OrderWithDetails::new(order, guest, drink));
        info!(order_id = %id, size = state.orders.len(), "Order placed");
        Ok(id)
    }

    /// Moves an order to a new status and notifies the owning guest's live feeds.
    pub fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let row = state
            .orders
            .iter_mut()
            .find(|o| o.id() == order_id)
            .ok_or_else(|| StoreError::NotFound(format!("order {order_id}")))?;
        row.order.status = status;
        let guest_id = row.guest_id().clone();

        let change = OrderStatusChange::new(order_id.clone(), status);
        state.sinks.retain(|_, sink| {
            sink.guest_id() != &guest_id || sink.push(change.clone())
        });
        info!(%order_id, %status, "Order status updated");
        Ok(())
    }

    /// All orders of a room, oldest first.
    pub fn orders_for_room(&self, room_id: &str) -> Vec<OrderWithDetails> {
        let state = self.state();
        state
            .orders
            .iter()
            .filter(|o| o.order.room_id == room_id)
            .map(|o| self.resolved(o.clone()))
            .collect()
    }

    /// Makes the next fetch fail with `error`. Queued failures are consumed in order.
    pub fn fail_next_fetch(&self, error: StoreError) {
        self.state().queued_failures.push_back(error);
    }

    pub fn open_subscriptions(&self) -> usize {
        self.state().sinks.len()
    }

    fn resolved(&self, mut details: OrderWithDetails) -> OrderWithDetails {
        if let Some(media) = &self.media {
            media.resolve(&mut details);
        }
        details
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn fetch_orders_for_guest(
        &self,
        guest_id: &GuestId,
    ) -> Result<Vec<OrderWithDetails>, StoreError> {
        let mut state = self.state();
        if let Some(error) = state.queued_failures.pop_front() {
            debug!(%guest_id, %error, "Injected fetch failure");
            return Err(error);
        }

        // Newest first
        let orders: Vec<_> = state
            .orders
            .iter()
            .rev()
            .filter(|o| o.guest_id() == guest_id)
            .cloned()
            .collect();
        drop(state);

        debug!(%guest_id, size = orders.len(), "Fetched guest orders");
        Ok(orders.into_iter().map(|o| self.resolved(o)).collect())
    }

    async fn subscribe_to_guest_order_updates(
        &self,
        guest_id: &GuestId,
        sink: StatusSink,
    ) -> Result<SubscriptionHandle, StoreError> {
        let handle = SubscriptionHandle::for_sink(&sink);
        let mut state = self.state();
        state.sinks.insert(sink.subscription(), sink);
        info!(%guest_id, channel = %handle.channel, open = state.sinks.len(), "Subscribed");
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut state = self.state();
        let removed = state.sinks.remove(&handle.id).is_some();
        info!(guest_id = %handle.guest_id, channel = %handle.channel, removed, "Unsubscribed");
    }
}
