//! Demo: one guest orders two drinks and watches the bar work through them.
//!
//! Runs entirely in process against [`InMemoryOrderStore`].

use pour_decisions::config::FacadeConfig;
use pour_decisions::lifecycle::{setup_tracing, FacadeSystem};
use pour_decisions::model::{Drink, GuestId, GuestSummary, MediaResolver, OrderCreate, OrderStatus};
use pour_decisions::room_board::RoomOrderBoard;
use pour_decisions::store::InMemoryOrderStore;
use std::sync::Arc;
use tracing::{info, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    let config = FacadeConfig::load()?;
    info!(storage_url = %config.storage_url, "Starting order cache demo");

    let store = Arc::new(
        InMemoryOrderStore::new().with_media(MediaResolver::new(config.storage_url.clone())),
    );
    let opened = store.create_room("Friday Cocktails");
    info!(room_id = %opened.id, code = %opened.code, "Room open");

    // The guest types the code however they like
    let room = store.room_by_code(&opened.code.as_str().to_lowercase())?;
    store.register_guest("guest_1", GuestSummary::new("Ada Lovelace"));
    let mut mojito = Drink::new("drink_1", "Mojito", room.id.clone());
    mojito.image_path = Some("drinks/mojito.png".to_string());
    store.add_drink(mojito);
    store.add_drink(Drink::new("drink_2", "Lager", room.id.clone()));

    let system = FacadeSystem::new(store.clone(), &config);
    let guest = GuestId::from("guest_1");

    let first = store.place_order(OrderCreate {
        guest_id: guest.clone(),
        drink_id: "drink_1".to_string(),
        room_id: room.id.clone(),
        notes: Some("extra mint".to_string()),
    })?;

    let span = tracing::info_span!("guest_session");
    let loaded = async {
        info!("Opening guest session");
        system.client.open_guest_session(&guest).await
    }
    .instrument(span)
    .await?;
    info!(%guest, loaded, "Guest session open");

    // Placed after the load: the guest sees it on the next reload, not before
    let second = store.place_order(OrderCreate {
        guest_id: guest.clone(),
        drink_id: "drink_2".to_string(),
        room_id: room.id.clone(),
        notes: None,
    })?;

    let mut changes = system.client.subscribe_changes();
    for status in [OrderStatus::InProgress, OrderStatus::Ready] {
        store.update_order_status(&first, status)?;
        changes.changed().await?;
    }
    store.update_order_status(&second, OrderStatus::InProgress)?;
    system.client.stats().await?;

    for row in system.client.get_orders_for_guest(&guest) {
        info!(order_id = %row.id(), drink = %row.drink.name, status = %row.status(), image = ?row.drink.image_url, "Cached order");
    }

    system.client.load_orders_for_guest(&guest).await?;
    let cached = system.client.get_orders_for_guest(&guest);
    info!(%guest, size = cached.len(), "Reloaded");

    let mut board = RoomOrderBoard::new(room.id.clone());
    board.replace(store.orders_for_room(&room.id));
    for stat in board.guest_stats() {
        info!(guest = %stat.name, count = stat.count, active = board.active_orders().len(), "Room board");
    }

    system.client.clear_guest_orders(&guest).await?;
    let stats = system.client.stats().await?;
    info!(cached_guests = stats.cached_guests, subscriptions = stats.active_subscriptions, "Guest left");

    system.shutdown().await?;
    info!("Demo completed successfully");
    Ok(())
}
