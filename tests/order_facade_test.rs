//! Real order cache with a mocked store.
//!
//! Pattern 2: Actor + Mocks
//! - Real cache task (tests bookkeeping and ordering)
//! - Mocked store (scripted fetch and subscribe results, hand-driven live feed)

use chrono::Utc;
use pour_decisions::clients::OrderFacadeClient;
use pour_decisions::config::FacadeConfig;
use pour_decisions::model::{
    Drink, GuestId, GuestSummary, Order, OrderId, OrderStatus, OrderStatusChange,
    OrderWithDetails,
};
use pour_decisions::order_facade::{FacadeError, FacadeStats};
use pour_decisions::store::{MockOrderStore, StoreError};
use std::time::Duration;
use tokio::task::JoinHandle;

fn row(id: &str, guest: &str, status: OrderStatus) -> OrderWithDetails {
    let order = Order {
        id: OrderId::from(id),
        guest_id: GuestId::from(guest),
        drink_id: "drink_1".to_string(),
        room_id: "room_1".to_string(),
        status,
        created_at: Utc::now(),
        notes: None,
    };
    OrderWithDetails::new(
        order,
        GuestSummary::new("Ada"),
        Drink::new("drink_1", "Mojito", "room_1"),
    )
}

fn spawn_cache(store: &MockOrderStore) -> (OrderFacadeClient, JoinHandle<()>) {
    spawn_cache_with(store, FacadeConfig::default())
}

fn spawn_cache_with(
    store: &MockOrderStore,
    config: FacadeConfig,
) -> (OrderFacadeClient, JoinHandle<()>) {
    let (actor, client) = pour_decisions::order_facade::new(&config);
    let handle = tokio::spawn(actor.run(store.clone()));
    (client, handle)
}

fn stats(cached_guests: usize, active_subscriptions: usize) -> FacadeStats {
    FacadeStats {
        cached_guests,
        active_subscriptions,
    }
}

#[tokio::test]
async fn test_load_then_get_returns_fetched_orders() {
    let store = MockOrderStore::new();
    let fetched = vec![row("o2", "g1", OrderStatus::Queued), row("o1", "g1", OrderStatus::Ready)];
    store.expect_fetch("g1").return_ok(fetched.clone());

    let (client, _handle) = spawn_cache(&store);
    let guest = GuestId::from("g1");

    assert_eq!(client.load_orders_for_guest(&guest).await, Ok(2));
    assert_eq!(client.get_orders_for_guest(&guest), fetched);
    store.verify();
}

#[tokio::test]
async fn test_get_for_unknown_guest_is_empty_and_calls_nothing() {
    let store = MockOrderStore::new();
    let (client, _handle) = spawn_cache(&store);

    assert!(client.get_orders_for_guest(&GuestId::from("nobody")).is_empty());
    assert_eq!(client.stats().await, Ok(stats(0, 0)));
    store.verify();
}

#[tokio::test]
async fn test_loaded_guest_with_no_orders_still_has_an_entry() {
    let store = MockOrderStore::new();
    store.expect_fetch("g1").return_ok(vec![]);
    let (client, _handle) = spawn_cache(&store);

    assert_eq!(client.load_orders_for_guest(&GuestId::from("g1")).await, Ok(0));
    assert_eq!(client.stats().await, Ok(stats(1, 0)));
}

#[tokio::test]
async fn test_failed_load_keeps_previous_entry() {
    let store = MockOrderStore::new();
    let first = vec![row("o1", "g1", OrderStatus::Queued)];
    store.expect_fetch("g1").return_ok(first.clone());
    store
        .expect_fetch("g1")
        .return_err(StoreError::Network("connection reset".to_string()));

    let (client, _handle) = spawn_cache(&store);
    let guest = GuestId::from("g1");

    client.load_orders_for_guest(&guest).await.unwrap();
    let result = client.load_orders_for_guest(&guest).await;

    assert_eq!(
        result,
        Err(FacadeError::Store(StoreError::Network("connection reset".to_string())))
    );
    assert_eq!(client.get_orders_for_guest(&guest), first);
    store.verify();
}

#[tokio::test]
async fn test_failed_first_load_creates_no_entry() {
    let store = MockOrderStore::new();
    store
        .expect_fetch("g1")
        .return_err(StoreError::Unauthorized("no session".to_string()));

    let (client, _handle) = spawn_cache(&store);

    assert!(client.load_orders_for_guest(&GuestId::from("g1")).await.is_err());
    assert_eq!(client.stats().await, Ok(stats(0, 0)));
}

#[tokio::test]
async fn test_ensure_twice_subscribes_once() {
    let store = MockOrderStore::new();
    store.expect_subscribe("g1").return_ok();

    let (client, _handle) = spawn_cache(&store);
    let guest = GuestId::from("g1");

    client.ensure_guest_subscription(&guest).await.unwrap();
    client.ensure_guest_subscription(&guest).await.unwrap();

    assert_eq!(store.subscribe_count(), 1);
    assert_eq!(client.stats().await, Ok(stats(0, 1)));
    store.verify();
}

#[tokio::test]
async fn test_failed_subscribe_can_be_retried() {
    let store = MockOrderStore::new();
    store
        .expect_subscribe("g1")
        .return_err(StoreError::Rejected("channel limit".to_string()));
    store.expect_subscribe("g1").return_ok();

    let (client, _handle) = spawn_cache(&store);
    let guest = GuestId::from("g1");

    assert!(matches!(
        client.ensure_guest_subscription(&guest).await,
        Err(FacadeError::Store(StoreError::Rejected(_)))
    ));
    assert_eq!(client.stats().await, Ok(stats(0, 0)));

    client.ensure_guest_subscription(&guest).await.unwrap();
    assert_eq!(client.stats().await, Ok(stats(0, 1)));
    store.verify();
}

#[tokio::test]
async fn test_live_update_patches_only_the_status() {
    let store = MockOrderStore::new();
    let fetched = vec![row("o1", "g1", OrderStatus::Queued), row("o2", "g1", OrderStatus::Queued)];
    store.expect_fetch("g1").return_ok(fetched.clone());
    store.expect_subscribe("g1").return_ok();

    let (client, _handle) = spawn_cache(&store);
    let guest = GuestId::from("g1");
    client.load_orders_for_guest(&guest).await.unwrap();
    client.ensure_guest_subscription(&guest).await.unwrap();

    let sink = store.sink_for("g1").expect("subscription opened");
    sink.push(OrderStatusChange::new("o1", OrderStatus::Ready));
    client.stats().await.unwrap();

    let orders = client.get_orders_for_guest(&guest);
    let mut expected = fetched;
    expected[0].order.status = OrderStatus::Ready;
    assert_eq!(orders, expected);
}

#[tokio::test]
async fn test_same_update_twice_is_idempotent() {
    let store = MockOrderStore::new();
    store
        .expect_fetch("g1")
        .return_ok(vec![row("o1", "g1", OrderStatus::Ready)]);
    store.expect_subscribe("g1").return_ok();

    let (client, _handle) = spawn_cache(&store);
    let guest = GuestId::from("g1");
    client.load_orders_for_guest(&guest).await.unwrap();
    client.ensure_guest_subscription(&guest).await.unwrap();

    let sink = store.sink_for("g1").unwrap();
    sink.push(OrderStatusChange::new("o1", OrderStatus::Served));
    client.stats().await.unwrap();
    let once = client.get_orders_for_guest(&guest);

    sink.push(OrderStatusChange::new("o1", OrderStatus::Served));
    client.stats().await.unwrap();
    assert_eq!(client.get_orders_for_guest(&guest), once);
}

#[tokio::test]
async fn test_update_for_unloaded_guest_creates_no_entry() {
    let store = MockOrderStore::new();
    store.expect_subscribe("g1").return_ok();

    let (client, _handle) = spawn_cache(&store);
    let guest = GuestId::from("g1");
    client.ensure_guest_subscription(&guest).await.unwrap();

    store
        .sink_for("g1")
        .unwrap()
        .push(OrderStatusChange::new("o1", OrderStatus::Ready));

    assert_eq!(client.stats().await, Ok(stats(0, 1)));
    assert!(client.get_orders_for_guest(&guest).is_empty());
}

#[tokio::test]
async fn test_update_for_unknown_order_changes_nothing() {
    let store = MockOrderStore::new();
    let fetched = vec![row("o1", "g1", OrderStatus::Queued)];
    store.expect_fetch("g1").return_ok(fetched.clone());
    store.expect_subscribe("g1").return_ok();

    let (client, _handle) = spawn_cache(&store);
    let guest = GuestId::from("g1");
    client.load_orders_for_guest(&guest).await.unwrap();
    client.ensure_guest_subscription(&guest).await.unwrap();

    store
        .sink_for("g1")
        .unwrap()
        .push(OrderStatusChange::new("o99", OrderStatus::Ready));
    client.stats().await.unwrap();

    assert_eq!(client.get_orders_for_guest(&guest), fetched);
}

#[tokio::test]
async fn test_teardown_keeps_orders_and_stops_updates() {
    let store = MockOrderStore::new();
    let fetched = vec![row("o1", "g1", OrderStatus::Queued)];
    store.expect_fetch("g1").return_ok(fetched.clone());
    store.expect_subscribe("g1").return_ok();

    let (client, _handle) = spawn_cache(&store);
    let guest = GuestId::from("g1");
    client.load_orders_for_guest(&guest).await.unwrap();
    client.ensure_guest_subscription(&guest).await.unwrap();
    let sink = store.sink_for("g1").unwrap();

    client.teardown_guest_subscription(&guest).await.unwrap();
    assert_eq!(store.unsubscribed().len(), 1);

    // A straggler from the closed feed
    sink.push(OrderStatusChange::new("o1", OrderStatus::Ready));
    assert_eq!(client.stats().await, Ok(stats(1, 0)));
    assert_eq!(client.get_orders_for_guest(&guest), fetched);

    // Nothing left to close
    client.teardown_guest_subscription(&guest).await.unwrap();
    assert_eq!(store.unsubscribed().len(), 1);
}

#[tokio::test]
async fn test_resubscribe_ignores_the_old_feed() {
    let store = MockOrderStore::new();
    store
        .expect_fetch("g1")
        .return_ok(vec![row("o1", "g1", OrderStatus::Queued)]);
    store.expect_subscribe("g1").return_ok();
    store.expect_subscribe("g1").return_ok();

    let (client, _handle) = spawn_cache(&store);
    let guest = GuestId::from("g1");
    client.load_orders_for_guest(&guest).await.unwrap();

    client.ensure_guest_subscription(&guest).await.unwrap();
    let old_sink = store.sink_for("g1").unwrap();
    client.teardown_guest_subscription(&guest).await.unwrap();
    client.ensure_guest_subscription(&guest).await.unwrap();
    let new_sink = store.sink_for("g1").unwrap();
    assert_ne!(old_sink.subscription(), new_sink.subscription());

    old_sink.push(OrderStatusChange::new("o1", OrderStatus::Cancelled));
    client.stats().await.unwrap();
    assert_eq!(client.get_orders_for_guest(&guest)[0].status(), OrderStatus::Queued);

    new_sink.push(OrderStatusChange::new("o1", OrderStatus::InProgress));
    client.stats().await.unwrap();
    assert_eq!(client.get_orders_for_guest(&guest)[0].status(), OrderStatus::InProgress);
    store.verify();
}

#[tokio::test]
async fn test_clear_removes_entry_and_subscription() {
    let store = MockOrderStore::new();
    store
        .expect_fetch("g1")
        .return_ok(vec![row("o1", "g1", OrderStatus::Queued)]);
    store.expect_subscribe("g1").return_ok();

    let (client, _handle) = spawn_cache(&store);
    let guest = GuestId::from("g1");
    client.load_orders_for_guest(&guest).await.unwrap();
    client.ensure_guest_subscription(&guest).await.unwrap();

    client.clear_guest_orders(&guest).await.unwrap();
    assert!(client.get_orders_for_guest(&guest).is_empty());
    assert_eq!(client.stats().await, Ok(stats(0, 0)));
    assert_eq!(store.unsubscribed().len(), 1);

    // Clearing again is harmless
    client.clear_guest_orders(&guest).await.unwrap();
    assert_eq!(store.unsubscribed().len(), 1);
}

#[tokio::test]
async fn test_clear_leaves_other_guests_alone() {
    let store = MockOrderStore::new();
    store
        .expect_fetch("g1")
        .return_ok(vec![row("o1", "g1", OrderStatus::Queued)]);
    store
        .expect_fetch("g2")
        .return_ok(vec![row("o2", "g2", OrderStatus::Queued)]);

    let (client, _handle) = spawn_cache(&store);
    client.load_orders_for_guest(&GuestId::from("g1")).await.unwrap();
    client.load_orders_for_guest(&GuestId::from("g2")).await.unwrap();

    client.clear_guest_orders(&GuestId::from("g1")).await.unwrap();
    assert_eq!(client.get_orders_for_guest(&GuestId::from("g2")).len(), 1);
    assert_eq!(client.stats().await, Ok(stats(1, 0)));
}

#[tokio::test]
async fn test_update_during_reload_lands_on_the_fresh_list() {
    let store = MockOrderStore::new();
    store
        .expect_fetch("g1")
        .return_ok(vec![row("o1", "g1", OrderStatus::Queued)]);
    store.expect_subscribe("g1").return_ok();
    store
        .expect_fetch("g1")
        .after(Duration::from_millis(50))
        .return_ok(vec![row("o1", "g1", OrderStatus::Queued)]);

    let (client, _handle) = spawn_cache(&store);
    let guest = GuestId::from("g1");
    client.load_orders_for_guest(&guest).await.unwrap();
    client.ensure_guest_subscription(&guest).await.unwrap();

    let reload = {
        let client = client.clone();
        let guest = guest.clone();
        tokio::spawn(async move { client.load_orders_for_guest(&guest).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    store
        .sink_for("g1")
        .unwrap()
        .push(OrderStatusChange::new("o1", OrderStatus::Ready));
    reload.await.unwrap().unwrap();
    client.stats().await.unwrap();

    assert_eq!(client.get_orders_for_guest(&guest)[0].status(), OrderStatus::Ready);
    store.verify();
}

#[tokio::test]
async fn test_slow_fetch_times_out_without_touching_the_cache() {
    let store = MockOrderStore::new();
    store
        .expect_fetch("g1")
        .after(Duration::from_millis(500))
        .return_ok(vec![row("o1", "g1", OrderStatus::Queued)]);

    let config = FacadeConfig {
        call_timeout: Duration::from_millis(20),
        ..FacadeConfig::default()
    };
    let (client, _handle) = spawn_cache_with(&store, config);

    assert_eq!(
        client.load_orders_for_guest(&GuestId::from("g1")).await,
        Err(FacadeError::Timeout(Duration::from_millis(20)))
    );
    assert_eq!(client.stats().await, Ok(stats(0, 0)));
}

#[tokio::test]
async fn test_abandoned_load_still_completes() {
    let store = MockOrderStore::new();
    let fetched = vec![row("o1", "g1", OrderStatus::Queued)];
    store
        .expect_fetch("g1")
        .after(Duration::from_millis(30))
        .return_ok(fetched.clone());

    let (client, _handle) = spawn_cache(&store);
    let guest = GuestId::from("g1");

    let abandoned =
        tokio::time::timeout(Duration::from_millis(5), client.load_orders_for_guest(&guest)).await;
    assert!(abandoned.is_err());

    // Queued behind the load, so it answers after the write
    assert_eq!(client.stats().await, Ok(stats(1, 0)));
    assert_eq!(client.get_orders_for_guest(&guest), fetched);
}

#[tokio::test]
async fn test_blank_guest_id_is_rejected_before_the_store() {
    let store = MockOrderStore::new();
    let (client, _handle) = spawn_cache(&store);
    let blank = GuestId::from("  ");

    assert_eq!(
        client.load_orders_for_guest(&blank).await,
        Err(FacadeError::InvalidGuestId)
    );
    assert_eq!(
        client.ensure_guest_subscription(&blank).await,
        Err(FacadeError::InvalidGuestId)
    );
    store.verify();
}

#[tokio::test]
async fn test_change_receiver_sees_loads() {
    let store = MockOrderStore::new();
    store
        .expect_fetch("g1")
        .return_ok(vec![row("o1", "g1", OrderStatus::Queued)]);

    let (client, _handle) = spawn_cache(&store);
    let mut changes = client.subscribe_changes();
    assert!(!changes.has_changed().unwrap());

    client.load_orders_for_guest(&GuestId::from("g1")).await.unwrap();
    changes.changed().await.unwrap();
    assert_eq!(changes.borrow().orders_for(&GuestId::from("g1")).len(), 1);
}

#[tokio::test]
async fn test_stopping_the_cache_closes_open_subscriptions() {
    let store = MockOrderStore::new();
    store.expect_subscribe("g1").return_ok();
    store.expect_subscribe("g2").return_ok();

    let (client, handle) = spawn_cache(&store);
    client.ensure_guest_subscription(&GuestId::from("g1")).await.unwrap();
    client.ensure_guest_subscription(&GuestId::from("g2")).await.unwrap();

    drop(client);
    handle.await.unwrap();

    let mut closed: Vec<_> = store
        .unsubscribed()
        .into_iter()
        .map(|h| h.guest_id)
        .collect();
    closed.sort();
    assert_eq!(closed, vec![GuestId::from("g1"), GuestId::from("g2")]);
}

#[tokio::test]
async fn test_calls_fail_once_the_cache_is_gone() {
    let (actor, client) = pour_decisions::order_facade::new(&FacadeConfig::default());
    drop(actor);

    assert_eq!(
        client.load_orders_for_guest(&GuestId::from("g1")).await,
        Err(FacadeError::ActorClosed)
    );
    assert_eq!(client.stats().await, Err(FacadeError::ActorClosed));
}

#[tokio::test]
async fn test_slow_fetch_for_one_guest_does_not_hold_up_another() {
    let store = MockOrderStore::new();
    store
        .expect_fetch("b")
        .return_ok(vec![row("o1", "b", OrderStatus::Queued)]);
    store.expect_subscribe("b").return_ok();
    store
        .expect_fetch("slow")
        .after(Duration::from_millis(500))
        .return_ok(vec![]);

    let (client, _handle) = spawn_cache(&store);
    let b = GuestId::from("b");
    client.load_orders_for_guest(&b).await.unwrap();
    client.ensure_guest_subscription(&b).await.unwrap();

    let slow_load = {
        let client = client.clone();
        tokio::spawn(async move { client.load_orders_for_guest(&GuestId::from("slow")).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let mut changes = client.subscribe_changes();
    store
        .sink_for("b")
        .unwrap()
        .push(OrderStatusChange::new("o1", OrderStatus::Ready));
    tokio::time::timeout(Duration::from_millis(100), changes.changed())
        .await
        .expect("status change applied while the other fetch runs")
        .unwrap();
    assert_eq!(client.get_orders_for_guest(&b)[0].status(), OrderStatus::Ready);

    tokio::time::timeout(Duration::from_millis(100), client.clear_guest_orders(&b))
        .await
        .expect("clear answered while the other fetch runs")
        .unwrap();
    assert!(client.get_orders_for_guest(&b).is_empty());

    assert_eq!(slow_load.await.unwrap(), Ok(0));
    assert_eq!(client.stats().await, Ok(stats(1, 0)));
    store.verify();
}

#[tokio::test]
async fn test_requests_for_one_guest_wait_for_its_call_in_flight() {
    let store = MockOrderStore::new();
    store
        .expect_fetch("g1")
        .after(Duration::from_millis(50))
        .return_ok(vec![row("o1", "g1", OrderStatus::Queued)]);

    let (client, _handle) = spawn_cache(&store);
    let guest = GuestId::from("g1");

    let load = {
        let client = client.clone();
        let guest = guest.clone();
        tokio::spawn(async move { client.load_orders_for_guest(&guest).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;

    // Runs after the load lands, so the fetched list does not survive it
    client.clear_guest_orders(&guest).await.unwrap();
    assert_eq!(load.await.unwrap(), Ok(1));
    assert!(client.get_orders_for_guest(&guest).is_empty());
    assert_eq!(client.stats().await, Ok(stats(0, 0)));
}

#[tokio::test]
async fn test_subscription_that_opens_after_timeout_is_closed() {
    let store = MockOrderStore::new();
    store
        .expect_subscribe("g1")
        .after(Duration::from_millis(200))
        .return_ok();

    let config = FacadeConfig {
        call_timeout: Duration::from_millis(50),
        ..FacadeConfig::default()
    };
    let (client, handle) = spawn_cache_with(&store, config);

    assert_eq!(
        client.ensure_guest_subscription(&GuestId::from("g1")).await,
        Err(FacadeError::Timeout(Duration::from_millis(50)))
    );
    assert_eq!(client.stats().await, Ok(stats(0, 0)));

    client.close().await.unwrap();
    handle.await.unwrap();

    assert_eq!(store.subscribe_count(), 1);
    assert_eq!(store.unsubscribed().len(), store.subscribe_count());
    store.verify();
}

#[tokio::test]
async fn test_close_stops_the_cache_while_clones_are_alive() {
    let store = MockOrderStore::new();
    store.expect_subscribe("g1").return_ok();

    let (client, handle) = spawn_cache(&store);
    let clone = client.clone();
    client.ensure_guest_subscription(&GuestId::from("g1")).await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), client.close())
        .await
        .expect("close answered with a clone still alive")
        .unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("cache task exited")
        .unwrap();

    assert_eq!(store.unsubscribed().len(), 1);
    assert_eq!(clone.stats().await, Err(FacadeError::ActorClosed));
    assert_eq!(
        clone.load_orders_for_guest(&GuestId::from("g1")).await,
        Err(FacadeError::ActorClosed)
    );
}
