//! # Logging
//!
//! [`setup_tracing`] installs a compact `tracing` subscriber filtered by `RUST_LOG`.
//!
//! ```bash
//! # Loads, subscriptions, status changes
//! RUST_LOG=info cargo run
//!
//! # Also ignored events, dropped stale events and store calls
//! RUST_LOG=debug cargo run
//! ```
//!
//! Every cache log line carries the guest as a structured field:
//!
//! ```text
//! INFO Subscribed guest_id=guest_1 subscription=sub_1 channel=guest-orders-guest_1
//! INFO Loaded guest_id=guest_1 size=2
//! INFO Status changed guest_id=guest_1 order_id=order_1 status=ready
//! DEBUG Dropped event from closed subscription guest_id=guest_1 subscription=sub_1
//! ```
//!
//! On the caller side, client calls run inside spans named after the method, e.g.
//! `load_orders_for_guest{guest_id=GuestId("guest_1")}`.

/// Installs the global subscriber. Calling it again is a no-op.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
