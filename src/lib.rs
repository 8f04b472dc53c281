//! # Pour Decisions
//!
//! > **Guest order cache for a drinks-ordering room.**
//!
//! Guests order drinks from a room's menu and watch those orders move through
//! `queued → in-progress → ready → served`. This crate keeps each guest's orders
//! in memory, patches them as live status changes arrive, and serves reads
//! without touching the backend.
//!
//! ## 🏗️ Design
//!
//! ### One owner, many readers
//! The cache is a single Tokio task ([`order_facade::OrderFacadeActor`]). Requests,
//! live events and finished store calls are handled one at a time in that task, so
//! its state needs no locks. Store calls themselves run on spawned tasks, one at a
//! time per guest, so a slow backend for one guest does not stall the others.
//! After every change the task publishes a snapshot, and
//! [`clients::OrderFacadeClient::get_orders_for_guest`] reads that snapshot
//! synchronously.
//!
//! ### The store is injected
//! All backend access goes through the [`store::OrderStore`] trait, handed to the
//! task when it starts. Tests swap in [`store::MockOrderStore`]; the demo uses
//! [`store::InMemoryOrderStore`].
//!
//! ### Errors
//! Each layer has its own `thiserror` enum: [`store::StoreError`] for the backend,
//! [`order_facade::FacadeError`] for the cache (wrapping store errors with `#[from]`),
//! and [`config::ConfigError`] for settings.
//!
//! ## 🗺️ Module Tour
//!
//! - [`model`]: orders, guests, drinks, rooms and the joined row the UI shows.
//! - [`store`]: the backend boundary and its two implementations.
//! - [`order_facade`]: the cache task and its per-guest book.
//! - [`clients`]: the handle the rest of the app talks to.
//! - [`room_board`]: the host's whole-room view.
//! - [`lifecycle`]: spawning, shutdown and log setup.
//! - [`config`]: environment settings.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run
//! cargo test
//! ```

pub mod clients;
pub mod config;
pub mod lifecycle;
pub mod model;
pub mod order_facade;
pub mod room_board;
pub mod store;
