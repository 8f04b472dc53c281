//! The per-guest order table behind the cache.
//!
//! [`OrderBook`] is plain data: the cache task owns the only mutable copy and
//! publishes clones of it as read snapshots.

use crate::model::{GuestId, OrderStatusChange, OrderWithDetails};
use std::collections::HashMap;

/// What happened when a live status change was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// At least one cached order moved to the new status.
    Applied,
    /// The matching orders already carried that status.
    Unchanged,
    /// The guest has no cache entry.
    UnknownGuest,
    /// The guest's entry has no order with that id.
    UnknownOrder,
}

/// Cached orders keyed by guest.
///
/// A guest that was loaded and has no orders maps to an empty list, which is
/// different from a guest that was never loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    entries: HashMap<GuestId, Vec<OrderWithDetails>>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached orders of a guest, or an empty slice when nothing is cached.
    pub fn orders_for(&self, guest_id: &GuestId) -> &[OrderWithDetails] {
        self.entries
            .get(guest_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, guest_id: &GuestId) -> bool {
        self.entries.contains_key(guest_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn guests(&self) -> impl Iterator<Item = &GuestId> {
        self.entries.keys()
    }

    /// Replaces the guest's whole entry.
    pub fn replace(&mut self, guest_id: GuestId, orders: Vec<OrderWithDetails>) {
        self.entries.insert(guest_id, orders);
    }

    pub fn remove(&mut self, guest_id: &GuestId) -> Option<Vec<OrderWithDetails>> {
        self.entries.remove(guest_id)
    }

    /// Sets the status of every cached order of `guest_id` whose id matches.
    ///
    /// Everything else about the order stays as it was. Order within the list is
    /// preserved and no order is ever added or removed here.
    pub fn apply_status_change(
        &mut self,
        guest_id: &GuestId,
        change: &OrderStatusChange,
    ) -> PatchOutcome {
        let Some(orders) = self.entries.get_mut(guest_id) else {
            return PatchOutcome::UnknownGuest;
        };

        let mut matched = false;
        let mut changed = false;
        for row in orders.iter_mut().filter(|o| o.id() == &change.order_id) {
            matched = true;
            if row.order.status != change.status {
                row.order.status = change.status;
                changed = true;
            }
        }

        match (matched, changed) {
            (false, _) => PatchOutcome::UnknownOrder,
            (true, false) => PatchOutcome::Unchanged,
            (true, true) => PatchOutcome::Applied,
        }
    }
}
