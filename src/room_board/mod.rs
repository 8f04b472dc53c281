//! # Room Order Board
//!
//! The host's view of every order in one room. Unlike the guest cache, the board
//! follows inserts and deletes as well as updates.

use crate::model::{OrderId, OrderWithDetails};
use tracing::debug;

/// A row-level change to the room's orders, carrying the joined row where there is one.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomOrderChange {
    Inserted(OrderWithDetails),
    Updated(OrderWithDetails),
    Deleted(OrderId),
}

/// How many orders one guest has placed in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestStat {
    pub name: String,
    pub count: usize,
}

/// Orders of one room, most recent first.
///
/// A full fetch is sorted by creation time; inserts go to the front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomOrderBoard {
    room_id: String,
    orders: Vec<OrderWithDetails>,
}

impl RoomOrderBoard {
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            orders: Vec::new(),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn orders(&self) -> &[OrderWithDetails] {
        &self.orders
    }

    /// Resynchronizes the board from a full fetch in any order. Rows from other
    /// rooms are dropped.
    pub fn replace(&mut self, orders: Vec<OrderWithDetails>) {
        let mut orders: Vec<_> = orders
            .into_iter()
            .filter(|o| o.order.room_id == self.room_id)
            .collect();
        orders.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at));
        self.orders = orders;
    }

    /// Applies one change. Returns whether the board changed.
    pub fn apply(&mut self, change: RoomOrderChange) -> bool {
        match change {
            RoomOrderChange::Inserted(row) => {
                if !self.belongs_here(&row) {
                    return false;
                }
                self.orders.retain(|o| o.id() != row.id());
                self.orders.insert(0, row);
                true
            }
            RoomOrderChange::Updated(row) => {
                if !self.belongs_here(&row) {
                    return false;
                }
                let mut changed = false;
                for existing in self.orders.iter_mut().filter(|o| o.id() == row.id()) {
                    *existing = row.clone();
                    changed = true;
                }
                changed
            }
            RoomOrderChange::Deleted(order_id) => {
                let before = self.orders.len();
                self.orders.retain(|o| o.id() != &order_id);
                before != self.orders.len()
            }
        }
    }

    /// Orders that still need the host's attention.
    pub fn active_orders(&self) -> Vec<&OrderWithDetails> {
        self.orders
            .iter()
            .filter(|o| o.status().is_active())
            .collect()
    }

    /// Order counts per guest display name, in the order guests first appear.
    pub fn guest_stats(&self) -> Vec<GuestStat> {
        let mut stats: Vec<GuestStat> = Vec::new();
        for row in &self.orders {
            let name = &row.guest.display_name;
            match stats.iter_mut().find(|s| &s.name == name) {
                Some(stat) => stat.count += 1,
                None => stats.push(GuestStat {
                    name: name.clone(),
                    count: 1,
                }),
            }
        }
        stats
    }

    fn belongs_here(&self, row: &OrderWithDetails) -> bool {
        let here = row.order.room_id == self.room_id;
        if !here {
            debug!(room_id = %self.room_id, order_id = %row.id(), "Change for another room");
        }
        here
    }
}
