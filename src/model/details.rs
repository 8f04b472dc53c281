use crate::model::{Drink, GuestId, GuestSummary, Order, OrderId, OrderStatus};
use serde::{Deserialize, Serialize};

/// An order joined with the guest who placed it and the drink they asked for.
///
/// This is the read-time view-model: the store produces it with a join, the
/// order cache keeps lists of it, and the live feed only ever patches
/// [`Order::status`] inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWithDetails {
    #[serde(flatten)]
    pub order: Order,
    pub guest: GuestSummary,
    pub drink: Drink,
}

impl OrderWithDetails {
    pub fn new(order: Order, guest: GuestSummary, drink: Drink) -> Self {
        Self { order, guest, drink }
    }

    pub fn id(&self) -> &OrderId {
        &self.order.id
    }

    pub fn guest_id(&self) -> &GuestId {
        &self.order.guest_id
    }

    pub fn status(&self) -> OrderStatus {
        self.order.status
    }
}
