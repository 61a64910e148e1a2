use serde::{Deserialize, Serialize};

use crate::types::{Currency, Dimension, ItemType, Location, OrderId, PropertyRight, Side};

// === ORDERS ===

/// A live bid or ask for a single unit in one market dimension.
///
/// `filled` is consumed by settlement and irreversible; `can_fill` tracks
/// whether the owner can currently honor the order and may flip in either
/// direction as positions change.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub dimension: Dimension,
    pub side: Side,
    pub price: i64,
    pub owner: String,
    pub location: Location,
    pub filled: bool,
    pub can_fill: bool,
}

impl Order {
    /// Eligible for matching: not yet consumed and currently honorable.
    pub fn live(&self) -> bool {
        !self.filled && self.can_fill
    }
}

/// Read-only view of an order handed to agents in OFFER/TRANSACT payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSnapshot {
    pub id: OrderId,
    pub side: Side,
    pub price: i64,
    pub owner: String,
    pub location: Location,
}

impl From<&Order> for OrderSnapshot {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            side: order.side,
            price: order.price,
            owner: order.owner.clone(),
            location: order.location,
        }
    }
}

// === ORDER BOOK ===

/// Dimension-partitioned arena of orders.
///
/// Flags are only mutated through the named transitions (`place`, `settle`,
/// `revalidate`); ids grow monotonically and survive `clear`, so a ledger row
/// never points at a recycled id.
#[derive(Debug, Default)]
pub struct OrderBook {
    orders: Vec<Order>,
    next_id: u64,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Append a fresh order (`filled = false`, `can_fill = true`).
    pub fn place(
        &mut self,
        dimension: Dimension,
        side: Side,
        price: i64,
        owner: &str,
        location: Location,
    ) -> OrderId {
        let id = OrderId(self.next_id);
        self.next_id += 1;
        self.orders.push(Order {
            id,
            dimension,
            side,
            price,
            owner: owner.to_string(),
            location,
            filled: false,
            can_fill: true,
        });
        id
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    /// Irreversibly consume an order. Returns false if the order is unknown
    /// or was already consumed.
    pub fn settle(&mut self, id: OrderId) -> bool {
        match self.orders.iter_mut().find(|o| o.id == id) {
            Some(order) if !order.filled => {
                order.filled = true;
                true
            }
            _ => false,
        }
    }

    /// Re-judge `can_fill` for one owner's unconsumed orders in one
    /// dimension. The judge sees the order and answers whether it is
    /// currently honorable; flips happen in both directions. Returns the ids
    /// whose eligibility changed.
    pub fn revalidate(
        &mut self,
        owner: &str,
        dimension: Dimension,
        judge: impl Fn(&Order) -> bool,
    ) -> Vec<OrderId> {
        let mut changed = Vec::new();
        for order in self.orders.iter_mut() {
            if order.filled || order.owner != owner || order.dimension != dimension {
                continue;
            }
            let verdict = judge(order);
            if verdict != order.can_fill {
                order.can_fill = verdict;
                changed.push(order.id);
            }
        }
        changed
    }

    /// Live orders in one dimension.
    pub fn live_in(&self, dimension: Dimension) -> impl Iterator<Item = &Order> {
        self.orders
            .iter()
            .filter(move |o| o.live() && o.dimension == dimension)
    }

    /// Dimension-restricted read-only view of the live book.
    pub fn snapshot_in(&self, dimension: Dimension) -> Vec<OrderSnapshot> {
        self.live_in(dimension).map(OrderSnapshot::from).collect()
    }

    /// The most recently placed live order on `side` owned by `owner` in one
    /// dimension, if any.
    pub fn latest_live(&self, owner: &str, dimension: Dimension, side: Side) -> Option<OrderId> {
        self.orders
            .iter()
            .rev()
            .find(|o| o.live() && o.side == side && o.owner == owner && o.dimension == dimension)
            .map(|o| o.id)
    }

    /// Drop all orders. Ids keep counting up.
    pub fn clear(&mut self) {
        self.orders.clear();
    }
}

// === OFFER HISTORY ===

/// Append-only record of a placed offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferRecord {
    pub round: u32,
    pub period: u32,
    pub week: u32,
    pub order: OrderId,
    pub side: Side,
    pub price: i64,
    pub owner: String,
    pub right: PropertyRight,
    pub item: ItemType,
    pub currency: Currency,
    pub location: Location,
}
