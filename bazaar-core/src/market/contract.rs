use serde::{Deserialize, Serialize};

use crate::types::{
    ContractId, Currency, Dimension, ItemType, Location, OrderId, PropertyRight,
};

/// One settled trade.
///
/// Immutable once appended; the ledger is append-only and never rolled back.
/// The field set is a stable contract consumed by external results tooling -
/// extend it, don't rename it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    /// The bid leg. Absent when the buyer had no live bid of their own.
    pub bid: Option<OrderId>,
    /// The ask leg. Absent when the seller had no live ask of their own.
    pub ask: Option<OrderId>,
    pub buyer: String,
    pub seller: String,
    pub price: i64,
    pub right: PropertyRight,
    pub item: ItemType,
    pub currency: Currency,
    /// Where the accepted resting order was placed.
    pub placed_location: Location,
    /// Where the accepting agent stood.
    pub accept_location: Location,
    pub acceptor: String,
    pub round: u32,
    pub period: u32,
    pub week: u32,
    /// Where this bargaining institution sits on the grid.
    pub bargain_location: Location,
}

impl Contract {
    pub fn dimension(&self) -> Dimension {
        Dimension::new(self.right, self.item, self.currency)
    }
}
