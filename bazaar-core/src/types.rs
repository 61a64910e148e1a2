use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Grid coordinates
// ============================================================================

/// A cell on the trading grid.
pub type Location = (i32, i32);

/// A one-step move on the grid, each component in {-1, 0, +1}.
pub type Displacement = (i8, i8);

// ============================================================================
// Ids - monotonically assigned by the engine, never reused
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Market vocabulary
// ============================================================================

/// Which side of the book an order sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// The side an order must be on to match against this one.
    pub fn counter(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

/// What an agent is in the market for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Buyer,
    Seller,
    /// Two-sided: buys one item type and sells another.
    Trader,
}

/// Which party of a contract a notice addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeRole {
    Buyer,
    Seller,
}

/// The form of ownership a unit is exchanged under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyRight {
    Spot,
    Rent,
    Durable,
}

impl PropertyRight {
    pub fn all() -> impl Iterator<Item = PropertyRight> {
        [PropertyRight::Spot, PropertyRight::Rent, PropertyRight::Durable].into_iter()
    }
}

/// Commodity label. `C` is the generic single-market commodity; `X` and `Y`
/// are the two sides of the two-commodity world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    C,
    X,
    Y,
}

impl ItemType {
    pub fn all() -> impl Iterator<Item = ItemType> {
        [ItemType::C, ItemType::X, ItemType::Y].into_iter()
    }
}

/// Currency label. `M` is the generic unit of account; `N` a second currency
/// for multi-currency treatments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    M,
    N,
}

impl Currency {
    pub fn all() -> impl Iterator<Item = Currency> {
        [Currency::M, Currency::N].into_iter()
    }
}

/// The (property right, item type, currency) triple partitioning the market
/// into independent sub-markets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub right: PropertyRight,
    pub item: ItemType,
    pub currency: Currency,
}

impl Dimension {
    pub fn new(right: PropertyRight, item: ItemType, currency: Currency) -> Self {
        Self { right, item, currency }
    }

    /// The one-commodity spot market paid in the generic currency.
    pub fn spot() -> Self {
        Self::new(PropertyRight::Spot, ItemType::C, Currency::M)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}|{:?}|{:?}", self.right, self.item, self.currency)
    }
}

// ============================================================================
// Institutional configuration
// ============================================================================

/// Whether bids draw on a real budget or an unconstrained synthetic balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiddingType {
    Abstract,
    Monetary,
}

/// Hardness of the quantity / money constraint at settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Enforcement {
    Hard,
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketType {
    SingleCommodity,
    MultiCommodity,
}
