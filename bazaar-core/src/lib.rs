//! Decentralized double-auction bargaining core.
//!
//! Autonomous zero-intelligence traders meet in an order-book-based
//! bargaining institution: the engine collects bids and asks per market
//! dimension, crosses them sequentially, settles under quantity and
//! currency constraints, and keeps an append-only contract ledger. All
//! engine/agent interaction goes through an explicit message protocol;
//! everything is single-threaded and deterministic given a seed.
//!
//! The simulation driver constructs a [`Bargain`] from a [`BargainConfig`],
//! hands it a population of [`Trader`]s, and calls [`Bargain::run`] once per
//! trading period; spatial movement, population construction, and results
//! processing live outside this crate.

pub mod agents;
pub mod market;
pub mod msg;
pub mod types;

pub use agents::{
    Strategy, Trader, TraderView, UnitLadder, Zi, ZiAffinity, ZiCongestion, ZiPriority,
    ZiPriorityAffinity,
};
pub use market::bargain::SYNTHETIC_BALANCE;
pub use market::{
    Bargain, BargainConfig, Contract, OfferRecord, Order, OrderBook, OrderSnapshot,
    TradeFailure,
};
pub use msg::{
    ContractNotice, Directive, ENGINE_ID, Message, MoveContext, OfferRequest, Payload, Place,
    ProtocolError, TransactRequest,
};
pub use types::{
    BiddingType, ContractId, Currency, Dimension, Displacement, Enforcement, ItemType,
    Location, MarketType, OrderId, PropertyRight, Role, Side, TradeRole,
};
