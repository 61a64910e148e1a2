pub mod bargain;
pub mod contract;
pub mod order;

pub use bargain::{Bargain, BargainConfig, TradeFailure};
pub use contract::Contract;
pub use order::{OfferRecord, Order, OrderBook, OrderSnapshot};
