//! The message envelope: the sole call/return convention between the bargain
//! engine and its agents. The envelope passes payloads through untouched;
//! the payload shape per directive is fixed by the [`Payload`] enum.

use thiserror::Error;

use crate::market::contract::Contract;
use crate::market::order::OrderSnapshot;
use crate::types::{
    BiddingType, ContractId, Currency, Dimension, Displacement, ItemType, OrderId,
    PropertyRight, Side, TradeRole,
};

/// Sender/receiver id the engine goes by.
pub const ENGINE_ID: &str = "BARGAIN";

/// Closed set of message kinds. The first group are engine requests, the
/// second agent replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    // engine -> agent
    Start,
    MoveRequested,
    Offer,
    Transact,
    Contract,
    ReportQuantity,
    ReportMoney,
    // agent -> engine
    Move,
    PlaceOffer,
    NoOffer,
    Buy,
    Sell,
    NoTrade,
    Confirm,
    Quantity,
    Money,
    Rejected,
}

/// Context handed to an agent deciding a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveContext {
    /// How many agents share the agent's grid cell, itself included.
    pub neighbors_at_location: usize,
}

/// Payload of an OFFER request: one dimension's live book plus the bidding
/// institution in force.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferRequest {
    pub dimension: Dimension,
    pub book: Vec<OrderSnapshot>,
    pub bidding: BiddingType,
}

/// An agent's placed offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Place {
    pub side: Side,
    pub price: i64,
}

/// Payload of a TRANSACT request: the orders this agent may accept (own and
/// dead orders already excluded by the engine).
#[derive(Debug, Clone, PartialEq)]
pub struct TransactRequest {
    pub dimension: Dimension,
    pub eligible: Vec<OrderSnapshot>,
}

/// Payload of a CONTRACT notice: which party this agent is, and the row.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractNotice {
    pub role: TradeRole,
    pub contract: Contract,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Move(Displacement),
    MoveContext(MoveContext),
    OfferRequest(OfferRequest),
    Place(Place),
    TransactRequest(TransactRequest),
    /// The order id a BUY/SELL reply accepts.
    Accept(OrderId),
    QuantityQuery { right: PropertyRight, item: ItemType },
    QuantityReport { right: PropertyRight, item: ItemType, amount: u32 },
    MoneyQuery { currency: Currency },
    MoneyReport { currency: Currency, amount: i64 },
    ContractNotice(ContractNotice),
    Rejection(ProtocolError),
}

/// Immutable envelope exchanged between engine and agents.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub directive: Directive,
    pub sender: String,
    pub receiver: String,
    pub payload: Payload,
}

impl Message {
    pub fn new(
        directive: Directive,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self {
            directive,
            sender: sender.into(),
            receiver: receiver.into(),
            payload,
        }
    }
}

/// Tagged rejection reasons. Carried inside a `Rejected` reply; the engine
/// treats any of these as "no action" for that agent this turn.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("message for {expected} delivered to {got}")]
    WrongReceiver { expected: String, got: String },
    #[error("unexpected directive {0:?}")]
    UnexpectedDirective(Directive),
    #[error("agent is not the named {role:?} on contract {id}")]
    WrongParty { role: TradeRole, id: ContractId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_passes_payload_through() {
        let msg = Message::new(
            Directive::Offer,
            ENGINE_ID,
            "buyer0",
            Payload::OfferRequest(OfferRequest {
                dimension: Dimension::spot(),
                book: vec![],
                bidding: BiddingType::Abstract,
            }),
        );
        let copy = msg.clone();
        assert_eq!(msg, copy);
        assert_eq!(copy.sender, "BARGAIN");
        assert_eq!(copy.receiver, "buyer0");
    }

    #[test]
    fn protocol_errors_describe_themselves() {
        let err = ProtocolError::WrongReceiver {
            expected: "buyer1".into(),
            got: "buyer0".into(),
        };
        assert_eq!(err.to_string(), "message for buyer1 delivered to buyer0");
    }
}
