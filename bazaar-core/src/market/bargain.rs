//! The bargaining institution: collects offers, crosses them, settles
//! contracts under quantity and currency constraints, and keeps the
//! append-only ledger. Strictly sequential; the engine is the sole mutator
//! of the book and ledger, and talks to agents only through messages.

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use slotmap::{SecondaryMap, SlotMap, new_key_type};
use thiserror::Error;

use crate::agents::trader::Trader;
use crate::market::contract::Contract;
use crate::market::order::{OfferRecord, Order, OrderBook, OrderSnapshot};
use crate::msg::{
    ContractNotice, Directive, ENGINE_ID, Message, OfferRequest, Payload, TransactRequest,
};
use crate::types::{
    BiddingType, ContractId, Currency, Dimension, Enforcement, ItemType, Location,
    MarketType, OrderId, PropertyRight, Side, TradeRole,
};

new_key_type! {
    pub struct TraderKey;
}

/// Balance assigned to every agent under abstract bidding; large enough that
/// the hard money check never binds.
pub const SYNTHETIC_BALANCE: i64 = 1_000_000_000;

// === CONFIGURATION ===

/// Institutional parameters, fixed at construction.
#[derive(Debug, Clone)]
pub struct BargainConfig {
    /// Bargaining rounds per `run()`.
    pub rounds: u32,
    /// Hard: sellers must hold inventory at settlement.
    pub quantity_limit: Enforcement,
    /// Hard: buyers must hold cash at settlement.
    pub money_limit: Enforcement,
    pub market_type: MarketType,
    pub item_types: Vec<ItemType>,
    pub currency_types: Vec<Currency>,
    pub property_rights: Vec<PropertyRight>,
    pub bidding: BiddingType,
    /// Only accept orders placed at the acceptor's own grid cell.
    pub enforce_locality: bool,
    /// Where this bargaining institution sits on the grid.
    pub location: Location,
    /// true: the book resets every round, book and ledger every run.
    /// false: unmatched orders persist across rounds of a run; stale
    /// acceptance is prevented by `can_fill` re-validation.
    pub hard_clear: bool,
    /// Seed for the per-round agent shuffle.
    pub seed: u64,
}

impl Default for BargainConfig {
    fn default() -> Self {
        Self {
            rounds: 10,
            quantity_limit: Enforcement::Hard,
            money_limit: Enforcement::Hard,
            market_type: MarketType::SingleCommodity,
            item_types: vec![ItemType::C],
            currency_types: vec![Currency::M],
            property_rights: vec![PropertyRight::Spot],
            bidding: BiddingType::Abstract,
            enforce_locality: false,
            location: (0, 0),
            hard_clear: true,
            seed: 0,
        }
    }
}

impl BargainConfig {
    /// The right x item x currency cross product: one independent sub-market
    /// per triple.
    pub fn dimensions(&self) -> Vec<Dimension> {
        let mut dims = Vec::new();
        for &right in &self.property_rights {
            for &item in &self.item_types {
                for &currency in &self.currency_types {
                    dims.push(Dimension::new(right, item, currency));
                }
            }
        }
        dims
    }
}

/// Why an attempted acceptance was skipped. Recovered locally, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TradeFailure {
    #[error("order unknown or already filled")]
    Stale,
    #[error("order is not currently fillable")]
    NotFillable,
    #[error("cannot accept own order")]
    OwnOrder,
    #[error("order side does not match the requested trade")]
    WrongSide,
    #[error("order placed at a different location")]
    LocationMismatch,
    #[error("buyer cannot cover the settlement price")]
    InsufficientFunds,
    #[error("seller has no inventory left")]
    InsufficientInventory,
}

/// Engine-side view of one agent's positions, refreshed from the agent at
/// the top of every round and kept current through settlements.
#[derive(Debug, Clone, Default)]
struct AgentPosition {
    quantities: HashMap<(PropertyRight, ItemType), u32>,
    balances: HashMap<Currency, i64>,
}

// === ENGINE ===

pub struct Bargain {
    config: BargainConfig,
    dimensions: Vec<Dimension>,
    traders: SlotMap<TraderKey, Trader>,
    lookup: HashMap<String, TraderKey>,
    /// Bargaining order, reshuffled every round.
    order: Vec<TraderKey>,
    book: OrderBook,
    contracts: Vec<Contract>,
    offer_history: Vec<OfferRecord>,
    positions: SecondaryMap<TraderKey, AgentPosition>,
    next_contract_id: u64,
    period: u32,
    week: u32,
    rng: StdRng,
}

impl Bargain {
    pub fn new(config: BargainConfig) -> Self {
        debug_assert!(
            match config.market_type {
                MarketType::SingleCommodity => config.item_types.len() == 1,
                MarketType::MultiCommodity => config.item_types.len() > 1,
            },
            "market_type does not match the configured item types"
        );
        let dimensions = config.dimensions();
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            dimensions,
            traders: SlotMap::with_key(),
            lookup: HashMap::new(),
            order: Vec::new(),
            book: OrderBook::new(),
            contracts: Vec::new(),
            offer_history: Vec::new(),
            positions: SecondaryMap::new(),
            next_contract_id: 0,
            period: 1,
            week: 1,
            rng,
        }
    }

    /// Replace the bargaining population.
    pub fn set_agents(&mut self, agents: Vec<Trader>) {
        self.traders.clear();
        self.lookup.clear();
        self.positions.clear();
        self.order.clear();
        for trader in agents {
            let name = trader.name().to_string();
            let key = self.traders.insert(trader);
            self.lookup.insert(name, key);
        }
    }

    /// Send START to every agent. Called by the driver at period/week
    /// boundaries; `run()` itself never resets agent state.
    pub fn start_agents(&mut self) {
        let keys: Vec<TraderKey> = self.traders.keys().collect();
        for key in keys {
            let name = self.traders[key].name().to_string();
            let msg = Message::new(Directive::Start, ENGINE_ID, &name, Payload::Empty);
            self.traders[key].process_message(&msg);
        }
    }

    pub fn agents(&self) -> impl Iterator<Item = &Trader> {
        self.traders.values()
    }

    pub fn agent(&self, name: &str) -> Option<&Trader> {
        self.lookup.get(name).map(|&key| &self.traders[key])
    }

    /// Driver access between periods (the travel institution applies moves
    /// through this).
    pub fn agent_mut(&mut self, name: &str) -> Option<&mut Trader> {
        let key = self.lookup.get(name).copied()?;
        self.traders.get_mut(key)
    }

    pub fn set_period(&mut self, period: u32) {
        self.period = period;
    }

    pub fn set_week(&mut self, week: u32) {
        self.week = week;
    }

    pub fn get_contracts(&self) -> &[Contract] {
        &self.contracts
    }

    pub fn get_offer_history(&self) -> &[OfferRecord] {
        &self.offer_history
    }

    pub fn order_book(&self) -> &OrderBook {
        &self.book
    }

    /// Run the configured number of bargaining rounds.
    ///
    /// Each round is a strict three-stage sequence: position sync, offer
    /// collection, then sequential transact/settlement. A settlement is
    /// visible to every later agent in the same round.
    pub fn run(&mut self) {
        self.book.clear();
        if self.config.hard_clear {
            self.contracts.clear();
            self.offer_history.clear();
        }
        self.positions.clear();

        for round in 0..self.config.rounds {
            self.shuffle_order();
            self.sync_positions();
            self.offer_phase(round);
            self.transact_phase(round);
            if self.config.hard_clear {
                self.book.clear();
            }
        }
        tracing::info!(
            target: "bargain",
            period = self.period,
            week = self.week,
            contracts = self.contracts.len(),
            "run complete"
        );
    }

    fn shuffle_order(&mut self) {
        self.order = self.traders.keys().collect();
        self.order.shuffle(&mut self.rng);
    }

    /// Stage 1: learn every agent's quantity positions, and money positions
    /// under monetary bidding. Abstract bidding assigns a synthetic balance
    /// instead; the agents' real balances are never queried.
    fn sync_positions(&mut self) {
        let keys = self.order.clone();
        for key in keys {
            let name = self.traders[key].name().to_string();
            let mut position = AgentPosition::default();

            for i in 0..self.config.property_rights.len() {
                for j in 0..self.config.item_types.len() {
                    let right = self.config.property_rights[i];
                    let item = self.config.item_types[j];
                    let msg = Message::new(
                        Directive::ReportQuantity,
                        ENGINE_ID,
                        &name,
                        Payload::QuantityQuery { right, item },
                    );
                    let reply = self.traders[key].process_message(&msg);
                    if let Payload::QuantityReport { amount, .. } = reply.payload {
                        position.quantities.insert((right, item), amount);
                    }
                }
            }

            for j in 0..self.config.currency_types.len() {
                let currency = self.config.currency_types[j];
                match self.config.bidding {
                    BiddingType::Monetary => {
                        let msg = Message::new(
                            Directive::ReportMoney,
                            ENGINE_ID,
                            &name,
                            Payload::MoneyQuery { currency },
                        );
                        let reply = self.traders[key].process_message(&msg);
                        if let Payload::MoneyReport { amount, .. } = reply.payload {
                            position.balances.insert(currency, amount);
                        }
                    }
                    BiddingType::Abstract => {
                        position.balances.insert(currency, SYNTHETIC_BALANCE);
                    }
                }
            }

            self.positions.insert(key, position);
        }
    }

    /// Stage 2: one OFFER exchange per agent per dimension; every placed
    /// offer lands in the book and the offer history.
    fn offer_phase(&mut self, round: u32) {
        let keys = self.order.clone();
        let dims = self.dimensions.clone();
        for key in keys {
            let name = self.traders[key].name().to_string();
            let location = self.traders[key].location();
            for &dimension in &dims {
                let book = self.book.snapshot_in(dimension);
                let msg = Message::new(
                    Directive::Offer,
                    ENGINE_ID,
                    &name,
                    Payload::OfferRequest(OfferRequest {
                        dimension,
                        book,
                        bidding: self.config.bidding,
                    }),
                );
                let reply = self.traders[key].process_message(&msg);
                match (reply.directive, reply.payload) {
                    (Directive::PlaceOffer, Payload::Place(place)) => {
                        let id =
                            self.book.place(dimension, place.side, place.price, &name, location);
                        tracing::debug!(
                            target: "offer",
                            round,
                            order = id.0,
                            agent = %name,
                            side = ?place.side,
                            price = place.price,
                            %dimension,
                        );
                        self.offer_history.push(OfferRecord {
                            round,
                            period: self.period,
                            week: self.week,
                            order: id,
                            side: place.side,
                            price: place.price,
                            owner: name.clone(),
                            right: dimension.right,
                            item: dimension.item,
                            currency: dimension.currency,
                            location,
                        });
                    }
                    (Directive::NoOffer, _) | (Directive::Rejected, _) => {}
                    (directive, _) => {
                        tracing::debug!(target: "reject", agent = %name, ?directive, "unusable offer reply");
                    }
                }
            }
        }
    }

    /// Stage 3: one TRANSACT exchange per agent per dimension, settled
    /// immediately in shuffle order. An order consumed here is ineligible
    /// for every later agent in the same phase.
    fn transact_phase(&mut self, round: u32) {
        let keys = self.order.clone();
        let dims = self.dimensions.clone();
        for key in keys {
            let name = self.traders[key].name().to_string();
            let location = self.traders[key].location();
            for &dimension in &dims {
                let eligible = self.eligible_for(&name, location, dimension);
                let msg = Message::new(
                    Directive::Transact,
                    ENGINE_ID,
                    &name,
                    Payload::TransactRequest(TransactRequest { dimension, eligible }),
                );
                let reply = self.traders[key].process_message(&msg);
                match (reply.directive, reply.payload) {
                    (Directive::Buy, Payload::Accept(id)) => {
                        self.try_settle(round, key, TradeRole::Buyer, id);
                    }
                    (Directive::Sell, Payload::Accept(id)) => {
                        self.try_settle(round, key, TradeRole::Seller, id);
                    }
                    (Directive::NoTrade, _) | (Directive::Rejected, _) => {}
                    (directive, _) => {
                        tracing::debug!(target: "reject", agent = %name, ?directive, "unusable transact reply");
                    }
                }
            }
        }
    }

    /// Orders this agent may accept: live, not their own, and (when locality
    /// is enforced) placed at their cell.
    fn eligible_for(&self, name: &str, location: Location, dimension: Dimension) -> Vec<OrderSnapshot> {
        self.book
            .live_in(dimension)
            .filter(|o| o.owner != name)
            .filter(|o| !self.config.enforce_locality || o.location == location)
            .map(OrderSnapshot::from)
            .collect()
    }

    fn try_settle(&mut self, round: u32, acceptor: TraderKey, role: TradeRole, id: OrderId) {
        let acceptor_name = self.traders[acceptor].name().to_string();
        let accept_location = self.traders[acceptor].location();
        match self.validate_trade(&acceptor_name, accept_location, role, id) {
            Ok(order) => self.settle(round, &acceptor_name, accept_location, role, order),
            Err(failure) => {
                // Skip silently; no retry within the round.
                tracing::debug!(target: "reject", agent = %acceptor_name, order = id.0, %failure);
            }
        }
    }

    fn validate_trade(
        &self,
        acceptor_name: &str,
        accept_location: Location,
        role: TradeRole,
        id: OrderId,
    ) -> Result<Order, TradeFailure> {
        let order = self.book.get(id).ok_or(TradeFailure::Stale)?;
        if order.filled {
            return Err(TradeFailure::Stale);
        }
        if !order.can_fill {
            return Err(TradeFailure::NotFillable);
        }
        if order.owner == acceptor_name {
            return Err(TradeFailure::OwnOrder);
        }
        let wanted = match role {
            TradeRole::Buyer => Side::Ask,
            TradeRole::Seller => Side::Bid,
        };
        if order.side != wanted {
            return Err(TradeFailure::WrongSide);
        }
        if self.config.enforce_locality && order.location != accept_location {
            return Err(TradeFailure::LocationMismatch);
        }

        // Settlement mutates balances mid-round, so hard limits are
        // re-verified here against the engine's position table, not the
        // round-start reports.
        let (buyer, seller) = match role {
            TradeRole::Buyer => (acceptor_name, order.owner.as_str()),
            TradeRole::Seller => (order.owner.as_str(), acceptor_name),
        };
        if self.config.money_limit == Enforcement::Hard {
            let cash = self.position_balance(buyer, order.dimension.currency)?;
            if cash < order.price {
                return Err(TradeFailure::InsufficientFunds);
            }
        }
        if self.config.quantity_limit == Enforcement::Hard {
            let held =
                self.position_quantity(seller, order.dimension.right, order.dimension.item)?;
            if held == 0 {
                return Err(TradeFailure::InsufficientInventory);
            }
        }
        Ok(order.clone())
    }

    fn position_balance(&self, name: &str, currency: Currency) -> Result<i64, TradeFailure> {
        let key = self.lookup.get(name).copied().ok_or(TradeFailure::Stale)?;
        Ok(self
            .positions
            .get(key)
            .and_then(|p| p.balances.get(&currency).copied())
            .unwrap_or(0))
    }

    fn position_quantity(
        &self,
        name: &str,
        right: PropertyRight,
        item: ItemType,
    ) -> Result<u32, TradeFailure> {
        let key = self.lookup.get(name).copied().ok_or(TradeFailure::Stale)?;
        Ok(self
            .positions
            .get(key)
            .and_then(|p| p.quantities.get(&(right, item)).copied())
            .unwrap_or(0))
    }

    /// Settle one validated acceptance. The settlement price is the resting
    /// order's price, never the acceptor's fresh reservation.
    fn settle(
        &mut self,
        round: u32,
        acceptor_name: &str,
        accept_location: Location,
        role: TradeRole,
        order: Order,
    ) {
        let dimension = order.dimension;
        self.book.settle(order.id);

        // The acceptor's own most recent live order on the opposite leg is
        // satisfied by this trade and consumed as the contract's other leg.
        let own_side = match role {
            TradeRole::Buyer => Side::Bid,
            TradeRole::Seller => Side::Ask,
        };
        let own_leg = self.book.latest_live(acceptor_name, dimension, own_side);
        if let Some(own_id) = own_leg {
            self.book.settle(own_id);
        }

        let (buyer, seller) = match role {
            TradeRole::Buyer => (acceptor_name.to_string(), order.owner.clone()),
            TradeRole::Seller => (order.owner.clone(), acceptor_name.to_string()),
        };
        let (bid, ask) = match role {
            TradeRole::Buyer => (own_leg, Some(order.id)),
            TradeRole::Seller => (Some(order.id), own_leg),
        };

        let contract = Contract {
            id: ContractId(self.next_contract_id),
            bid,
            ask,
            buyer: buyer.clone(),
            seller: seller.clone(),
            price: order.price,
            right: dimension.right,
            item: dimension.item,
            currency: dimension.currency,
            placed_location: order.location,
            accept_location,
            acceptor: acceptor_name.to_string(),
            round,
            period: self.period,
            week: self.week,
            bargain_location: self.config.location,
        };
        self.next_contract_id += 1;

        self.apply_positions(&contract);
        self.notify(TradeRole::Buyer, &contract);
        self.notify(TradeRole::Seller, &contract);
        // Only the two counterparties are re-validated, and only in the
        // affected dimension - not transitively across shared currency
        // pools.
        self.revalidate_party(&buyer, dimension);
        self.revalidate_party(&seller, dimension);

        tracing::info!(
            target: "contract",
            id = contract.id.0,
            round,
            buyer = %contract.buyer,
            seller = %contract.seller,
            price = contract.price,
            %dimension,
        );
        self.contracts.push(contract);
    }

    fn apply_positions(&mut self, contract: &Contract) {
        let key = (contract.right, contract.item);
        if let Some(buyer_key) = self.lookup.get(&contract.buyer).copied() {
            if let Some(position) = self.positions.get_mut(buyer_key) {
                *position.quantities.entry(key).or_insert(0) += 1;
                *position.balances.entry(contract.currency).or_insert(0) -= contract.price;
            }
        }
        if let Some(seller_key) = self.lookup.get(&contract.seller).copied() {
            if let Some(position) = self.positions.get_mut(seller_key) {
                let held = position.quantities.entry(key).or_insert(0);
                *held = held.saturating_sub(1);
                *position.balances.entry(contract.currency).or_insert(0) += contract.price;
            }
        }
    }

    fn notify(&mut self, role: TradeRole, contract: &Contract) {
        let name = match role {
            TradeRole::Buyer => contract.buyer.clone(),
            TradeRole::Seller => contract.seller.clone(),
        };
        let Some(key) = self.lookup.get(&name).copied() else {
            return;
        };
        let msg = Message::new(
            Directive::Contract,
            ENGINE_ID,
            &name,
            Payload::ContractNotice(ContractNotice { role, contract: contract.clone() }),
        );
        let reply = self.traders[key].process_message(&msg);
        if reply.directive == Directive::Rejected {
            tracing::warn!(target: "reject", agent = %name, contract = contract.id.0, "contract notice rejected");
        }
    }

    /// Re-judge `can_fill` on one party's remaining live orders in the
    /// affected dimension. Flips only follow the hard limits; a soft limit
    /// is not enforced at settlement, so there is nothing to protect.
    fn revalidate_party(&mut self, name: &str, dimension: Dimension) {
        let Some(key) = self.lookup.get(name).copied() else {
            return;
        };
        let Some(position) = self.positions.get(key) else {
            return;
        };
        let held = position
            .quantities
            .get(&(dimension.right, dimension.item))
            .copied()
            .unwrap_or(0);
        let cash = position.balances.get(&dimension.currency).copied().unwrap_or(0);
        let quantity_hard = self.config.quantity_limit == Enforcement::Hard;
        let money_hard = self.config.money_limit == Enforcement::Hard;

        let changed = self.book.revalidate(name, dimension, move |order| match order.side {
            Side::Ask => !quantity_hard || held >= 1,
            Side::Bid => !money_hard || cash >= order.price,
        });
        if !changed.is_empty() {
            tracing::debug!(
                target: "revalidate",
                agent = %name,
                affected = changed.len(),
                %dimension,
            );
        }
    }
}
