use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agents::strategy::{Strategy, TraderView};
use crate::agents::zi::Zi;
use crate::market::contract::Contract;
use crate::market::order::OrderSnapshot;
use crate::msg::{
    ContractNotice, Directive, Message, MoveContext, OfferRequest, Payload, Place,
    ProtocolError, TransactRequest,
};
use crate::types::{
    BiddingType, Currency, Dimension, ItemType, Location, PropertyRight, Role, Side, TradeRole,
};

// === UNIT LADDER ===

/// An ordered valuation (buyer, descending) or cost (seller, ascending)
/// schedule with a cursor for the unit currently sought. The cursor only
/// moves forward and never past the end.
#[derive(Debug, Clone)]
pub struct UnitLadder {
    schedule: Vec<i64>,
    cur_unit: usize,
}

impl UnitLadder {
    pub fn new(schedule: Vec<i64>) -> Self {
        Self { schedule, cur_unit: 0 }
    }

    /// Value or cost of the unit currently sought; None once exhausted.
    pub fn current(&self) -> Option<i64> {
        self.schedule.get(self.cur_unit).copied()
    }

    pub fn advance(&mut self) {
        if self.cur_unit < self.schedule.len() {
            self.cur_unit += 1;
        }
    }

    pub fn reset(&mut self) {
        self.cur_unit = 0;
    }

    pub fn exhausted(&self) -> bool {
        self.cur_unit >= self.schedule.len()
    }

    pub fn cur_unit(&self) -> usize {
        self.cur_unit
    }

    pub fn len(&self) -> usize {
        self.schedule.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedule.is_empty()
    }
}

// === TRADER ===

/// An autonomous trading agent: private valuation/cost schedules, quantity
/// and currency positions, and the protocol handlers behind
/// [`process_message`](Trader::process_message). Decision-making is deferred
/// to the attached [`Strategy`].
pub struct Trader {
    name: String,
    buy_item: Option<ItemType>,
    sell_item: Option<ItemType>,
    values: Option<UnitLadder>,
    costs: Option<UnitLadder>,
    quantities: HashMap<(PropertyRight, ItemType), u32>,
    currencies: HashMap<Currency, i64>,
    rights: Vec<PropertyRight>,
    location: Location,
    lower_bound: i64,
    upper_bound: i64,
    units_transacted: u32,
    contract_this_period: bool,
    contracts: Vec<Contract>,
    strategy: Box<dyn Strategy>,
    rng: StdRng,
}

impl Trader {
    fn base(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buy_item: None,
            sell_item: None,
            values: None,
            costs: None,
            quantities: HashMap::new(),
            currencies: HashMap::new(),
            rights: vec![PropertyRight::Spot],
            location: (0, 0),
            lower_bound: 0,
            upper_bound: 9999,
            units_transacted: 0,
            contract_this_period: false,
            contracts: Vec::new(),
            strategy: Box::new(Zi),
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// A buyer of the generic commodity with the given descending values.
    pub fn buyer(name: impl Into<String>, values: Vec<i64>) -> Self {
        let mut trader = Self::base(name);
        trader.buy_item = Some(ItemType::C);
        trader.values = Some(UnitLadder::new(values));
        trader.seed_quantities();
        trader
    }

    /// A seller of the generic commodity with the given ascending costs.
    pub fn seller(name: impl Into<String>, costs: Vec<i64>) -> Self {
        let mut trader = Self::base(name);
        trader.sell_item = Some(ItemType::C);
        trader.costs = Some(UnitLadder::new(costs));
        trader.seed_quantities();
        trader
    }

    /// A two-sided trader buying one item type and selling another. The two
    /// items must differ, otherwise the side of an exchange in their shared
    /// dimension would be ambiguous.
    pub fn two_sided(
        name: impl Into<String>,
        buys: ItemType,
        values: Vec<i64>,
        sells: ItemType,
        costs: Vec<i64>,
    ) -> Self {
        debug_assert!(buys != sells, "a two-sided trader must buy and sell different items");
        let mut trader = Self::base(name);
        trader.buy_item = Some(buys);
        trader.sell_item = Some(sells);
        trader.values = Some(UnitLadder::new(values));
        trader.costs = Some(UnitLadder::new(costs));
        trader.seed_quantities();
        trader
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_bounds(mut self, lower: i64, upper: i64) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    pub fn with_money(mut self, currency: Currency, amount: i64) -> Self {
        self.currencies.insert(currency, amount);
        self
    }

    /// Property rights this trader holds inventory under (default: spot).
    pub fn with_rights(mut self, rights: Vec<PropertyRight>) -> Self {
        self.rights = rights;
        self.seed_quantities();
        self
    }

    pub fn with_buy_item(mut self, item: ItemType) -> Self {
        self.buy_item = Some(item);
        self.seed_quantities();
        self
    }

    pub fn with_sell_item(mut self, item: ItemType) -> Self {
        self.sell_item = Some(item);
        self.seed_quantities();
        self
    }

    pub fn with_strategy(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // === accessors ===

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        match (self.buy_item, self.sell_item) {
            (Some(_), Some(_)) => Role::Trader,
            (Some(_), None) => Role::Buyer,
            _ => Role::Seller,
        }
    }

    pub fn strategy_kind(&self) -> &'static str {
        self.strategy.kind()
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Driver-facing: the travel institution applies moves between rounds.
    pub fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    pub fn units_transacted(&self) -> u32 {
        self.units_transacted
    }

    /// Read by movement-bias strategies between bargaining rounds.
    pub fn contract_this_period(&self) -> bool {
        self.contract_this_period
    }

    /// Driver-facing: clears the movement-bias flag on schedules other than
    /// the per-START default.
    pub fn reset_period_flag(&mut self) {
        self.contract_this_period = false;
    }

    /// Cursor into the valuation ladder (`Side::Bid`) or cost ladder
    /// (`Side::Ask`). Absent ladders read as cursor 0.
    pub fn cur_unit(&self, side: Side) -> usize {
        let ladder = match side {
            Side::Bid => self.values.as_ref(),
            Side::Ask => self.costs.as_ref(),
        };
        ladder.map(UnitLadder::cur_unit).unwrap_or(0)
    }

    pub fn quantity(&self, right: PropertyRight, item: ItemType) -> u32 {
        self.quantities.get(&(right, item)).copied().unwrap_or(0)
    }

    pub fn balance(&self, currency: Currency) -> i64 {
        self.currencies.get(&currency).copied().unwrap_or(0)
    }

    /// No tradeable unit left on any leg.
    pub fn exhausted(&self) -> bool {
        let buy_done = self.values.as_ref().is_none_or(UnitLadder::exhausted);
        let sell_done = self.costs.as_ref().is_none_or(UnitLadder::exhausted);
        buy_done && sell_done
    }

    /// Which side this trader takes in the given dimension, if any.
    fn side_for(&self, dimension: &Dimension) -> Option<Side> {
        if self.buy_item == Some(dimension.item) {
            Some(Side::Bid)
        } else if self.sell_item == Some(dimension.item) {
            Some(Side::Ask)
        } else {
            None
        }
    }

    /// Sellers start each period holding their full inventory, buyers hold
    /// nothing.
    fn seed_quantities(&mut self) {
        self.quantities.clear();
        for &right in &self.rights {
            if let Some(item) = self.sell_item {
                let stock = self.costs.as_ref().map(UnitLadder::len).unwrap_or(0) as u32;
                self.quantities.insert((right, item), stock);
            }
            if let Some(item) = self.buy_item {
                self.quantities.insert((right, item), 0);
            }
        }
    }

    // === protocol ===

    /// Handle one request message and return the reply. Wrong receiver,
    /// unexpected directives, and mismatched contract parties come back as
    /// tagged rejections without touching state.
    pub fn process_message(&mut self, msg: &Message) -> Message {
        if msg.receiver != self.name {
            return self.reject(
                &msg.sender,
                ProtocolError::WrongReceiver {
                    expected: msg.receiver.clone(),
                    got: self.name.clone(),
                },
            );
        }
        match (msg.directive, &msg.payload) {
            (Directive::Start, _) => self.start(&msg.sender),
            (Directive::MoveRequested, Payload::MoveContext(ctx)) => {
                self.move_requested(&msg.sender, ctx)
            }
            (Directive::Offer, Payload::OfferRequest(req)) => self.offer(&msg.sender, req),
            (Directive::Transact, Payload::TransactRequest(req)) => {
                self.transact(&msg.sender, req)
            }
            (Directive::Contract, Payload::ContractNotice(notice)) => {
                self.contract(&msg.sender, notice)
            }
            (Directive::ReportQuantity, Payload::QuantityQuery { right, item }) => {
                self.report_quantity(&msg.sender, *right, *item)
            }
            (Directive::ReportMoney, Payload::MoneyQuery { currency }) => {
                self.report_money(&msg.sender, *currency)
            }
            (directive, _) => {
                self.reject(&msg.sender, ProtocolError::UnexpectedDirective(directive))
            }
        }
    }

    fn reject(&mut self, sender: &str, error: ProtocolError) -> Message {
        tracing::debug!(target: "reject", agent = %self.name, %error);
        Message::new(Directive::Rejected, &self.name, sender, Payload::Rejection(error))
    }

    fn start(&mut self, sender: &str) -> Message {
        self.units_transacted = 0;
        self.contract_this_period = false;
        if let Some(ladder) = self.values.as_mut() {
            ladder.reset();
        }
        if let Some(ladder) = self.costs.as_mut() {
            ladder.reset();
        }
        self.seed_quantities();
        Message::new(Directive::Confirm, &self.name, sender, Payload::Empty)
    }

    fn move_requested(&mut self, sender: &str, ctx: &MoveContext) -> Message {
        let step = if self.exhausted() {
            (0, 0)
        } else {
            let view = TraderView { contract_this_period: self.contract_this_period };
            self.strategy.choose_move(&view, ctx, &mut self.rng)
        };
        Message::new(Directive::Move, &self.name, sender, Payload::Move(step))
    }

    fn offer(&mut self, sender: &str, req: &OfferRequest) -> Message {
        let no_offer =
            |name: &str| Message::new(Directive::NoOffer, name, sender, Payload::Empty);
        let Some(side) = self.side_for(&req.dimension) else {
            return no_offer(&self.name);
        };
        match side {
            Side::Bid => {
                let Some(value) = self.values.as_ref().and_then(UnitLadder::current) else {
                    return no_offer(&self.name);
                };
                let Some(cap) = self.bid_cap(value, &req.dimension, req.bidding) else {
                    return no_offer(&self.name);
                };
                let price = self.rng.random_range(self.lower_bound..=cap);
                self.place(sender, Side::Bid, price)
            }
            Side::Ask => {
                let Some(cost) = self.costs.as_ref().and_then(UnitLadder::current) else {
                    return no_offer(&self.name);
                };
                if cost > self.upper_bound {
                    return no_offer(&self.name);
                }
                let price = self.rng.random_range(cost..=self.upper_bound);
                self.place(sender, Side::Ask, price)
            }
        }
    }

    fn place(&mut self, sender: &str, side: Side, price: i64) -> Message {
        Message::new(
            Directive::PlaceOffer,
            &self.name,
            sender,
            Payload::Place(Place { side, price }),
        )
    }

    /// Upper end of the individually-rational bid interval. Under monetary
    /// bidding a bid is additionally capped at on-hand cash; a cap below the
    /// lower bound means abstaining entirely.
    fn bid_cap(&self, value: i64, dimension: &Dimension, bidding: BiddingType) -> Option<i64> {
        let cap = match bidding {
            BiddingType::Abstract => value,
            BiddingType::Monetary => value.min(self.balance(dimension.currency)),
        };
        (cap >= self.lower_bound).then_some(cap)
    }

    fn transact(&mut self, sender: &str, req: &TransactRequest) -> Message {
        let no_trade =
            |name: &str| Message::new(Directive::NoTrade, name, sender, Payload::Empty);
        let Some(side) = self.side_for(&req.dimension) else {
            return no_trade(&self.name);
        };
        match side {
            Side::Bid => {
                // Buying: fresh reservation draw, then try an ask. Cash is
                // not re-checked here; a hard money limit is enforced by the
                // engine at settlement.
                let Some(value) = self.values.as_ref().and_then(UnitLadder::current) else {
                    return no_trade(&self.name);
                };
                if value < self.lower_bound {
                    return no_trade(&self.name);
                }
                let wtp = self.rng.random_range(self.lower_bound..=value);
                let candidates: Vec<&OrderSnapshot> =
                    req.eligible.iter().filter(|o| o.side == Side::Ask).collect();
                let pick = self.strategy.select_order(Side::Ask, &candidates, &mut self.rng);
                match pick {
                    Some(order) if wtp >= order.price => Message::new(
                        Directive::Buy,
                        &self.name,
                        sender,
                        Payload::Accept(order.id),
                    ),
                    _ => no_trade(&self.name),
                }
            }
            Side::Ask => {
                // Selling: fresh reservation draw, then try a bid.
                let Some(cost) = self.costs.as_ref().and_then(UnitLadder::current) else {
                    return no_trade(&self.name);
                };
                if cost > self.upper_bound {
                    return no_trade(&self.name);
                }
                let wta = self.rng.random_range(cost..=self.upper_bound);
                let candidates: Vec<&OrderSnapshot> =
                    req.eligible.iter().filter(|o| o.side == Side::Bid).collect();
                let pick = self.strategy.select_order(Side::Bid, &candidates, &mut self.rng);
                match pick {
                    Some(order) if wta <= order.price => Message::new(
                        Directive::Sell,
                        &self.name,
                        sender,
                        Payload::Accept(order.id),
                    ),
                    _ => no_trade(&self.name),
                }
            }
        }
    }

    fn contract(&mut self, sender: &str, notice: &ContractNotice) -> Message {
        let contract = &notice.contract;
        let named = match notice.role {
            TradeRole::Buyer => &contract.buyer,
            TradeRole::Seller => &contract.seller,
        };
        if *named != self.name {
            return self.reject(
                sender,
                ProtocolError::WrongParty { role: notice.role, id: contract.id },
            );
        }
        // A notice may not be applied twice for the same contract.
        if self.contracts.iter().any(|c| c.id == contract.id) {
            return Message::new(Directive::Confirm, &self.name, sender, Payload::Empty);
        }

        let key = (contract.right, contract.item);
        match notice.role {
            TradeRole::Buyer => {
                *self.quantities.entry(key).or_insert(0) += 1;
                *self.currencies.entry(contract.currency).or_insert(0) -= contract.price;
                if let Some(ladder) = self.values.as_mut() {
                    ladder.advance();
                }
            }
            TradeRole::Seller => {
                let held = self.quantities.entry(key).or_insert(0);
                *held = held.saturating_sub(1);
                *self.currencies.entry(contract.currency).or_insert(0) += contract.price;
                if let Some(ladder) = self.costs.as_mut() {
                    ladder.advance();
                }
            }
        }
        self.units_transacted += 1;
        self.contract_this_period = true;
        self.contracts.push(contract.clone());
        Message::new(Directive::Confirm, &self.name, sender, Payload::Empty)
    }

    fn report_quantity(&mut self, sender: &str, right: PropertyRight, item: ItemType) -> Message {
        let amount = self.quantity(right, item);
        Message::new(
            Directive::Quantity,
            &self.name,
            sender,
            Payload::QuantityReport { right, item, amount },
        )
    }

    fn report_money(&mut self, sender: &str, currency: Currency) -> Message {
        let amount = self.balance(currency);
        Message::new(
            Directive::Money,
            &self.name,
            sender,
            Payload::MoneyReport { currency, amount },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::ENGINE_ID;
    use crate::types::ContractId;

    fn offer_request(bidding: BiddingType) -> OfferRequest {
        OfferRequest { dimension: Dimension::spot(), book: vec![], bidding }
    }

    fn ask_snapshot(id: u64, price: i64) -> OrderSnapshot {
        OrderSnapshot {
            id: crate::types::OrderId(id),
            side: Side::Ask,
            price,
            owner: "seller0".into(),
            location: (0, 0),
        }
    }

    fn contract_for(buyer: &str, seller: &str, price: i64, id: u64) -> Contract {
        Contract {
            id: ContractId(id),
            bid: None,
            ask: Some(crate::types::OrderId(0)),
            buyer: buyer.into(),
            seller: seller.into(),
            price,
            right: PropertyRight::Spot,
            item: ItemType::C,
            currency: Currency::M,
            placed_location: (0, 0),
            accept_location: (0, 0),
            acceptor: buyer.into(),
            round: 0,
            period: 1,
            week: 1,
            bargain_location: (0, 0),
        }
    }

    fn send(trader: &mut Trader, directive: Directive, payload: Payload) -> Message {
        let msg = Message::new(directive, ENGINE_ID, trader.name().to_string(), payload);
        trader.process_message(&msg)
    }

    #[test]
    fn wrong_receiver_is_rejected_without_state_change() {
        let mut trader = Trader::buyer("buyer0", vec![100]);
        let msg = Message::new(Directive::Start, ENGINE_ID, "buyer1", Payload::Empty);
        let reply = trader.process_message(&msg);
        assert_eq!(reply.directive, Directive::Rejected);
        assert!(matches!(
            reply.payload,
            Payload::Rejection(ProtocolError::WrongReceiver { .. })
        ));
        assert_eq!(trader.cur_unit(Side::Bid), 0);
    }

    #[test]
    fn reply_directives_are_rejected_as_unexpected() {
        let mut trader = Trader::buyer("buyer0", vec![100]);
        let reply = send(&mut trader, Directive::Buy, Payload::Empty);
        assert!(matches!(
            reply.payload,
            Payload::Rejection(ProtocolError::UnexpectedDirective(Directive::Buy))
        ));
    }

    #[test]
    fn start_resets_cursors_and_seeds_inventory() {
        let mut trader = Trader::seller("seller0", vec![10, 20]);
        let notice = ContractNotice {
            role: TradeRole::Seller,
            contract: contract_for("buyer0", "seller0", 50, 1),
        };
        send(&mut trader, Directive::Contract, Payload::ContractNotice(notice));
        assert_eq!(trader.cur_unit(Side::Ask), 1);
        assert_eq!(trader.quantity(PropertyRight::Spot, ItemType::C), 1);
        assert!(trader.contract_this_period());

        let reply = send(&mut trader, Directive::Start, Payload::Empty);
        assert_eq!(reply.directive, Directive::Confirm);
        assert_eq!(trader.cur_unit(Side::Ask), 0);
        assert_eq!(trader.units_transacted(), 0);
        assert_eq!(trader.quantity(PropertyRight::Spot, ItemType::C), 2);
        assert!(!trader.contract_this_period());
    }

    #[test]
    fn buyer_bids_inside_the_rational_interval() {
        let mut trader = Trader::buyer("buyer0", vec![100]).with_bounds(20, 600).with_seed(9);
        for _ in 0..50 {
            let reply = send(
                &mut trader,
                Directive::Offer,
                Payload::OfferRequest(offer_request(BiddingType::Abstract)),
            );
            assert_eq!(reply.directive, Directive::PlaceOffer);
            let Payload::Place(place) = reply.payload else { panic!("expected a placed offer") };
            assert_eq!(place.side, Side::Bid);
            assert!((20..=100).contains(&place.price));
        }
    }

    #[test]
    fn seller_asks_inside_the_rational_interval() {
        let mut trader = Trader::seller("seller0", vec![10]).with_bounds(0, 200).with_seed(10);
        for _ in 0..50 {
            let reply = send(
                &mut trader,
                Directive::Offer,
                Payload::OfferRequest(offer_request(BiddingType::Abstract)),
            );
            let Payload::Place(place) = reply.payload else { panic!("expected a placed offer") };
            assert_eq!(place.side, Side::Ask);
            assert!((10..=200).contains(&place.price));
        }
    }

    #[test]
    fn monetary_bid_is_capped_at_cash() {
        let mut trader = Trader::buyer("buyer0", vec![100])
            .with_money(Currency::M, 40)
            .with_seed(11);
        for _ in 0..50 {
            let reply = send(
                &mut trader,
                Directive::Offer,
                Payload::OfferRequest(offer_request(BiddingType::Monetary)),
            );
            let Payload::Place(place) = reply.payload else { panic!("expected a placed offer") };
            assert!(place.price <= 40);
        }
    }

    #[test]
    fn monetary_buyer_abstains_when_cash_is_below_lower_bound() {
        let mut trader = Trader::buyer("buyer0", vec![100])
            .with_bounds(50, 600)
            .with_money(Currency::M, 30);
        let reply = send(
            &mut trader,
            Directive::Offer,
            Payload::OfferRequest(offer_request(BiddingType::Monetary)),
        );
        assert_eq!(reply.directive, Directive::NoOffer);
    }

    #[test]
    fn exhausted_trader_goes_silent_and_stops_moving() {
        let mut trader = Trader::buyer("buyer0", vec![100]);
        let notice = ContractNotice {
            role: TradeRole::Buyer,
            contract: contract_for("buyer0", "seller0", 50, 1),
        };
        send(&mut trader, Directive::Contract, Payload::ContractNotice(notice));
        assert!(trader.exhausted());

        let reply = send(
            &mut trader,
            Directive::Offer,
            Payload::OfferRequest(offer_request(BiddingType::Abstract)),
        );
        assert_eq!(reply.directive, Directive::NoOffer);

        let reply = send(
            &mut trader,
            Directive::Transact,
            Payload::TransactRequest(TransactRequest {
                dimension: Dimension::spot(),
                eligible: vec![ask_snapshot(1, 1)],
            }),
        );
        assert_eq!(reply.directive, Directive::NoTrade);

        let reply = send(
            &mut trader,
            Directive::MoveRequested,
            Payload::MoveContext(MoveContext::default()),
        );
        assert_eq!(reply.payload, Payload::Move((0, 0)));
    }

    #[test]
    fn buyer_accepts_only_when_reservation_is_satisfied() {
        // lower_bound pinned to the value makes the reservation draw
        // degenerate at 100.
        let mut trader = Trader::buyer("buyer0", vec![100]).with_bounds(100, 600);
        let reply = send(
            &mut trader,
            Directive::Transact,
            Payload::TransactRequest(TransactRequest {
                dimension: Dimension::spot(),
                eligible: vec![ask_snapshot(1, 90)],
            }),
        );
        assert_eq!(reply.directive, Directive::Buy);
        assert_eq!(reply.payload, Payload::Accept(crate::types::OrderId(1)));

        let reply = send(
            &mut trader,
            Directive::Transact,
            Payload::TransactRequest(TransactRequest {
                dimension: Dimension::spot(),
                eligible: vec![ask_snapshot(2, 150)],
            }),
        );
        assert_eq!(reply.directive, Directive::NoTrade);
    }

    #[test]
    fn contract_updates_positions_on_both_sides() {
        let mut buyer = Trader::buyer("buyer0", vec![100]).with_money(Currency::M, 500);
        let mut seller = Trader::seller("seller0", vec![10]).with_money(Currency::M, 0);
        let contract = contract_for("buyer0", "seller0", 60, 1);

        let notice = ContractNotice { role: TradeRole::Buyer, contract: contract.clone() };
        let reply = send(&mut buyer, Directive::Contract, Payload::ContractNotice(notice));
        assert_eq!(reply.directive, Directive::Confirm);
        assert_eq!(buyer.quantity(PropertyRight::Spot, ItemType::C), 1);
        assert_eq!(buyer.balance(Currency::M), 440);
        assert_eq!(buyer.cur_unit(Side::Bid), 1);

        let notice = ContractNotice { role: TradeRole::Seller, contract };
        send(&mut seller, Directive::Contract, Payload::ContractNotice(notice));
        assert_eq!(seller.quantity(PropertyRight::Spot, ItemType::C), 0);
        assert_eq!(seller.balance(Currency::M), 60);
        assert_eq!(seller.cur_unit(Side::Ask), 1);
    }

    #[test]
    fn contract_for_someone_else_is_rejected_untouched() {
        let mut trader = Trader::buyer("buyer1", vec![100]);
        let notice = ContractNotice {
            role: TradeRole::Buyer,
            contract: contract_for("buyer0", "seller0", 60, 1),
        };
        let reply = send(&mut trader, Directive::Contract, Payload::ContractNotice(notice));
        assert!(matches!(
            reply.payload,
            Payload::Rejection(ProtocolError::WrongParty { .. })
        ));
        assert_eq!(trader.units_transacted(), 0);
        assert_eq!(trader.cur_unit(Side::Bid), 0);
    }

    #[test]
    fn contract_is_applied_exactly_once() {
        let mut trader = Trader::buyer("buyer0", vec![100, 90]);
        let notice = ContractNotice {
            role: TradeRole::Buyer,
            contract: contract_for("buyer0", "seller0", 60, 1),
        };
        send(&mut trader, Directive::Contract, Payload::ContractNotice(notice.clone()));
        let reply = send(&mut trader, Directive::Contract, Payload::ContractNotice(notice));
        assert_eq!(reply.directive, Directive::Confirm);
        assert_eq!(trader.units_transacted(), 1);
        assert_eq!(trader.cur_unit(Side::Bid), 1);
    }

    #[test]
    fn reports_are_pure_accessors() {
        let mut trader = Trader::seller("seller0", vec![10, 20]).with_money(Currency::M, 75);
        let reply = send(
            &mut trader,
            Directive::ReportQuantity,
            Payload::QuantityQuery { right: PropertyRight::Spot, item: ItemType::C },
        );
        assert_eq!(
            reply.payload,
            Payload::QuantityReport {
                right: PropertyRight::Spot,
                item: ItemType::C,
                amount: 2
            }
        );

        let reply = send(
            &mut trader,
            Directive::ReportMoney,
            Payload::MoneyQuery { currency: Currency::M },
        );
        assert_eq!(reply.payload, Payload::MoneyReport { currency: Currency::M, amount: 75 });

        // Unknown entries read as zero.
        let reply = send(
            &mut trader,
            Directive::ReportQuantity,
            Payload::QuantityQuery { right: PropertyRight::Rent, item: ItemType::C },
        );
        assert_eq!(
            reply.payload,
            Payload::QuantityReport {
                right: PropertyRight::Rent,
                item: ItemType::C,
                amount: 0
            }
        );
    }

    #[test]
    fn two_sided_trader_takes_the_side_the_dimension_implies() {
        let mut trader =
            Trader::two_sided("t0", ItemType::X, vec![100], ItemType::Y, vec![10])
                .with_bounds(0, 200)
                .with_seed(12);
        let x = Dimension::new(PropertyRight::Spot, ItemType::X, Currency::M);
        let y = Dimension::new(PropertyRight::Spot, ItemType::Y, Currency::M);

        let reply = send(
            &mut trader,
            Directive::Offer,
            Payload::OfferRequest(OfferRequest {
                dimension: x,
                book: vec![],
                bidding: BiddingType::Abstract,
            }),
        );
        let Payload::Place(place) = reply.payload else { panic!("expected a bid in X") };
        assert_eq!(place.side, Side::Bid);

        let reply = send(
            &mut trader,
            Directive::Offer,
            Payload::OfferRequest(OfferRequest {
                dimension: y,
                book: vec![],
                bidding: BiddingType::Abstract,
            }),
        );
        let Payload::Place(place) = reply.payload else { panic!("expected an ask in Y") };
        assert_eq!(place.side, Side::Ask);

        // A dimension it trades neither item in draws no offer.
        let reply = send(
            &mut trader,
            Directive::Offer,
            Payload::OfferRequest(offer_request(BiddingType::Abstract)),
        );
        assert_eq!(reply.directive, Directive::NoOffer);
    }
}
