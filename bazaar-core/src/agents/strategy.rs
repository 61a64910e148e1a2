use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::market::order::OrderSnapshot;
use crate::msg::MoveContext;
use crate::types::{Displacement, Side};

/// The slice of trader state a decision hook may consult.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraderView {
    pub contract_this_period: bool,
}

/// Decision policy of a trader. The protocol handlers live on [`Trader`];
/// variants only override the hooks below. Defaults are the plain
/// zero-intelligence policy.
///
/// [`Trader`]: crate::agents::trader::Trader
pub trait Strategy {
    fn kind(&self) -> &'static str;

    /// Displacement for the coming travel step. Only called while the trader
    /// can still trade; an exhausted trader never moves.
    fn choose_move(
        &mut self,
        _view: &TraderView,
        _ctx: &MoveContext,
        rng: &mut StdRng,
    ) -> Displacement {
        uniform_step(rng)
    }

    /// Pick a counter-order to try to accept. `candidates` all sit on
    /// `counter_side`; the reservation check happens after selection.
    fn select_order<'a>(
        &mut self,
        _counter_side: Side,
        candidates: &[&'a OrderSnapshot],
        rng: &mut StdRng,
    ) -> Option<&'a OrderSnapshot> {
        candidates.choose(rng).copied()
    }
}

/// One uniform step: each component drawn from {-1, 0, +1}.
pub fn uniform_step(rng: &mut StdRng) -> Displacement {
    (rng.random_range(-1i8..=1), rng.random_range(-1i8..=1))
}

/// One uniform step that never stays put: each component from {-1, +1}.
pub fn flee_step(rng: &mut StdRng) -> Displacement {
    let pick = |rng: &mut StdRng| if rng.random_range(0..2) == 0 { -1i8 } else { 1 };
    (pick(rng), pick(rng))
}

/// Best-priced candidate for an acceptor facing `counter_side`: the lowest
/// ask for a buyer, the highest bid for a seller. First-seen wins ties.
pub fn best_priced<'a>(
    counter_side: Side,
    candidates: &[&'a OrderSnapshot],
) -> Option<&'a OrderSnapshot> {
    let mut best: Option<&'a OrderSnapshot> = None;
    for &candidate in candidates {
        let better = match best {
            None => true,
            Some(found) => match counter_side {
                Side::Ask => candidate.price < found.price,
                Side::Bid => candidate.price > found.price,
            },
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::types::OrderId;

    fn snapshot(id: u64, side: Side, price: i64) -> OrderSnapshot {
        OrderSnapshot {
            id: OrderId(id),
            side,
            price,
            owner: format!("t{id}"),
            location: (0, 0),
        }
    }

    #[test]
    fn uniform_step_stays_on_the_unit_square() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let (dx, dy) = uniform_step(&mut rng);
            assert!((-1..=1).contains(&dx));
            assert!((-1..=1).contains(&dy));
        }
    }

    #[test]
    fn flee_step_never_stays_put_on_either_axis() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..200 {
            let (dx, dy) = flee_step(&mut rng);
            assert!(dx == -1 || dx == 1);
            assert!(dy == -1 || dy == 1);
        }
    }

    #[test]
    fn best_priced_minimizes_asks_and_maximizes_bids() {
        let asks = [
            snapshot(1, Side::Ask, 30),
            snapshot(2, Side::Ask, 10),
            snapshot(3, Side::Ask, 20),
        ];
        let refs: Vec<&OrderSnapshot> = asks.iter().collect();
        assert_eq!(best_priced(Side::Ask, &refs).unwrap().id, OrderId(2));

        let bids = [
            snapshot(4, Side::Bid, 30),
            snapshot(5, Side::Bid, 80),
            snapshot(6, Side::Bid, 50),
        ];
        let refs: Vec<&OrderSnapshot> = bids.iter().collect();
        assert_eq!(best_priced(Side::Bid, &refs).unwrap().id, OrderId(5));
    }

    #[test]
    fn best_priced_ties_break_first_seen() {
        let asks = [snapshot(1, Side::Ask, 10), snapshot(2, Side::Ask, 10)];
        let refs: Vec<&OrderSnapshot> = asks.iter().collect();
        assert_eq!(best_priced(Side::Ask, &refs).unwrap().id, OrderId(1));
        assert!(best_priced(Side::Ask, &[]).is_none());
    }
}
