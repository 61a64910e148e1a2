//! Concrete zero-intelligence strategy variants. All draw reservation prices
//! the same way (that part lives on the trader); they differ only in how a
//! counter-order is selected and how the agent moves between periods.

use rand::rngs::StdRng;

use crate::agents::strategy::{Strategy, TraderView, best_priced, flee_step, uniform_step};
use crate::market::order::OrderSnapshot;
use crate::msg::MoveContext;
use crate::types::{Displacement, Side};

/// Plain zero-intelligence: uniform random movement, uniform random
/// counter-order selection.
#[derive(Debug, Default)]
pub struct Zi;

impl Strategy for Zi {
    fn kind(&self) -> &'static str {
        "zi"
    }
}

/// Priority matching: accepts the best-priced counter-order instead of a
/// random one.
#[derive(Debug, Default)]
pub struct ZiPriority;

impl Strategy for ZiPriority {
    fn kind(&self) -> &'static str {
        "zi-priority"
    }

    fn select_order<'a>(
        &mut self,
        counter_side: Side,
        candidates: &[&'a OrderSnapshot],
        _rng: &mut StdRng,
    ) -> Option<&'a OrderSnapshot> {
        best_priced(counter_side, candidates)
    }
}

/// Location affinity: stays put after landing a contract this period.
#[derive(Debug, Default)]
pub struct ZiAffinity;

impl Strategy for ZiAffinity {
    fn kind(&self) -> &'static str {
        "zi-affinity"
    }

    fn choose_move(
        &mut self,
        view: &TraderView,
        _ctx: &MoveContext,
        rng: &mut StdRng,
    ) -> Displacement {
        if view.contract_this_period {
            (0, 0)
        } else {
            uniform_step(rng)
        }
    }
}

/// Priority matching plus location affinity.
#[derive(Debug, Default)]
pub struct ZiPriorityAffinity;

impl Strategy for ZiPriorityAffinity {
    fn kind(&self) -> &'static str {
        "zi-priority-affinity"
    }

    fn choose_move(
        &mut self,
        view: &TraderView,
        _ctx: &MoveContext,
        rng: &mut StdRng,
    ) -> Displacement {
        if view.contract_this_period {
            (0, 0)
        } else {
            uniform_step(rng)
        }
    }

    fn select_order<'a>(
        &mut self,
        counter_side: Side,
        candidates: &[&'a OrderSnapshot],
        _rng: &mut StdRng,
    ) -> Option<&'a OrderSnapshot> {
        best_priced(counter_side, candidates)
    }
}

/// Congestion avoidance: priority matching with affinity, but a crowded cell
/// overrides the stay bias and forces a step away.
#[derive(Debug)]
pub struct ZiCongestion {
    pub crowd_threshold: usize,
}

impl Default for ZiCongestion {
    fn default() -> Self {
        Self { crowd_threshold: 2 }
    }
}

impl Strategy for ZiCongestion {
    fn kind(&self) -> &'static str {
        "zi-congestion"
    }

    fn choose_move(
        &mut self,
        view: &TraderView,
        ctx: &MoveContext,
        rng: &mut StdRng,
    ) -> Displacement {
        if ctx.neighbors_at_location > self.crowd_threshold {
            flee_step(rng)
        } else if view.contract_this_period {
            (0, 0)
        } else {
            uniform_step(rng)
        }
    }

    fn select_order<'a>(
        &mut self,
        counter_side: Side,
        candidates: &[&'a OrderSnapshot],
        _rng: &mut StdRng,
    ) -> Option<&'a OrderSnapshot> {
        best_priced(counter_side, candidates)
    }
}
