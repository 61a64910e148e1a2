pub mod strategy;
pub mod trader;
pub mod zi;

pub use strategy::{Strategy, TraderView};
pub use trader::{Trader, UnitLadder};
pub use zi::{Zi, ZiAffinity, ZiCongestion, ZiPriority, ZiPriorityAffinity};
