//! Per-player, per-instrument position accounting (§3 `positions`, §4.1
//! `update_positions`, invariant 5).

use serde::Serialize;

use crate::orderbook::Direction;

/// A player's holding in one instrument (or `CASH`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct Position {
    pub size: i64,
    pub average_price: f64,
}

impl Position {
    pub fn zero() -> Self {
        Self { size: 0, average_price: 0.0 }
    }

    /// The `CASH` row's fixed shape: zero size, average price pinned at 1.
    pub fn cash() -> Self {
        Self { size: 0, average_price: 1.0 }
    }

    /// Applies one fill's VWAP recurrence (§4.1):
    /// `new_avg = (prev_size·prev_avg ± size·price) / (prev_size ± size)`,
    /// 0 if the new size is 0. `direction` is this fill's own side, not the
    /// taker's.
    pub fn apply_fill(&mut self, direction: Direction, price: i64, size: i64) {
        let signed_size = match direction {
            Direction::Bid => size,
            Direction::Ask => -size,
        };
        let prev_size = self.size;
        let prev_avg = self.average_price;
        let new_size = prev_size + signed_size;
        self.average_price = if new_size != 0 {
            (prev_size as f64 * prev_avg + signed_size as f64 * price as f64) / new_size as f64
        } else {
            0.0
        };
        self.size = new_size;
    }

    /// Cash moves opposite to the instrument fill: debited on a bid,
    /// credited on an ask. `average_price` stays fixed at 1 regardless of
    /// size (§3).
    pub fn apply_cash_fill(&mut self, direction: Direction, price: i64, size: i64) {
        let delta = match direction {
            Direction::Bid => -(price * size),
            Direction::Ask => price * size,
        };
        self.size += delta;
        self.average_price = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bid_fill_increases_size_and_weights_average_price() {
        let mut pos = Position::zero();
        pos.apply_fill(Direction::Bid, 10, 2);
        assert_eq!(pos.size, 2);
        assert_eq!(pos.average_price, 10.0);
        pos.apply_fill(Direction::Bid, 20, 2);
        assert_eq!(pos.size, 4);
        assert_eq!(pos.average_price, 15.0);
    }

    #[test]
    fn ask_fill_decreases_size() {
        let mut pos = Position { size: 4, average_price: 15.0 };
        pos.apply_fill(Direction::Ask, 20, 4);
        assert_eq!(pos.size, 0);
        assert_eq!(pos.average_price, 0.0);
    }

    #[test]
    fn cash_fill_debits_on_bid_credits_on_ask() {
        let mut cash = Position::cash();
        cash.apply_cash_fill(Direction::Bid, 5, 2);
        assert_eq!(cash.size, -10);
        assert_eq!(cash.average_price, 1.0);
        cash.apply_cash_fill(Direction::Ask, 5, 2);
        assert_eq!(cash.size, 0);
        assert_eq!(cash.average_price, 1.0);
    }
}
