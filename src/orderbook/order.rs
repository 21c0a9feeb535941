//! Resting order records.
//!
//! Grounded in `original_source/structures/book.py`'s `Order` class. Per
//! SPEC_FULL §9 ("Cyclic references"), an `Order` here knows only its
//! `player` and `instrument` by name — it never holds a reference back to
//! its `Room` or `OrderBook`. Lifecycle transitions (`fill`, `cancel`)
//! mutate the order in place; the caller (`PriceLevel`) is responsible for
//! turning the post-mutation state into a [`crate::orderbook::event::BookEvent`].

use serde::{Deserialize, Serialize};

/// Which side of the book a resting order (or incoming order) sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bid,
    Ask,
}

impl Direction {
    /// The side a crossing order must walk to find resting liquidity.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Bid => Direction::Ask,
            Direction::Ask => Direction::Bid,
        }
    }

    /// The taker-side vocabulary used on `TradeUpdate` (§6): `buy`/`sell`
    /// rather than `bid`/`ask`.
    pub fn as_trade_side(self) -> TradeSide {
        match self {
            Direction::Bid => TradeSide::Buy,
            Direction::Ask => TradeSide::Sell,
        }
    }
}

/// The `buy`/`sell` vocabulary used on outbound `TradeUpdate` messages,
/// distinct from the book-side `Direction` (`bid`/`ask`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Lifecycle status of a resting order. Transitions once: `Active` to
/// either `Filled` or `Cancelled`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Active,
    Filled,
    Cancelled,
}

/// A resting order record (§3).
#[derive(Debug, Clone)]
pub struct Order {
    pub order_id: u64,
    pub player: String,
    pub instrument: String,
    pub direction: Direction,
    pub price: i64,
    pub size: i64,
    pub remaining_size: i64,
    pub status: OrderStatus,
}

impl Order {
    pub fn new(
        order_id: u64,
        player: String,
        instrument: String,
        direction: Direction,
        price: i64,
        size: i64,
    ) -> Self {
        Self {
            order_id,
            player,
            instrument,
            direction,
            price,
            size,
            remaining_size: size,
            status: OrderStatus::Active,
        }
    }

    /// Applies a fill of `qty` units. `qty` exceeding `remaining_size` is an
    /// invariant violation (§7 kind 4) and panics rather than returning a
    /// `Result` — the matching loop only ever calls this with
    /// `qty <= remaining_size` by construction.
    pub fn fill(&mut self, qty: i64) {
        assert!(
            qty > 0 && qty <= self.remaining_size,
            "fill of {qty} exceeds remaining size {}",
            self.remaining_size
        );
        self.remaining_size -= qty;
        if self.remaining_size == 0 {
            self.status = OrderStatus::Filled;
        }
    }

    pub fn cancel(&mut self) {
        self.remaining_size = 0;
        self.status = OrderStatus::Cancelled;
    }

    pub fn snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            instrument: self.instrument.clone(),
            order_id: self.order_id,
            player: self.player.clone(),
            price: self.price,
            size: self.size,
            remaining_size: self.remaining_size,
            direction: self.direction,
            status: self.status,
        }
    }
}

/// A point-in-time copy of an order's fields, carried by [`crate::orderbook::event::BookEvent`]
/// so the book's matching logic never needs to await or hold a reference to
/// the player it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSnapshot {
    pub instrument: String,
    pub order_id: u64,
    pub player: String,
    pub price: i64,
    pub size: i64,
    pub remaining_size: i64,
    pub direction: Direction,
    pub status: OrderStatus,
}
