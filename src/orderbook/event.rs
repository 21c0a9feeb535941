//! Events produced by matching and cancellation.
//!
//! The teacher routes book mutations out through a callback
//! (`TradeListener`/`PriceLevelChangedListener`, see `manager.rs` and
//! `book_change_event.rs`). This port generalizes that pattern into a
//! plain returned `Vec<BookEvent>` instead of a callback, because a
//! callback would need to be async (to reach a player's sink) and
//! `PriceLevel`/`OrderBook` are meant to stay synchronous and unit-testable
//! (§9 "Cyclic references" resolution) — the owning `Room` is the only
//! thing that ever awaits.

use crate::orderbook::order::OrderSnapshot;

/// A single fact produced while placing or cancelling an order, to be
/// turned into I/O (and Room-level bookkeeping) by the caller.
#[derive(Debug, Clone)]
pub enum BookEvent {
    /// Emitted once, immediately, when an order is first accepted (§4.2
    /// step 1), before any crossing is attempted.
    OrderPlaced(OrderSnapshot),

    /// One `Fill` is emitted for the maker and one for the taker on every
    /// unit of matching (§4.3 "Fill semantics"). `price` is always the
    /// level's own price (maker print; price improvement for the taker).
    Fill {
        snapshot: OrderSnapshot,
        price: i64,
        size: i64,
        is_taker: bool,
    },

    /// Emitted once per order removed by a cancel (§4.2 "Cancel algorithm").
    OrderCancelled(OrderSnapshot),
}

/// The result of matching an incoming order against a single resting
/// [`crate::orderbook::price_level::PriceLevel`] (§4.3 "Opposite side").
pub(crate) enum MatchOutcome {
    /// The incoming order was fully filled. The level itself may or may
    /// not be empty afterward; the caller checks that separately.
    Done(crate::orderbook::order::Order),
    /// The level was fully drained and the incoming order's residual sits
    /// at exactly this level's price, so the level flipped to the
    /// incoming order's side in place.
    Flipped,
    /// The level was fully drained but the incoming order still has a
    /// residual at a different price; the caller continues walking.
    Drained(crate::orderbook::order::Order),
}
