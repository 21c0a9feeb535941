//! A single price level: a FIFO queue of resting orders at one price.
//!
//! Grounded in `original_source/structures/book.py`'s `PricePoint.new_order`,
//! which implements the empty/same-side/opposite-side cases in one method
//! against a mutable `Order` reference. This port splits that one Python
//! method into two Rust methods (`rest` for the non-crossing cases, which
//! `OrderBook` already knows apply before calling in; `match_against` for
//! the crossing case) because Rust's ownership rules make "the caller
//! already knows which case applies" cheaper to express than re-deriving it
//! inside a single method.

use std::collections::VecDeque;

use crate::orderbook::event::{BookEvent, MatchOutcome};
use crate::orderbook::order::{Direction, Order};

/// Resting liquidity at one price (§3, §4.3).
#[derive(Debug, Clone)]
pub struct PriceLevel {
    pub price: i64,
    pub size: i64,
    pub direction: Option<Direction>,
    queue: VecDeque<Order>,
}

impl PriceLevel {
    pub fn new(price: i64) -> Self {
        Self {
            price,
            size: 0,
            direction: None,
            queue: VecDeque::new(),
        }
    }

    /// `direction == None` iff the queue is empty (invariant 2, §3).
    pub fn is_empty(&self) -> bool {
        self.direction.is_none()
    }

    /// Appends `order` as resting liquidity on `direction`. Valid only
    /// when the level is empty or already resting on `direction` — the
    /// caller (`OrderBook`) is responsible for routing crossing orders to
    /// [`Self::match_against`] instead.
    pub fn rest(&mut self, direction: Direction, order: Order) {
        debug_assert!(self.direction.is_none() || self.direction == Some(direction));
        self.direction = Some(direction);
        self.size += order.remaining_size;
        self.queue.push_back(order);
    }

    /// Matches `order` against this level's resting queue (§4.3 "Opposite
    /// side"). The caller guarantees `order.direction` is the opposite of
    /// this level's current `direction`.
    pub fn match_against(&mut self, mut order: Order) -> (Vec<BookEvent>, MatchOutcome) {
        let taker_direction = order.direction;
        debug_assert_eq!(self.direction, Some(taker_direction.opposite()));

        let mut events = Vec::new();

        while order.remaining_size > 0 {
            let Some(mut maker) = self.queue.pop_front() else {
                break;
            };
            let fill_size = maker.remaining_size.min(order.remaining_size);
            maker.fill(fill_size);
            order.fill(fill_size);
            self.size -= fill_size;

            events.push(BookEvent::Fill {
                snapshot: maker.snapshot(),
                price: self.price,
                size: fill_size,
                is_taker: false,
            });
            events.push(BookEvent::Fill {
                snapshot: order.snapshot(),
                price: self.price,
                size: fill_size,
                is_taker: true,
            });

            if maker.remaining_size > 0 {
                self.queue.push_front(maker);
            }
        }

        if self.queue.is_empty() {
            self.direction = None;
        }

        if order.remaining_size == 0 {
            (events, MatchOutcome::Done(order))
        } else if order.price == self.price {
            // Level-price flip (§4.3, glossary "Level flip").
            self.direction = Some(taker_direction);
            self.size = order.remaining_size;
            self.queue.push_back(order);
            (events, MatchOutcome::Flipped)
        } else {
            (events, MatchOutcome::Drained(order))
        }
    }

    /// Orders currently resting at this level, in FIFO order.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.queue.iter()
    }

    /// Cancels every resting order belonging to `player` (§4.3 "Cancel").
    pub fn cancel(&mut self, player: &str) -> Vec<BookEvent> {
        let mut events = Vec::new();
        let mut remaining = VecDeque::with_capacity(self.queue.len());
        while let Some(mut order) = self.queue.pop_front() {
            if order.player == player {
                self.size -= order.remaining_size;
                order.cancel();
                events.push(BookEvent::OrderCancelled(order.snapshot()));
            } else {
                remaining.push_back(order);
            }
        }
        self.queue = remaining;
        if self.queue.is_empty() {
            self.direction = None;
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::event::BookEvent;

    fn order(id: u64, player: &str, direction: Direction, price: i64, size: i64) -> Order {
        Order::new(id, player.into(), "A".into(), direction, price, size)
    }

    #[test]
    fn empty_level_becomes_resting_on_first_order() {
        let mut level = PriceLevel::new(5);
        level.rest(Direction::Bid, order(1, "p1", Direction::Bid, 5, 3));
        assert_eq!(level.direction, Some(Direction::Bid));
        assert_eq!(level.size, 3);
    }

    #[test]
    fn same_side_append_preserves_time_priority() {
        let mut level = PriceLevel::new(5);
        level.rest(Direction::Bid, order(1, "p1", Direction::Bid, 5, 2));
        level.rest(Direction::Bid, order(2, "p2", Direction::Bid, 5, 4));
        assert_eq!(level.size, 6);
    }

    #[test]
    fn exact_match_empties_level_and_emits_fills_for_both_sides() {
        let mut level = PriceLevel::new(5);
        level.rest(Direction::Bid, order(1, "p1", Direction::Bid, 5, 3));
        let taker = order(2, "p2", Direction::Ask, 5, 3);
        let (events, outcome) = level.match_against(taker);
        assert!(level.is_empty());
        assert!(matches!(outcome, MatchOutcome::Done(_)));
        let fills: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, BookEvent::Fill { .. }))
            .collect();
        assert_eq!(fills.len(), 2);
    }

    #[test]
    fn residual_at_same_price_flips_the_level() {
        let mut level = PriceLevel::new(5);
        level.rest(Direction::Bid, order(1, "p1", Direction::Bid, 5, 5));
        let taker = order(2, "p2", Direction::Ask, 5, 8);
        let (_events, outcome) = level.match_against(taker);
        assert!(matches!(outcome, MatchOutcome::Flipped));
        assert_eq!(level.direction, Some(Direction::Ask));
        assert_eq!(level.size, 3);
    }

    #[test]
    fn cancel_removes_only_the_named_players_orders() {
        let mut level = PriceLevel::new(4);
        level.rest(Direction::Bid, order(1, "p1", Direction::Bid, 4, 2));
        level.rest(Direction::Bid, order(2, "p1", Direction::Bid, 4, 1));
        level.rest(Direction::Bid, order(3, "p2", Direction::Bid, 4, 5));
        let events = level.cancel("p1");
        assert_eq!(events.len(), 2);
        assert_eq!(level.size, 5);
        assert_eq!(level.direction, Some(Direction::Bid));
    }

    #[test]
    fn cancel_draining_the_level_clears_direction() {
        let mut level = PriceLevel::new(4);
        level.rest(Direction::Bid, order(1, "p1", Direction::Bid, 4, 2));
        level.cancel("p1");
        assert!(level.is_empty());
    }
}
