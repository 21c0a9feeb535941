//! The per-instrument order book: sparse indexed price-level arrays plus
//! the crossing/resting/trimming algorithms that operate on them (§4.2,
//! §4.4).
//!
//! Grounded in `original_source/structures/book.py`'s `OrderBook.new_order`
//! and `OrderBook.delete`. The Python implementation mutates an `Order` by
//! shared reference throughout; this port instead threads ownership of the
//! `Order` explicitly through [`MatchOutcome`], since Rust has no implicit
//! aliasing. The teacher's `Vec<Option<PriceLevel>>`-shaped "no level here"
//! sentinel follows SPEC_FULL §9: `Option` already is the tagged-empty
//! variant the design note asks for.

use serde::Serialize;
use tracing::{debug, trace};

use crate::orderbook::error::OrderBookError;
use crate::orderbook::event::{BookEvent, MatchOutcome};
use crate::orderbook::order::{Direction, Order};
use crate::orderbook::price_level::PriceLevel;

/// One per instrument (§2, §3).
#[derive(Debug, Clone)]
pub struct OrderBook {
    pub symbol: String,
    pub tick_size: i64,
    bids: Vec<Option<PriceLevel>>,
    asks: Vec<Option<PriceLevel>>,
    best_bid: Option<i64>,
    best_ask: Option<i64>,
    last_order_id: u64,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>, tick_size: i64) -> Self {
        Self {
            symbol: symbol.into(),
            tick_size,
            bids: Vec::new(),
            asks: Vec::new(),
            best_bid: None,
            best_ask: None,
            last_order_id: 0,
        }
    }

    pub fn best_bid(&self) -> Option<i64> {
        self.best_bid
    }

    pub fn best_ask(&self) -> Option<i64> {
        self.best_ask
    }

    fn levels(&self, side: Direction) -> &Vec<Option<PriceLevel>> {
        match side {
            Direction::Bid => &self.bids,
            Direction::Ask => &self.asks,
        }
    }

    fn levels_mut(&mut self, side: Direction) -> &mut Vec<Option<PriceLevel>> {
        match side {
            Direction::Bid => &mut self.bids,
            Direction::Ask => &mut self.asks,
        }
    }

    fn best(&self, side: Direction) -> Option<i64> {
        match side {
            Direction::Bid => self.best_bid,
            Direction::Ask => self.best_ask,
        }
    }

    fn set_best(&mut self, side: Direction, price: Option<i64>) {
        match side {
            Direction::Bid => self.best_bid = price,
            Direction::Ask => self.best_ask = price,
        }
    }

    /// Ensures `levels(side)` has a slot for `price`, padding with empty
    /// slots and updating the best price as needed (§4.2 step 3). Does not
    /// touch the contents of the returned slot.
    fn ensure_slot(&mut self, side: Direction, price: i64) -> usize {
        match self.best(side) {
            None => {
                *self.levels_mut(side) = vec![None];
                self.set_best(side, Some(price));
                0
            }
            Some(best) => {
                let i = match side {
                    Direction::Ask => (price - best) / self.tick_size,
                    Direction::Bid => (best - price) / self.tick_size,
                };
                let len = self.levels(side).len() as i64;
                if i > len - 1 {
                    let pad = (i - len + 1) as usize;
                    self.levels_mut(side).extend(std::iter::repeat_with(|| None).take(pad));
                    i as usize
                } else if i < 0 {
                    let pad = (-i) as usize;
                    let mut padded: Vec<Option<PriceLevel>> =
                        std::iter::repeat_with(|| None).take(pad).collect();
                    padded.append(self.levels_mut(side));
                    *self.levels_mut(side) = padded;
                    self.set_best(side, Some(price));
                    0
                } else {
                    i as usize
                }
            }
        }
    }

    /// Resting placement for a non-crossing order (§4.2 step 3).
    fn rest_new(&mut self, order: Order) -> Vec<BookEvent> {
        let side = order.direction;
        let idx = self.ensure_slot(side, order.price);
        match self.levels_mut(side)[idx].as_mut() {
            Some(level) => level.rest(side, order),
            None => {
                let mut level = PriceLevel::new(order.price);
                level.rest(side, order);
                self.levels_mut(side)[idx] = Some(level);
            }
        }
        Vec::new()
    }

    /// Relocates an already-populated level (produced by a level-price
    /// flip, §4.3) into its new side's array. The destination slot is
    /// guaranteed empty: invariant 3 (no crossed book at rest) rules out a
    /// pre-existing resting level on the new side at this exact price.
    fn place_level(&mut self, side: Direction, level: PriceLevel) {
        let idx = self.ensure_slot(side, level.price);
        debug_assert!(self.levels(side)[idx].is_none(), "flip target slot unexpectedly occupied");
        self.levels_mut(side)[idx] = Some(level);
    }

    /// Removes a specific empty level, trimming leading/trailing empty
    /// runs per invariant 4 (§4.4).
    fn delete(&mut self, side: Direction, price: i64) {
        let Some(best) = self.best(side) else { return };
        let idx = match side {
            Direction::Ask => (price - best) / self.tick_size,
            Direction::Bid => (best - price) / self.tick_size,
        };
        let len = self.levels(side).len() as i64;
        if idx < 0 || idx > len - 1 {
            return;
        }
        let idx = idx as usize;
        let last = self.levels(side).len() - 1;

        if idx == 0 {
            let levels = self.levels_mut(side);
            let mut pop = 1;
            while pop < levels.len() && levels[pop].is_none() {
                pop += 1;
            }
            levels.drain(0..pop);
            if levels.is_empty() {
                self.set_best(side, None);
            } else {
                let new_best = levels[0].as_ref().expect("first slot occupied after trim").price;
                self.set_best(side, Some(new_best));
            }
        } else if idx == last {
            let levels = self.levels_mut(side);
            let mut pop = 1;
            while pop <= idx && levels[idx - pop].is_none() {
                pop += 1;
            }
            let new_len = levels.len() - pop;
            levels.truncate(new_len);
        } else {
            self.levels_mut(side)[idx] = None;
        }
    }

    /// Walks the opposite side, matching and then resting the residual
    /// (§4.2 steps 2–3).
    fn place(&mut self, mut order: Order) -> Vec<BookEvent> {
        let mut events = Vec::new();

        loop {
            let taker_direction = order.direction;
            let opposite_side = taker_direction.opposite();
            let crosses = self.best(opposite_side).is_some_and(|top| match taker_direction {
                Direction::Ask => order.price <= top,
                Direction::Bid => order.price >= top,
            });

            if !crosses {
                events.extend(self.rest_new(order));
                return events;
            }

            let mut drained_prices: Vec<i64> = Vec::new();
            let len = self.levels(opposite_side).len();

            let mut outer_result = None;
            for idx in 0..len {
                if self.levels(opposite_side)[idx].is_none() {
                    continue;
                }
                let price = self.levels(opposite_side)[idx].as_ref().unwrap().price;
                let stop = match taker_direction {
                    Direction::Ask => price < order.price,
                    Direction::Bid => price > order.price,
                };
                if stop {
                    break;
                }

                let mut level = self.levels_mut(opposite_side)[idx].take().unwrap();
                let (lvl_events, outcome) = level.match_against(order);
                events.extend(lvl_events);

                match outcome {
                    MatchOutcome::Done(filled) => {
                        debug_assert_eq!(filled.remaining_size, 0);
                        if !level.is_empty() {
                            self.levels_mut(opposite_side)[idx] = Some(level);
                        } else {
                            drained_prices.push(price);
                        }
                        outer_result = Some(());
                        break;
                    }
                    MatchOutcome::Flipped => {
                        drained_prices.push(price);
                        for p in drained_prices.drain(..) {
                            self.delete(opposite_side, p);
                        }
                        trace!(symbol = %self.symbol, price = level.price, "level flip");
                        self.place_level(taker_direction, level);
                        return events;
                    }
                    MatchOutcome::Drained(residual) => {
                        drained_prices.push(price);
                        order = residual;
                    }
                }
            }

            for p in drained_prices {
                self.delete(opposite_side, p);
            }

            if outer_result.is_some() {
                return events;
            }
            if order.remaining_size == 0 {
                return events;
            }
            // Residual still outstanding; invariant 3 guarantees it no
            // longer crosses, so the next loop iteration rests it.
        }
    }

    /// Admits a new order (§4.2 "Placement algorithm").
    pub fn place_order(
        &mut self,
        player: impl Into<String>,
        direction: Direction,
        price: i64,
        size: i64,
    ) -> Result<Vec<BookEvent>, OrderBookError> {
        if price <= 0 {
            return Err(OrderBookError::InvalidPrice(price));
        }
        if size <= 0 {
            return Err(OrderBookError::InvalidSize(size));
        }

        self.last_order_id += 1;
        let order = Order::new(
            self.last_order_id,
            player.into(),
            self.symbol.clone(),
            direction,
            price,
            size,
        );
        debug!(symbol = %self.symbol, order_id = order.order_id, ?direction, price, size, "order placed");

        let mut events = vec![BookEvent::OrderPlaced(order.snapshot())];
        events.extend(self.place(order));
        Ok(events)
    }

    /// Cancels every resting order of `player`'s at `price` on `direction`
    /// (§4.2 "Cancel algorithm"). A no-op if no such level exists.
    pub fn cancel_order(&mut self, player: &str, price: i64, direction: Direction) -> Vec<BookEvent> {
        let Some(best) = self.best(direction) else {
            return Vec::new();
        };
        let idx = match direction {
            Direction::Ask => (price - best) / self.tick_size,
            Direction::Bid => (best - price) / self.tick_size,
        };
        let len = self.levels(direction).len() as i64;
        if idx < 0 || idx > len - 1 {
            return Vec::new();
        }
        let idx = idx as usize;
        let Some(level) = self.levels_mut(direction)[idx].as_mut() else {
            return Vec::new();
        };
        let events = level.cancel(player);
        if level.is_empty() {
            self.delete(direction, price);
        }
        debug!(symbol = %self.symbol, %player, price, ?direction, cancelled = events.len(), "order cancelled");
        events
    }

    /// Every order of `player`'s still resting in this book, used to
    /// replay private state to a rejoining player (§4.1 "Join/leave", S6).
    pub fn orders_by_player(&self, player: &str) -> Vec<crate::orderbook::order::OrderSnapshot> {
        self.bids
            .iter()
            .chain(self.asks.iter())
            .flatten()
            .flat_map(|level| level.orders())
            .filter(|order| order.player == player)
            .map(|order| order.snapshot())
            .collect()
    }

    /// A full book snapshot: asks from best outward, then bids from best
    /// outward (§4.2 "Quotes and snapshots").
    pub fn snapshot(&self) -> OrderBookSnapshot {
        let mut data = Vec::new();
        for level in self.asks.iter().flatten() {
            data.push(LevelQuote { price: level.price, size: level.size, r#type: Direction::Ask });
        }
        for level in self.bids.iter().flatten() {
            data.push(LevelQuote { price: level.price, size: level.size, r#type: Direction::Bid });
        }
        OrderBookSnapshot { symbol: self.symbol.clone(), data }
    }
}

/// One resting level as reported on `OrderbookUpdate` (§6).
#[derive(Debug, Clone, Serialize)]
pub struct LevelQuote {
    pub price: i64,
    pub size: i64,
    pub r#type: Direction,
}

/// The `OrderbookUpdate` payload (§6).
#[derive(Debug, Clone, Serialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    pub data: Vec<LevelQuote>,
}
