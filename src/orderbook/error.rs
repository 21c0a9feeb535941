//! Validation-kind errors raised by [`crate::orderbook::OrderBook`].
//!
//! Grounded in the teacher's `orderbook/error.rs`, which gives one variant
//! per rejected precondition; this port uses `thiserror`'s derive rather
//! than the teacher's hand-written `Display` impl.

use thiserror::Error;

/// Validation failures for order placement (§7 kind 1).
///
/// These never mutate book state — the order is rejected before any slot
/// is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderBookError {
    #[error("price must be a positive integer, got {0}")]
    InvalidPrice(i64),

    #[error("size must be a positive integer, got {0}")]
    InvalidSize(i64),
}
