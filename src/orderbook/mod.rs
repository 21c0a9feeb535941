//! The matching engine core: per-instrument order books built from sparse
//! price-level arrays (§3, §4.2, §4.3, §4.4).

mod book;
mod error;
mod event;
mod order;
mod price_level;

pub use book::{LevelQuote, OrderBook, OrderBookSnapshot};
pub use error::OrderBookError;
pub use event::BookEvent;
pub use order::{Direction, Order, OrderSnapshot, OrderStatus, TradeSide};
pub use price_level::PriceLevel;
