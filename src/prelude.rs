//! Commonly used types, re-exported for convenient glob import:
//!
//! ```rust
//! use cardmarket_engine::prelude::*;
//! ```

pub use crate::card::{Card, Deck, Suit};
pub use crate::engine::Engine;
pub use crate::lobby::{Lobby, LobbyError};
pub use crate::messages::{InboundCommand, NewInstrumentKind, OutboundMessage};
pub use crate::orderbook::{Direction, Order, OrderBook, OrderBookError, OrderSnapshot, OrderStatus, TradeSide};
pub use crate::player::{MessageSink, Player, TransportError};
pub use crate::room::{OptionKind, Position, Room, RoomConfig, RoomError, RoomStatus};
