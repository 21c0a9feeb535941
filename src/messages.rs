//! The wire vocabulary (§6): inbound commands and outbound messages.
//!
//! The websocket transport and JSON codec themselves are out of scope (§1);
//! this module only defines the already-parsed, type-tagged shapes they are
//! expected to produce and consume.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::card::Card;
use crate::orderbook::{Direction, LevelQuote, OrderSnapshot, TradeSide};
use crate::room::{OptionKind, PlayerCards, Position};

/// One decoded client command (§6 "Inbound command types and payloads").
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InboundCommand {
    NewRoom { name: String },
    DeleteRoom { name: String },
    NewPlayer { name: String, password: String },
    DeletePlayer { name: String },
    JoinRoom { player: String, room: String },
    LeaveRoom { player: String, room: String },
    StartGame { room: String },
    RevealCard { room: String, player: String, card: Card },
    NewInstrument {
        room: String,
        #[serde(rename = "type")]
        kind: NewInstrumentKind,
        name: String,
        strike: Option<i64>,
    },
    NewOrder {
        room: String,
        player: String,
        instrument: String,
        price: i64,
        size: i64,
        direction: Direction,
    },
    CancelOrder {
        room: String,
        player: String,
        instrument: String,
        price: i64,
        direction: Direction,
    },
    SettleGame { room: String },
}

/// `NewInstrument.type` (§6): `"underlying"` requests `init_underlying`'s
/// fixed trio, `CALL`/`PUT` request a new option on an existing underlying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum NewInstrumentKind {
    #[serde(rename = "underlying")]
    Underlying,
    #[serde(rename = "CALL")]
    Call,
    #[serde(rename = "PUT")]
    Put,
}

impl From<NewInstrumentKind> for Option<OptionKind> {
    fn from(kind: NewInstrumentKind) -> Self {
        match kind {
            NewInstrumentKind::Underlying => None,
            NewInstrumentKind::Call => Some(OptionKind::Call),
            NewInstrumentKind::Put => Some(OptionKind::Put),
        }
    }
}

/// A message pushed to one or more player sinks (§6 "Outbound messages").
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    Info { status: String },
    RoomUpdate { data: Vec<String> },
    PlayerUpdate { data: Vec<String> },
    PlayerDetails { data: String },
    CurrentRoom { data: CurrentRoomData },
    RoomPlayersUpdate { data: RoomPlayersData },
    GameStart { data: GameStartData },
    RevealedCards { data: HashMap<String, PlayerCards> },
    InstrumentsUpdate { data: Vec<String> },
    PositionUpdate { data: HashMap<String, Position> },
    OrderbookUpdate { symbol: String, data: Vec<LevelQuote> },
    OrderUpdate { data: OrderSnapshot },
    TradeUpdate { data: TradeUpdateData },
    Trade { data: Vec<TradeRecord> },
    Settlement { data: HashMap<String, f64> },
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentRoomData {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomPlayersData {
    pub room: String,
    pub players: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameStartData {
    pub cards: PlayerCards,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeUpdateData {
    pub price: i64,
    pub size: i64,
    pub direction: TradeSide,
}

/// One entry of a room's trade tape (§3 `trades`, §4.1 `new_trade`).
///
/// `direction` is the taker's book-side direction (`bid`/`ask`), not the
/// `buy`/`sell` vocabulary used on the per-player `TradeUpdate` (§4.1
/// "direction here is the taker's direction"; S1 §8).
#[derive(Debug, Clone, Serialize)]
pub struct TradeRecord {
    pub instrument: String,
    pub price: i64,
    pub size: i64,
    pub direction: Direction,
    pub timestamp: u64,
}
