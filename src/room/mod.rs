//! One game instance: players, instruments, books, positions, trades, and
//! the card deck they settle against (§3 "Room", §4.1).
//!
//! Grounded in `original_source/backend/server.py`'s `Room` class. Unlike
//! the teacher crate's `BookManager` (a channel-driven background
//! processor, `orderbook/manager.rs`), a `Room` here is a plain value whose
//! handlers run to completion under the single global consumer (§5) —
//! there is no per-room task or channel.

mod error;
mod position;
mod settlement;

pub use error::RoomError;
pub use position::Position;
pub use settlement::{OptionKind, SettlementValue, option_symbol, payoff, spread_symbol};

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::card::{Card, Deck};
use crate::messages::{GameStartData, OutboundMessage, RoomPlayersData, TradeRecord, TradeUpdateData};
use crate::orderbook::{BookEvent, Direction, OrderBook, OrderSnapshot, TradeSide};
use crate::player::Player;
use crate::utils::current_time_millis;

/// Tunable constants a room is constructed with (§12): tick size and the
/// number of cards dealt per pile.
#[derive(Debug, Clone, Copy)]
pub struct RoomConfig {
    pub tick_size: i64,
    pub n_cards: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self { tick_size: 1, n_cards: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    Started,
    Settled,
}

/// A player's private and revealed card piles (§3 `player_cards`,
/// `revealed_cards`).
#[derive(Debug, Clone, Serialize, Default)]
pub struct PlayerCards {
    #[serde(rename = "A")]
    pub a: Vec<Card>,
    #[serde(rename = "B")]
    pub b: Vec<Card>,
}

/// One game instance (§3 "Room").
pub struct Room {
    pub name: String,
    status: RoomStatus,
    config: RoomConfig,
    players: HashMap<String, Player>,
    instruments: Vec<String>,
    books: HashMap<String, OrderBook>,
    trades: Vec<TradeRecord>,
    positions: HashMap<String, HashMap<String, Position>>,
    player_cards: HashMap<String, PlayerCards>,
    revealed_cards: HashMap<String, PlayerCards>,
    settlement_value: SettlementValue,
    deck: Deck,
}

impl Room {
    pub fn new(name: impl Into<String>, config: RoomConfig) -> Self {
        Self {
            name: name.into(),
            status: RoomStatus::Waiting,
            config,
            players: HashMap::new(),
            instruments: Vec::new(),
            books: HashMap::new(),
            trades: Vec::new(),
            positions: HashMap::new(),
            player_cards: HashMap::new(),
            revealed_cards: HashMap::new(),
            settlement_value: SettlementValue::default(),
            deck: Deck::new(),
        }
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn has_player(&self, player: &str) -> bool {
        self.players.contains_key(player)
    }

    /// Instruments in insertion order (§3 `instruments`).
    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    /// Read-only access to one instrument's book, used by tests and by
    /// replay (§4.1 "Join/leave").
    pub fn book(&self, symbol: &str) -> Option<&OrderBook> {
        self.books.get(symbol)
    }

    /// A player's position map, used by tests and settlement (§3 `positions`).
    pub fn positions(&self, player: &str) -> Option<&HashMap<String, Position>> {
        self.positions.get(player)
    }

    /// The room's chronological trade tape (§3 `trades`).
    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// The settlement basis computed at `start_game` (§3 `settlement_value`).
    pub fn settlement_value(&self) -> SettlementValue {
        self.settlement_value
    }

    fn sorted_player_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.players.keys().cloned().collect();
        names.sort();
        names
    }

    /// Admits `player`, or — if the game has already started and `player`
    /// was previously a member — replays current state instead (§4.1
    /// "Join/leave", S6).
    pub async fn join(&mut self, player: Player) -> Result<(), RoomError> {
        match self.status {
            RoomStatus::Waiting => {
                let name = player.name.clone();
                info!(room = %self.name, player = %name, "player joined");
                self.players.insert(name.clone(), player);
                self.positions.entry(name).or_default();
                self.broadcast_room_players().await;
                Ok(())
            }
            _ => {
                if let Some(existing) = self.players.get(&player.name).cloned() {
                    info!(room = %self.name, player = %existing.name, "player rejoined, replaying state");
                    self.replay_state_to(&existing).await;
                    Ok(())
                } else {
                    Err(RoomError::NotAMember)
                }
            }
        }
    }

    /// Removes a waiting-room member; a no-op acknowledgement once the game
    /// has started (§4.1, §9 "Open questions").
    pub async fn leave(&mut self, player_name: &str) -> Result<(), RoomError> {
        if self.status == RoomStatus::Waiting {
            self.players.remove(player_name);
            self.positions.remove(player_name);
            self.broadcast_room_players().await;
        }
        Ok(())
    }

    /// Deals cards, computes the settlement basis, and transitions to
    /// `started` (§4.1 "Start game").
    pub async fn start_game(&mut self) -> Result<(), RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::AlreadyStarted);
        }

        let mut rng = rand::rng();
        let names: Vec<String> = self.players.keys().cloned().collect();
        for name in &names {
            let mut a = Vec::with_capacity(self.config.n_cards);
            let mut b = Vec::with_capacity(self.config.n_cards);
            for _ in 0..self.config.n_cards {
                if let Some(card) = self.deck.deal(&mut rng) {
                    a.push(card);
                }
            }
            for _ in 0..self.config.n_cards {
                if let Some(card) = self.deck.deal(&mut rng) {
                    b.push(card);
                }
            }
            self.player_cards.insert(name.clone(), PlayerCards { a, b });
            self.revealed_cards.insert(name.clone(), PlayerCards::default());
            self.positions.entry(name.clone()).or_default().insert("CASH".into(), Position::cash());
        }

        let settlement_a: i64 =
            self.player_cards.values().flat_map(|cards| cards.a.iter()).map(|c| c.rank as i64).sum();
        let settlement_b: i64 =
            self.player_cards.values().flat_map(|cards| cards.b.iter()).map(|c| c.rank as i64).sum();
        self.settlement_value = SettlementValue { a: settlement_a, b: settlement_b };
        self.status = RoomStatus::Started;
        info!(room = %self.name, a = settlement_a, b = settlement_b, "game started");

        for name in &names {
            if let (Some(player), Some(cards)) = (self.players.get(name), self.player_cards.get(name)) {
                player
                    .send_best_effort(&OutboundMessage::GameStart { data: GameStartData { cards: cards.clone() } })
                    .await;
            }
        }

        self.init_underlying().await;
        self.send_positions().await;
        Ok(())
    }

    /// Creates `A`, `B`, and the non-negative spread instrument (§4.1).
    /// Idempotent: re-invoking after the trio already exists (possible via
    /// a direct `NewInstrument{type:underlying}` command, which the
    /// original source routes straight to this method) just re-announces
    /// the current instrument set rather than duplicating symbols.
    pub async fn init_underlying(&mut self) {
        self.add_instrument("A".to_string());
        self.add_instrument("B".to_string());
        self.add_instrument(spread_symbol(&self.settlement_value));
        self.broadcast_instruments().await;
        self.send_positions().await;
    }

    fn add_instrument(&mut self, symbol: String) {
        if self.books.contains_key(&symbol) {
            return;
        }
        self.books.insert(symbol.clone(), OrderBook::new(symbol.clone(), self.config.tick_size));
        for positions in self.positions.values_mut() {
            positions.entry(symbol.clone()).or_insert_with(Position::zero);
        }
        self.instruments.push(symbol);
    }

    /// Registers a new European option on `underlying` (§4.1 "new_option").
    pub async fn new_option(&mut self, underlying: &str, kind: OptionKind, strike: i64) -> Result<(), RoomError> {
        if strike <= 0 {
            return Err(RoomError::InvalidStrike);
        }
        let symbol = option_symbol(underlying, strike, kind);
        if self.books.contains_key(&symbol) {
            return Err(RoomError::DuplicateInstrument(symbol));
        }
        debug!(room = %self.name, instrument = %symbol, strike, "option instrument created");
        self.add_instrument(symbol);
        self.broadcast_instruments().await;
        self.send_positions().await;
        Ok(())
    }

    /// Records or ignores a revealed card (§4.1, §9 "the reveal-card logic
    /// assumes the card is in exactly one of the player's piles").
    pub async fn reveal_card(&mut self, player: &str, card: Card) {
        let in_a = self.player_cards.get(player).is_some_and(|cards| cards.a.contains(&card));
        let in_b = self.player_cards.get(player).is_some_and(|cards| cards.b.contains(&card));

        let Some(revealed) = self.revealed_cards.get_mut(player) else {
            return;
        };
        if revealed.a.contains(&card) || revealed.b.contains(&card) {
            return;
        }
        if in_a {
            revealed.a.push(card);
        } else if in_b {
            revealed.b.push(card);
        } else {
            return;
        }
        self.broadcast(OutboundMessage::RevealedCards { data: self.revealed_cards.clone() }).await;
    }

    /// Validates, places, and settles the side effects of a new order
    /// (§4.1 "new_order / cancel_order").
    pub async fn new_order(
        &mut self,
        instrument: &str,
        player: &str,
        price: i64,
        size: i64,
        direction: Direction,
    ) -> Result<(), RoomError> {
        if price <= 0 || size <= 0 {
            return Err(RoomError::InvalidOrderFields);
        }
        let events = {
            let book = self
                .books
                .get_mut(instrument)
                .ok_or_else(|| RoomError::UnknownInstrument(instrument.to_string()))?;
            book.place_order(player, direction, price, size).map_err(|_| RoomError::InvalidOrderFields)?
        };
        self.handle_book_events(instrument, events).await;
        self.broadcast_all_books().await;
        Ok(())
    }

    pub async fn cancel_order(
        &mut self,
        instrument: &str,
        player: &str,
        price: i64,
        direction: Direction,
    ) -> Result<(), RoomError> {
        let events = {
            let book = self
                .books
                .get_mut(instrument)
                .ok_or_else(|| RoomError::UnknownInstrument(instrument.to_string()))?;
            book.cancel_order(player, price, direction)
        };
        self.handle_book_events(instrument, events).await;
        self.broadcast_all_books().await;
        Ok(())
    }

    async fn handle_book_events(&mut self, instrument: &str, events: Vec<BookEvent>) {
        for event in events {
            match event {
                BookEvent::OrderPlaced(snapshot) => {
                    self.send_order_update(&snapshot).await;
                }
                BookEvent::Fill { snapshot, price, size, is_taker } => {
                    self.update_positions(&snapshot.player.clone(), instrument, snapshot.direction, price, size)
                        .await;
                    self.send_order_update(&snapshot).await;
                    self.send_trade_update(&snapshot.player, price, size, snapshot.direction.as_trade_side()).await;
                    if is_taker {
                        self.new_trade(instrument, price, size, snapshot.direction).await;
                    }
                }
                BookEvent::OrderCancelled(snapshot) => {
                    self.send_order_update(&snapshot).await;
                }
            }
        }
    }

    /// Pushes every player's current position map to that player, so newly
    /// dealt `CASH` rows and freshly listed instruments' zeroed rows reach
    /// clients without waiting on a first fill (§4.1 `init_underlying`,
    /// `new_option`, and `start_game`, each of which call this after
    /// mutating `positions`).
    async fn send_positions(&self) {
        for (player, positions) in &self.positions {
            if let Some(target) = self.players.get(player) {
                target.send_best_effort(&OutboundMessage::PositionUpdate { data: positions.clone() }).await;
            }
        }
    }

    /// Updates a player's instrument and cash positions after a fill and
    /// pushes the resulting full position map to that player (§4.1
    /// "update_positions").
    async fn update_positions(&mut self, player: &str, instrument: &str, direction: Direction, price: i64, size: i64) {
        let positions = self.positions.entry(player.to_string()).or_default();
        positions.entry(instrument.to_string()).or_insert_with(Position::zero).apply_fill(direction, price, size);
        positions.entry("CASH".to_string()).or_insert_with(Position::cash).apply_cash_fill(direction, price, size);
        let snapshot = positions.clone();
        if let Some(target) = self.players.get(player) {
            target.send_best_effort(&OutboundMessage::PositionUpdate { data: snapshot }).await;
        }
    }

    /// Appends a taker-side fill to the trade tape and broadcasts it
    /// (§4.1 "new_trade": "direction here is the taker's direction" — the
    /// book-side `bid`/`ask`, not the `buy`/`sell` vocabulary used on
    /// `TradeUpdate`).
    async fn new_trade(&mut self, instrument: &str, price: i64, size: i64, direction: Direction) {
        self.trades.push(TradeRecord {
            instrument: instrument.to_string(),
            price,
            size,
            direction,
            timestamp: current_time_millis(),
        });
        info!(room = %self.name, instrument, price, size, "trade printed");
        self.broadcast(OutboundMessage::Trade { data: self.trades.clone() }).await;
    }

    /// Marks every player's pnl against the settlement basis and closes the
    /// game (§4.1 "settle_game").
    pub async fn settle_game(&mut self) -> Result<(), RoomError> {
        if self.status != RoomStatus::Started {
            return Err(RoomError::NotStarted);
        }
        let mut pnl = HashMap::new();
        for (player, positions) in &self.positions {
            let total: f64 = positions
                .iter()
                .map(|(symbol, pos)| pos.size as f64 * payoff(symbol, &self.settlement_value) as f64)
                .sum();
            pnl.insert(player.clone(), total);
        }
        self.status = RoomStatus::Settled;
        info!(room = %self.name, "game settled");
        self.broadcast(OutboundMessage::Settlement { data: pnl }).await;
        Ok(())
    }

    async fn replay_state_to(&self, player: &Player) {
        player
            .send_best_effort(&OutboundMessage::RoomPlayersUpdate {
                data: RoomPlayersData { room: self.name.clone(), players: self.sorted_player_names() },
            })
            .await;
        if let Some(cards) = self.player_cards.get(&player.name) {
            player
                .send_best_effort(&OutboundMessage::GameStart { data: GameStartData { cards: cards.clone() } })
                .await;
        }
        player
            .send_best_effort(&OutboundMessage::RevealedCards { data: self.revealed_cards.clone() })
            .await;
        player
            .send_best_effort(&OutboundMessage::InstrumentsUpdate { data: self.instruments.clone() })
            .await;
        if let Some(positions) = self.positions.get(&player.name) {
            player.send_best_effort(&OutboundMessage::PositionUpdate { data: positions.clone() }).await;
        }
        for instrument in &self.instruments {
            let Some(book) = self.books.get(instrument) else { continue };
            let snapshot = book.snapshot();
            player
                .send_best_effort(&OutboundMessage::OrderbookUpdate { symbol: snapshot.symbol, data: snapshot.data })
                .await;
            for order in book.orders_by_player(&player.name) {
                player.send_best_effort(&OutboundMessage::OrderUpdate { data: order }).await;
            }
        }
    }

    async fn send_order_update(&self, snapshot: &OrderSnapshot) {
        if let Some(player) = self.players.get(&snapshot.player) {
            player.send_best_effort(&OutboundMessage::OrderUpdate { data: snapshot.clone() }).await;
        }
    }

    async fn send_trade_update(&self, player_name: &str, price: i64, size: i64, direction: TradeSide) {
        if let Some(player) = self.players.get(player_name) {
            player
                .send_best_effort(&OutboundMessage::TradeUpdate { data: TradeUpdateData { price, size, direction } })
                .await;
        }
    }

    async fn broadcast(&self, message: OutboundMessage) {
        for player in self.players.values() {
            player.send_best_effort(&message).await;
        }
    }

    /// Surfaces a validation/conflict result to this room's members only
    /// (§7 kinds 1–2, room-scoped per §6's broadcast-scope column), used
    /// by the Engine's command dispatch.
    pub async fn send_info(&self, status: impl Into<String>) {
        self.broadcast(OutboundMessage::Info { status: status.into() }).await;
    }

    async fn broadcast_room_players(&self) {
        self.broadcast(OutboundMessage::RoomPlayersUpdate {
            data: RoomPlayersData { room: self.name.clone(), players: self.sorted_player_names() },
        })
        .await;
    }

    async fn broadcast_instruments(&self) {
        self.broadcast(OutboundMessage::InstrumentsUpdate { data: self.instruments.clone() }).await;
    }

    async fn broadcast_all_books(&self) {
        for instrument in &self.instruments {
            let Some(book) = self.books.get(instrument) else { continue };
            let snapshot = book.snapshot();
            self.broadcast(OutboundMessage::OrderbookUpdate { symbol: snapshot.symbol, data: snapshot.data }).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{MessageSink, TransportError};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use serde_json::Value;

    struct Recorder(Arc<Mutex<Vec<Value>>>);

    #[async_trait]
    impl MessageSink for Recorder {
        async fn send(&mut self, message: Value) -> Result<(), TransportError> {
            self.0.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn player(name: &str) -> (Player, Arc<Mutex<Vec<Value>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (Player::new(name, "pw", Box::new(Recorder(log.clone()))), log)
    }

    #[tokio::test]
    async fn join_while_waiting_admits_the_player() {
        let mut room = Room::new("R", RoomConfig::default());
        let (p1, _log) = player("p1");
        room.join(p1).await.unwrap();
        assert_eq!(room.player_count(), 1);
    }

    #[tokio::test]
    async fn join_after_start_rejects_non_members() {
        let mut room = Room::new("R", RoomConfig::default());
        let (p1, _) = player("p1");
        room.join(p1).await.unwrap();
        room.start_game().await.unwrap();

        let (p2, _) = player("p2");
        let result = room.join(p2).await;
        assert!(matches!(result, Err(RoomError::NotAMember)));
    }

    /// S1 (§8): simple cross at price 5.
    #[tokio::test]
    async fn simple_cross_updates_positions_and_trade_tape() {
        let mut room = Room::new("R", RoomConfig::default());
        let (p1, log1) = player("p1");
        let (p2, log2) = player("p2");
        room.join(p1).await.unwrap();
        room.join(p2).await.unwrap();
        room.start_game().await.unwrap();

        room.new_order("A", "p1", 5, 3, Direction::Bid).await.unwrap();
        room.new_order("A", "p2", 5, 2, Direction::Ask).await.unwrap();

        let p1_position = room.positions.get("p1").unwrap().get("A").unwrap();
        assert_eq!(p1_position.size, 2);
        assert_eq!(p1_position.average_price, 5.0);
        let p1_cash = room.positions.get("p1").unwrap().get("CASH").unwrap();
        assert_eq!(p1_cash.size, -10);

        let p2_position = room.positions.get("p2").unwrap().get("A").unwrap();
        assert_eq!(p2_position.size, -2);
        let p2_cash = room.positions.get("p2").unwrap().get("CASH").unwrap();
        assert_eq!(p2_cash.size, 10);

        assert_eq!(room.trades.len(), 1);
        assert_eq!(room.trades[0].size, 2);
        assert_eq!(room.trades[0].price, 5);

        assert!(!log1.lock().unwrap().is_empty());
        assert!(!log2.lock().unwrap().is_empty());
    }

    /// S5 (§8): option settlement pnl.
    #[tokio::test]
    async fn settlement_pnl_matches_scenario_s5() {
        let mut room = Room::new("R", RoomConfig::default());
        let (p1, _) = player("p1");
        let (p2, _) = player("p2");
        room.join(p1).await.unwrap();
        room.join(p2).await.unwrap();
        room.start_game().await.unwrap();
        room.settlement_value = SettlementValue { a: 45, b: 18 };

        room.new_option("A", OptionKind::Call, 20).await.unwrap();
        let symbol = option_symbol("A", 20, OptionKind::Call);
        room.new_order(&symbol, "p2", 10, 1, Direction::Ask).await.unwrap();
        room.new_order(&symbol, "p1", 10, 1, Direction::Bid).await.unwrap();

        room.settle_game().await.unwrap();

        let p1_positions = room.positions.get("p1").unwrap();
        let p1_pnl: f64 =
            p1_positions.iter().map(|(sym, pos)| pos.size as f64 * payoff(sym, &room.settlement_value) as f64).sum();
        assert_eq!(p1_pnl, 15.0);

        let p2_positions = room.positions.get("p2").unwrap();
        let p2_pnl: f64 =
            p2_positions.iter().map(|(sym, pos)| pos.size as f64 * payoff(sym, &room.settlement_value) as f64).sum();
        assert_eq!(p2_pnl, -15.0);
    }
}
