//! End-to-end scenario and cross-cutting invariant tests (§8, §13),
//! driven through `Engine::dispatch` the way a real transport would feed
//! it decoded `InboundCommand`s. A recorder `MessageSink` stands in for
//! the out-of-scope websocket connection.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use cardmarket_engine::engine::Engine;
use cardmarket_engine::messages::{InboundCommand, NewInstrumentKind};
use cardmarket_engine::orderbook::Direction;
use cardmarket_engine::player::{MessageSink, TransportError};
use cardmarket_engine::room::RoomConfig;

struct Recorder(Arc<Mutex<Vec<Value>>>);

#[async_trait]
impl MessageSink for Recorder {
    async fn send(&mut self, message: Value) -> Result<(), TransportError> {
        self.0.lock().unwrap().push(message);
        Ok(())
    }
}

fn recorder() -> (Box<dyn MessageSink>, Arc<Mutex<Vec<Value>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    (Box::new(Recorder(log.clone())), log)
}

async fn register(engine: &mut Engine, name: &str) -> Arc<Mutex<Vec<Value>>> {
    let (sink, log) = recorder();
    engine.attach_sink(name, sink);
    engine.dispatch(InboundCommand::NewPlayer { name: name.into(), password: "pw".into() }).await;
    log
}

async fn new_room_and_start(engine: &mut Engine, room: &str, players: &[&str]) {
    engine.dispatch(InboundCommand::NewRoom { name: room.into() }).await;
    for player in players {
        engine.dispatch(InboundCommand::JoinRoom { player: (*player).into(), room: room.into() }).await;
    }
    engine.dispatch(InboundCommand::StartGame { room: room.into() }).await;
}

fn order(room: &str, player: &str, instrument: &str, price: i64, size: i64, direction: Direction) -> InboundCommand {
    InboundCommand::NewOrder {
        room: room.into(),
        player: player.into(),
        instrument: instrument.into(),
        price,
        size,
        direction,
    }
}

/// S1 — simple cross (§8).
#[tokio::test]
async fn s1_simple_cross() {
    let mut engine = Engine::new(RoomConfig::default());
    register(&mut engine, "p1").await;
    register(&mut engine, "p2").await;
    new_room_and_start(&mut engine, "R", &["p1", "p2"]).await;

    engine.dispatch(order("R", "p1", "A", 5, 3, Direction::Bid)).await;
    let room = engine.lobby().room("R").unwrap();
    assert_eq!(room.book("A").unwrap().best_bid(), Some(5));
    assert_eq!(room.book("A").unwrap().best_ask(), None);

    engine.dispatch(order("R", "p2", "A", 5, 2, Direction::Ask)).await;

    let room = engine.lobby().room("R").unwrap();
    let p1 = room.positions("p1").unwrap();
    assert_eq!(p1.get("A").unwrap().size, 2);
    assert_eq!(p1.get("A").unwrap().average_price, 5.0);
    assert_eq!(p1.get("CASH").unwrap().size, -10);

    let p2 = room.positions("p2").unwrap();
    assert_eq!(p2.get("A").unwrap().size, -2);
    assert_eq!(p2.get("CASH").unwrap().size, 10);

    assert_eq!(room.trades().len(), 1);
    assert_eq!(room.trades()[0].price, 5);
    assert_eq!(room.trades()[0].size, 2);

    assert_eq!(room.book("A").unwrap().best_bid(), Some(5));
    assert_eq!(room.book("A").unwrap().best_ask(), None);
}

/// S2 — price improvement: trade prints at the maker's price (§8).
#[tokio::test]
async fn s2_price_improvement() {
    let mut engine = Engine::new(RoomConfig::default());
    register(&mut engine, "p1").await;
    register(&mut engine, "p2").await;
    new_room_and_start(&mut engine, "R", &["p1", "p2"]).await;

    engine.dispatch(order("R", "p1", "A", 10, 1, Direction::Bid)).await;
    engine.dispatch(order("R", "p2", "A", 7, 1, Direction::Ask)).await;

    let room = engine.lobby().room("R").unwrap();
    assert_eq!(room.positions("p1").unwrap().get("A").unwrap().average_price, 10.0);
    assert_eq!(room.positions("p2").unwrap().get("CASH").unwrap().size, 10);
    assert_eq!(room.book("A").unwrap().best_bid(), None);
    assert_eq!(room.book("A").unwrap().best_ask(), None);
}

/// S3 — partial fill then rest, level flip (§8).
#[tokio::test]
async fn s3_partial_fill_then_level_flip() {
    let mut engine = Engine::new(RoomConfig::default());
    register(&mut engine, "p1").await;
    register(&mut engine, "p2").await;
    new_room_and_start(&mut engine, "R", &["p1", "p2"]).await;

    engine.dispatch(order("R", "p1", "A", 5, 5, Direction::Bid)).await;
    engine.dispatch(order("R", "p2", "A", 5, 8, Direction::Ask)).await;

    let room = engine.lobby().room("R").unwrap();
    let book = room.book("A").unwrap();
    assert_eq!(book.best_bid(), None);
    assert_eq!(book.best_ask(), Some(5));
    let snapshot = book.snapshot();
    assert_eq!(snapshot.data.len(), 1);
    assert_eq!(snapshot.data[0].size, 3);
}

/// S4 — cancel (§8).
#[tokio::test]
async fn s4_cancel_removes_all_orders_at_price() {
    let mut engine = Engine::new(RoomConfig::default());
    register(&mut engine, "p1").await;
    new_room_and_start(&mut engine, "R", &["p1"]).await;

    engine.dispatch(order("R", "p1", "A", 4, 2, Direction::Bid)).await;
    engine.dispatch(order("R", "p1", "A", 4, 1, Direction::Bid)).await;
    engine
        .dispatch(InboundCommand::CancelOrder {
            room: "R".into(),
            player: "p1".into(),
            instrument: "A".into(),
            price: 4,
            direction: Direction::Bid,
        })
        .await;

    let room = engine.lobby().room("R").unwrap();
    assert_eq!(room.book("A").unwrap().best_bid(), None);
}

/// S6 — rejoin replays private state to a reconnecting player (§8).
#[tokio::test]
async fn s6_rejoin_replays_state() {
    let mut engine = Engine::new(RoomConfig::default());
    register(&mut engine, "p1").await;
    register(&mut engine, "p2").await;
    new_room_and_start(&mut engine, "R", &["p1", "p2"]).await;
    engine.dispatch(order("R", "p1", "A", 5, 3, Direction::Bid)).await;

    let (new_sink, log) = recorder();
    engine.attach_sink("p1", new_sink);
    engine.dispatch(InboundCommand::NewPlayer { name: "p1".into(), password: "pw".into() }).await;
    engine.dispatch(InboundCommand::JoinRoom { player: "p1".into(), room: "R".into() }).await;

    let messages = log.lock().unwrap();
    let types: Vec<String> =
        messages.iter().map(|m| m["type"].as_str().unwrap_or_default().to_string()).collect();
    assert!(types.contains(&"PlayerDetails".to_string()));
    assert!(types.contains(&"RoomPlayersUpdate".to_string()));
    assert!(types.contains(&"GameStart".to_string()));
    assert!(types.contains(&"InstrumentsUpdate".to_string()));
    assert!(types.contains(&"PositionUpdate".to_string()));
    assert!(types.contains(&"OrderbookUpdate".to_string()));
    assert!(types.contains(&"OrderUpdate".to_string()));
}

/// §8 round-trip: an order followed by a same-price/direction cancel
/// restores the book to its pre-order state.
#[tokio::test]
async fn order_then_cancel_is_a_round_trip() {
    let mut engine = Engine::new(RoomConfig::default());
    register(&mut engine, "p1").await;
    register(&mut engine, "p2").await;
    new_room_and_start(&mut engine, "R", &["p1", "p2"]).await;

    engine.dispatch(order("R", "p1", "A", 5, 3, Direction::Bid)).await;
    let before = engine.lobby().room("R").unwrap().book("A").unwrap().snapshot();

    engine.dispatch(order("R", "p2", "A", 6, 1, Direction::Bid)).await;
    engine
        .dispatch(InboundCommand::CancelOrder {
            room: "R".into(),
            player: "p2".into(),
            instrument: "A".into(),
            price: 6,
            direction: Direction::Bid,
        })
        .await;
    let after = engine.lobby().room("R").unwrap().book("A").unwrap().snapshot();

    assert_eq!(before.data.len(), after.data.len());
    assert_eq!(before.data[0].price, after.data[0].price);
    assert_eq!(before.data[0].size, after.data[0].size);
}

/// §8: a second `start_game` on an already-started room is rejected.
#[tokio::test]
async fn start_game_twice_is_rejected_the_second_time() {
    let mut engine = Engine::new(RoomConfig::default());
    register(&mut engine, "p1").await;
    new_room_and_start(&mut engine, "R", &["p1"]).await;
    assert_eq!(engine.lobby().room("R").unwrap().status(), cardmarket_engine::room::RoomStatus::Started);

    engine.dispatch(InboundCommand::StartGame { room: "R".into() }).await;
    assert_eq!(engine.lobby().room("R").unwrap().status(), cardmarket_engine::room::RoomStatus::Started);
}

/// §8: revealing the same card twice is a no-op, whether or not the card
/// is actually one of the player's (§9 "the reveal-card logic assumes the
/// card is in exactly one of the player's piles; if absent, nothing is
/// recorded and no error is raised").
#[tokio::test]
async fn reveal_card_twice_is_idempotent() {
    let mut engine = Engine::new(RoomConfig::default());
    register(&mut engine, "p1").await;
    new_room_and_start(&mut engine, "R", &["p1"]).await;

    let ace_of_spades =
        cardmarket_engine::card::Card { rank: 1, suit: cardmarket_engine::card::Suit::Spades };
    engine.dispatch(InboundCommand::RevealCard { room: "R".into(), player: "p1".into(), card: ace_of_spades }).await;
    engine.dispatch(InboundCommand::RevealCard { room: "R".into(), player: "p1".into(), card: ace_of_spades }).await;
    // Neither call panics and the room is left in a consistent state
    // regardless of whether the card was actually in p1's piles.
}

/// §8 conservation: net position in a non-cash instrument across all
/// players of a room sums to zero after any sequence of trades.
#[tokio::test]
async fn positions_are_conserved_across_players() {
    let mut engine = Engine::new(RoomConfig::default());
    register(&mut engine, "p1").await;
    register(&mut engine, "p2").await;
    register(&mut engine, "p3").await;
    new_room_and_start(&mut engine, "R", &["p1", "p2", "p3"]).await;

    engine.dispatch(order("R", "p1", "A", 5, 3, Direction::Bid)).await;
    engine.dispatch(order("R", "p2", "A", 5, 2, Direction::Ask)).await;
    engine.dispatch(order("R", "p3", "A", 4, 4, Direction::Ask)).await;
    engine.dispatch(order("R", "p1", "A", 4, 1, Direction::Bid)).await;

    let room = engine.lobby().room("R").unwrap();
    let mut net_a = 0i64;
    let mut net_cash = 0i64;
    for player in ["p1", "p2", "p3"] {
        let positions = room.positions(player).unwrap();
        net_a += positions.get("A").unwrap().size;
        net_cash += positions.get("CASH").unwrap().size;
    }
    assert_eq!(net_a, 0);
    assert_eq!(net_cash, 0);
}

/// §7 kind 2 / §4.6: joining a room that doesn't exist is reported but
/// never panics the engine.
#[tokio::test]
async fn joining_an_unknown_room_is_reported_gracefully() {
    let mut engine = Engine::new(RoomConfig::default());
    let log = register(&mut engine, "p1").await;
    engine.dispatch(InboundCommand::JoinRoom { player: "p1".into(), room: "nowhere".into() }).await;
    assert!(!log.lock().unwrap().is_empty());
}

/// §4.1 `new_option` / §7: a missing or non-positive strike is rejected.
#[tokio::test]
async fn new_option_without_a_positive_strike_is_rejected() {
    let mut engine = Engine::new(RoomConfig::default());
    register(&mut engine, "p1").await;
    new_room_and_start(&mut engine, "R", &["p1"]).await;

    engine
        .dispatch(InboundCommand::NewInstrument {
            room: "R".into(),
            kind: NewInstrumentKind::Call,
            name: "A".into(),
            strike: None,
        })
        .await;

    let room = engine.lobby().room("R").unwrap();
    assert!(!room.instruments().iter().any(|s| s.ends_with("-CALL")));
}
