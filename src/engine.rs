//! The single inbound-command consumer (§2 "Control flow", §5, §9 "Global
//! mutable state").
//!
//! Grounded in `original_source/backend/server.py`'s `MatchingEngine`: one
//! `asyncio.Queue` feeding one `consume` loop that dispatches every decoded
//! command to the Lobby or to a Room. This port keeps that one-mailbox
//! shape with a `tokio::sync::mpsc` channel (§9 "Per-room single-writer"
//! resolution: a single global mailbox, not one per room), following the
//! teacher's `BookManagerTokio` (`manager.rs`) for the channel-plus-
//! consumer-task idiom.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::warn;

use crate::lobby::Lobby;
use crate::messages::{InboundCommand, NewInstrumentKind};
use crate::player::MessageSink;
use crate::room::RoomConfig;

/// Owns the `Lobby` (and, transitively, the connected-player set) and
/// drains the inbound command channel to completion, one command at a
/// time (§5 "Scheduling model": "no handler ever sees partial state of
/// another").
///
/// The out-of-scope transport (§1) hands a freshly accepted connection's
/// sink to [`Engine::attach_sink`] before that connection's `NewPlayer`
/// command reaches the queue; `§6`'s `NewPlayer` payload itself carries
/// only `name`/`password`, since the sink is a property of the connection,
/// not of the parsed command.
pub struct Engine {
    lobby: Lobby,
    pending_sinks: HashMap<String, Box<dyn MessageSink>>,
}

impl Engine {
    pub fn new(room_config: RoomConfig) -> Self {
        Self { lobby: Lobby::new(room_config), pending_sinks: HashMap::new() }
    }

    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    pub fn lobby_mut(&mut self) -> &mut Lobby {
        &mut self.lobby
    }

    /// Stages the sink for a connection that is about to send `NewPlayer`
    /// for `name`. Overwrites any previously staged sink for the same
    /// name (a client retrying a login before the engine drained the
    /// first attempt).
    pub fn attach_sink(&mut self, name: impl Into<String>, sink: Box<dyn MessageSink>) {
        self.pending_sinks.insert(name.into(), sink);
    }

    /// Runs the consumer loop until the channel is closed (every sender
    /// dropped). Each command's handler runs to completion, including any
    /// broadcast I/O it performs, before the next command is dequeued
    /// (§5 "Suspension points").
    pub async fn run(&mut self, mut inbox: mpsc::Receiver<InboundCommand>) {
        while let Some(command) = inbox.recv().await {
            self.dispatch(command).await;
        }
    }

    /// Handles exactly one decoded command (§6 "Inbound command types").
    /// Lobby- and Room-level operations push their own broadcasts as a
    /// side effect; this method's only additional job is turning a
    /// rejected operation into an `Info` (§7 kinds 1–2).
    pub async fn dispatch(&mut self, command: InboundCommand) {
        match command {
            InboundCommand::NewRoom { name } => match self.lobby.new_room(name).await {
                Ok(()) => self.lobby.broadcast_info("New room successfully created").await,
                Err(err) => self.lobby.broadcast_info(err.to_string()).await,
            },
            InboundCommand::DeleteRoom { name } => match self.lobby.delete_room(&name).await {
                Ok(()) => self.lobby.broadcast_info("Deleted room").await,
                Err(err) => self.lobby.broadcast_info(err.to_string()).await,
            },
            InboundCommand::NewPlayer { name, password } => {
                let Some(sink) = self.pending_sinks.remove(&name) else {
                    warn!(player = %name, "NewPlayer dispatched with no sink staged via attach_sink");
                    return;
                };
                if let Err(err) = self.lobby.new_player(name, password, sink).await {
                    self.lobby.broadcast_info(err.to_string()).await;
                }
            }
            InboundCommand::DeletePlayer { name } => match self.lobby.delete_player(&name).await {
                Ok(()) => self.lobby.broadcast_info("Deleted player").await,
                Err(err) => self.lobby.broadcast_info(err.to_string()).await,
            },
            InboundCommand::JoinRoom { player, room } => {
                let status = match self.lobby.join_room(&player, &room).await {
                    Ok(()) => format!("{player} has joined {room}"),
                    Err(err) => err.to_string(),
                };
                self.lobby.broadcast_info(status).await;
            }
            InboundCommand::LeaveRoom { player, room } => {
                let status = match self.lobby.leave_room(&player, &room).await {
                    Ok(()) => format!("{player} has left {room}"),
                    Err(err) => err.to_string(),
                };
                self.lobby.broadcast_info(status).await;
            }
            InboundCommand::StartGame { room } => {
                let Some(room_ref) = self.lobby.room_mut(&room) else {
                    self.lobby.broadcast_info(format!("unknown room: {room}")).await;
                    return;
                };
                if let Err(err) = room_ref.start_game().await {
                    room_ref.send_info(err.to_string()).await;
                }
            }
            InboundCommand::RevealCard { room, player, card } => {
                if let Some(room_ref) = self.lobby.room_mut(&room) {
                    room_ref.reveal_card(&player, card).await;
                }
            }
            InboundCommand::NewInstrument { room, kind, name, strike } => {
                let Some(room_ref) = self.lobby.room_mut(&room) else {
                    self.lobby.broadcast_info(format!("unknown room: {room}")).await;
                    return;
                };
                match kind {
                    NewInstrumentKind::Underlying => room_ref.init_underlying().await,
                    NewInstrumentKind::Call | NewInstrumentKind::Put => {
                        let option_kind = Option::from(kind).expect("CALL/PUT always maps to Some");
                        let result = match strike {
                            Some(strike) => room_ref.new_option(&name, option_kind, strike).await,
                            None => Err(crate::room::RoomError::InvalidStrike),
                        };
                        if let Err(err) = result {
                            room_ref.send_info(err.to_string()).await;
                        }
                    }
                }
            }
            InboundCommand::NewOrder { room, player, instrument, price, size, direction } => {
                let Some(room_ref) = self.lobby.room_mut(&room) else {
                    self.lobby.broadcast_info(format!("unknown room: {room}")).await;
                    return;
                };
                if let Err(err) = room_ref.new_order(&instrument, &player, price, size, direction).await {
                    room_ref.send_info(err.to_string()).await;
                }
            }
            InboundCommand::CancelOrder { room, player, instrument, price, direction } => {
                let Some(room_ref) = self.lobby.room_mut(&room) else {
                    self.lobby.broadcast_info(format!("unknown room: {room}")).await;
                    return;
                };
                if let Err(err) = room_ref.cancel_order(&instrument, &player, price, direction).await {
                    room_ref.send_info(err.to_string()).await;
                }
            }
            InboundCommand::SettleGame { room } => {
                let Some(room_ref) = self.lobby.room_mut(&room) else {
                    self.lobby.broadcast_info(format!("unknown room: {room}")).await;
                    return;
                };
                if let Err(err) = room_ref.settle_game().await {
                    room_ref.send_info(err.to_string()).await;
                }
            }
        }
    }
}
