//! The room/player directory and its create/delete/join/leave routing
//! (§2 "Lobby", §4.6).
//!
//! Grounded in `original_source/backend/server.py`'s `Lobby` class, which
//! owns `_rooms`/`_players` dictionaries keyed by name. This port adds the
//! `connected` name set §4.6 calls out as distinct from the players
//! directory (a player can be registered — even mid-game — without
//! currently being connected, between a dropped socket and a reconnect).

mod error;

pub use error::LobbyError;

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::messages::OutboundMessage;
use crate::player::{MessageSink, Player};
use crate::room::{Room, RoomConfig, RoomStatus};

/// The room/player directory (§4.6 "Directory state").
pub struct Lobby {
    rooms: HashMap<String, Room>,
    players: HashMap<String, Player>,
    connected: HashSet<String>,
    room_config: RoomConfig,
}

impl Lobby {
    pub fn new(room_config: RoomConfig) -> Self {
        Self { rooms: HashMap::new(), players: HashMap::new(), connected: HashSet::new(), room_config }
    }

    fn sorted_room_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rooms.keys().cloned().collect();
        names.sort();
        names
    }

    fn sorted_player_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.players.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn room_mut(&mut self, name: &str) -> Option<&mut Room> {
        self.rooms.get_mut(name)
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.get(name)
    }

    /// Creates an empty waiting room (§4.6 `new_room`).
    pub async fn new_room(&mut self, name: String) -> Result<(), LobbyError> {
        if self.rooms.contains_key(&name) {
            return Err(LobbyError::DuplicateRoom(name));
        }
        info!(room = %name, "room created");
        self.rooms.insert(name.clone(), Room::new(name, self.room_config));
        self.broadcast(OutboundMessage::RoomUpdate { data: self.sorted_room_names() }).await;
        Ok(())
    }

    /// Deletes a waiting room (§4.6 `delete_room`); refuses once a game has
    /// started so players mid-settlement aren't pulled out from under it.
    pub async fn delete_room(&mut self, name: &str) -> Result<(), LobbyError> {
        let Some(room) = self.rooms.get(name) else {
            return Err(LobbyError::UnknownRoom(name.to_string()));
        };
        if room.status() != RoomStatus::Waiting {
            return Err(LobbyError::RoomNotWaiting(name.to_string()));
        }
        self.rooms.remove(name);
        info!(room = %name, "room deleted");
        self.broadcast(OutboundMessage::RoomUpdate { data: self.sorted_room_names() }).await;
        Ok(())
    }

    /// Registers a new player, or — if `name` is already registered and
    /// `password` matches — treats this as a reconnect: swaps in the new
    /// sink and re-marks the name connected (§4.6 `new_player`, §9 "Open
    /// questions" reconnect resolution). A mismatched password is a
    /// Conflict.
    pub async fn new_player(
        &mut self,
        name: String,
        password: String,
        sink: Box<dyn MessageSink>,
    ) -> Result<(), LobbyError> {
        if let Some(existing) = self.players.get(&name) {
            if !existing.password_matches(&password) {
                return Err(LobbyError::WrongPassword(name));
            }
            info!(player = %name, "player reconnected");
            existing.replace_sink(sink).await;
            self.connected.insert(name.clone());
            existing.send_best_effort(&OutboundMessage::PlayerDetails { data: name }).await;
            return Ok(());
        }

        info!(player = %name, "player registered");
        let player = Player::new(name.clone(), password, sink);
        self.players.insert(name.clone(), player);
        self.connected.insert(name.clone());
        self.broadcast(OutboundMessage::PlayerUpdate { data: self.sorted_player_names() }).await;
        if let Some(player) = self.players.get(&name) {
            player.send_best_effort(&OutboundMessage::PlayerDetails { data: name }).await;
        }
        Ok(())
    }

    /// Removes a player from the directory, the connected set, and every
    /// room it belongs to (§4.6 `delete_player`).
    pub async fn delete_player(&mut self, name: &str) -> Result<(), LobbyError> {
        if !self.players.contains_key(name) {
            return Err(LobbyError::UnknownPlayer(name.to_string()));
        }
        self.players.remove(name);
        self.connected.remove(name);
        for room in self.rooms.values_mut() {
            let _ = room.leave(name).await;
        }
        info!(player = %name, "player deleted");
        self.broadcast(OutboundMessage::PlayerUpdate { data: self.sorted_player_names() }).await;
        Ok(())
    }

    /// Looks up both directory entries and delegates to `Room::join`
    /// (§4.6 `join_room`).
    pub async fn join_room(&mut self, player_name: &str, room_name: &str) -> Result<(), LobbyError> {
        let player = self.players.get(player_name).cloned().ok_or_else(|| LobbyError::UnknownPlayer(player_name.to_string()))?;
        let room = self.rooms.get_mut(room_name).ok_or_else(|| LobbyError::UnknownRoom(room_name.to_string()))?;
        room.join(player.clone()).await?;
        player
            .send_best_effort(&OutboundMessage::CurrentRoom {
                data: crate::messages::CurrentRoomData { name: room_name.to_string() },
            })
            .await;
        Ok(())
    }

    /// Looks up both directory entries and delegates to `Room::leave`
    /// (§4.6 `leave_room`).
    pub async fn leave_room(&mut self, player_name: &str, room_name: &str) -> Result<(), LobbyError> {
        if !self.players.contains_key(player_name) {
            return Err(LobbyError::UnknownPlayer(player_name.to_string()));
        }
        let room = self.rooms.get_mut(room_name).ok_or_else(|| LobbyError::UnknownRoom(room_name.to_string()))?;
        let _ = room.leave(player_name).await;
        Ok(())
    }

    /// Pushes `message` to every currently connected player, dropping any
    /// recipient whose send fails from the connected set (§5 "Backpressure
    /// and failure isolation", §7 kind 3).
    pub async fn broadcast(&mut self, message: OutboundMessage) {
        let mut failed = Vec::new();
        for name in &self.connected {
            let Some(player) = self.players.get(name) else { continue };
            if player.send(&message).await.is_err() {
                failed.push(name.clone());
            }
        }
        for name in failed {
            warn!(player = %name, "dropped from connected set after send failure");
            self.connected.remove(&name);
        }
    }

    /// Convenience wrapper used by the Engine to surface a validation or
    /// conflict result as an `Info` broadcast (§7 kinds 1 and 2).
    pub async fn broadcast_info(&mut self, status: impl Into<String>) {
        self.broadcast(OutboundMessage::Info { status: status.into() }).await;
    }
}
