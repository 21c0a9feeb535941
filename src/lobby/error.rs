//! Conflict-kind errors raised by [`crate::lobby::Lobby`] (§7, §11).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LobbyError {
    #[error("room already exists: {0}")]
    DuplicateRoom(String),

    #[error("unknown room: {0}")]
    UnknownRoom(String),

    #[error("room is not in the waiting state: {0}")]
    RoomNotWaiting(String),

    #[error("player already registered under a different password: {0}")]
    WrongPassword(String),

    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    #[error("{0}")]
    Room(#[from] crate::room::RoomError),
}
