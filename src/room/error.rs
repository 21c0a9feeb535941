//! Conflict- and validation-kind errors raised by [`crate::room::Room`] (§7).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("the game has already started")]
    AlreadyStarted,

    #[error("the game has not started yet")]
    NotStarted,

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("instrument already exists: {0}")]
    DuplicateInstrument(String),

    #[error("strike must be a positive integer")]
    InvalidStrike,

    #[error("player is not a member of this room")]
    NotAMember,

    #[error("price and size must be positive integers")]
    InvalidOrderFields,
}
