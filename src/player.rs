//! Players and their outbound message sinks.
//!
//! Grounded in `original_source/backend/server.py`'s `Player` class, which
//! pairs a name/password with a live websocket. Per SPEC_FULL §9
//! ("Cyclic references" / "Global mutable state"), the sink is reached
//! through a cheaply-clonable handle rather than the `Room`/`Lobby` holding
//! a unique owner of it, so the same player registered in both the `Lobby`
//! and any number of `Room`s observes a reconnect's new sink immediately.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

use crate::messages::OutboundMessage;

/// A transport failure while pushing a message to a player's sink (§7 kind 3).
///
/// Never surfaced to the user; the caller's job is to decide what to do
/// with a disconnected recipient (drop it from a broadcast set).
#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// The out-of-scope websocket connection, abstracted to "push JSON at a
/// named player" (§1 Purpose & Scope: "treats each connected player as a
/// named sink").
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&mut self, message: Value) -> Result<(), TransportError>;
}

/// A player identified by name (§3). Clones share the same underlying sink,
/// so replacing it on reconnect is visible to every `Room`/`Lobby` holding a
/// clone of this handle.
#[derive(Clone)]
pub struct Player {
    pub name: String,
    password: String,
    sink: Arc<RwLock<Box<dyn MessageSink>>>,
}

impl Player {
    pub fn new(name: impl Into<String>, password: impl Into<String>, sink: Box<dyn MessageSink>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            sink: Arc::new(RwLock::new(sink)),
        }
    }

    pub fn password_matches(&self, password: &str) -> bool {
        self.password == password
    }

    /// Swaps in a new sink on reconnect (§4.6). Every existing clone of this
    /// handle observes the new sink on its next send.
    pub async fn replace_sink(&self, sink: Box<dyn MessageSink>) {
        *self.sink.write().await = sink;
    }

    pub async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let value = serde_json::to_value(message).expect("OutboundMessage always serializes");
        self.sink.write().await.send(value).await
    }

    /// Sends and swallows a transport failure, logging it (§7 kind 3, §10).
    /// Used for room-scoped broadcasts, which never evict on send failure.
    pub async fn send_best_effort(&self, message: &OutboundMessage) {
        if let Err(err) = self.send(message).await {
            warn!(player = %self.name, %err, "send failed, ignoring (room-scoped)");
        }
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player").field("name", &self.name).finish_non_exhaustive()
    }
}
