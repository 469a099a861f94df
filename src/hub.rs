//! The room hub: tracks live rooms, routes sockets to their engine and
//! fans events out to the right audience.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{event, Level};

use crate::engine::{EngineEvent, EngineSettings, GameEngine};
use crate::models::PlayerRole;
use crate::protocol::ServerMessage;
use crate::storage::Repositories;

#[derive(Debug, Clone)]
/// Sending half of one client connection.
pub struct ConnectionHandle {
    pub id: u64,
    outbound: UnboundedSender<ServerMessage>,
}

impl ConnectionHandle {
    /// Delivers a single message. Failures mean the peer is gone; they are
    /// surfaced to the caller but never retried.
    pub fn send(&self, message: ServerMessage) -> bool {
        self.outbound.send(message).is_ok()
    }
}

#[derive(Debug)]
/// A connection bound to a room, with its authenticated identity.
pub struct ConnEntry {
    pub handle: ConnectionHandle,
    pub role: Option<PlayerRole>,
    pub player_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Recipient set for a broadcast.
pub enum Audience {
    All,
    Master,
    Players,
    /// One player, addressed by id.
    Player(String),
    /// Everyone except one player.
    Except(String),
}

impl Audience {
    /// Whether a connection belongs to this audience.
    pub fn includes(&self, entry: &ConnEntry) -> bool {
        match self {
            Self::All => true,
            Self::Master => entry.role == Some(PlayerRole::Master),
            Self::Players => entry.role == Some(PlayerRole::Player),
            Self::Player(id) => entry.player_id.as_deref() == Some(id.as_str()),
            Self::Except(id) => entry.player_id.as_deref() != Some(id.as_str()),
        }
    }
}

/// Delivers `message` to every connection in the audience.
///
/// Sends into per-connection FIFO queues, so per-recipient ordering follows
/// the caller's emission order. Failed sends are swallowed; the reader task
/// of a dead socket detaches it.
pub fn fan_out(
    connections: &DashMap<u64, ConnEntry>,
    message: &ServerMessage,
    audience: &Audience,
) {
    for entry in connections.iter() {
        if audience.includes(&entry) && !entry.handle.send(message.clone()) {
            event!(
                Level::DEBUG,
                conn_id = entry.handle.id,
                kind = message.kind(),
                "dropping message for a dead socket"
            );
        }
    }
}

/// One live room: its engine inbox and its socket set.
pub struct RoomSlot {
    pub inbox: UnboundedSender<EngineEvent>,
    pub connections: Arc<DashMap<u64, ConnEntry>>,
}

/// Registry of active rooms.
pub struct Hub {
    rooms: DashMap<String, RoomSlot>,
    repos: Repositories,
    settings: EngineSettings,
    next_conn_id: AtomicU64,
    /// Handed to engines so they can release their own slot.
    weak_self: Weak<Hub>,
}

impl Hub {
    pub fn new(repos: Repositories, settings: EngineSettings) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            rooms: DashMap::new(),
            repos,
            settings,
            next_conn_id: AtomicU64::new(1),
            weak_self: weak_self.clone(),
        })
    }

    /// The repositories this hub serves.
    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    /// Number of live room slots. For diagnostics and tests.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Binds a new connection to a room, creating the room's engine slot on
    /// first attach. The engine authenticates and answers the handshake.
    pub async fn attach(
        &self,
        room_id: &str,
        token: Option<String>,
        player_id: Option<String>,
        outbound: UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionHandle, crate::storage::Error> {
        // The room must exist before a slot is created for it.
        self.repos.rooms.find_by_id(room_id).await?;

        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let handle = ConnectionHandle {
            id: conn_id,
            outbound,
        };

        let inbox = {
            let slot = self.rooms.entry(room_id.to_string()).or_insert_with(|| {
                let connections = Arc::new(DashMap::new());
                let inbox = GameEngine::spawn(
                    room_id.to_string(),
                    self.repos.clone(),
                    self.weak_self.clone(),
                    connections.clone(),
                    self.settings.clone(),
                );

                event!(Level::DEBUG, room_id = %room_id, "room slot created");

                RoomSlot { inbox, connections }
            });

            slot.connections.insert(
                conn_id,
                ConnEntry {
                    handle: handle.clone(),
                    role: None,
                    player_id: None,
                },
            );

            slot.inbox.clone()
        };

        let _ = inbox.send(EngineEvent::Attached {
            conn: handle.clone(),
            token,
            player_id,
        });

        Ok(handle)
    }

    /// Detaches a closed connection and tells the engine.
    pub fn detach(&self, room_id: &str, conn_id: u64) {
        let Some(slot) = self.rooms.get(room_id) else {
            return;
        };

        let player_id = slot
            .connections
            .remove(&conn_id)
            .and_then(|(_, entry)| entry.player_id);

        let _ = slot.inbox.send(EngineEvent::ConnectionClosed {
            conn_id,
            player_id,
        });
    }

    /// Forwards a decoded client message to the room's engine.
    pub fn route(&self, room_id: &str, conn: &ConnectionHandle, msg: crate::protocol::ClientMessage) {
        if let Some(slot) = self.rooms.get(room_id) {
            let _ = slot.inbox.send(EngineEvent::Message {
                conn: conn.clone(),
                msg,
            });
        }
    }

    /// Reports an undecodable frame to the room's engine.
    pub fn route_malformed(&self, room_id: &str, conn: &ConnectionHandle, detail: String) {
        if let Some(slot) = self.rooms.get(room_id) {
            let _ = slot.inbox.send(EngineEvent::Malformed {
                conn: conn.clone(),
                detail,
            });
        }
    }

    /// Releases a room slot and shuts its engine down.
    pub fn remove_room(&self, room_id: &str) {
        if let Some((_, slot)) = self.rooms.remove(room_id) {
            let _ = slot.inbox.send(EngineEvent::Shutdown);
            event!(Level::DEBUG, room_id = %room_id, "room slot released");
        }
    }
}
