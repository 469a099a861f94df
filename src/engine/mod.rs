//! The per-room game engine.
//!
//! One engine task owns all mutable gameplay state of its room and is the
//! single writer over it. Every external trigger (client messages, timer
//! firings, disconnect notifications) arrives through the engine's inbox
//! and is processed strictly one at a time, which makes the serial order of
//! processing the total order over state mutations and emitted events.

pub mod state;
pub mod timer;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::result::Result as StdResult;
use std::sync::{Arc, Weak};

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{sleep, Duration};
use tracing::{event, instrument, Level};
use uuid::Uuid;

use crate::hub::{fan_out, Audience, ConnEntry, ConnectionHandle, Hub};
use crate::media;
use crate::models::{
    AnswerKind, Player, PlayerRole, RoomStatus, Round, RoundConfig, RoundStatus,
    RoundSongStatus, SessionStatus,
};
use crate::modes::{self, BuzzOutcome, SubmittedAnswer};
use crate::params::{self, ModeParams};
use crate::protocol::{ClientMessage, QuestionView, RoundSnapshot, ServerMessage};
use crate::scoring::{competition_ranking, FinalScore};
use crate::storage::{self, PlayerPatch, Repositories, RoomPatch, SimilarQuery};
use crate::utils::constants::{
    ENCORE_DISTRACTOR_POOL_LIMIT, ENCORE_MIN_PLAYERS_TO_START, ENCORE_SIMILAR_YEAR_WINDOW,
};
use crate::utils::valid_name;

use state::{LiveGame, LiveRound, LiveSong};
use timer::{TimerFire, TimerKind, Timers};

/// Result type for engine handlers.
pub type Result<T> = StdResult<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Errors reported back to the originating socket.
pub enum Error {
    /// Malformed frame or unknown message type.
    Transport(String),
    /// Missing or invalid credentials for a master-only action.
    Auth(&'static str),
    /// The action is illegal in the current state.
    State(&'static str),
    /// An id did not resolve.
    NotFound(String),
    /// A uniqueness rule would be violated.
    Conflict(String),
    /// A name or parameter is out of range.
    Validation(String),
    /// A bug or I/O failure. Logged; reported generically.
    Internal(String),
}

impl Error {
    /// Stable error code carried on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Auth(_) => "AUTH_ERROR",
            Self::State(_) => "STATE_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Human-readable message carried on the wire.
    pub fn message(&self) -> String {
        match self {
            Self::Transport(detail) => detail.clone(),
            Self::Auth(detail) | Self::State(detail) => (*detail).to_string(),
            Self::NotFound(detail) | Self::Conflict(detail) | Self::Validation(detail) => {
                detail.clone()
            }
            // Internals stay server-side; the sender gets a generic line.
            Self::Internal(_) => "internal server error".to_string(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(detail) => write!(f, "transport error: {}", detail),
            Self::Auth(detail) => write!(f, "auth error: {}", detail),
            Self::State(detail) => write!(f, "state error: {}", detail),
            Self::NotFound(detail) => write!(f, "not found: {}", detail),
            Self::Conflict(detail) => write!(f, "conflict: {}", detail),
            Self::Validation(detail) => write!(f, "validation error: {}", detail),
            Self::Internal(detail) => write!(f, "internal error: {}", detail),
        }
    }
}

impl std::error::Error for Error {}

impl From<storage::Error> for Error {
    fn from(e: storage::Error) -> Self {
        match e {
            storage::Error::NotFound { .. } => Self::NotFound(e.to_string()),
            storage::Error::Conflict(detail) => Self::Conflict(detail),
            storage::Error::Validation(detail) => Self::Validation(detail),
            storage::Error::Backend(detail) => Self::Internal(detail),
        }
    }
}

#[derive(Debug, Clone)]
/// Engine knobs resolved from the configuration.
pub struct EngineSettings {
    /// Reconnection window before the room is told about a disconnect.
    pub grace: Duration,
    /// Auto-advance delay between rounds. `None` waits for the master.
    pub round_advance: Option<Duration>,
    /// System-default gameplay parameters.
    pub system_params: ModeParams,
    /// Fallback song count for rounds with neither songs nor filters.
    pub default_round_songs: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(crate::utils::constants::ENCORE_DEFAULT_GRACE_SECS),
            round_advance: None,
            system_params: ModeParams::default(),
            default_round_songs: 10,
        }
    }
}

/// An event delivered to a room engine.
pub enum EngineEvent {
    /// A socket attached to the room; the engine authenticates it.
    Attached {
        conn: ConnectionHandle,
        token: Option<String>,
        player_id: Option<String>,
    },
    /// A decoded client message.
    Message {
        conn: ConnectionHandle,
        msg: ClientMessage,
    },
    /// An undecodable frame from a socket.
    Malformed {
        conn: ConnectionHandle,
        detail: String,
    },
    /// A socket closed.
    ConnectionClosed {
        conn_id: u64,
        player_id: Option<String>,
    },
    /// A reconnection grace window ran out.
    GraceExpired { player_id: String, epoch: u64 },
    /// A logical deadline fired.
    Timer(TimerFire),
    /// Tear the engine down.
    Shutdown,
}

/// One room's authoritative state machine.
pub struct GameEngine {
    room_id: String,
    repos: Repositories,
    hub: Weak<Hub>,
    connections: Arc<DashMap<u64, ConnEntry>>,
    inbox: UnboundedReceiver<EngineEvent>,
    inbox_tx: UnboundedSender<EngineEvent>,
    timers: Timers,
    settings: EngineSettings,
    live: Option<LiveGame>,
    /// Per-player disconnect epochs; a reconnect makes pending grace
    /// expiries stale.
    grace_epochs: HashMap<String, u64>,
}

impl GameEngine {
    /// Spawns the engine task for a room and returns its inbox.
    pub fn spawn(
        room_id: String,
        repos: Repositories,
        hub: Weak<Hub>,
        connections: Arc<DashMap<u64, ConnEntry>>,
        settings: EngineSettings,
    ) -> UnboundedSender<EngineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        let engine = GameEngine {
            room_id,
            repos,
            hub,
            connections,
            inbox: rx,
            inbox_tx: tx.clone(),
            timers: Timers::new(tx.clone()),
            settings,
            live: None,
            grace_epochs: HashMap::new(),
        };

        tokio::spawn(engine.run());

        tx
    }

    /// The engine event loop. Handlers run to completion one at a time;
    /// a failing handler reports to the originating socket and never kills
    /// the room.
    async fn run(mut self) {
        event!(Level::DEBUG, room_id = %self.room_id, "engine started");

        while let Some(engine_event) = self.inbox.recv().await {
            if matches!(engine_event, EngineEvent::Shutdown) {
                self.teardown();
                break;
            }

            self.dispatch(engine_event).await;
        }

        event!(Level::DEBUG, room_id = %self.room_id, "engine stopped");
    }

    #[instrument(skip_all, fields(room_id = %self.room_id))]
    async fn dispatch(&mut self, engine_event: EngineEvent) {
        match engine_event {
            EngineEvent::Attached {
                conn,
                token,
                player_id,
            } => {
                if let Err(e) = self.handle_attach(&conn, token, player_id).await {
                    self.report(&conn, &e);
                }
            }
            EngineEvent::Message { conn, msg } => {
                if let Err(e) = self.handle_message(&conn, msg).await {
                    if let Error::Internal(ref detail) = e {
                        event!(Level::ERROR, error = %detail, "engine handler failed");
                    }

                    self.report(&conn, &e);
                }
            }
            EngineEvent::Malformed { conn, detail } => {
                self.report(&conn, &Error::Transport(detail));
            }
            EngineEvent::ConnectionClosed { conn_id, player_id } => {
                self.handle_disconnect(conn_id, player_id);
            }
            EngineEvent::GraceExpired { player_id, epoch } => {
                if let Err(e) = self.handle_grace_expired(&player_id, epoch).await {
                    event!(Level::WARN, error = %e, "grace expiry handling failed");
                }
            }
            EngineEvent::Timer(fire) => {
                if let Err(e) = self.handle_timer(fire).await {
                    event!(Level::WARN, error = %e, "timer handling failed");
                }
            }
            EngineEvent::Shutdown => self.teardown(),
        }
    }

    /// Drains the inbox and cancels every timer before the slot goes away.
    fn teardown(&mut self) {
        self.timers.cancel_all();

        while self.inbox.try_recv().is_ok() {}
    }

    fn report(&self, conn: &ConnectionHandle, error: &Error) {
        conn.send(ServerMessage::Error {
            code: error.code().to_string(),
            message: error.message(),
        });
    }

    fn broadcast(&self, message: ServerMessage, audience: Audience) {
        fan_out(&self.connections, &message, &audience);
    }

    /// The authenticated identity of a connection.
    fn identity(&self, conn: &ConnectionHandle) -> (Option<PlayerRole>, Option<String>) {
        self.connections
            .get(&conn.id)
            .map(|entry| (entry.role, entry.player_id.clone()))
            .unwrap_or((None, None))
    }

    fn set_identity(&self, conn_id: u64, role: Option<PlayerRole>, player_id: Option<String>) {
        if let Some(mut entry) = self.connections.get_mut(&conn_id) {
            entry.role = role;
            entry.player_id = player_id;
        }
    }

    fn require_master(&self, conn: &ConnectionHandle) -> Result<()> {
        match self.identity(conn).0 {
            Some(PlayerRole::Master) => Ok(()),
            _ => Err(Error::Auth("this action requires the master token")),
        }
    }

    // ---- connection lifecycle ------------------------------------------

    async fn handle_attach(
        &mut self,
        conn: &ConnectionHandle,
        token: Option<String>,
        player_id: Option<String>,
    ) -> Result<()> {
        conn.send(ServerMessage::Connected {
            room_id: self.room_id.clone(),
        });

        if let Some(token) = token {
            let expected = self.repos.rooms.master_token(&self.room_id).await?;

            if token != expected {
                return Err(Error::Auth("invalid master token"));
            }

            self.set_identity(conn.id, Some(PlayerRole::Master), None);

            event!(Level::DEBUG, conn_id = conn.id, "master attached");

            return Ok(());
        }

        if let Some(player_id) = player_id {
            return self.handle_reconnect(conn, &player_id).await;
        }

        Ok(())
    }

    /// Re-binds a returning player's socket within the session.
    async fn handle_reconnect(&mut self, conn: &ConnectionHandle, player_id: &str) -> Result<()> {
        let player = self.repos.players.find_by_id(player_id).await?;

        if player.room_id != self.room_id {
            return Err(Error::NotFound(format!(
                "player '{}' does not belong to this room",
                player_id
            )));
        }

        // Invalidate any pending grace expiry.
        *self.grace_epochs.entry(player_id.to_string()).or_insert(0) += 1;

        self.set_identity(conn.id, Some(player.role), Some(player.id.clone()));

        let was_disconnected = !player.connected;

        self.repos
            .players
            .update(
                player_id,
                PlayerPatch {
                    connected: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        if let Some(live) = self.live.as_mut() {
            if let Some(roster_entry) = live.players.get_mut(player_id) {
                roster_entry.connected = true;
            }
        }

        if was_disconnected {
            event!(Level::INFO, player_id = %player_id, "player reconnected");

            self.broadcast(
                ServerMessage::PlayerReconnected {
                    player_id: player.id,
                    player_name: player.name,
                },
                Audience::All,
            );
        }

        Ok(())
    }

    fn handle_disconnect(&mut self, conn_id: u64, player_id: Option<String>) {
        event!(Level::DEBUG, conn_id = conn_id, "connection closed");

        if let Some(player_id) = player_id {
            let still_connected = self
                .connections
                .iter()
                .any(|entry| entry.player_id.as_deref() == Some(player_id.as_str()));

            if !still_connected {
                let epoch = {
                    let epoch = self.grace_epochs.entry(player_id.clone()).or_insert(0);
                    *epoch += 1;
                    *epoch
                };

                let inbox = self.inbox_tx.clone();
                let grace = self.settings.grace;

                tokio::spawn(async move {
                    sleep(grace).await;
                    let _ = inbox.send(EngineEvent::GraceExpired { player_id, epoch });
                });
            }
        }

        // An idle room with nobody attached releases its slot. A running
        // game stays resident so players can reconnect.
        if self.connections.is_empty() && self.live.is_none() {
            if let Some(hub) = self.hub.upgrade() {
                hub.remove_room(&self.room_id);
            }
        }
    }

    async fn handle_grace_expired(&mut self, player_id: &str, epoch: u64) -> Result<()> {
        if self.grace_epochs.get(player_id) != Some(&epoch) {
            return Ok(());
        }

        let reconnected = self
            .connections
            .iter()
            .any(|entry| entry.player_id.as_deref() == Some(player_id));

        if reconnected {
            return Ok(());
        }

        let player = self.repos.players.find_by_id(player_id).await?;

        self.repos
            .players
            .update(
                player_id,
                PlayerPatch {
                    connected: Some(false),
                    ..Default::default()
                },
            )
            .await?;

        if let Some(live) = self.live.as_mut() {
            if let Some(roster_entry) = live.players.get_mut(player_id) {
                roster_entry.connected = false;
            }
        }

        event!(Level::INFO, player_id = %player_id, "player disconnected");

        self.broadcast(
            ServerMessage::PlayerDisconnected {
                player_id: player.id,
                player_name: player.name,
            },
            Audience::All,
        );

        // A vanished buzzer must not hang the song.
        self.release_active_buzzer(player_id).await?;

        Ok(())
    }

    /// Reopens the song if `player_id` held the buzz.
    async fn release_active_buzzer(&mut self, player_id: &str) -> Result<()> {
        let reopened = {
            let Some(live) = self.live.as_mut() else {
                return Ok(());
            };
            let Some(round) = live.rounds.get_mut(live.current_round) else {
                return Ok(());
            };
            let Some(song) = round.songs.get_mut(round.current_song) else {
                return Ok(());
            };

            if song.status == RoundSongStatus::Answering
                && song.active_player_id.as_deref() == Some(player_id)
            {
                song.active_player_id = None;
                song.status = RoundSongStatus::Playing;
                true
            } else {
                false
            }
        };

        if reopened {
            self.set_active_flag(player_id, false).await?;
            self.timers.cancel(TimerKind::Answer);
            self.timers.resume(TimerKind::Song);
        }

        Ok(())
    }

    // ---- message dispatch ----------------------------------------------

    async fn handle_message(&mut self, conn: &ConnectionHandle, msg: ClientMessage) -> Result<()> {
        match msg {
            ClientMessage::PlayerJoin { name } => self.handle_join(conn, name).await,
            ClientMessage::PlayerLeave => self.handle_leave(conn).await,
            ClientMessage::PlayerKick { player_id } => self.handle_kick(conn, &player_id).await,
            ClientMessage::StateSync => self.handle_sync(conn).await,
            ClientMessage::GameStart { rounds } => self.handle_start(conn, rounds).await,
            ClientMessage::PlayerBuzz {
                song_index,
                timestamp,
            } => self.handle_buzz(conn, song_index, timestamp).await,
            ClientMessage::PlayerAnswer {
                song_index,
                kind,
                value,
            } => self.handle_player_answer(conn, song_index, kind, value).await,
            ClientMessage::GamePause => self.handle_pause(conn).await,
            ClientMessage::GameResume => self.handle_resume(conn).await,
            ClientMessage::GameSkip => self.handle_skip(conn).await,
        }
    }

    // ---- roster --------------------------------------------------------

    async fn handle_join(&mut self, conn: &ConnectionHandle, name: String) -> Result<()> {
        let room = self.repos.rooms.find_by_id(&self.room_id).await?;

        if room.status != RoomStatus::Lobby {
            return Err(Error::State("the game already started"));
        }

        if !valid_name(&name) {
            return Err(Error::Validation(format!(
                "'{}' is not an acceptable player name",
                name
            )));
        }

        let roster = self.repos.players.find_by_room(&self.room_id).await?;
        let player_count = roster
            .iter()
            .filter(|p| p.role == PlayerRole::Player)
            .count();

        if player_count >= room.max_players {
            return Err(Error::State("the room is full"));
        }

        let player = self
            .repos
            .players
            .create(storage::NewPlayer {
                room_id: self.room_id.clone(),
                name,
                role: PlayerRole::Player,
            })
            .await?;

        self.set_identity(conn.id, Some(PlayerRole::Player), Some(player.id.clone()));

        event!(Level::INFO, player_id = %player.id, player_name = %player.name, "player joined");

        self.broadcast(
            ServerMessage::PlayerJoined { player, room },
            Audience::All,
        );

        Ok(())
    }

    async fn handle_leave(&mut self, conn: &ConnectionHandle) -> Result<()> {
        let (_, player_id) = self.identity(conn);
        let player_id = player_id.ok_or(Error::State("join the room first"))?;

        self.set_identity(conn.id, None, None);
        self.remove_player(&player_id, None).await
    }

    async fn handle_kick(&mut self, conn: &ConnectionHandle, target_id: &str) -> Result<()> {
        self.require_master(conn)?;

        let target = self.repos.players.find_by_id(target_id).await?;

        if target.room_id != self.room_id {
            return Err(Error::NotFound(format!(
                "player '{}' does not belong to this room",
                target_id
            )));
        }

        self.broadcast(
            ServerMessage::PlayerKicked {
                reason: "removed by the master".to_string(),
            },
            Audience::Player(target_id.to_string()),
        );

        // Strip the identity from every socket the player holds.
        for mut entry in self.connections.iter_mut() {
            if entry.player_id.as_deref() == Some(target_id) {
                entry.role = None;
                entry.player_id = None;
            }
        }

        self.remove_player(target_id, Some("kicked")).await
    }

    /// Deletes a player and announces the departure.
    async fn remove_player(&mut self, player_id: &str, reason: Option<&str>) -> Result<()> {
        let player = self.repos.players.find_by_id(player_id).await?;

        self.repos.players.delete(player_id).await?;

        let was_active = {
            if let Some(live) = self.live.as_mut() {
                live.players.remove(player_id);
                live.rounds
                    .get(live.current_round)
                    .and_then(|round| round.songs.get(round.current_song))
                    .is_some_and(|song| song.active_player_id.as_deref() == Some(player_id))
            } else {
                false
            }
        };

        let remaining_players = self
            .repos
            .players
            .find_by_room(&self.room_id)
            .await?
            .iter()
            .filter(|p| p.role == PlayerRole::Player)
            .count();

        event!(
            Level::INFO,
            player_id = %player_id,
            reason = reason.unwrap_or("left"),
            "player removed"
        );

        self.broadcast(
            ServerMessage::PlayerLeft {
                player_id: player.id.clone(),
                player_name: player.name,
                remaining_players,
            },
            Audience::All,
        );

        if was_active {
            self.release_active_buzzer(player_id).await?;
        }

        Ok(())
    }

    // ---- snapshots -----------------------------------------------------

    async fn handle_sync(&mut self, conn: &ConnectionHandle) -> Result<()> {
        let room = self.repos.rooms.find_by_id(&self.room_id).await?;
        let players = self.repos.players.find_by_room(&self.room_id).await?;

        let current_round = self.live.as_ref().and_then(|live| {
            live.rounds.get(live.current_round).map(|round| RoundSnapshot {
                round_index: round.def.index,
                mode_type: round.def.mode_type.clone(),
                media_type: round.def.media_type.clone(),
                song_count: round.songs.len(),
                current_song_index: round.current_song,
            })
        });

        conn.send(ServerMessage::StateSynced {
            room,
            players,
            current_round,
        });

        Ok(())
    }

    // ---- game lifecycle ------------------------------------------------

    async fn handle_start(
        &mut self,
        conn: &ConnectionHandle,
        configs: Vec<RoundConfig>,
    ) -> Result<()> {
        self.require_master(conn)?;

        let room = self.repos.rooms.find_by_id(&self.room_id).await?;

        if room.status != RoomStatus::Lobby {
            return Err(Error::State("the game already started"));
        }

        if configs.is_empty() {
            return Err(Error::Validation("at least one round is required".to_string()));
        }

        let connected = self.repos.players.count_connected(&self.room_id).await?;

        if connected < ENCORE_MIN_PLAYERS_TO_START {
            return Err(Error::State("at least two connected players are required"));
        }

        let session = self.repos.sessions.create(&self.room_id).await?;

        let mut rounds = Vec::with_capacity(configs.len());

        for (index, config) in configs.into_iter().enumerate() {
            rounds.push(self.materialise_round(&session.id, index, config).await?);
        }

        // The roster is frozen now: whoever holds a seat plays for score.
        self.repos.players.reset_scores(&self.room_id).await?;

        let roster: HashMap<String, Player> = self
            .repos
            .players
            .find_by_room(&self.room_id)
            .await?
            .into_iter()
            .filter(|p| p.role == PlayerRole::Player)
            .map(|p| (p.id.clone(), p))
            .collect();

        let round_history = roster
            .keys()
            .map(|id| (id.clone(), Vec::new()))
            .collect();

        let room = self
            .repos
            .rooms
            .update(
                &self.room_id,
                RoomPatch {
                    status: Some(RoomStatus::Playing),
                    ..Default::default()
                },
            )
            .await?;

        let session = self
            .repos
            .sessions
            .set_status(&session.id, SessionStatus::Playing)
            .await?;

        event!(
            Level::INFO,
            session_id = %session.id,
            round_count = rounds.len(),
            player_count = roster.len(),
            "game started"
        );

        self.live = Some(LiveGame {
            session: session.clone(),
            players: roster,
            round_history,
            rounds,
            current_round: 0,
        });

        self.broadcast(ServerMessage::GameStarted { session, room }, Audience::All);

        self.start_round(0).await
    }

    /// Resolves one round config into a live round with its songs loaded.
    async fn materialise_round(
        &mut self,
        session_id: &str,
        index: usize,
        config: RoundConfig,
    ) -> Result<LiveRound> {
        let mode = modes::mode(&config.mode_type).ok_or_else(|| {
            Error::Validation(format!("unknown mode '{}'", config.mode_type))
        })?;
        let media_handler = media::media(&config.media_type).ok_or_else(|| {
            Error::Validation(format!("unknown media type '{}'", config.media_type))
        })?;

        let songs = if let Some(ids) = &config.song_ids {
            self.repos.songs.find_by_ids(ids).await?
        } else if let Some(filters) = &config.song_filters {
            self.repos.songs.find_by_filters(filters).await?
        } else {
            self.repos
                .songs
                .get_random(self.settings.default_round_songs, false)
                .await?
        };

        if songs.is_empty() {
            return Err(Error::Validation(format!(
                "round {} has no songs to play",
                index
            )));
        }

        let effective = params::resolve(
            &self.settings.system_params,
            &mode.default_params(),
            config.params.as_ref(),
        );

        let def = Round {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            index,
            mode_type: config.mode_type,
            media_type: config.media_type,
            params: config.params,
            song_filters: config.song_filters,
            status: RoundStatus::Pending,
            song_ids: songs.iter().map(|s| s.id.clone()).collect(),
        };

        self.repos.sessions.add_round(def.clone()).await?;

        let mut live_songs = Vec::with_capacity(songs.len());

        for (song_index, song) in songs.into_iter().enumerate() {
            let content = media_handler
                .load_content(&song)
                .map_err(|e| Error::Validation(e.to_string()))?;

            live_songs.push(LiveSong::new(song_index, song, content, effective.clone()));
        }

        Ok(LiveRound {
            def,
            mode,
            media: media_handler,
            songs: live_songs,
            current_song: 0,
        })
    }

    async fn start_round(&mut self, index: usize) -> Result<()> {
        let (round_index, mode_type, media_type, song_count, player_ids) = {
            let live = self.live.as_mut().ok_or(Error::State("no game in progress"))?;

            live.current_round = index;

            let player_ids: Vec<String> = live.players.keys().cloned().collect();

            for player in live.players.values_mut() {
                player.round_score = 0;
            }

            let round = live
                .rounds
                .get_mut(index)
                .ok_or(Error::Internal(format!("round {} is missing", index)))?;

            round.def.status = RoundStatus::Active;
            round.current_song = 0;

            let mode = round.mode.clone();
            mode.start_round(&mut round.def);

            (
                round.def.index,
                round.def.mode_type.clone(),
                round.def.media_type.clone(),
                round.songs.len(),
                player_ids,
            )
        };

        for player_id in &player_ids {
            self.repos
                .players
                .update(
                    player_id,
                    PlayerPatch {
                        round_score: Some(0),
                        ..Default::default()
                    },
                )
                .await?;
        }

        event!(Level::INFO, round_index, mode = %mode_type, "round started");

        self.broadcast(
            ServerMessage::RoundStarted {
                round_index,
                mode_type,
                media_type,
                song_count,
            },
            Audience::All,
        );

        self.start_song().await
    }

    async fn start_song(&mut self) -> Result<()> {
        // Clear the per-song flags of the previous song.
        let player_ids: Vec<String> = {
            let live = self.live.as_ref().ok_or(Error::State("no game in progress"))?;
            live.players.keys().cloned().collect()
        };

        for player_id in &player_ids {
            self.set_song_flags(player_id, false, false).await?;
        }

        let pool_query = {
            let live = self.live.as_ref().ok_or(Error::State("no game in progress"))?;
            let round = live.round().ok_or(Error::Internal("no current round".into()))?;
            let song = round
                .song()
                .ok_or(Error::Internal("no current song".into()))?;

            SimilarQuery {
                genre: song.song.genre.clone(),
                year_min: Some(song.song.year - ENCORE_SIMILAR_YEAR_WINDOW),
                year_max: Some(song.song.year + ENCORE_SIMILAR_YEAR_WINDOW),
                language: song.song.language.clone(),
                exclude_song_id: Some(song.song.id.clone()),
                limit: ENCORE_DISTRACTOR_POOL_LIMIT,
            }
        };

        let pool_songs = self.repos.songs.find_similar(&pool_query).await?;

        let (song_index, duration, clip_start, playback, title, artist) = {
            let live = self.live.as_mut().ok_or(Error::State("no game in progress"))?;
            let round = live
                .round_mut()
                .ok_or(Error::Internal("no current round".into()))?;

            let media_handler = round.media.clone();
            let mode = round.mode.clone();

            let pool: Vec<_> = pool_songs
                .iter()
                .filter_map(|candidate| media_handler.load_content(candidate).ok())
                .collect();

            let song = round
                .song_mut()
                .ok_or(Error::Internal("no current song".into()))?;

            song.status = RoundSongStatus::Playing;
            song.started_at = Some(tokio::time::Instant::now());

            {
                let mut rng = rand::thread_rng();
                mode.start_song(song, &pool, media_handler.as_ref(), &mut rng);
            }

            (
                song.index,
                song.params.song_duration,
                song.song.clip_start,
                media_handler.audio_playback(),
                song.song.title.clone(),
                song.song.artist.clone(),
            )
        };

        self.timers
            .arm(TimerKind::Song, Duration::from_secs(u64::from(duration)));

        event!(Level::DEBUG, song_index, duration, "song started");

        // Players never see the answers; the master does.
        self.broadcast(
            ServerMessage::SongStarted {
                song_index,
                duration,
                clip_start,
                audio_playback: playback,
                song_title: None,
                song_artist: None,
            },
            Audience::Players,
        );
        self.broadcast(
            ServerMessage::SongStarted {
                song_index,
                duration,
                clip_start,
                audio_playback: playback,
                song_title: Some(title),
                song_artist: Some(artist),
            },
            Audience::Master,
        );

        Ok(())
    }

    // ---- buzzing -------------------------------------------------------

    async fn handle_buzz(
        &mut self,
        conn: &ConnectionHandle,
        song_index: usize,
        timestamp: u64,
    ) -> Result<()> {
        let (role, player_id) = self.identity(conn);

        if role != Some(PlayerRole::Player) {
            return Err(Error::State("only players can buzz"));
        }

        let player_id = player_id.ok_or(Error::State("join the room first"))?;

        let live = self.live.as_ref().ok_or(Error::State("no game in progress"))?;

        if live.session.status == SessionStatus::Paused {
            return Err(Error::State("the game is paused"));
        }

        if !live
            .players
            .get(&player_id)
            .is_some_and(|p| p.connected)
        {
            return Err(Error::State("you are not part of this game"));
        }

        let (outcome, payload, player_name, pauses) = {
            let live = self.live.as_mut().ok_or(Error::State("no game in progress"))?;
            let player_name = live
                .players
                .get(&player_id)
                .map(|p| p.name.clone())
                .unwrap_or_default();

            let round = live
                .round_mut()
                .ok_or(Error::State("no round in progress"))?;
            let mode = round.mode.clone();

            if round.current_song != song_index {
                return Err(Error::State("this song is over"));
            }

            let song = round
                .song_mut()
                .ok_or(Error::State("no song in progress"))?;

            // A mode that produces no payload does not buzz at all.
            let Some(payload) = mode.buzz_payload(song) else {
                conn.send(ServerMessage::BuzzRejected {
                    player_id: player_id.clone(),
                    reason: "buzzing_not_available".to_string(),
                });

                return Ok(());
            };

            if !mode.can_buzz(&player_id, song) {
                conn.send(ServerMessage::BuzzRejected {
                    player_id: player_id.clone(),
                    reason: if song.locked_out.contains(&player_id) {
                        "locked_out".to_string()
                    } else {
                        "song_not_playing".to_string()
                    },
                });

                return Ok(());
            }

            let outcome = mode.handle_buzz(&player_id, song, timestamp);

            (outcome, payload, player_name, mode.pauses_on_buzz())
        };

        match outcome {
            BuzzOutcome::Rejected(reason) => {
                conn.send(ServerMessage::BuzzRejected {
                    player_id,
                    reason: reason.to_string(),
                });
            }
            BuzzOutcome::Accepted { preempted } => {
                if let Some(loser) = &preempted {
                    self.set_active_flag(loser, false).await?;

                    self.broadcast(
                        ServerMessage::BuzzRejected {
                            player_id: loser.clone(),
                            reason: "outbuzzed".to_string(),
                        },
                        Audience::Player(loser.clone()),
                    );
                }

                self.record_buzz_stats(&player_id, timestamp).await?;
                self.set_active_flag(&player_id, true).await?;

                if pauses {
                    self.timers.pause(TimerKind::Song);
                }

                let answer_timer = {
                    let live = self.live.as_ref().ok_or(Error::State("no game in progress"))?;
                    live.round()
                        .and_then(|r| r.song())
                        .map(|s| s.params.answer_timer)
                        .unwrap_or(5)
                };

                self.timers
                    .arm(TimerKind::Answer, Duration::from_secs(u64::from(answer_timer)));

                event!(
                    Level::INFO,
                    player_id = %player_id,
                    timestamp,
                    preempted = ?preempted,
                    "buzz accepted"
                );

                let artist_question = payload.artist_question.as_ref().map(|q| QuestionView {
                    kind: q.kind,
                    choices: q.choices.clone(),
                });

                self.broadcast(
                    ServerMessage::PlayerBuzzed {
                        player_id: player_id.clone(),
                        player_name: player_name.clone(),
                        song_index,
                        timestamp,
                        artist_question: None,
                    },
                    Audience::Except(player_id.clone()),
                );
                self.broadcast(
                    ServerMessage::PlayerBuzzed {
                        player_id: player_id.clone(),
                        player_name,
                        song_index,
                        timestamp,
                        artist_question: artist_question.clone(),
                    },
                    Audience::Player(player_id.clone()),
                );

                if let Some(question) = artist_question {
                    self.broadcast(
                        ServerMessage::ChoicesArtist {
                            player_id: player_id.clone(),
                            choices: question.choices,
                        },
                        Audience::Player(player_id),
                    );
                }
            }
        }

        Ok(())
    }

    // ---- answering -----------------------------------------------------

    async fn handle_player_answer(
        &mut self,
        conn: &ConnectionHandle,
        song_index: usize,
        kind: AnswerKind,
        value: String,
    ) -> Result<()> {
        let (role, sender_id) = self.identity(conn);

        let live = self.live.as_ref().ok_or(Error::State("no game in progress"))?;

        if live.session.status == SessionStatus::Paused {
            return Err(Error::State("the game is paused"));
        }

        let round = live.round().ok_or(Error::State("no round in progress"))?;

        if round.current_song != song_index {
            return Err(Error::State("this song is over"));
        }

        let song = round.song().ok_or(Error::State("no song in progress"))?;

        if !song.is_open() {
            return Err(Error::State("the song is not accepting answers"));
        }

        let mode = round.mode.clone();

        // Who is the answer attributed to?
        let target_id = match role {
            Some(PlayerRole::Master) => {
                if !mode.requires_manual_validation() {
                    return Err(Error::State(
                        "this mode does not take master validation",
                    ));
                }

                song.active_player_id
                    .clone()
                    .ok_or(Error::State("nobody holds the buzz"))?
            }
            Some(PlayerRole::Player) => {
                let sender_id = sender_id.ok_or(Error::State("join the room first"))?;

                if mode.requires_manual_validation() {
                    return Err(Error::Auth("the master validates answers in this mode"));
                }

                if mode.exclusive_answers()
                    && song.active_player_id.as_deref() != Some(sender_id.as_str())
                {
                    return Err(Error::State("another player holds the buzz"));
                }

                if !live
                    .players
                    .get(&sender_id)
                    .is_some_and(|p| p.connected)
                {
                    return Err(Error::State("you are not part of this game"));
                }

                sender_id
            }
            None => return Err(Error::State("join the room first")),
        };

        self.apply_answer(&target_id, kind, value).await
    }

    /// Runs one answer through the mode rules and applies the outcome.
    /// Shared by client submissions and answer-timeout synthesis.
    async fn apply_answer(&mut self, target_id: &str, kind: AnswerKind, value: String) -> Result<()> {
        let (result, answer, player_name, active_count) = {
            let live = self.live.as_mut().ok_or(Error::State("no game in progress"))?;
            let active_count = live.active_player_count();
            let player_name = live
                .players
                .get(target_id)
                .map(|p| p.name.clone())
                .unwrap_or_default();

            let round = live
                .round_mut()
                .ok_or(Error::State("no round in progress"))?;
            let mode = round.mode.clone();
            let media_handler = round.media.clone();
            let round_id = round.def.id.clone();

            let song = round
                .song_mut()
                .ok_or(Error::State("no song in progress"))?;

            if song.has_answer(target_id, kind) {
                return Err(Error::Conflict(
                    "this question was already answered".to_string(),
                ));
            }

            let submitted = SubmittedAnswer {
                player_id: target_id.to_string(),
                kind,
                value: value.clone(),
            };

            let result = mode.handle_answer(&submitted, song, media_handler.as_ref());

            let answer = crate::models::Answer {
                id: Uuid::new_v4().to_string(),
                player_id: target_id.to_string(),
                round_id,
                song_id: song.song.id.clone(),
                kind,
                value,
                submitted_at: Utc::now(),
                time_to_answer_ms: song.elapsed_ms(),
                is_correct: result.is_correct,
                points_awarded: result.points_awarded,
            };

            song.answers.push(answer.clone());

            if result.lock_out_player {
                song.locked_out.insert(target_id.to_string());
            }

            (result, answer, player_name, active_count)
        };

        self.apply_score(target_id, result.points_awarded, result.is_correct)
            .await?;

        if result.lock_out_player {
            self.set_lockout_flag(target_id, true).await?;
        }

        event!(
            Level::INFO,
            player_id = %target_id,
            kind = ?kind,
            is_correct = result.is_correct,
            points = result.points_awarded,
            "answer resolved"
        );

        self.broadcast(
            ServerMessage::AnswerResult {
                player_id: target_id.to_string(),
                player_name,
                answer_type: kind,
                is_correct: answer.is_correct,
                points_awarded: answer.points_awarded,
            },
            Audience::All,
        );

        // Follow-up prompts go to the answering player only.
        let (title_choices, artist_choices) = {
            let live = self.live.as_ref().ok_or(Error::State("no game in progress"))?;
            let song = live
                .round()
                .and_then(|r| r.song())
                .ok_or(Error::State("no song in progress"))?;

            (
                result
                    .show_title_choices
                    .then(|| song.title_question.as_ref().map(|q| q.choices.clone()))
                    .flatten(),
                result
                    .show_artist_choices
                    .then(|| song.artist_question.as_ref().map(|q| q.choices.clone()))
                    .flatten(),
            )
        };

        let has_followup = title_choices.is_some() || artist_choices.is_some();

        if let Some(choices) = artist_choices {
            self.broadcast(
                ServerMessage::ChoicesArtist {
                    player_id: target_id.to_string(),
                    choices,
                },
                Audience::Player(target_id.to_string()),
            );
        }

        if let Some(choices) = title_choices {
            self.broadcast(
                ServerMessage::ChoicesTitle {
                    player_id: target_id.to_string(),
                    choices,
                },
                Audience::Player(target_id.to_string()),
            );
        }

        let should_end = {
            let live = self.live.as_ref().ok_or(Error::State("no game in progress"))?;
            let round = live.round().ok_or(Error::State("no round in progress"))?;
            let song = round.song().ok_or(Error::State("no song in progress"))?;

            round.mode.should_end_song(song, active_count)
        };

        if should_end {
            return self.finish_song().await;
        }

        if has_followup {
            // A fresh window for the follow-up question.
            let answer_timer = {
                let live = self.live.as_ref().ok_or(Error::State("no game in progress"))?;
                live.round()
                    .and_then(|r| r.song())
                    .map(|s| s.params.answer_timer)
                    .unwrap_or(5)
            };

            self.timers
                .arm(TimerKind::Answer, Duration::from_secs(u64::from(answer_timer)));

            return Ok(());
        }

        if result.lock_out_player {
            self.end_buzz_cycle(target_id).await?;
        }

        Ok(())
    }

    /// Closes a failed buzz cycle: rebuzz when allowed, otherwise the song
    /// is over.
    async fn end_buzz_cycle(&mut self, player_id: &str) -> Result<()> {
        let allow_rebuzz = {
            let live = self.live.as_mut().ok_or(Error::State("no game in progress"))?;
            let Some(round) = live.rounds.get_mut(live.current_round) else {
                return Ok(());
            };
            let Some(song) = round.songs.get_mut(round.current_song) else {
                return Ok(());
            };

            if song.active_player_id.as_deref() != Some(player_id) {
                return Ok(());
            }

            let allow_rebuzz = song.params.allow_rebuzz;

            if allow_rebuzz {
                song.active_player_id = None;
                song.status = RoundSongStatus::Playing;
            }

            allow_rebuzz
        };

        self.set_active_flag(player_id, false).await?;

        if allow_rebuzz {
            self.timers.cancel(TimerKind::Answer);
            self.timers.resume(TimerKind::Song);

            Ok(())
        } else {
            self.finish_song().await
        }
    }

    // ---- song and round resolution -------------------------------------

    async fn finish_song(&mut self) -> Result<()> {
        let (song_index, correct_title, correct_artist, active, round_over) = {
            let live = self.live.as_mut().ok_or(Error::State("no game in progress"))?;
            let round = live
                .round_mut()
                .ok_or(Error::State("no round in progress"))?;
            let song = round
                .song_mut()
                .ok_or(Error::State("no song in progress"))?;

            song.status = RoundSongStatus::Finished;
            let active = song.active_player_id.take();

            let details = (
                song.index,
                song.song.title.clone(),
                song.song.artist.clone(),
            );

            let round_over = round.current_song + 1 >= round.songs.len();

            (details.0, details.1, details.2, active, round_over)
        };

        if let Some(active) = active {
            self.set_active_flag(&active, false).await?;
        }

        self.timers.cancel(TimerKind::Song);
        self.timers.cancel(TimerKind::Answer);

        event!(Level::INFO, song_index, "song finished");

        self.broadcast(
            ServerMessage::SongEnded {
                song_index,
                correct_title,
                correct_artist,
            },
            Audience::All,
        );

        if round_over {
            return self.finish_round().await;
        }

        {
            let live = self.live.as_mut().ok_or(Error::State("no game in progress"))?;
            let session_id = live.session.id.clone();
            let round = live
                .round_mut()
                .ok_or(Error::State("no round in progress"))?;
            round.current_song += 1;

            let session = self.repos.sessions.next_song(&session_id).await?;
            live.session = session;
        }

        self.start_song().await
    }

    async fn finish_round(&mut self) -> Result<()> {
        let (round_index, scores, last_round) = {
            let live = self.live.as_mut().ok_or(Error::State("no game in progress"))?;

            let entries = live.round_entries();
            let scores = competition_ranking(&entries);

            for player in live.players.values() {
                live.round_history
                    .entry(player.id.clone())
                    .or_default()
                    .push(player.round_score);
            }

            let round = live
                .round_mut()
                .ok_or(Error::State("no round in progress"))?;
            round.def.status = RoundStatus::Finished;
            let round_index = round.def.index;

            (round_index, scores, live.on_last_round())
        };

        event!(Level::INFO, round_index, "round finished");

        self.broadcast(
            ServerMessage::RoundEnded {
                round_index,
                scores: scores.clone(),
            },
            Audience::All,
        );

        if last_round {
            return self.finish_game().await;
        }

        self.repos
            .rooms
            .update(
                &self.room_id,
                RoomPatch {
                    status: Some(RoomStatus::BetweenRounds),
                    ..Default::default()
                },
            )
            .await?;

        let (next_round_index, next_round_mode, next_round_media) = {
            let live = self.live.as_ref().ok_or(Error::State("no game in progress"))?;
            let next = live
                .rounds
                .get(live.current_round + 1)
                .ok_or(Error::Internal("next round is missing".into()))?;

            (
                next.def.index,
                next.def.mode_type.clone(),
                next.def.media_type.clone(),
            )
        };

        self.broadcast(
            ServerMessage::RoundBetween {
                completed_round_index: round_index,
                next_round_index,
                next_round_mode,
                next_round_media,
                scores,
            },
            Audience::All,
        );

        if let Some(delay) = self.settings.round_advance {
            self.timers.arm(TimerKind::Advance, delay);
        }

        Ok(())
    }

    async fn finish_game(&mut self) -> Result<()> {
        let final_scores = {
            let live = self.live.as_ref().ok_or(Error::State("no game in progress"))?;

            let totals = competition_ranking(&live.total_entries());

            totals
                .into_iter()
                .map(|entry| FinalScore {
                    round_scores: live
                        .round_history
                        .get(&entry.player_id)
                        .cloned()
                        .unwrap_or_default(),
                    player_id: entry.player_id,
                    player_name: entry.player_name,
                    total_score: entry.score,
                    rank: entry.rank,
                })
                .collect::<Vec<_>>()
        };

        let session_id = {
            let live = self.live.as_ref().ok_or(Error::State("no game in progress"))?;
            live.session.id.clone()
        };

        self.repos.sessions.end_session(&session_id).await?;
        self.repos
            .rooms
            .update(
                &self.room_id,
                RoomPatch {
                    status: Some(RoomStatus::Finished),
                    ..Default::default()
                },
            )
            .await?;

        self.timers.cancel_all();
        self.live = None;

        event!(Level::INFO, session_id = %session_id, "game finished");

        self.broadcast(ServerMessage::GameEnded { final_scores }, Audience::All);

        Ok(())
    }

    /// Moves from the round break into the next round.
    async fn advance_round(&mut self) -> Result<()> {
        let room = self.repos.rooms.find_by_id(&self.room_id).await?;

        if room.status != RoomStatus::BetweenRounds {
            return Err(Error::State("no round break to advance past"));
        }

        self.timers.cancel(TimerKind::Advance);

        self.repos
            .rooms
            .update(
                &self.room_id,
                RoomPatch {
                    status: Some(RoomStatus::Playing),
                    ..Default::default()
                },
            )
            .await?;

        let next_index = {
            let live = self.live.as_mut().ok_or(Error::State("no game in progress"))?;
            let session = self.repos.sessions.next_round(&live.session.id).await?;
            live.session = session;
            live.current_round + 1
        };

        self.start_round(next_index).await
    }

    // ---- master controls -----------------------------------------------

    async fn handle_pause(&mut self, conn: &ConnectionHandle) -> Result<()> {
        self.require_master(conn)?;

        let session_id = {
            let live = self.live.as_ref().ok_or(Error::State("no game in progress"))?;

            if live.session.status != SessionStatus::Playing {
                return Err(Error::State("the game is not running"));
            }

            live.session.id.clone()
        };

        let session = self
            .repos
            .sessions
            .set_status(&session_id, SessionStatus::Paused)
            .await?;

        if let Some(live) = self.live.as_mut() {
            live.session = session;
        }

        self.timers.pause(TimerKind::Song);
        self.timers.pause(TimerKind::Answer);

        event!(Level::INFO, "game paused");

        self.broadcast(ServerMessage::GamePaused, Audience::All);

        Ok(())
    }

    async fn handle_resume(&mut self, conn: &ConnectionHandle) -> Result<()> {
        self.require_master(conn)?;

        let session_id = {
            let live = self.live.as_ref().ok_or(Error::State("no game in progress"))?;

            if live.session.status != SessionStatus::Paused {
                return Err(Error::State("the game is not paused"));
            }

            live.session.id.clone()
        };

        let session = self
            .repos
            .sessions
            .set_status(&session_id, SessionStatus::Playing)
            .await?;

        if let Some(live) = self.live.as_mut() {
            live.session = session;
        }

        self.timers.resume(TimerKind::Song);
        self.timers.resume(TimerKind::Answer);

        event!(Level::INFO, "game resumed");

        self.broadcast(ServerMessage::GameResumed, Audience::All);

        Ok(())
    }

    async fn handle_skip(&mut self, conn: &ConnectionHandle) -> Result<()> {
        self.require_master(conn)?;

        if self.live.is_none() {
            return Err(Error::State("no game in progress"));
        }

        let room = self.repos.rooms.find_by_id(&self.room_id).await?;

        if room.status == RoomStatus::BetweenRounds {
            return self.advance_round().await;
        }

        let song_open = {
            let live = self.live.as_ref().ok_or(Error::State("no game in progress"))?;
            live.round().and_then(|r| r.song()).is_some_and(|s| {
                s.status != RoundSongStatus::Finished
            })
        };

        if !song_open {
            return Err(Error::State("nothing to skip"));
        }

        event!(Level::INFO, "song skipped by the master");

        self.broadcast(ServerMessage::GameSkipped, Audience::All);

        self.finish_song().await
    }

    // ---- timers --------------------------------------------------------

    async fn handle_timer(&mut self, fire: TimerFire) -> Result<()> {
        if !self.timers.accepts(fire) {
            return Ok(());
        }

        match fire.kind {
            TimerKind::Song => {
                let open = self
                    .live
                    .as_ref()
                    .and_then(|live| live.round())
                    .and_then(|round| round.song())
                    .is_some_and(|song| song.is_open());

                if open {
                    event!(Level::DEBUG, "song deadline reached");
                    self.finish_song().await?;
                }
            }
            TimerKind::Answer => {
                self.handle_answer_timeout().await?;
            }
            TimerKind::Advance => {
                self.advance_round().await?;
            }
        }

        Ok(())
    }

    /// An expired answer window counts as a wrong answer from the active
    /// player, on whichever question was pending.
    async fn handle_answer_timeout(&mut self) -> Result<()> {
        let pending = {
            let Some(live) = self.live.as_ref() else {
                return Ok(());
            };
            let Some(song) = live.round().and_then(|r| r.song()) else {
                return Ok(());
            };

            if song.status != RoundSongStatus::Answering {
                return Ok(());
            }

            song.active_player_id.clone().map(|active| {
                let kind = if song.artist_question.is_some()
                    && !song.has_answer(&active, AnswerKind::Artist)
                {
                    AnswerKind::Artist
                } else {
                    AnswerKind::Title
                };

                (active, kind)
            })
        };

        if let Some((active, kind)) = pending {
            event!(Level::DEBUG, player_id = %active, "answer deadline reached");
            self.apply_answer(&active, kind, String::new()).await?;
        }

        Ok(())
    }

    // ---- roster bookkeeping --------------------------------------------

    /// Applies a score delta and result counters to a player, in the live
    /// roster and the store.
    async fn apply_score(&mut self, player_id: &str, points: i32, correct: bool) -> Result<()> {
        let patch = {
            let Some(live) = self.live.as_mut() else {
                return Ok(());
            };
            let Some(player) = live.players.get_mut(player_id) else {
                return Ok(());
            };

            player.score += points;
            player.round_score += points;

            if correct {
                player.stats.correct_answers += 1;
            } else {
                player.stats.wrong_answers += 1;
            }

            PlayerPatch {
                score: Some(player.score),
                round_score: Some(player.round_score),
                stats: Some(player.stats.clone()),
                ..Default::default()
            }
        };

        self.repos.players.update(player_id, patch).await?;

        Ok(())
    }

    async fn record_buzz_stats(&mut self, player_id: &str, timestamp: u64) -> Result<()> {
        let patch = {
            let Some(live) = self.live.as_mut() else {
                return Ok(());
            };
            let Some(player) = live.players.get_mut(player_id) else {
                return Ok(());
            };

            player.stats.buzzes += 1;
            player.stats.best_buzz_ms = Some(
                player
                    .stats
                    .best_buzz_ms
                    .map_or(timestamp, |best| best.min(timestamp)),
            );

            PlayerPatch {
                stats: Some(player.stats.clone()),
                ..Default::default()
            }
        };

        self.repos.players.update(player_id, patch).await?;

        Ok(())
    }

    async fn set_active_flag(&mut self, player_id: &str, active: bool) -> Result<()> {
        if let Some(live) = self.live.as_mut() {
            if let Some(player) = live.players.get_mut(player_id) {
                player.is_active = active;
            }
        }

        match self
            .repos
            .players
            .update(
                player_id,
                PlayerPatch {
                    is_active: Some(active),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(_) => Ok(()),
            // The player may already be deleted; the flag is moot then.
            Err(storage::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_lockout_flag(&mut self, player_id: &str, locked: bool) -> Result<()> {
        if let Some(live) = self.live.as_mut() {
            if let Some(player) = live.players.get_mut(player_id) {
                player.is_locked_out = locked;
            }
        }

        match self
            .repos
            .players
            .update(
                player_id,
                PlayerPatch {
                    is_locked_out: Some(locked),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(storage::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Resets both per-song flags when a new song starts.
    async fn set_song_flags(&mut self, player_id: &str, active: bool, locked: bool) -> Result<()> {
        if let Some(live) = self.live.as_mut() {
            if let Some(player) = live.players.get_mut(player_id) {
                player.is_active = active;
                player.is_locked_out = locked;
            }
        }

        match self
            .repos
            .players
            .update(
                player_id,
                PlayerPatch {
                    is_active: Some(active),
                    is_locked_out: Some(locked),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(storage::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
