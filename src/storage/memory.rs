//! In-memory repository implementations.
//!
//! Uniqueness invariants (room code, player name within a room, single
//! master per room) are guarded by index-map entries so concurrent creates
//! cannot both succeed.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::models::{
    Player, PlayerRole, PlayerStats, Playlist, Room, RoomStatus, Round, Session, SessionStatus,
    Song, SongFilters,
};
use crate::utils::text::normalize;
use crate::utils::{generate_master_token, generate_room_code, valid_name};

use super::{
    Error, NewPlayer, NewRoom, PlayerPatch, PlayerRepository, PlaylistRepository, Result,
    RoomPatch, RoomRepository, SessionRepository, SimilarQuery, SongRepository,
};

#[derive(Default)]
/// Room records held in process memory.
pub struct MemoryRoomRepository {
    rooms: DashMap<String, Room>,
    /// Join code to room id. Guards code uniqueness across live rooms.
    codes: DashMap<String, String>,
}

#[async_trait]
impl RoomRepository for MemoryRoomRepository {
    async fn find_by_id(&self, id: &str) -> Result<Room> {
        self.rooms
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| Error::not_found("room", id))
    }

    async fn find_by_code(&self, code: &str) -> Result<Room> {
        let id = self
            .codes
            .get(code)
            .map(|id| id.clone())
            .ok_or_else(|| Error::not_found("room", code))?;

        self.find_by_id(&id).await
    }

    async fn find_by_status(&self, status: RoomStatus) -> Result<Vec<Room>> {
        Ok(self
            .rooms
            .iter()
            .filter(|r| r.status == status)
            .map(|r| r.clone())
            .collect())
    }

    async fn create(&self, new: NewRoom) -> Result<Room> {
        if !valid_name(&new.name) {
            return Err(Error::Validation(format!(
                "'{}' is not an acceptable room name",
                new.name
            )));
        }

        if new.max_players == 0 {
            return Err(Error::Validation("maxPlayers must be positive".to_string()));
        }

        let id = Uuid::new_v4().to_string();

        // Reserve a unique join code before the room becomes visible.
        let code = loop {
            let candidate = generate_room_code(&mut rand::thread_rng());

            match self.codes.entry(candidate.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(id.clone());
                    break candidate;
                }
                Entry::Occupied(_) => continue,
            }
        };

        let now = Utc::now();
        let room = Room {
            id: id.clone(),
            name: new.name.trim().to_string(),
            code,
            master_ip: new.master_ip,
            status: RoomStatus::Lobby,
            max_players: new.max_players,
            created_at: now,
            updated_at: now,
            master_token: generate_master_token(),
        };

        self.rooms.insert(id, room.clone());

        Ok(room)
    }

    async fn update(&self, id: &str, patch: RoomPatch) -> Result<Room> {
        let mut room = self
            .rooms
            .get_mut(id)
            .ok_or_else(|| Error::not_found("room", id))?;

        if let Some(name) = patch.name {
            if !valid_name(&name) {
                return Err(Error::Validation(format!(
                    "'{}' is not an acceptable room name",
                    name
                )));
            }

            room.name = name.trim().to_string();
        }

        if let Some(status) = patch.status {
            room.status = status;
        }

        if let Some(max_players) = patch.max_players {
            room.max_players = max_players;
        }

        room.updated_at = Utc::now();

        Ok(room.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let (_, room) = self
            .rooms
            .remove(id)
            .ok_or_else(|| Error::not_found("room", id))?;

        self.codes.remove(&room.code);

        Ok(())
    }

    async fn master_token(&self, id: &str) -> Result<String> {
        self.rooms
            .get(id)
            .map(|r| r.master_token.clone())
            .ok_or_else(|| Error::not_found("room", id))
    }
}

#[derive(Default)]
/// Player records held in process memory.
pub struct MemoryPlayerRepository {
    players: DashMap<String, Player>,
    /// (room id, normalised name) to player id. Guards name uniqueness.
    names: DashMap<(String, String), String>,
    /// Room id to master player id. Guards the single-master invariant.
    masters: DashMap<String, String>,
}

#[async_trait]
impl PlayerRepository for MemoryPlayerRepository {
    async fn find_by_id(&self, id: &str) -> Result<Player> {
        self.players
            .get(id)
            .map(|p| p.clone())
            .ok_or_else(|| Error::not_found("player", id))
    }

    async fn find_by_room(&self, room_id: &str) -> Result<Vec<Player>> {
        let mut players: Vec<Player> = self
            .players
            .iter()
            .filter(|p| p.room_id == room_id)
            .map(|p| p.clone())
            .collect();

        players.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(players)
    }

    async fn find_by_room_and_name(&self, room_id: &str, name: &str) -> Result<Player> {
        let key = (room_id.to_string(), normalize(name));
        let id = self
            .names
            .get(&key)
            .map(|id| id.clone())
            .ok_or_else(|| Error::not_found("player", name))?;

        self.find_by_id(&id).await
    }

    async fn count_connected(&self, room_id: &str) -> Result<usize> {
        Ok(self
            .players
            .iter()
            .filter(|p| p.room_id == room_id && p.role == PlayerRole::Player && p.connected)
            .count())
    }

    async fn create(&self, new: NewPlayer) -> Result<Player> {
        if !valid_name(&new.name) {
            return Err(Error::Validation(format!(
                "'{}' is not an acceptable player name",
                new.name
            )));
        }

        let id = Uuid::new_v4().to_string();
        let name = new.name.trim().to_string();
        let name_key = (new.room_id.clone(), normalize(&name));

        match self.names.entry(name_key) {
            Entry::Vacant(slot) => slot.insert(id.clone()),
            Entry::Occupied(_) => {
                return Err(Error::Conflict(format!(
                    "player name '{}' is taken in this room",
                    name
                )))
            }
        };

        if new.role == PlayerRole::Master {
            match self.masters.entry(new.room_id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(id.clone());
                }
                Entry::Occupied(_) => {
                    self.names.remove(&(new.room_id.clone(), normalize(&name)));
                    return Err(Error::Conflict("the room already has a master".to_string()));
                }
            }
        }

        let player = Player {
            id: id.clone(),
            room_id: new.room_id,
            name,
            role: new.role,
            connected: true,
            score: 0,
            round_score: 0,
            is_active: false,
            is_locked_out: false,
            stats: PlayerStats::default(),
        };

        self.players.insert(id, player.clone());

        Ok(player)
    }

    async fn update(&self, id: &str, patch: PlayerPatch) -> Result<Player> {
        let mut player = self
            .players
            .get_mut(id)
            .ok_or_else(|| Error::not_found("player", id))?;

        if let Some(connected) = patch.connected {
            player.connected = connected;
        }

        if let Some(score) = patch.score {
            player.score = score;
        }

        if let Some(round_score) = patch.round_score {
            player.round_score = round_score;
        }

        if let Some(is_active) = patch.is_active {
            player.is_active = is_active;
        }

        if let Some(is_locked_out) = patch.is_locked_out {
            player.is_locked_out = is_locked_out;
        }

        if let Some(stats) = patch.stats {
            player.stats = stats;
        }

        Ok(player.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let (_, player) = self
            .players
            .remove(id)
            .ok_or_else(|| Error::not_found("player", id))?;

        self.names
            .remove(&(player.room_id.clone(), normalize(&player.name)));

        if player.role == PlayerRole::Master {
            self.masters.remove(&player.room_id);
        }

        Ok(())
    }

    async fn delete_by_room(&self, room_id: &str) -> Result<usize> {
        let ids: Vec<String> = self
            .players
            .iter()
            .filter(|p| p.room_id == room_id)
            .map(|p| p.id.clone())
            .collect();

        for id in &ids {
            self.delete(id).await?;
        }

        Ok(ids.len())
    }

    async fn reset_scores(&self, room_id: &str) -> Result<()> {
        for mut player in self.players.iter_mut() {
            if player.room_id == room_id {
                player.score = 0;
                player.round_score = 0;
            }
        }

        Ok(())
    }
}

#[derive(Default)]
/// Session records held in process memory.
pub struct MemorySessionRepository {
    sessions: DashMap<String, Session>,
    /// Session id to its materialised rounds, ordered by index.
    rounds: DashMap<String, Vec<Round>>,
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn find_by_id(&self, id: &str) -> Result<Session> {
        self.sessions
            .get(id)
            .map(|s| s.clone())
            .ok_or_else(|| Error::not_found("session", id))
    }

    async fn find_by_room(&self, room_id: &str) -> Result<Vec<Session>> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| s.room_id == room_id)
            .map(|s| s.clone())
            .collect())
    }

    async fn create(&self, room_id: &str) -> Result<Session> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            status: SessionStatus::Waiting,
            current_round_index: 0,
            current_song_index: 0,
            started_at: Utc::now(),
            ended_at: None,
        };

        self.sessions.insert(session.id.clone(), session.clone());

        Ok(session)
    }

    async fn set_status(&self, id: &str, status: SessionStatus) -> Result<Session> {
        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| Error::not_found("session", id))?;

        session.status = status;

        Ok(session.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions
            .remove(id)
            .ok_or_else(|| Error::not_found("session", id))?;
        self.rounds.remove(id);

        Ok(())
    }

    async fn delete_by_room(&self, room_id: &str) -> Result<usize> {
        let ids: Vec<String> = self
            .sessions
            .iter()
            .filter(|s| s.room_id == room_id)
            .map(|s| s.id.clone())
            .collect();

        for id in &ids {
            self.delete(id).await?;
        }

        Ok(ids.len())
    }

    async fn end_session(&self, id: &str) -> Result<Session> {
        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| Error::not_found("session", id))?;

        session.status = SessionStatus::Finished;
        session.ended_at = Some(Utc::now());

        Ok(session.clone())
    }

    async fn next_round(&self, id: &str) -> Result<Session> {
        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| Error::not_found("session", id))?;

        session.current_round_index += 1;
        session.current_song_index = 0;

        Ok(session.clone())
    }

    async fn next_song(&self, id: &str) -> Result<Session> {
        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| Error::not_found("session", id))?;

        session.current_song_index += 1;

        Ok(session.clone())
    }

    async fn add_round(&self, round: Round) -> Result<()> {
        let mut rounds = self.rounds.entry(round.session_id.clone()).or_default();

        if rounds.iter().any(|r| r.index == round.index) {
            return Err(Error::Conflict(format!(
                "round index {} already exists in session {}",
                round.index, round.session_id
            )));
        }

        rounds.push(round);
        rounds.sort_by_key(|r| r.index);

        Ok(())
    }

    async fn rounds_of(&self, session_id: &str) -> Result<Vec<Round>> {
        Ok(self
            .rounds
            .get(session_id)
            .map(|r| r.clone())
            .unwrap_or_default())
    }
}

#[derive(Default)]
/// The song library held in process memory.
pub struct MemorySongRepository {
    songs: DashMap<String, Song>,
}

#[async_trait]
impl SongRepository for MemorySongRepository {
    async fn find_by_id(&self, id: &str) -> Result<Song> {
        self.songs
            .get(id)
            .map(|s| s.clone())
            .ok_or_else(|| Error::not_found("song", id))
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Song>> {
        let mut songs = Vec::with_capacity(ids.len());

        for id in ids {
            songs.push(self.find_by_id(id).await?);
        }

        Ok(songs)
    }

    async fn find_by_filters(&self, filters: &SongFilters) -> Result<Vec<Song>> {
        let mut pool: Vec<Song> = self
            .songs
            .iter()
            .filter(|song| {
                if song.niche && !filters.include_niche {
                    return false;
                }

                if let Some(genre) = &filters.genre {
                    if !song
                        .genre
                        .as_deref()
                        .is_some_and(|g| normalize(g) == normalize(genre))
                    {
                        return false;
                    }
                }

                if let Some(min) = filters.year_min {
                    if song.year < min {
                        return false;
                    }
                }

                if let Some(max) = filters.year_max {
                    if song.year > max {
                        return false;
                    }
                }

                if let Some(artist) = &filters.artist_name {
                    if !normalize(&song.artist).contains(&normalize(artist)) {
                        return false;
                    }
                }

                true
            })
            .map(|song| song.clone())
            .collect();

        {
            let mut rng = rand::thread_rng();
            pool.shuffle(&mut rng);
        }

        if let Some(count) = filters.song_count {
            pool.truncate(count);
        }

        Ok(pool)
    }

    async fn find_similar(&self, query: &SimilarQuery) -> Result<Vec<Song>> {
        let unfiltered = query.genre.is_none()
            && query.year_min.is_none()
            && query.year_max.is_none()
            && query.language.is_none();

        let mut pool: Vec<Song> = self
            .songs
            .iter()
            .filter(|song| query.exclude_song_id.as_deref() != Some(song.id.as_str()))
            .filter(|song| {
                if unfiltered {
                    return true;
                }

                let genre_match = match (&query.genre, &song.genre) {
                    (Some(a), Some(b)) => normalize(a) == normalize(b),
                    _ => false,
                };

                let year_match = match (query.year_min, query.year_max) {
                    (Some(min), Some(max)) => song.year >= min && song.year <= max,
                    (Some(min), None) => song.year >= min,
                    (None, Some(max)) => song.year <= max,
                    (None, None) => false,
                };

                let language_match = match (&query.language, &song.language) {
                    (Some(a), Some(b)) => normalize(a) == normalize(b),
                    _ => false,
                };

                genre_match || year_match || language_match
            })
            .map(|song| song.clone())
            .collect();

        {
            let mut rng = rand::thread_rng();
            pool.shuffle(&mut rng);
        }

        pool.truncate(query.limit);

        Ok(pool)
    }

    async fn get_random(&self, count: usize, include_niche: bool) -> Result<Vec<Song>> {
        let mut pool: Vec<Song> = self
            .songs
            .iter()
            .filter(|song| include_niche || !song.niche)
            .map(|song| song.clone())
            .collect();

        {
            let mut rng = rand::thread_rng();
            pool.shuffle(&mut rng);
        }

        pool.truncate(count);

        Ok(pool)
    }

    async fn create(&self, song: Song) -> Result<Song> {
        match self.songs.entry(song.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(song.clone());
                Ok(song)
            }
            Entry::Occupied(_) => Err(Error::Conflict(format!(
                "song '{}' already exists",
                song.id
            ))),
        }
    }

    async fn update(&self, song: Song) -> Result<Song> {
        let mut existing = self
            .songs
            .get_mut(&song.id)
            .ok_or_else(|| Error::not_found("song", &song.id))?;

        *existing = song.clone();

        Ok(song)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.songs
            .remove(id)
            .ok_or_else(|| Error::not_found("song", id))?;

        Ok(())
    }
}

#[derive(Default)]
/// Playlists held in process memory.
pub struct MemoryPlaylistRepository {
    playlists: DashMap<String, Playlist>,
}

#[async_trait]
impl PlaylistRepository for MemoryPlaylistRepository {
    async fn find_by_id(&self, id: &str) -> Result<Playlist> {
        self.playlists
            .get(id)
            .map(|p| p.clone())
            .ok_or_else(|| Error::not_found("playlist", id))
    }

    async fn create(&self, name: &str, song_ids: Vec<String>) -> Result<Playlist> {
        let playlist = Playlist {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            song_ids,
        };

        self.playlists.insert(playlist.id.clone(), playlist.clone());

        Ok(playlist)
    }

    async fn rename(&self, id: &str, name: &str) -> Result<Playlist> {
        let mut playlist = self
            .playlists
            .get_mut(id)
            .ok_or_else(|| Error::not_found("playlist", id))?;

        playlist.name = name.to_string();

        Ok(playlist.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.playlists
            .remove(id)
            .ok_or_else(|| Error::not_found("playlist", id))?;

        Ok(())
    }

    async fn set_songs(&self, id: &str, song_ids: Vec<String>) -> Result<Playlist> {
        let mut playlist = self
            .playlists
            .get_mut(id)
            .ok_or_else(|| Error::not_found("playlist", id))?;

        playlist.song_ids = song_ids;

        Ok(playlist.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_song;

    #[tokio::test]
    async fn room_codes_are_unique_and_reusable_after_delete() {
        let repo = MemoryRoomRepository::default();
        let mut codes = std::collections::HashSet::new();

        for i in 0..50 {
            let room = repo
                .create(NewRoom {
                    name: format!("room {i}"),
                    max_players: 8,
                    master_ip: None,
                })
                .await
                .unwrap();

            assert!(codes.insert(room.code.clone()), "duplicate code");
            assert_eq!(repo.find_by_code(&room.code).await.unwrap().id, room.id);
        }
    }

    #[tokio::test]
    async fn room_names_are_validated() {
        let repo = MemoryRoomRepository::default();
        let result = repo
            .create(NewRoom {
                name: "<h1>pwn</h1>".to_string(),
                max_players: 8,
                master_ip: None,
            })
            .await;

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn duplicate_player_names_conflict_case_insensitively() {
        let repo = MemoryPlayerRepository::default();
        repo.create(NewPlayer {
            room_id: "r1".to_string(),
            name: "Ada".to_string(),
            role: PlayerRole::Player,
        })
        .await
        .unwrap();

        let duplicate = repo
            .create(NewPlayer {
                room_id: "r1".to_string(),
                name: " ada ".to_string(),
                role: PlayerRole::Player,
            })
            .await;
        assert!(matches!(duplicate, Err(Error::Conflict(_))));

        let found = repo.find_by_room_and_name("r1", "ADA").await.unwrap();
        assert_eq!(found.name, "Ada");

        // The same name is free in another room.
        assert!(repo
            .create(NewPlayer {
                room_id: "r2".to_string(),
                name: "Ada".to_string(),
                role: PlayerRole::Player,
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn at_most_one_master_per_room() {
        let repo = MemoryPlayerRepository::default();
        repo.create(NewPlayer {
            room_id: "r1".to_string(),
            name: "Host".to_string(),
            role: PlayerRole::Master,
        })
        .await
        .unwrap();

        let second = repo
            .create(NewPlayer {
                room_id: "r1".to_string(),
                name: "Host2".to_string(),
                role: PlayerRole::Master,
            })
            .await;

        assert!(matches!(second, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn count_connected_ignores_master_and_disconnected() {
        let repo = MemoryPlayerRepository::default();
        repo.create(NewPlayer {
            room_id: "r1".to_string(),
            name: "Host".to_string(),
            role: PlayerRole::Master,
        })
        .await
        .unwrap();
        let a = repo
            .create(NewPlayer {
                room_id: "r1".to_string(),
                name: "Ada".to_string(),
                role: PlayerRole::Player,
            })
            .await
            .unwrap();
        repo.create(NewPlayer {
            room_id: "r1".to_string(),
            name: "Bob".to_string(),
            role: PlayerRole::Player,
        })
        .await
        .unwrap();

        assert_eq!(repo.count_connected("r1").await.unwrap(), 2);

        repo.update(
            &a.id,
            PlayerPatch {
                connected: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(repo.count_connected("r1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reset_scores_zeroes_both_counters() {
        let repo = MemoryPlayerRepository::default();
        let player = repo
            .create(NewPlayer {
                room_id: "r1".to_string(),
                name: "Ada".to_string(),
                role: PlayerRole::Player,
            })
            .await
            .unwrap();

        repo.update(
            &player.id,
            PlayerPatch {
                score: Some(7),
                round_score: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        repo.reset_scores("r1").await.unwrap();

        let player = repo.find_by_id(&player.id).await.unwrap();
        assert_eq!(player.score, 0);
        assert_eq!(player.round_score, 0);
    }

    #[tokio::test]
    async fn session_cursors_advance() {
        let repo = MemorySessionRepository::default();
        let session = repo.create("r1").await.unwrap();

        let session = repo.next_song(&session.id).await.unwrap();
        assert_eq!(session.current_song_index, 1);

        let session = repo.next_round(&session.id).await.unwrap();
        assert_eq!(session.current_round_index, 1);
        assert_eq!(session.current_song_index, 0);

        let session = repo.end_session(&session.id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Finished);
        assert!(session.ended_at.is_some());
    }

    #[tokio::test]
    async fn find_by_filters_caps_at_pool_size() {
        let repo = MemorySongRepository::default();
        for i in 0..3 {
            repo.create(test_song(
                &format!("s{i}"),
                &format!("Song {i}"),
                "Artist",
                1990,
                Some("rock"),
            ))
            .await
            .unwrap();
        }

        let filters = SongFilters {
            genre: Some("rock".to_string()),
            song_count: Some(10),
            ..Default::default()
        };

        assert_eq!(repo.find_by_filters(&filters).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn niche_songs_need_opting_in() {
        let repo = MemorySongRepository::default();
        let mut niche = test_song("s1", "Obscure", "Artist", 1990, None);
        niche.niche = true;
        repo.create(niche).await.unwrap();

        assert!(repo.get_random(5, false).await.unwrap().is_empty());
        assert_eq!(repo.get_random(5, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_similar_matches_any_given_criterion() {
        let repo = MemorySongRepository::default();
        repo.create(test_song("s1", "A", "Ann", 1990, Some("rock")))
            .await
            .unwrap();
        repo.create(test_song("s2", "B", "Bob", 2015, Some("rock")))
            .await
            .unwrap();
        repo.create(test_song("s3", "C", "Cid", 1991, Some("pop")))
            .await
            .unwrap();
        repo.create(test_song("s4", "D", "Dee", 2020, Some("jazz")))
            .await
            .unwrap();

        let similar = repo
            .find_similar(&SimilarQuery {
                genre: Some("rock".to_string()),
                year_min: Some(1985),
                year_max: Some(1995),
                language: None,
                exclude_song_id: Some("s1".to_string()),
                limit: 10,
            })
            .await
            .unwrap();

        let ids: Vec<&str> = similar.iter().map(|s| s.id.as_str()).collect();
        assert!(ids.contains(&"s2"), "same genre");
        assert!(ids.contains(&"s3"), "same era");
        assert!(!ids.contains(&"s1"), "excluded");
        assert!(!ids.contains(&"s4"), "unrelated");
    }

    #[tokio::test]
    async fn find_by_ids_preserves_order_and_fails_on_missing() {
        let repo = MemorySongRepository::default();
        repo.create(test_song("s1", "A", "Ann", 1990, None))
            .await
            .unwrap();
        repo.create(test_song("s2", "B", "Bob", 1991, None))
            .await
            .unwrap();

        let songs = repo
            .find_by_ids(&["s2".to_string(), "s1".to_string()])
            .await
            .unwrap();
        assert_eq!(songs[0].id, "s2");
        assert_eq!(songs[1].id, "s1");

        assert!(repo
            .find_by_ids(&["s1".to_string(), "zzz".to_string()])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn playlists_keep_song_order() {
        let repo = MemoryPlaylistRepository::default();
        let playlist = repo
            .create("Classics", vec!["s1".to_string(), "s2".to_string()])
            .await
            .unwrap();

        let playlist = repo
            .set_songs(&playlist.id, vec!["s2".to_string(), "s1".to_string()])
            .await
            .unwrap();

        assert_eq!(playlist.song_ids, vec!["s2", "s1"]);
    }
}
