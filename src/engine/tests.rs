//! End-to-end engine scenarios, driven through the hub with fake sockets.

use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::time::{timeout, Duration};

use crate::engine::EngineSettings;
use crate::hub::{ConnectionHandle, Hub};
use crate::models::{AnswerKind, Room, RoomStatus, RoundConfig};
use crate::params::ParamsOverride;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::storage::{NewRoom, Repositories};

struct TestClient {
    conn: ConnectionHandle,
    rx: UnboundedReceiver<ServerMessage>,
}

impl TestClient {
    /// Waits for the next message of the given kind, skipping others.
    async fn next_of(&mut self, kind: &str) -> ServerMessage {
        loop {
            let message = timeout(Duration::from_secs(60), self.rx.recv())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for '{kind}'"))
                .expect("connection channel closed");

            if message.kind() == kind {
                return message;
            }
        }
    }

    /// Asserts that nothing of the given kind is already queued.
    fn assert_not_queued(&mut self, kind: &str) {
        while let Ok(message) = self.rx.try_recv() {
            assert_ne!(message.kind(), kind, "unexpected '{kind}' in the queue");
        }
    }
}

async fn seed_library(repos: &Repositories) {
    let songs = [
        ("s1", "Bohemian Rhapsody", "Queen", 1975, "rock"),
        ("s2", "Hotel California", "Eagles", 1976, "rock"),
        ("s3", "Go Your Own Way", "Fleetwood Mac", 1977, "rock"),
        ("s4", "Dream On", "Aerosmith", 1973, "rock"),
        ("s5", "Night Fever", "Bee Gees", 1977, "disco"),
        ("s6", "Stayin Alive", "Bee Gees", 1977, "disco"),
    ];

    for (id, title, artist, year, genre) in songs {
        repos
            .songs
            .create(crate::storage::test_song(id, title, artist, year, Some(genre)))
            .await
            .unwrap();
    }
}

async fn setup() -> (Arc<Hub>, Repositories, Room) {
    setup_with(EngineSettings {
        grace: Duration::from_millis(20),
        ..Default::default()
    })
    .await
}

async fn setup_with(settings: EngineSettings) -> (Arc<Hub>, Repositories, Room) {
    let repos = Repositories::in_memory();
    seed_library(&repos).await;

    let room = repos
        .rooms
        .create(NewRoom {
            name: "Friday Night".to_string(),
            max_players: 8,
            master_ip: None,
        })
        .await
        .unwrap();

    let hub = Hub::new(repos.clone(), settings);

    (hub, repos, room)
}

async fn connect(
    hub: &Arc<Hub>,
    room: &Room,
    token: Option<&str>,
    player_id: Option<&str>,
) -> TestClient {
    let (tx, rx) = unbounded_channel();
    let conn = hub
        .attach(
            &room.id,
            token.map(str::to_string),
            player_id.map(str::to_string),
            tx,
        )
        .await
        .unwrap();

    let mut client = TestClient { conn, rx };
    client.next_of("connected").await;

    client
}

async fn join(hub: &Arc<Hub>, room: &Room, client: &mut TestClient, name: &str) -> String {
    hub.route(
        &room.id,
        &client.conn,
        ClientMessage::PlayerJoin {
            name: name.to_string(),
        },
    );

    loop {
        if let ServerMessage::PlayerJoined { player, .. } = client.next_of("player:joined").await {
            if player.name == name {
                return player.id;
            }
        }
    }
}

fn single_round(mode: &str, song_ids: &[&str], params: Option<ParamsOverride>) -> Vec<RoundConfig> {
    vec![RoundConfig {
        mode_type: mode.to_string(),
        media_type: "music".to_string(),
        params,
        song_filters: None,
        song_ids: Some(song_ids.iter().map(|s| s.to_string()).collect()),
    }]
}

fn start_game(hub: &Arc<Hub>, room: &Room, master: &TestClient, rounds: Vec<RoundConfig>) {
    hub.route(&room.id, &master.conn, ClientMessage::GameStart { rounds });
}

fn buzz(hub: &Arc<Hub>, room: &Room, client: &TestClient, song_index: usize, timestamp: u64) {
    hub.route(
        &room.id,
        &client.conn,
        ClientMessage::PlayerBuzz {
            song_index,
            timestamp,
        },
    );
}

fn answer(
    hub: &Arc<Hub>,
    room: &Room,
    client: &TestClient,
    song_index: usize,
    kind: AnswerKind,
    value: &str,
) {
    hub.route(
        &room.id,
        &client.conn,
        ClientMessage::PlayerAnswer {
            song_index,
            kind,
            value: value.to_string(),
        },
    );
}

#[tokio::test]
async fn buzz_race_is_won_by_the_earlier_client_timestamp() {
    let (hub, _repos, room) = setup().await;

    let master = connect(&hub, &room, Some(room.master_token.as_str()), None).await;
    let mut a = connect(&hub, &room, None, None).await;
    let mut b = connect(&hub, &room, None, None).await;

    let a_id = join(&hub, &room, &mut a, "A").await;
    let _b_id = join(&hub, &room, &mut b, "B").await;

    start_game(&hub, &room, &master, single_round("fast_buzz", &["s1"], None));
    a.next_of("song:started").await;
    b.next_of("song:started").await;

    // B arrives first with the later client tick.
    buzz(&hub, &room, &b, 0, 120);
    b.next_of("player:buzzed").await;

    let ServerMessage::PlayerBuzzed { player_id, .. } = a.next_of("player:buzzed").await else {
        unreachable!()
    };
    assert_ne!(player_id, a_id, "B holds the buzz first");

    // A arrives later with the earlier tick and preempts.
    buzz(&hub, &room, &a, 0, 100);

    let ServerMessage::BuzzRejected { player_id, .. } = b.next_of("buzz:rejected").await else {
        unreachable!()
    };
    assert_ne!(player_id, a_id);

    let ServerMessage::PlayerBuzzed { player_id, .. } = a.next_of("player:buzzed").await else {
        unreachable!()
    };
    assert_eq!(player_id, a_id);
}

#[tokio::test]
async fn fast_buzz_correct_awards_points_and_ends_the_song() {
    let (hub, repos, room) = setup().await;

    let mut master = connect(&hub, &room, Some(room.master_token.as_str()), None).await;
    let mut a = connect(&hub, &room, None, None).await;
    let mut b = connect(&hub, &room, None, None).await;

    let a_id = join(&hub, &room, &mut a, "A").await;
    join(&hub, &room, &mut b, "B").await;

    start_game(&hub, &room, &master, single_round("fast_buzz", &["s1"], None));
    master.next_of("song:started").await;

    buzz(&hub, &room, &a, 0, 100);
    master.next_of("player:buzzed").await;

    // The master validates the verbal answer.
    answer(&hub, &room, &master, 0, AnswerKind::Title, "correct");

    let ServerMessage::AnswerResult {
        player_id,
        is_correct,
        points_awarded,
        ..
    } = master.next_of("answer:result").await
    else {
        unreachable!()
    };
    assert_eq!(player_id, a_id);
    assert!(is_correct);
    assert_eq!(points_awarded, 1);

    master.next_of("song:ended").await;

    let player = repos.players.find_by_id(&a_id).await.unwrap();
    assert_eq!(player.score, 1);

    // A single one-song round runs straight to the end of the game.
    let ServerMessage::GameEnded { final_scores } = master.next_of("game:ended").await else {
        unreachable!()
    };
    assert_eq!(final_scores[0].player_id, a_id);
    assert_eq!(final_scores[0].total_score, 1);
    assert_eq!(final_scores[0].rank, 1);
    assert_eq!(final_scores[0].round_scores, vec![1]);

    let room = repos.rooms.find_by_id(&room.id).await.unwrap();
    assert_eq!(room.status, RoomStatus::Finished);
}

#[tokio::test]
async fn buzz_and_choice_runs_the_full_two_question_sequence() {
    let (hub, _repos, room) = setup().await;

    let master = connect(&hub, &room, Some(room.master_token.as_str()), None).await;
    let mut a = connect(&hub, &room, None, None).await;
    let mut b = connect(&hub, &room, None, None).await;

    let a_id = join(&hub, &room, &mut a, "A").await;
    join(&hub, &room, &mut b, "B").await;

    start_game(
        &hub,
        &room,
        &master,
        single_round("buzz_and_choice", &["s1"], None),
    );
    a.next_of("song:started").await;
    b.next_of("song:started").await;

    buzz(&hub, &room, &a, 0, 100);

    // The buzzer alone receives the artist question.
    let ServerMessage::PlayerBuzzed {
        artist_question, ..
    } = a.next_of("player:buzzed").await
    else {
        unreachable!()
    };
    let question = artist_question.expect("buzzer gets the artist question");
    assert_eq!(question.choices.len(), 4);
    assert!(question.choices.contains(&"Queen".to_string()));

    let ServerMessage::ChoicesArtist { choices, .. } = a.next_of("choices:artist").await else {
        unreachable!()
    };
    assert_eq!(choices.len(), 4);

    let ServerMessage::PlayerBuzzed {
        artist_question, ..
    } = b.next_of("player:buzzed").await
    else {
        unreachable!()
    };
    assert!(artist_question.is_none(), "others never see the choices");

    // Correct artist first.
    answer(&hub, &room, &a, 0, AnswerKind::Artist, "Queen");

    let ServerMessage::AnswerResult {
        is_correct,
        points_awarded,
        ..
    } = a.next_of("answer:result").await
    else {
        unreachable!()
    };
    assert!(is_correct);
    assert_eq!(points_awarded, 1);

    let ServerMessage::ChoicesTitle { choices, .. } = a.next_of("choices:title").await else {
        unreachable!()
    };
    assert!(choices.contains(&"Bohemian Rhapsody".to_string()));

    // Wrong title second: no extra points, lockout, song over.
    answer(&hub, &room, &a, 0, AnswerKind::Title, "Hotel California");

    let ServerMessage::AnswerResult {
        is_correct,
        points_awarded,
        ..
    } = a.next_of("answer:result").await
    else {
        unreachable!()
    };
    assert!(!is_correct);
    assert_eq!(points_awarded, 0);

    a.next_of("song:ended").await;

    let ServerMessage::RoundEnded { scores, .. } = a.next_of("round:ended").await else {
        unreachable!()
    };
    let mine = scores.iter().find(|s| s.player_id == a_id).unwrap();
    assert_eq!(mine.score, 1);
}

#[tokio::test]
async fn text_input_applies_the_levenshtein_threshold_without_lockout() {
    let (hub, repos, room) = setup().await;

    let master = connect(&hub, &room, Some(room.master_token.as_str()), None).await;
    let mut b = connect(&hub, &room, None, None).await;
    let mut c = connect(&hub, &room, None, None).await;

    let b_id = join(&hub, &room, &mut b, "B").await;
    let c_id = join(&hub, &room, &mut c, "C").await;

    start_game(&hub, &room, &master, single_round("text_input", &["s1"], None));
    b.next_of("song:started").await;
    c.next_of("song:started").await;

    // Distance 1: accepted.
    answer(&hub, &room, &b, 0, AnswerKind::Title, "Bohemian Rapsody");

    let ServerMessage::AnswerResult {
        player_id,
        is_correct,
        points_awarded,
        ..
    } = b.next_of("answer:result").await
    else {
        unreachable!()
    };
    assert_eq!(player_id, b_id);
    assert!(is_correct);
    assert_eq!(points_awarded, 1);

    // Distance 3: rejected, no lockout.
    answer(&hub, &room, &c, 0, AnswerKind::Title, "Boheman Rapsod");

    let ServerMessage::AnswerResult {
        player_id,
        is_correct,
        points_awarded,
        ..
    } = c.next_of("answer:result").await
    else {
        unreachable!()
    };
    assert_eq!(player_id, c_id);
    assert!(!is_correct);
    assert_eq!(points_awarded, 0);

    for id in [&b_id, &c_id] {
        let player = repos.players.find_by_id(id).await.unwrap();
        assert!(!player.is_locked_out);
    }

    // C may still try the artist.
    answer(&hub, &room, &c, 0, AnswerKind::Artist, "queen");

    let ServerMessage::AnswerResult { is_correct, .. } = c.next_of("answer:result").await else {
        unreachable!()
    };
    assert!(is_correct);
}

#[tokio::test]
async fn song_ends_without_a_claimant_once_everyone_is_locked_out() {
    let (hub, _repos, room) = setup().await;

    let mut master = connect(&hub, &room, Some(room.master_token.as_str()), None).await;
    let mut a = connect(&hub, &room, None, None).await;
    let mut b = connect(&hub, &room, None, None).await;
    let mut c = connect(&hub, &room, None, None).await;

    join(&hub, &room, &mut a, "A").await;
    join(&hub, &room, &mut b, "B").await;
    join(&hub, &room, &mut c, "C").await;

    start_game(&hub, &room, &master, single_round("fast_buzz", &["s1"], None));
    master.next_of("song:started").await;

    for (index, player) in [&a, &b, &c].into_iter().enumerate() {
        buzz(&hub, &room, player, 0, 100 + index as u64);
        master.next_of("player:buzzed").await;
        answer(&hub, &room, &master, 0, AnswerKind::Title, "wrong");
        master.next_of("answer:result").await;
    }

    // The third wrong answer locks out the last player and ends the song.
    let ServerMessage::SongEnded {
        correct_title,
        correct_artist,
        ..
    } = master.next_of("song:ended").await
    else {
        unreachable!()
    };
    assert_eq!(correct_title, "Bohemian Rhapsody");
    assert_eq!(correct_artist, "Queen");

    let ServerMessage::GameEnded { final_scores } = master.next_of("game:ended").await else {
        unreachable!()
    };
    assert!(final_scores.iter().all(|s| s.total_score == 0));
    assert!(final_scores.iter().all(|s| s.rank == 1));
}

#[tokio::test]
async fn locked_out_buzzes_are_rejected_without_state_change() {
    let (hub, repos, room) = setup().await;

    let mut master = connect(&hub, &room, Some(room.master_token.as_str()), None).await;
    let mut a = connect(&hub, &room, None, None).await;
    let mut b = connect(&hub, &room, None, None).await;

    let a_id = join(&hub, &room, &mut a, "A").await;
    join(&hub, &room, &mut b, "B").await;

    start_game(&hub, &room, &master, single_round("fast_buzz", &["s1"], None));
    master.next_of("song:started").await;

    buzz(&hub, &room, &a, 0, 100);
    master.next_of("player:buzzed").await;
    answer(&hub, &room, &master, 0, AnswerKind::Title, "wrong");
    master.next_of("answer:result").await;

    // A is locked out now; a rebuzz is a no-op.
    buzz(&hub, &room, &a, 0, 90);

    let ServerMessage::BuzzRejected { reason, .. } = a.next_of("buzz:rejected").await else {
        unreachable!()
    };
    assert_eq!(reason, "locked_out");

    let player = repos.players.find_by_id(&a_id).await.unwrap();
    assert!(player.is_locked_out);
    assert!(!player.is_active);

    // B can still win the song.
    buzz(&hub, &room, &b, 0, 500);
    master.next_of("player:buzzed").await;
    answer(&hub, &room, &master, 0, AnswerKind::Title, "correct");

    let ServerMessage::AnswerResult { is_correct, .. } = master.next_of("answer:result").await
    else {
        unreachable!()
    };
    assert!(is_correct);
}

#[tokio::test]
async fn lockouts_reset_when_the_next_song_starts() {
    let (hub, repos, room) = setup().await;

    let mut master = connect(&hub, &room, Some(room.master_token.as_str()), None).await;
    let mut a = connect(&hub, &room, None, None).await;
    let mut b = connect(&hub, &room, None, None).await;

    let a_id = join(&hub, &room, &mut a, "A").await;
    join(&hub, &room, &mut b, "B").await;

    start_game(
        &hub,
        &room,
        &master,
        single_round("fast_buzz", &["s1", "s2"], None),
    );
    master.next_of("song:started").await;

    buzz(&hub, &room, &a, 0, 100);
    master.next_of("player:buzzed").await;
    answer(&hub, &room, &master, 0, AnswerKind::Title, "wrong");
    master.next_of("answer:result").await;

    // Skip to the next song; the lockout must not follow A there.
    hub.route(&room.id, &master.conn, ClientMessage::GameSkip);
    master.next_of("song:ended").await;
    master.next_of("song:started").await;

    let player = repos.players.find_by_id(&a_id).await.unwrap();
    assert!(!player.is_locked_out);

    buzz(&hub, &room, &a, 1, 40);
    let ServerMessage::PlayerBuzzed { player_id, .. } = master.next_of("player:buzzed").await
    else {
        unreachable!()
    };
    assert_eq!(player_id, a_id);
}

#[tokio::test]
async fn rounds_chain_through_the_between_state() {
    let (hub, _repos, room) = setup().await;

    let mut master = connect(&hub, &room, Some(room.master_token.as_str()), None).await;
    let mut a = connect(&hub, &room, None, None).await;
    let mut b = connect(&hub, &room, None, None).await;

    join(&hub, &room, &mut a, "A").await;
    join(&hub, &room, &mut b, "B").await;

    let rounds = vec![
        RoundConfig {
            mode_type: "fast_buzz".to_string(),
            media_type: "music".to_string(),
            params: None,
            song_filters: None,
            song_ids: Some(vec!["s1".to_string()]),
        },
        RoundConfig {
            mode_type: "text_input".to_string(),
            media_type: "music".to_string(),
            params: None,
            song_filters: None,
            song_ids: Some(vec!["s2".to_string()]),
        },
    ];

    start_game(&hub, &room, &master, rounds);
    master.next_of("song:started").await;

    // Resolve round 0 by skipping its only song.
    hub.route(&room.id, &master.conn, ClientMessage::GameSkip);
    master.next_of("song:ended").await;
    master.next_of("round:ended").await;

    let ServerMessage::RoundBetween {
        completed_round_index,
        next_round_index,
        next_round_mode,
        ..
    } = master.next_of("round:between").await
    else {
        unreachable!()
    };
    assert_eq!(completed_round_index, 0);
    assert_eq!(next_round_index, 1);
    assert_eq!(next_round_mode, "text_input");

    // The master advances past the break.
    hub.route(&room.id, &master.conn, ClientMessage::GameSkip);

    let ServerMessage::RoundStarted {
        round_index,
        mode_type,
        ..
    } = master.next_of("round:started").await
    else {
        unreachable!()
    };
    assert_eq!(round_index, 1);
    assert_eq!(mode_type, "text_input");

    master.next_of("song:started").await;
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume_preserve_the_remaining_song_time() {
    let (hub, _repos, room) = setup().await;

    let mut master = connect(&hub, &room, Some(room.master_token.as_str()), None).await;
    let mut a = connect(&hub, &room, None, None).await;
    let mut b = connect(&hub, &room, None, None).await;

    join(&hub, &room, &mut a, "A").await;
    join(&hub, &room, &mut b, "B").await;

    start_game(&hub, &room, &master, single_round("text_input", &["s1"], None));
    master.next_of("song:started").await;

    tokio::time::advance(Duration::from_secs(10)).await;

    hub.route(&room.id, &master.conn, ClientMessage::GamePause);
    master.next_of("game:paused").await;

    // Far more than the song length passes while paused.
    tokio::time::advance(Duration::from_secs(300)).await;
    master.assert_not_queued("song:ended");

    hub.route(&room.id, &master.conn, ClientMessage::GameResume);
    master.next_of("game:resumed").await;

    let before = tokio::time::Instant::now();
    master.next_of("song:ended").await;
    assert_eq!(
        tokio::time::Instant::now().duration_since(before),
        Duration::from_secs(20)
    );
}

#[tokio::test]
async fn repeated_state_sync_is_idempotent() {
    let (hub, _repos, room) = setup().await;

    let mut master = connect(&hub, &room, Some(room.master_token.as_str()), None).await;
    let mut a = connect(&hub, &room, None, None).await;

    join(&hub, &room, &mut a, "A").await;
    master.next_of("player:joined").await;

    hub.route(&room.id, &master.conn, ClientMessage::StateSync);
    let first = master.next_of("state:synced").await;

    hub.route(&room.id, &master.conn, ClientMessage::StateSync);
    let second = master.next_of("state:synced").await;

    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[tokio::test]
async fn error_taxonomy_reaches_only_the_offending_socket() {
    let (hub, _repos, room) = setup().await;

    let mut master = connect(&hub, &room, Some(room.master_token.as_str()), None).await;
    let mut a = connect(&hub, &room, None, None).await;
    let mut b = connect(&hub, &room, None, None).await;

    join(&hub, &room, &mut a, "A").await;

    // A player cannot start the game.
    hub.route(
        &room.id,
        &a.conn,
        ClientMessage::GameStart {
            rounds: single_round("fast_buzz", &["s1"], None),
        },
    );
    let ServerMessage::Error { code, .. } = a.next_of("error").await else {
        unreachable!()
    };
    assert_eq!(code, "AUTH_ERROR");

    // Starting with one connected player is a state error.
    hub.route(
        &room.id,
        &master.conn,
        ClientMessage::GameStart {
            rounds: single_round("fast_buzz", &["s1"], None),
        },
    );
    let ServerMessage::Error { code, .. } = master.next_of("error").await else {
        unreachable!()
    };
    assert_eq!(code, "STATE_ERROR");

    // A duplicate name conflicts.
    join(&hub, &room, &mut b, "B").await;
    hub.route(
        &room.id,
        &b.conn,
        ClientMessage::PlayerJoin {
            name: "A".to_string(),
        },
    );
    let ServerMessage::Error { code, .. } = b.next_of("error").await else {
        unreachable!()
    };
    assert_eq!(code, "CONFLICT");

    // Markup in a name fails validation.
    hub.route(
        &room.id,
        &b.conn,
        ClientMessage::PlayerJoin {
            name: "<b>eve</b>".to_string(),
        },
    );
    let ServerMessage::Error { code, .. } = b.next_of("error").await else {
        unreachable!()
    };
    assert_eq!(code, "VALIDATION_ERROR");

    // An undecodable frame is a transport error; the socket stays usable.
    hub.route_malformed(&room.id, &b.conn, "unknown message type".to_string());
    let ServerMessage::Error { code, .. } = b.next_of("error").await else {
        unreachable!()
    };
    assert_eq!(code, "TRANSPORT_ERROR");

    hub.route(&room.id, &b.conn, ClientMessage::StateSync);
    b.next_of("state:synced").await;

    // None of it leaked to the master's socket.
    master.assert_not_queued("error");
}

#[tokio::test]
async fn disconnect_marks_the_player_after_the_grace_window() {
    let (hub, repos, room) = setup().await;

    let mut master = connect(&hub, &room, Some(room.master_token.as_str()), None).await;
    let mut a = connect(&hub, &room, None, None).await;
    let mut b = connect(&hub, &room, None, None).await;

    let a_id = join(&hub, &room, &mut a, "A").await;
    join(&hub, &room, &mut b, "B").await;

    let a_conn_id = a.conn.id;
    drop(a);
    hub.detach(&room.id, a_conn_id);

    let ServerMessage::PlayerDisconnected { player_id, .. } =
        master.next_of("player:disconnected").await
    else {
        unreachable!()
    };
    assert_eq!(player_id, a_id);

    let player = repos.players.find_by_id(&a_id).await.unwrap();
    assert!(!player.connected);

    // The seat survives: reconnecting with the player id re-binds it.
    let mut a2 = connect(&hub, &room, None, Some(&a_id)).await;

    let ServerMessage::PlayerReconnected { player_id, .. } =
        master.next_of("player:reconnected").await
    else {
        unreachable!()
    };
    assert_eq!(player_id, a_id);

    let player = repos.players.find_by_id(&a_id).await.unwrap();
    assert!(player.connected);

    hub.route(&room.id, &a2.conn, ClientMessage::StateSync);
    a2.next_of("state:synced").await;
}

#[tokio::test]
async fn answer_timeout_counts_as_a_wrong_answer() {
    let (hub, _repos, room) = setup_with(EngineSettings {
        grace: Duration::from_millis(20),
        system_params: crate::params::ModeParams {
            answer_timer: 1,
            ..Default::default()
        },
        ..Default::default()
    })
    .await;

    let mut master = connect(&hub, &room, Some(room.master_token.as_str()), None).await;
    let mut a = connect(&hub, &room, None, None).await;
    let mut b = connect(&hub, &room, None, None).await;

    let a_id = join(&hub, &room, &mut a, "A").await;
    join(&hub, &room, &mut b, "B").await;

    start_game(&hub, &room, &master, single_round("fast_buzz", &["s1"], None));
    master.next_of("song:started").await;

    buzz(&hub, &room, &a, 0, 100);
    master.next_of("player:buzzed").await;

    // Nobody answers within the second.
    let ServerMessage::AnswerResult {
        player_id,
        is_correct,
        ..
    } = master.next_of("answer:result").await
    else {
        unreachable!()
    };
    assert_eq!(player_id, a_id);
    assert!(!is_correct);
}

#[tokio::test]
async fn kicked_players_are_told_and_removed() {
    let (hub, repos, room) = setup().await;

    let mut master = connect(&hub, &room, Some(room.master_token.as_str()), None).await;
    let mut a = connect(&hub, &room, None, None).await;

    let a_id = join(&hub, &room, &mut a, "A").await;
    master.next_of("player:joined").await;

    hub.route(
        &room.id,
        &master.conn,
        ClientMessage::PlayerKick {
            player_id: a_id.clone(),
        },
    );

    a.next_of("player:kicked").await;

    let ServerMessage::PlayerLeft {
        player_id,
        remaining_players,
        ..
    } = master.next_of("player:left").await
    else {
        unreachable!()
    };
    assert_eq!(player_id, a_id);
    assert_eq!(remaining_players, 0);

    assert!(repos.players.find_by_id(&a_id).await.is_err());
}
