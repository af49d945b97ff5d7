use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Player {
    /// name of the player
    pub username: String,
    /// the score of the player
    pub score: i64,
    /// score before the current round, for showing deltas
    pub prev_score: i64,
    /// is the player currently connected?
    pub active: bool,
}

impl Player {
    pub fn new(username: String) -> Self {
        Player {
            username,
            score: 0,
            prev_score: 0,
            active: true,
        }
    }
}

/// Where a room is in its lifecycle.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    #[serde(rename = "WAITING")]
    Waiting,
    #[serde(rename = "STARTED")]
    Started,
    #[serde(rename = "OVER")]
    Over,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GameState {
    /// how many rounds the game runs for
    pub total_rounds: usize,
    /// the round currently played, starts at 1
    pub current_round: usize,
    /// index into the room's player list of whoever is drawing
    pub currently_drawing: usize,
    /// room title
    pub title: String,
    /// the word to guess, only meaningful to the server and the drawer
    pub correct_word: String,
    /// unix millis at which the round started
    pub round_start_time: u128,
}

impl Default for GameState {
    fn default() -> Self {
        GameState {
            total_rounds: 3,
            current_round: 1,
            currently_drawing: 0,
            title: "Default room".to_string(),
            correct_word: "default".to_string(),
            round_start_time: unix_millis(),
        }
    }
}

/// Milliseconds since the unix epoch.
fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis()
}

/// Aggregate view of one game session.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Room {
    pub room_id: String,
    /// lifecycle status of the room
    pub status: GameStatus,
    /// all players, keyed by their id
    pub players: BTreeMap<String, Player>,
    /// id of the player who created the room
    pub owner: String,
    /// server-authoritative round state
    pub state: GameState,
}

impl Room {
    /// A fresh waiting room with the owner as its only player.
    pub fn new(owner: String, room_id: String, owner_username: String) -> Room {
        let mut players = BTreeMap::new();
        players.insert(owner.clone(), Player::new(owner_username));
        Room {
            room_id,
            status: GameStatus::Waiting,
            players,
            owner,
            state: GameState::default(),
        }
    }
}

/// A player record paired with the id it belongs to.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlayerData {
    pub user_id: String,
    pub player: Player,
}
