use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::gamestate_common::Player;

/// The message categories and type names the server is known to use.
/// Informational only, nothing validates against this catalogue.
pub const RELAY_TYPES: (&str, [&str; 3]) = ("Relay", ["Info", "Draw", "Text"]);
pub const GAME_TYPES: (&str, [&str; 2]) = ("Game", ["StartGame", "GameState"]);
pub const DATA_TYPES: (&str, [&str; 1]) = ("Data", ["UserData"]);

/// Tag discriminating the kind of a message on the wire.
///
/// Serializes as an object with a single entry mapping the category to the
/// type name, e.g. `{"Relay":"Draw"}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct MessageType(BTreeMap<String, String>);

impl MessageType {
    /// Builds a tag with exactly one entry, key = category, value = type
    /// name. Any strings are accepted, there is no check against the known
    /// catalogue.
    pub fn new(category: &str, type_name: &str) -> Self {
        let mut tag = BTreeMap::new();
        tag.insert(category.to_string(), type_name.to_string());
        MessageType(tag)
    }

    /// The category of the tag, e.g. "Relay".
    ///
    /// A tag received off the wire may hold any number of entries, so this
    /// returns the first one in key order, or None for an empty tag.
    pub fn category(&self) -> Option<&str> {
        self.0.keys().next().map(String::as_str)
    }

    /// The type name within the category, e.g. "Draw".
    pub fn name(&self) -> Option<&str> {
        self.0.values().next().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Envelope for everything that crosses the wire.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ServerMessage {
    /// kind of message
    pub msg_type: MessageType,
    /// serialized payload, its real shape depends on msg_type
    pub content: String,
}

impl ServerMessage {
    /// Wraps a payload into an envelope, serializing it into `content`.
    pub fn new<T: Serialize>(msg_type: MessageType, payload: &T) -> serde_json::Result<Self> {
        Ok(ServerMessage {
            msg_type,
            content: serde_json::to_string(payload)?,
        })
    }

    /// Parses `content` back into the shape the caller expects for this
    /// msg_type.
    pub fn parse_content<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.content)
    }
}

/// A chat message doubling as a guess at the drawn word.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GuessMessage {
    /// name of the player who sent it
    pub username: String,
    /// id of the player who sent it
    pub user_id: String,
    /// the chat text or guessed word
    pub content: String,
    /// whether the guess matched, only present once the server judged it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
}

/// One incremental segment of freehand drawing input.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct DrawMessage {
    /// stroke color
    pub color: u32,
    /// stroke width
    pub size: f32,
    pub x: f32,
    pub y: f32,
    /// first segment of a stroke
    pub beginning: bool,
    /// last segment of a stroke
    pub end: bool,
}

/// Per-round broadcast of the canvas and the scoreboard.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GameMessage {
    /// the canvas contents, serialized
    pub drawing: String,
    /// score per player id
    pub scores: BTreeMap<String, i64>,
}

/// A player joining or leaving a room.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlayerMovement {
    /// true on join, false on leave
    pub enter: bool,
    pub user_id: String,
    /// snapshot of the player that moved
    pub player: Player,
}
