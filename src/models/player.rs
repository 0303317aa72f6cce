use chess::Color;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub type PlayerId = String;
pub type MatchId = String;

/// Identity a caller supplies when joining or queueing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub id: PlayerId,
    /// Opaque transport handle (connection id) used by the gateway to deliver notifications
    pub handle: String,
    pub display_name: String,
    #[serde(default)]
    pub rank: Option<i32>,
}

impl PlayerInfo {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let id = id.into();
        PlayerInfo {
            handle: id.clone(),
            id,
            display_name: display_name.into(),
            rank: None,
        }
    }

    pub fn with_rank(mut self, rank: i32) -> Self {
        self.rank = Some(rank);
        self
    }
}

/// A seated player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub handle: String,
    pub display_name: String,
    pub side: Color,
    pub is_ready: bool,
}

#[derive(Debug, Clone)]
pub struct Spectator {
    pub id: PlayerId,
    pub handle: String,
    pub display_name: String,
    pub joined_at: Instant,
}
