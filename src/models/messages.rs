use serde::{Deserialize, Serialize};

use crate::models::match_state::{EndReason, MatchStatus};
use crate::models::settings::Settings;

/// Immutable view of a match, handed to the gateway after every mutation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MatchSnapshot {
    pub match_id: String,
    pub status: MatchStatus,
    pub players: Vec<PlayerView>,
    pub spectators: Vec<SpectatorView>,
    pub settings: Settings,
    /// FEN piece placement, rank 8 first
    pub board: String,
    pub cooldowns: Vec<CooldownView>,
    pub move_count: usize,
    pub last_move: Option<LastMove>,
    pub winner: Option<String>,
    pub end_reason: Option<EndReason>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    pub id: String,
    pub display_name: String,
    pub color: String,
    pub is_ready: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SpectatorView {
    pub id: String,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CooldownView {
    pub square: String,
    pub owner: String,
    pub remaining_ms: u64,
}

/// Last move information
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LastMove {
    pub from: String,
    pub to: String,
    pub piece: String,
    pub captured: Option<String>,
}

/// One row of a match listing
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MatchSummary {
    pub match_id: String,
    pub status: MatchStatus,
    pub players: usize,
    pub spectators: usize,
}
