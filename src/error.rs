use thiserror::Error;

/// Why a move was refused. The `Display` text is meant to be shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveRejection {
    #[error("game is not in progress")]
    NotPlaying,

    #[error("unknown player")]
    UnknownPlayer,

    #[error("piece on {square} is cooling down for {remaining_secs}s")]
    Cooldown { square: String, remaining_secs: u64 },

    #[error("rate limit exceeded: at most {max_moves} moves per {window_secs} seconds")]
    RateLimited { max_moves: u32, window_secs: u64 },

    #[error("no piece on {0}")]
    NoPiece(String),

    #[error("piece on {0} belongs to the opponent")]
    WrongOwner(String),

    #[error("illegal move {from}{to}")]
    IllegalMove { from: String, to: String },
}

/// Failures of roster, settings and readiness operations on a single match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("settings can only be changed before the game starts")]
    SettingsLocked,

    #[error("match is not in the settings phase")]
    NotInSettings,

    #[error("unknown player")]
    UnknownPlayer,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a player id is required")]
    InvalidIdentity,

    #[error("invalid match id")]
    InvalidMatchId,

    #[error("invalid square: {0}")]
    InvalidSquare(String),

    #[error("match {0} not found")]
    MatchNotFound(String),

    #[error("player {0} is not in a match")]
    PlayerNotInMatch(String),

    #[error("already in this game")]
    AlreadyInGame,

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Move(#[from] MoveRejection),

    /// State that should exist vanished mid-operation. Callers may retry.
    #[error("server error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: String, value: String },

    #[error("{key} must not be empty")]
    Empty { key: String },
}
