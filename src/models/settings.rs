use serde::{Deserialize, Serialize};

use crate::error::MatchError;

pub const DEFAULT_MAX_MOVES_PER_PERIOD: u32 = 5;
pub const DEFAULT_PIECE_COOLDOWN_SECONDS: u32 = 3;

/// Per-match tuning, editable until both players are ready.
///
/// Missing fields fall back to the defaults and unknown fields are refused,
/// so a client cannot smuggle extra knobs through.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub max_moves_per_period: u32,
    pub piece_cooldown_seconds: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_moves_per_period: DEFAULT_MAX_MOVES_PER_PERIOD,
            piece_cooldown_seconds: DEFAULT_PIECE_COOLDOWN_SECONDS,
        }
    }
}

impl Settings {
    pub fn new(max_moves_per_period: u32, piece_cooldown_seconds: u32) -> Result<Self, MatchError> {
        Settings {
            max_moves_per_period,
            piece_cooldown_seconds,
        }
        .validated()
    }

    pub fn validated(self) -> Result<Self, MatchError> {
        if self.max_moves_per_period < 1 {
            return Err(MatchError::InvalidSettings(
                "max_moves_per_period must be at least 1".to_string(),
            ));
        }
        if self.piece_cooldown_seconds < 1 {
            return Err(MatchError::InvalidSettings(
                "piece_cooldown_seconds must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"max_moves_per_period": 2}"#).unwrap();
        assert_eq!(settings.max_moves_per_period, 2);
        assert_eq!(settings.piece_cooldown_seconds, DEFAULT_PIECE_COOLDOWN_SECONDS);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed = serde_json::from_str::<Settings>(r#"{"turbo": true}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn zero_values_fail_validation() {
        assert!(Settings::new(0, 3).is_err());
        assert!(Settings::new(3, 0).is_err());
        assert_eq!(Settings::new(1, 1).unwrap().max_moves_per_period, 1);
    }
}
