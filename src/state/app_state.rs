use log::{debug, info};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::RegistryError;
use crate::models::{MatchId, MatchSnapshot, MatchStatus, PlayerInfo};
use crate::state::matchmaking::{MatchmakingQueue, QueueEntry};
use crate::state::registry::{JoinOptions, MatchRegistry};

/// Application state shared between request handlers and background tasks.
/// Built once at startup and passed around explicitly.
pub struct AppState {
    pub registry: Arc<MatchRegistry>,
    pub queue: Arc<MatchmakingQueue>,
    // serializes matchmaking attempts so one player cannot be paired twice
    matchmaking: Mutex<()>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchmakingOutcome {
    Paired {
        match_id: MatchId,
        opponent: QueueEntry,
        snapshot: MatchSnapshot,
    },
    Queued {
        position: usize,
    },
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let queue = Arc::new(MatchmakingQueue::new(clock.clone(), config.queue));
        let registry = Arc::new(MatchRegistry::new(queue.clone(), clock, config.registry));
        AppState {
            registry,
            queue,
            matchmaking: Mutex::new(()),
        }
    }

    /// Pair the player with a waiting opponent, or queue them.
    ///
    /// The player leaves any current match first. A candidate who has meanwhile
    /// started playing elsewhere is skipped. On a pairing the waiting opponent
    /// takes white in a freshly allocated match.
    pub fn request_match(&self, info: PlayerInfo) -> Result<MatchmakingOutcome, RegistryError> {
        if info.id.trim().is_empty() {
            return Err(RegistryError::InvalidIdentity);
        }
        let _guard = self.matchmaking.lock().unwrap_or_else(|e| e.into_inner());

        self.registry.leave_match(&info.id);

        loop {
            let Some(opponent) = self.queue.find_match(&info.id, info.rank) else {
                self.queue
                    .enqueue(&info.id, &info.handle, &info.display_name, info.rank);
                let position = self
                    .queue
                    .position(&info.id)
                    .ok_or_else(|| RegistryError::Internal("queue entry vanished".to_string()))?;
                return Ok(MatchmakingOutcome::Queued { position });
            };

            let busy = self
                .registry
                .get_match_by_player(&opponent.player_id)
                .map_or(false, |m| m.status == MatchStatus::Playing);
            if busy {
                debug!(
                    "Skipping {}: already playing elsewhere",
                    opponent.player_id
                );
                continue;
            }

            let match_id = self.registry.create_match(Some(Uuid::new_v4().to_string()))?;
            let opts = JoinOptions {
                is_matchmaking: true,
            };
            let waiting = PlayerInfo {
                id: opponent.player_id.clone(),
                handle: opponent.handle.clone(),
                display_name: opponent.display_name.clone(),
                rank: opponent.rank,
            };
            self.registry.join_match(&match_id, waiting, opts)?;
            let joined = self.registry.join_match(&match_id, info, opts)?;
            info!(
                "Matchmaking created match {} for {}",
                match_id, opponent.player_id
            );

            return Ok(MatchmakingOutcome::Paired {
                match_id,
                opponent,
                snapshot: joined.snapshot,
            });
        }
    }

    /// Idempotent: cancelling without a queue entry is fine.
    pub fn cancel_matchmaking(&self, player_id: &str) -> bool {
        self.queue.dequeue(player_id)
    }
}
