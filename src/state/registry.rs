//! Owns every live match and the player -> match mapping.
//!
//! Lock order is `matches` map, then a single match, then `players`. Moves
//! only hold the map lock long enough to clone the match handle, so moves in
//! different matches run in parallel while joins, leaves and reaping are
//! serialized against each other.

use chess::{Piece, Square};
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{MatchError, RegistryError};
use crate::game::utils::{parse_promotion, parse_square};
use crate::models::{
    AppliedMove, JoinOutcome, Match, MatchId, MatchSnapshot, MatchStatus, MatchSummary, PlayerId,
    PlayerInfo, Settings,
};
use crate::state::matchmaking::MatchmakingQueue;

pub const DEFAULT_ABANDON_AFTER: Duration = Duration::from_secs(300);
pub const DEFAULT_FINISHED_RETENTION: Duration = Duration::from_secs(1800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Idle time after which a mid-play match short of players is dropped
    pub abandon_after: Duration,
    /// Idle time after which a finished match is dropped
    pub finished_retention: Duration,
    /// Settings every new match starts with
    pub default_settings: Settings,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            abandon_after: DEFAULT_ABANDON_AFTER,
            finished_retention: DEFAULT_FINISHED_RETENTION,
            default_settings: Settings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinOptions {
    /// Matchmaking joins skip the "already in this game" guard
    pub is_matchmaking: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinResult {
    pub outcome: JoinOutcome,
    pub snapshot: MatchSnapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaveResult {
    pub match_id: Option<MatchId>,
    /// State after the leave; `None` when the player had no match or it was deleted
    pub snapshot: Option<MatchSnapshot>,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveResult {
    pub applied: AppliedMove,
    pub snapshot: MatchSnapshot,
}

type MatchHandle = Arc<Mutex<Match>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Spectators are mapped to their match too, but only seated players may change it.
fn require_seat(game: &Match, player_id: &str) -> Result<(), RegistryError> {
    match game.player(player_id) {
        Some(_) => Ok(()),
        None => Err(MatchError::UnknownPlayer.into()),
    }
}

pub struct MatchRegistry {
    matches: Mutex<HashMap<MatchId, MatchHandle>>,
    players: Mutex<HashMap<PlayerId, MatchId>>,
    queue: Arc<MatchmakingQueue>,
    clock: Arc<dyn Clock>,
    config: RegistryConfig,
}

impl MatchRegistry {
    pub fn new(queue: Arc<MatchmakingQueue>, clock: Arc<dyn Clock>, config: RegistryConfig) -> Self {
        MatchRegistry {
            matches: Mutex::new(HashMap::new()),
            players: Mutex::new(HashMap::new()),
            queue,
            clock,
            config,
        }
    }

    /// Store a new match under `id` (or a fresh UUID). An existing match with
    /// the same id is kept as is.
    pub fn create_match(&self, id: Option<MatchId>) -> Result<MatchId, RegistryError> {
        let id = match id {
            Some(id) if id.trim().is_empty() => return Err(RegistryError::InvalidMatchId),
            Some(id) => id,
            None => Uuid::new_v4().to_string(),
        };
        let mut matches = lock(&self.matches);
        matches.entry(id.clone()).or_insert_with(|| {
            info!("Created match {}", id);
            Arc::new(Mutex::new(Match::new(
                id.clone(),
                self.config.default_settings,
                self.clock.now(),
            )))
        });
        Ok(id)
    }

    /// Seat `info` in match `id`, creating the match if needed.
    ///
    /// Outside matchmaking, a player or spectator already in that match is
    /// refused. A player mapped to another match leaves it first, and joining
    /// always takes the player out of the matchmaking queue.
    pub fn join_match(
        &self,
        id: &str,
        info: PlayerInfo,
        opts: JoinOptions,
    ) -> Result<JoinResult, RegistryError> {
        if info.id.trim().is_empty() {
            return Err(RegistryError::InvalidIdentity);
        }
        if id.trim().is_empty() {
            return Err(RegistryError::InvalidMatchId);
        }

        let current = lock(&self.players).get(&info.id).cloned();
        if let Some(current) = current.filter(|m| m != id) {
            info!("Player {} switches from match {} to {}", info.id, current, id);
            self.leave_match(&info.id);
        }

        let now = self.clock.now();
        let mut matches = lock(&self.matches);
        let handle = matches
            .entry(id.to_string())
            .or_insert_with(|| {
                info!("Created match {} on first join", id);
                Arc::new(Mutex::new(Match::new(id, self.config.default_settings, now)))
            })
            .clone();
        let mut game = lock(&handle);

        if !opts.is_matchmaking && game.has_participant(&info.id) {
            return Err(RegistryError::AlreadyInGame);
        }

        let player_id = info.id.clone();
        let outcome = game.join(info, now);
        self.queue.dequeue(&player_id);
        lock(&self.players).insert(player_id, id.to_string());

        Ok(JoinResult {
            outcome,
            snapshot: game.snapshot(now),
        })
    }

    /// Take the player out of their match, deleting the match once nobody is
    /// left in it. Always succeeds, and always clears the player's mapping and
    /// queue entry.
    pub fn leave_match(&self, player_id: &str) -> LeaveResult {
        self.queue.dequeue(player_id);
        let Some(match_id) = lock(&self.players).remove(player_id) else {
            return LeaveResult {
                match_id: None,
                snapshot: None,
                deleted: false,
            };
        };

        let now = self.clock.now();
        let mut matches = lock(&self.matches);
        let Some(handle) = matches.get(&match_id).cloned() else {
            warn!("Player {} was mapped to missing match {}", player_id, match_id);
            return LeaveResult {
                match_id: Some(match_id),
                snapshot: None,
                deleted: true,
            };
        };
        let mut game = lock(&handle);
        game.leave(player_id, now);

        if game.is_empty() {
            matches.remove(&match_id);
            info!("Deleted empty match {}", match_id);
            return LeaveResult {
                match_id: Some(match_id),
                snapshot: None,
                deleted: true,
            };
        }

        LeaveResult {
            match_id: Some(match_id),
            snapshot: Some(game.snapshot(now)),
            deleted: false,
        }
    }

    pub fn switch_sides(&self, player_id: &str) -> Result<(bool, MatchSnapshot), RegistryError> {
        self.with_player_match(player_id, |game, now| {
            require_seat(game, player_id)?;
            Ok(game.switch_sides(now))
        })
    }

    pub fn set_settings(
        &self,
        player_id: &str,
        settings: Settings,
    ) -> Result<MatchSnapshot, RegistryError> {
        self.with_player_match(player_id, |game, now| {
            require_seat(game, player_id)?;
            game.set_settings(settings, now).map_err(RegistryError::from)
        })
        .map(|(_, snapshot)| snapshot)
    }

    /// Returns whether this call started the game.
    pub fn set_ready(&self, player_id: &str) -> Result<(bool, MatchSnapshot), RegistryError> {
        self.with_player_match(player_id, |game, now| {
            game.set_ready(player_id, now).map_err(RegistryError::from)
        })
    }

    pub fn make_move(
        &self,
        player_id: &str,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
    ) -> Result<MoveResult, RegistryError> {
        self.with_player_match(player_id, |game, now| {
            game.move_piece(player_id, from, to, promotion, now)
                .map_err(RegistryError::from)
        })
        .map(|(applied, snapshot)| MoveResult { applied, snapshot })
    }

    /// `make_move` with squares in algebraic notation ("e2") and an optional
    /// promotion hint ("q", "knight"). An unrecognised hint promotes to a queen.
    pub fn make_move_notation(
        &self,
        player_id: &str,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<MoveResult, RegistryError> {
        let from = parse_square(from)?;
        let to = parse_square(to)?;
        self.make_move(player_id, from, to, promotion.and_then(parse_promotion))
    }

    pub fn possible_moves(
        &self,
        player_id: &str,
    ) -> Result<BTreeMap<Square, Vec<Square>>, RegistryError> {
        self.with_player_match(player_id, |game, now| {
            game.possible_moves(player_id, now).map_err(RegistryError::from)
        })
        .map(|(moves, _)| moves)
    }

    pub fn reset_game(&self, player_id: &str) -> Result<MatchSnapshot, RegistryError> {
        self.with_player_match(player_id, |game, now| {
            require_seat(game, player_id)?;
            game.reset_game(now);
            Ok(())
        })
        .map(|(_, snapshot)| snapshot)
    }

    pub fn get_match(&self, id: &str) -> Option<MatchSnapshot> {
        let handle = lock(&self.matches).get(id).cloned()?;
        let now = self.clock.now();
        let snapshot = lock(&handle).snapshot(now);
        Some(snapshot)
    }

    pub fn get_match_by_player(&self, player_id: &str) -> Option<MatchSnapshot> {
        let id = lock(&self.players).get(player_id).cloned()?;
        self.get_match(&id)
    }

    pub fn match_id_of(&self, player_id: &str) -> Option<MatchId> {
        lock(&self.players).get(player_id).cloned()
    }

    pub fn list_matches(&self) -> Vec<MatchSummary> {
        let handles: Vec<MatchHandle> = lock(&self.matches).values().cloned().collect();
        let mut summaries: Vec<MatchSummary> =
            handles.iter().map(|h| lock(h).summary()).collect();
        summaries.sort_by(|a, b| a.match_id.cmp(&b.match_id));
        summaries
    }

    pub fn len(&self) -> usize {
        lock(&self.matches).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Safety-net sweep for matches whose cleanup never happened. Returns the
    /// ids that were removed.
    pub fn reap_abandoned(&self) -> Vec<MatchId> {
        let now = self.clock.now();
        let mut matches = lock(&self.matches);
        let mut reaped = Vec::new();

        matches.retain(|id, handle| {
            let game = lock(handle.as_ref());
            let idle = now.saturating_duration_since(game.last_activity());
            let expired = game.has_no_players()
                || (game.status() == MatchStatus::Playing
                    && game.players().len() < 2
                    && idle >= self.config.abandon_after)
                || (game.status() == MatchStatus::Finished
                    && idle >= self.config.finished_retention);
            if expired {
                reaped.push((
                    id.clone(),
                    game.players()
                        .iter()
                        .map(|p| p.id.clone())
                        .chain(game.spectators().iter().map(|s| s.id.clone()))
                        .collect::<Vec<_>>(),
                ));
            }
            !expired
        });
        drop(matches);

        if reaped.is_empty() {
            return Vec::new();
        }
        let mut players = lock(&self.players);
        for (id, members) in &reaped {
            for member in members {
                if players.get(member) == Some(id) {
                    players.remove(member);
                }
            }
            info!("Reaped abandoned match {}", id);
        }
        reaped.into_iter().map(|(id, _)| id).collect()
    }

    /// Drop expired cooldown and ledger entries in every match.
    pub fn compact(&self) {
        let now = self.clock.now();
        let handles: Vec<MatchHandle> = lock(&self.matches).values().cloned().collect();
        for handle in handles {
            lock(&handle).compact(now);
        }
    }

    fn handle_for_player(&self, player_id: &str) -> Result<MatchHandle, RegistryError> {
        if player_id.trim().is_empty() {
            return Err(RegistryError::InvalidIdentity);
        }
        let id = lock(&self.players)
            .get(player_id)
            .cloned()
            .ok_or_else(|| RegistryError::PlayerNotInMatch(player_id.to_string()))?;
        lock(&self.matches)
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::Internal(format!("match {} vanished", id)))
    }

    fn with_player_match<T>(
        &self,
        player_id: &str,
        op: impl FnOnce(&mut Match, Instant) -> Result<T, RegistryError>,
    ) -> Result<(T, MatchSnapshot), RegistryError> {
        let handle = self.handle_for_player(player_id)?;
        let now = self.clock.now();
        let mut game = lock(&handle);
        let value = op(&mut game, now)?;
        Ok((value, game.snapshot(now)))
    }
}
