//! One game session: roster, settings, board, and the cooldown and move-rate
//! ledgers, driven through the waiting -> settings -> playing -> finished
//! state machine.
//!
//! Every operation takes the current `Instant` explicitly so the state machine
//! stays deterministic. Expired cooldowns and ledger entries are ignored on
//! read, so `compact` is only needed to reclaim memory.

use chess::{Color, Piece, Square};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::error::{MatchError, MoveRejection};
use crate::game::utils::{color_to_string, piece_name};
use crate::game::{Board, ColoredPiece};
use crate::models::messages::{
    CooldownView, LastMove, MatchSnapshot, MatchSummary, PlayerView, SpectatorView,
};
use crate::models::player::{MatchId, Player, PlayerId, PlayerInfo, Spectator};
use crate::models::settings::Settings;

/// Trailing window over which `max_moves_per_period` is counted.
pub const RATE_WINDOW: Duration = Duration::from_secs(10);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Waiting,
    Settings,
    Playing,
    Finished,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    KingCaptured,
    Disconnection,
}

/// A piece that recently moved and is parked on `square` until `available_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownEntry {
    pub square: Square,
    pub owner: PlayerId,
    pub available_at: Instant,
}

impl CooldownEntry {
    pub fn is_live(&self, now: Instant) -> bool {
        self.available_at > now
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.available_at.saturating_duration_since(now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub player_id: PlayerId,
    pub at: Instant,
}

/// A move that passed validation and was applied to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub player_id: PlayerId,
    pub from: Square,
    pub to: Square,
    pub piece: ColoredPiece,
    pub captured: Option<ColoredPiece>,
    pub promotion: Option<Piece>,
    pub at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    pub as_spectator: bool,
    pub side: Option<Color>,
}

#[derive(Debug, Clone)]
pub struct Match {
    id: MatchId,
    players: Vec<Player>,
    spectators: Vec<Spectator>,
    status: MatchStatus,
    settings: Settings,
    frozen_settings: Option<Settings>,
    board: Board,
    history: Vec<AppliedMove>,
    cooldowns: Vec<CooldownEntry>,
    move_ledger: Vec<MoveRecord>,
    winner: Option<PlayerId>,
    end_reason: Option<EndReason>,
    created_at: Instant,
    last_activity: Instant,
}

impl Match {
    pub fn new(id: impl Into<MatchId>, settings: Settings, now: Instant) -> Self {
        Match {
            id: id.into(),
            players: Vec::with_capacity(2),
            spectators: Vec::new(),
            status: MatchStatus::Waiting,
            settings,
            frozen_settings: None,
            board: Board::starting_position(),
            history: Vec::new(),
            cooldowns: Vec::new(),
            move_ledger: Vec::new(),
            winner: None,
            end_reason: None,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn spectators(&self) -> &[Spectator] {
        &self.spectators
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn history(&self) -> &[AppliedMove] {
        &self.history
    }

    /// Cooldown entries still stored, live or not. Use `live_cooldown` for checks.
    pub fn cooldowns(&self) -> &[CooldownEntry] {
        &self.cooldowns
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn is_spectator(&self, player_id: &str) -> bool {
        self.spectators.iter().any(|s| s.id == player_id)
    }

    pub fn has_participant(&self, player_id: &str) -> bool {
        self.player(player_id).is_some() || self.is_spectator(player_id)
    }

    pub fn has_no_players(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.spectators.is_empty()
    }

    /// Seat the joiner, or attach them as a spectator when both seats are taken.
    ///
    /// A newcomer to a finished match resets it first. Joining twice is a no-op
    /// that reports the existing seat.
    pub fn join(&mut self, info: PlayerInfo, now: Instant) -> JoinOutcome {
        if let Some(existing) = self.player(&info.id) {
            return JoinOutcome {
                as_spectator: false,
                side: Some(existing.side),
            };
        }
        if self.is_spectator(&info.id) {
            return JoinOutcome {
                as_spectator: true,
                side: None,
            };
        }

        if self.status == MatchStatus::Finished {
            info!("Resetting finished match {} for new player {}", self.id, info.id);
            self.reset_game(now);
        }
        self.last_activity = now;

        if self.players.len() >= 2 {
            info!("Player {} joins match {} as spectator", info.id, self.id);
            self.spectators.push(Spectator {
                id: info.id,
                handle: info.handle,
                display_name: info.display_name,
                joined_at: now,
            });
            return JoinOutcome {
                as_spectator: true,
                side: None,
            };
        }

        let side = if self.players.iter().any(|p| p.side == Color::White) {
            Color::Black
        } else {
            Color::White
        };
        info!(
            "Player {} joins match {} as {}",
            info.id,
            self.id,
            color_to_string(side)
        );
        self.players.push(Player {
            id: info.id,
            handle: info.handle,
            display_name: info.display_name,
            side,
            is_ready: false,
        });

        if self.players.len() == 2 && self.status == MatchStatus::Waiting {
            self.status = MatchStatus::Settings;
            info!("Match {} moves to settings", self.id);
        }

        JoinOutcome {
            as_spectator: false,
            side: Some(side),
        }
    }

    /// Remove a player or spectator. Returns whether anyone was removed.
    pub fn leave(&mut self, player_id: &str, now: Instant) -> bool {
        if let Some(pos) = self.players.iter().position(|p| p.id == player_id) {
            self.players.remove(pos);
            self.last_activity = now;
            info!("Player {} left match {}", player_id, self.id);

            match self.players.len() {
                1 if self.status == MatchStatus::Playing => {
                    let winner = self.players[0].id.clone();
                    self.finish(winner, EndReason::Disconnection);
                }
                1 => {
                    if self.status != MatchStatus::Waiting {
                        self.reset_game(now);
                    }
                    for p in &mut self.players {
                        p.side = Color::White;
                        p.is_ready = false;
                    }
                }
                0 if self.status != MatchStatus::Finished => {
                    self.status = MatchStatus::Waiting;
                    self.frozen_settings = None;
                }
                _ => {}
            }
            return true;
        }

        let before = self.spectators.len();
        self.spectators.retain(|s| s.id != player_id);
        let removed = self.spectators.len() != before;
        if removed {
            self.last_activity = now;
            debug!("Spectator {} left match {}", player_id, self.id);
        }
        removed
    }

    /// Swap colors. Only allowed with two seated, unready players during settings.
    pub fn switch_sides(&mut self, now: Instant) -> bool {
        if self.players.len() != 2
            || self.status != MatchStatus::Settings
            || self.players.iter().any(|p| p.is_ready)
        {
            return false;
        }
        for p in &mut self.players {
            p.side = !p.side;
            p.is_ready = false;
        }
        self.last_activity = now;
        debug!("Match {} switched sides", self.id);
        true
    }

    pub fn set_settings(&mut self, settings: Settings, now: Instant) -> Result<(), MatchError> {
        if self.status != MatchStatus::Settings {
            return Err(MatchError::SettingsLocked);
        }
        self.settings = settings.validated()?;
        self.last_activity = now;
        debug!("Match {} settings now {:?}", self.id, self.settings);
        Ok(())
    }

    /// Flag a player ready. Returns `true` when this call started the game.
    pub fn set_ready(&mut self, player_id: &str, now: Instant) -> Result<bool, MatchError> {
        if self.status != MatchStatus::Settings {
            return Err(MatchError::NotInSettings);
        }
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or(MatchError::UnknownPlayer)?;
        player.is_ready = true;
        self.last_activity = now;

        if self.players.len() == 2 && self.players.iter().all(|p| p.is_ready) {
            self.start(now);
            return Ok(true);
        }
        Ok(false)
    }

    /// Validate and apply a move. Checks run in a fixed order and the first
    /// failure wins; a rejected move leaves the match untouched.
    pub fn move_piece(
        &mut self,
        player_id: &str,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
        now: Instant,
    ) -> Result<AppliedMove, MoveRejection> {
        let settings = match (self.status, self.frozen_settings) {
            (MatchStatus::Playing, Some(settings)) => settings,
            _ => return Err(MoveRejection::NotPlaying),
        };
        let side = self
            .player(player_id)
            .map(|p| p.side)
            .ok_or(MoveRejection::UnknownPlayer)?;

        if let Some(cooldown) = self.live_cooldown(from, player_id, now) {
            let remaining = cooldown.remaining(now);
            return Err(MoveRejection::Cooldown {
                square: from.to_string(),
                remaining_secs: remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
            });
        }

        if self.recent_moves(player_id, now) >= settings.max_moves_per_period as usize {
            return Err(MoveRejection::RateLimited {
                max_moves: settings.max_moves_per_period,
                window_secs: RATE_WINDOW.as_secs(),
            });
        }

        let piece = match self.board.piece_on(from) {
            None => return Err(MoveRejection::NoPiece(from.to_string())),
            Some(p) if p.color != side => return Err(MoveRejection::WrongOwner(from.to_string())),
            Some(p) => p,
        };

        if !self.board.moves_for(from).contains(&to) {
            return Err(MoveRejection::IllegalMove {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let (board, captured) = self.board.apply(from, to, promotion);
        let promoted = board
            .piece_on(to)
            .filter(|p| p.piece != piece.piece)
            .map(|p| p.piece);
        self.board = board;

        // whatever cooled on `to` was just captured
        self.cooldowns.retain(|c| c.square != to);
        self.cooldowns.push(CooldownEntry {
            square: to,
            owner: player_id.to_string(),
            available_at: now + Duration::from_secs(u64::from(settings.piece_cooldown_seconds)),
        });
        self.move_ledger.push(MoveRecord {
            player_id: player_id.to_string(),
            at: now,
        });
        self.compact(now);
        self.last_activity = now;

        let applied = AppliedMove {
            player_id: player_id.to_string(),
            from,
            to,
            piece,
            captured,
            promotion: promoted,
            at: now,
        };
        self.history.push(applied.clone());
        debug!("Match {}: {} played {}{}", self.id, player_id, from, to);

        if matches!(captured, Some(c) if c.piece == Piece::King && c.color != side) {
            self.finish(player_id.to_string(), EndReason::KingCaptured);
        }

        Ok(applied)
    }

    /// Reachable squares for each of the player's pieces that is not cooling down.
    /// Outside of play the map is empty.
    pub fn possible_moves(
        &self,
        player_id: &str,
        now: Instant,
    ) -> Result<BTreeMap<Square, Vec<Square>>, MoveRejection> {
        let side = self
            .player(player_id)
            .map(|p| p.side)
            .ok_or(MoveRejection::UnknownPlayer)?;

        let mut moves = BTreeMap::new();
        if self.status != MatchStatus::Playing {
            return Ok(moves);
        }
        for square in self.board.squares_of(side) {
            if self.live_cooldown(square, player_id, now).is_none() {
                moves.insert(square, self.board.moves_for(square));
            }
        }
        Ok(moves)
    }

    /// Fresh board and ledgers; waiting with fewer than two players, else settings.
    pub fn reset_game(&mut self, now: Instant) {
        self.board = Board::starting_position();
        self.history.clear();
        self.cooldowns.clear();
        self.move_ledger.clear();
        self.winner = None;
        self.end_reason = None;
        self.frozen_settings = None;
        for p in &mut self.players {
            p.is_ready = false;
        }
        self.status = if self.players.len() < 2 {
            MatchStatus::Waiting
        } else {
            MatchStatus::Settings
        };
        self.last_activity = now;
        debug!("Match {} reset to {:?}", self.id, self.status);
    }

    /// Drop expired cooldowns and ledger entries older than the rate window.
    pub fn compact(&mut self, now: Instant) {
        self.cooldowns.retain(|c| c.is_live(now));
        self.move_ledger
            .retain(|r| now.saturating_duration_since(r.at) < RATE_WINDOW);
    }

    pub fn live_cooldown(&self, square: Square, owner: &str, now: Instant) -> Option<&CooldownEntry> {
        self.cooldowns
            .iter()
            .find(|c| c.square == square && c.owner == owner && c.is_live(now))
    }

    pub fn snapshot(&self, now: Instant) -> MatchSnapshot {
        MatchSnapshot {
            match_id: self.id.clone(),
            status: self.status,
            players: self
                .players
                .iter()
                .map(|p| PlayerView {
                    id: p.id.clone(),
                    display_name: p.display_name.clone(),
                    color: color_to_string(p.side),
                    is_ready: p.is_ready,
                })
                .collect(),
            spectators: self
                .spectators
                .iter()
                .map(|s| SpectatorView {
                    id: s.id.clone(),
                    display_name: s.display_name.clone(),
                })
                .collect(),
            settings: self.settings,
            board: self.board.to_fen_placement(),
            cooldowns: self
                .cooldowns
                .iter()
                .filter(|c| c.is_live(now))
                .map(|c| CooldownView {
                    square: c.square.to_string(),
                    owner: c.owner.clone(),
                    remaining_ms: c.remaining(now).as_millis() as u64,
                })
                .collect(),
            move_count: self.history.len(),
            last_move: self.history.last().map(|m| LastMove {
                from: m.from.to_string(),
                to: m.to.to_string(),
                piece: piece_name(m.piece.piece).to_string(),
                captured: m.captured.map(|c| piece_name(c.piece).to_string()),
            }),
            winner: self.winner.clone(),
            end_reason: self.end_reason,
        }
    }

    pub fn summary(&self) -> MatchSummary {
        MatchSummary {
            match_id: self.id.clone(),
            status: self.status,
            players: self.players.len(),
            spectators: self.spectators.len(),
        }
    }

    fn recent_moves(&self, player_id: &str, now: Instant) -> usize {
        self.move_ledger
            .iter()
            .filter(|r| r.player_id == player_id && now.saturating_duration_since(r.at) < RATE_WINDOW)
            .count()
    }

    fn start(&mut self, now: Instant) {
        self.board = Board::starting_position();
        self.history.clear();
        self.cooldowns.clear();
        self.move_ledger.clear();
        self.frozen_settings = Some(self.settings);
        self.status = MatchStatus::Playing;
        self.last_activity = now;
        info!("Match {} started with {:?}", self.id, self.settings);
    }

    fn finish(&mut self, winner: PlayerId, reason: EndReason) {
        info!("Match {} finished: {} wins by {:?}", self.id, winner, reason);
        self.status = MatchStatus::Finished;
        self.winner = Some(winner);
        self.end_reason = Some(reason);
    }
}
