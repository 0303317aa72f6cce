//! Rank-aware waiting pool for players looking for an opponent.
//!
//! The queue only decides pairings. Allocating the match and seating both
//! players is left to the caller (see `AppState::request_match`).

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::models::PlayerId;

pub const DEFAULT_QUEUE_TTL: Duration = Duration::from_secs(600);
pub const DEFAULT_QUEUE_STALE_AFTER: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Entries older than this are never paired
    pub ttl: Duration,
    /// Entries older than this are dropped by `cleanup`; never longer than `ttl`
    pub stale_after: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            ttl: DEFAULT_QUEUE_TTL,
            stale_after: DEFAULT_QUEUE_STALE_AFTER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub player_id: PlayerId,
    pub handle: String,
    pub display_name: String,
    pub rank: Option<i32>,
    pub enqueued_at: Instant,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueInfo {
    pub total: usize,
    pub ranked: usize,
    pub unranked: usize,
}

pub struct MatchmakingQueue {
    entries: Mutex<Vec<QueueEntry>>,
    clock: Arc<dyn Clock>,
    config: QueueConfig,
}

impl MatchmakingQueue {
    pub fn new(clock: Arc<dyn Clock>, config: QueueConfig) -> Self {
        MatchmakingQueue {
            entries: Mutex::new(Vec::new()),
            clock,
            config,
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<QueueEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add the player with a fresh timestamp, replacing any earlier entry.
    pub fn enqueue(
        &self,
        player_id: &str,
        handle: &str,
        display_name: &str,
        rank: Option<i32>,
    ) {
        let now = self.clock.now();
        let mut entries = self.entries();
        entries.retain(|e| e.player_id != player_id);
        entries.push(QueueEntry {
            player_id: player_id.to_string(),
            handle: handle.to_string(),
            display_name: display_name.to_string(),
            rank,
            enqueued_at: now,
        });
        info!(
            "Player {} queued for matchmaking (rank {:?}, {} waiting)",
            player_id,
            rank,
            entries.len()
        );
    }

    /// Returns whether an entry was removed.
    pub fn dequeue(&self, player_id: &str) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|e| e.player_id != player_id);
        let removed = entries.len() != before;
        if removed {
            debug!("Player {} left the matchmaking queue", player_id);
        }
        removed
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.entries().iter().any(|e| e.player_id == player_id)
    }

    /// 1-based position in enqueue order.
    pub fn position(&self, player_id: &str) -> Option<usize> {
        self.entries()
            .iter()
            .position(|e| e.player_id == player_id)
            .map(|i| i + 1)
    }

    /// Pick and remove an opponent for the requester.
    ///
    /// The requester's own entry is removed first, so a player can never be
    /// paired with themselves. Ranked requesters get the closest rank (ties go
    /// to whoever waited longest) and fall back to the longest-waiting unranked
    /// entry. Unranked requesters prefer unranked entries, then anyone.
    pub fn find_match(&self, player_id: &str, rank: Option<i32>) -> Option<QueueEntry> {
        let now = self.clock.now();
        let ttl = self.config.ttl;
        let mut entries = self.entries();

        entries.retain(|e| e.player_id != player_id);
        entries.retain(|e| now.saturating_duration_since(e.enqueued_at) < ttl);
        if entries.is_empty() {
            debug!("No opponents waiting for {}", player_id);
            return None;
        }

        let earliest = |ranked: Option<bool>| {
            entries
                .iter()
                .enumerate()
                .filter(|(_, e)| ranked.map_or(true, |r| e.rank.is_some() == r))
                .min_by_key(|(_, e)| e.enqueued_at)
                .map(|(i, _)| i)
        };

        let picked = match rank {
            Some(rank) => entries
                .iter()
                .enumerate()
                .filter_map(|(i, e)| e.rank.map(|r| (i, (i64::from(r) - i64::from(rank)).abs(), e.enqueued_at)))
                .min_by_key(|(_, diff, at)| (*diff, *at))
                .map(|(i, _, _)| i)
                .or_else(|| earliest(Some(false))),
            None => earliest(Some(false)).or_else(|| earliest(None)),
        }?;

        let opponent = entries.remove(picked);
        info!(
            "Paired {} (rank {:?}) with {} (rank {:?})",
            player_id, rank, opponent.player_id, opponent.rank
        );
        Some(opponent)
    }

    pub fn size(&self) -> usize {
        self.entries().len()
    }

    pub fn info(&self) -> QueueInfo {
        let entries = self.entries();
        let ranked = entries.iter().filter(|e| e.rank.is_some()).count();
        QueueInfo {
            total: entries.len(),
            ranked,
            unranked: entries.len() - ranked,
        }
    }

    /// Drop entries that have waited past the staleness window. Returns how many.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let stale_after = self.config.stale_after.min(self.config.ttl);
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|e| now.saturating_duration_since(e.enqueued_at) < stale_after);
        let removed = before - entries.len();
        if removed > 0 {
            info!("Dropped {} stale matchmaking entries", removed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn queue() -> (Arc<ManualClock>, MatchmakingQueue) {
        let clock = Arc::new(ManualClock::new());
        let queue = MatchmakingQueue::new(clock.clone(), QueueConfig::default());
        (clock, queue)
    }

    fn add(queue: &MatchmakingQueue, clock: &ManualClock, id: &str, rank: Option<i32>) {
        queue.enqueue(id, id, id, rank);
        clock.advance(Duration::from_millis(10));
    }

    #[test]
    fn enqueue_replaces_an_existing_entry() {
        let (clock, queue) = queue();
        add(&queue, &clock, "alice", Some(1000));
        add(&queue, &clock, "bob", None);
        add(&queue, &clock, "alice", Some(1100));
        assert_eq!(queue.size(), 2);
        assert_eq!(queue.position("alice"), Some(2));
    }

    #[test]
    fn dequeue_is_idempotent() {
        let (clock, queue) = queue();
        add(&queue, &clock, "alice", None);
        assert!(queue.dequeue("alice"));
        assert!(!queue.dequeue("alice"));
        assert!(!queue.contains("alice"));
    }

    #[test]
    fn closest_rank_wins() {
        let (clock, queue) = queue();
        add(&queue, &clock, "low", Some(1000));
        add(&queue, &clock, "mid", Some(1200));
        add(&queue, &clock, "high", Some(1800));
        let opponent = queue.find_match("me", Some(1250)).unwrap();
        assert_eq!(opponent.player_id, "mid");
        assert_eq!(queue.size(), 2);
    }

    #[test]
    fn rank_ties_go_to_the_longest_waiting() {
        let (clock, queue) = queue();
        add(&queue, &clock, "first", Some(1300));
        add(&queue, &clock, "second", Some(1100));
        let opponent = queue.find_match("me", Some(1200)).unwrap();
        assert_eq!(opponent.player_id, "first");
    }

    #[test]
    fn ranked_requester_falls_back_to_unranked() {
        let (clock, queue) = queue();
        add(&queue, &clock, "casual-1", None);
        add(&queue, &clock, "casual-2", None);
        let opponent = queue.find_match("me", Some(1500)).unwrap();
        assert_eq!(opponent.player_id, "casual-1");
    }

    #[test]
    fn unranked_requester_prefers_unranked_then_anyone() {
        let (clock, queue) = queue();
        add(&queue, &clock, "ranked", Some(1400));
        add(&queue, &clock, "casual", None);
        assert_eq!(queue.find_match("me", None).unwrap().player_id, "casual");
        assert_eq!(queue.find_match("me", None).unwrap().player_id, "ranked");
        assert!(queue.find_match("me", None).is_none());
    }

    #[test]
    fn requester_is_never_paired_with_themselves() {
        let (clock, queue) = queue();
        add(&queue, &clock, "me", Some(1200));
        assert!(queue.find_match("me", Some(1200)).is_none());
        assert!(!queue.contains("me"));
    }

    #[test]
    fn expired_entries_are_not_paired() {
        let (clock, queue) = queue();
        add(&queue, &clock, "old", None);
        clock.advance(DEFAULT_QUEUE_TTL);
        assert!(queue.find_match("me", None).is_none());
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn cleanup_uses_the_staleness_window() {
        let (clock, queue) = queue();
        add(&queue, &clock, "old", None);
        clock.advance(DEFAULT_QUEUE_STALE_AFTER);
        add(&queue, &clock, "fresh", Some(900));
        assert_eq!(queue.cleanup(), 1);
        assert_eq!(
            queue.info(),
            QueueInfo {
                total: 1,
                ranked: 1,
                unranked: 0
            }
        );
    }
}
