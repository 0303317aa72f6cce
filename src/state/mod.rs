pub mod app_state;
pub mod matchmaking;
pub mod registry;

pub use app_state::{AppState, MatchmakingOutcome};
pub use matchmaking::{MatchmakingQueue, QueueConfig, QueueEntry, QueueInfo};
pub use registry::{JoinOptions, JoinResult, LeaveResult, MatchRegistry, MoveResult, RegistryConfig};
