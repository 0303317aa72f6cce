//! Real-time chess server core: cooldown-gated simultaneous play where the
//! game ends when a king is captured.

pub mod clock;
pub mod config;
pub mod error;
pub mod game;
pub mod models;
pub mod routes;
pub mod state;
pub mod sweeper;

pub use config::Config;
pub use state::AppState;
