pub mod board;
pub mod utils;

pub use board::{Board, ColoredPiece};
