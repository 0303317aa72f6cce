use chess::{Color, Piece, Square};
use std::str::FromStr;

use crate::error::RegistryError;

/// Convert a chess color to a string
pub fn color_to_string(color: Color) -> String {
    match color {
        Color::White => "white".to_string(),
        Color::Black => "black".to_string(),
    }
}

/// Lowercase name of a piece type, as shown to clients
pub fn piece_name(piece: Piece) -> &'static str {
    match piece {
        Piece::Pawn => "pawn",
        Piece::Knight => "knight",
        Piece::Bishop => "bishop",
        Piece::Rook => "rook",
        Piece::Queen => "queen",
        Piece::King => "king",
    }
}

/// FEN letter for a piece: uppercase for white, lowercase for black
pub fn piece_char(piece: Piece, color: Color) -> char {
    let c = match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    };
    match color {
        Color::White => c.to_ascii_uppercase(),
        Color::Black => c,
    }
}

/// Parse a square in algebraic notation ("e2"), case-insensitive
pub fn parse_square(text: &str) -> Result<Square, RegistryError> {
    let trimmed = text.trim();
    if trimmed.len() != 2 {
        return Err(RegistryError::InvalidSquare(text.to_string()));
    }
    Square::from_str(&trimmed.to_lowercase())
        .map_err(|_| RegistryError::InvalidSquare(text.to_string()))
}

/// Parse a promotion hint ("q", "queen", "n", ...). Unknown hints yield `None`.
pub fn parse_promotion(text: &str) -> Option<Piece> {
    match text.trim().to_lowercase().as_str() {
        "q" | "queen" => Some(Piece::Queen),
        "r" | "rook" => Some(Piece::Rook),
        "b" | "bishop" => Some(Piece::Bishop),
        "n" | "knight" => Some(Piece::Knight),
        _ => None,
    }
}
