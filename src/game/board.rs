//! The 8x8 board and per-piece movement rules.
//!
//! Movement is deliberately simpler than standard chess: there is no check
//! awareness, no castling and no en passant. Kings can be captured like any
//! other piece, and capturing one ends the game.

use chess::{Color, File, Piece, Rank, Square, ALL_SQUARES};

use crate::game::utils::piece_char;

const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];
const KING_STEPS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];
const ROOK_DIRECTIONS: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

const BACK_RANK: [Piece; 8] = [
    Piece::Rook,
    Piece::Knight,
    Piece::Bishop,
    Piece::Queen,
    Piece::King,
    Piece::Bishop,
    Piece::Knight,
    Piece::Rook,
];

/// A piece together with the side that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColoredPiece {
    pub piece: Piece,
    pub color: Color,
}

impl ColoredPiece {
    pub fn new(piece: Piece, color: Color) -> Self {
        ColoredPiece { piece, color }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Option<ColoredPiece>; 64],
}

impl Default for Board {
    fn default() -> Self {
        Board::starting_position()
    }
}

/// Square at the given file/rank offsets, or `None` when off the board.
pub fn square_at(file: i8, rank: i8) -> Option<Square> {
    if (0..8).contains(&file) && (0..8).contains(&rank) {
        Some(Square::make_square(
            Rank::from_index(rank as usize),
            File::from_index(file as usize),
        ))
    } else {
        None
    }
}

fn coords(square: Square) -> (i8, i8) {
    (
        square.get_file().to_index() as i8,
        square.get_rank().to_index() as i8,
    )
}

fn last_rank(color: Color) -> i8 {
    match color {
        Color::White => 7,
        Color::Black => 0,
    }
}

impl Board {
    pub fn empty() -> Self {
        Board { cells: [None; 64] }
    }

    /// The standard chess starting layout.
    pub fn starting_position() -> Self {
        let mut board = Board::empty();
        for (file, piece) in BACK_RANK.iter().enumerate() {
            let file = file as i8;
            for (color, back, pawns) in [(Color::White, 0, 1), (Color::Black, 7, 6)] {
                if let Some(sq) = square_at(file, back) {
                    board.put(sq, Some(ColoredPiece::new(*piece, color)));
                }
                if let Some(sq) = square_at(file, pawns) {
                    board.put(sq, Some(ColoredPiece::new(Piece::Pawn, color)));
                }
            }
        }
        board
    }

    pub fn piece_on(&self, square: Square) -> Option<ColoredPiece> {
        self.cells[square.to_index()]
    }

    /// Place or clear a piece. Used for setting up positions.
    pub fn put(&mut self, square: Square, piece: Option<ColoredPiece>) {
        self.cells[square.to_index()] = piece;
    }

    /// Squares holding a piece of `color`, in a1..h8 order.
    pub fn squares_of(&self, color: Color) -> impl Iterator<Item = Square> + '_ {
        ALL_SQUARES
            .iter()
            .copied()
            .filter(move |sq| matches!(self.piece_on(*sq), Some(p) if p.color == color))
    }

    /// Every square the piece on `from` can reach. Empty when `from` is empty.
    pub fn moves_for(&self, from: Square) -> Vec<Square> {
        let Some(mover) = self.piece_on(from) else {
            return Vec::new();
        };
        let mut moves = Vec::new();
        match mover.piece {
            Piece::Pawn => self.pawn_moves(from, mover.color, &mut moves),
            Piece::Knight => self.step_moves(from, mover.color, &KNIGHT_JUMPS, &mut moves),
            Piece::King => self.step_moves(from, mover.color, &KING_STEPS, &mut moves),
            Piece::Bishop => self.slide_moves(from, mover.color, &BISHOP_DIRECTIONS, &mut moves),
            Piece::Rook => self.slide_moves(from, mover.color, &ROOK_DIRECTIONS, &mut moves),
            Piece::Queen => {
                self.slide_moves(from, mover.color, &ROOK_DIRECTIONS, &mut moves);
                self.slide_moves(from, mover.color, &BISHOP_DIRECTIONS, &mut moves);
            }
        }
        moves
    }

    /// Move whatever stands on `from` to `to`, returning the new board and the
    /// captured piece. No legality checks are made here.
    ///
    /// A pawn landing on its last rank is promoted to `promotion` when that is
    /// a knight, bishop, rook or queen, otherwise to a queen.
    pub fn apply(
        &self,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
    ) -> (Board, Option<ColoredPiece>) {
        let mut next = self.clone();
        let captured = next.piece_on(to);
        let moved = next.piece_on(from).map(|p| {
            if p.piece == Piece::Pawn && coords(to).1 == last_rank(p.color) {
                let promoted = match promotion {
                    Some(piece @ (Piece::Knight | Piece::Bishop | Piece::Rook | Piece::Queen)) => {
                        piece
                    }
                    _ => Piece::Queen,
                };
                ColoredPiece::new(promoted, p.color)
            } else {
                p
            }
        });
        next.put(from, None);
        next.put(to, moved);
        (next, captured)
    }

    /// Piece placement field of a FEN string, rank 8 first.
    pub fn to_fen_placement(&self) -> String {
        let mut fen = String::with_capacity(72);
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match square_at(file, rank).and_then(|sq| self.piece_on(sq)) {
                    Some(p) => {
                        if empty > 0 {
                            fen.push_str(&empty.to_string());
                            empty = 0;
                        }
                        fen.push(piece_char(p.piece, p.color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push_str(&empty.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }
        fen
    }

    fn pawn_moves(&self, from: Square, color: Color, moves: &mut Vec<Square>) {
        let (file, rank) = coords(from);
        let (dir, start_rank) = match color {
            Color::White => (1, 1),
            Color::Black => (-1, 6),
        };

        if let Some(one) = square_at(file, rank + dir) {
            if self.piece_on(one).is_none() {
                moves.push(one);
                if rank == start_rank {
                    if let Some(two) = square_at(file, rank + 2 * dir) {
                        if self.piece_on(two).is_none() {
                            moves.push(two);
                        }
                    }
                }
            }
        }

        for df in [-1, 1] {
            if let Some(diag) = square_at(file + df, rank + dir) {
                if matches!(self.piece_on(diag), Some(p) if p.color != color) {
                    moves.push(diag);
                }
            }
        }
    }

    fn step_moves(&self, from: Square, color: Color, steps: &[(i8, i8)], moves: &mut Vec<Square>) {
        let (file, rank) = coords(from);
        for (df, dr) in steps {
            if let Some(to) = square_at(file + df, rank + dr) {
                match self.piece_on(to) {
                    Some(p) if p.color == color => {}
                    _ => moves.push(to),
                }
            }
        }
    }

    fn slide_moves(
        &self,
        from: Square,
        color: Color,
        directions: &[(i8, i8)],
        moves: &mut Vec<Square>,
    ) {
        let (file, rank) = coords(from);
        for (df, dr) in directions {
            let (mut f, mut r) = (file + df, rank + dr);
            while let Some(to) = square_at(f, r) {
                match self.piece_on(to) {
                    None => moves.push(to),
                    Some(p) => {
                        if p.color != color {
                            moves.push(to);
                        }
                        break;
                    }
                }
                f += df;
                r += dr;
            }
        }
    }
}
