//! Common types and score constants used throughout the engine.

use std::fmt;
use std::ops::Not;

/// Evaluation score in internal units, from the side to move's point of view.
pub type Value = i32;

/// Maximum search depth in plies; also sizes the mate ranges.
pub const MAX_PLY: i32 = 246;

pub const VALUE_ZERO: Value = 0;
pub const VALUE_MATE: Value = 32000;
pub const VALUE_INFINITE: Value = 32001;
pub const VALUE_NONE: Value = 32002;

/// Lowest score that encodes "mate in N" for the side to move.
pub const VALUE_MATE_IN_MAX_PLY: Value = VALUE_MATE - MAX_PLY;

/// Highest score that encodes "mated in N" for the side to move.
pub const VALUE_MATED_IN_MAX_PLY: Value = -VALUE_MATE_IN_MAX_PLY;

pub const ROOK_VALUE: Value = 1213;
pub const ADVISOR_VALUE: Value = 216;
pub const CANNON_VALUE: Value = 746;
pub const PAWN_VALUE: Value = 144;
pub const KNIGHT_VALUE: Value = 964;
pub const BISHOP_VALUE: Value = 191;

/// Converts an internal value to centipawns.
#[inline]
pub const fn to_cp(v: Value) -> i32 {
    100 * v / PAWN_VALUE
}

/// Side of the board. Red moves first and is called `White`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl Not for Color {
    type Output = Color;

    #[inline(always)]
    fn not(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

/// Xiangqi piece kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceType {
    Rook,
    Advisor,
    Cannon,
    Pawn,
    Knight,
    Bishop,
    King,
}

impl PieceType {
    /// Number of distinct piece types.
    pub const COUNT: usize = 7;

    pub const ALL: [PieceType; PieceType::COUNT] = [
        PieceType::Rook,
        PieceType::Advisor,
        PieceType::Cannon,
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::King,
    ];

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Material weight of the piece type. Kings carry no material.
    pub const fn value(self) -> Value {
        match self {
            PieceType::Rook => ROOK_VALUE,
            PieceType::Advisor => ADVISOR_VALUE,
            PieceType::Cannon => CANNON_VALUE,
            PieceType::Pawn => PAWN_VALUE,
            PieceType::Knight => KNIGHT_VALUE,
            PieceType::Bishop => BISHOP_VALUE,
            PieceType::King => 0,
        }
    }

    /// Most pieces of this type one side can have.
    pub const fn max_count(self) -> i32 {
        match self {
            PieceType::Pawn => 5,
            PieceType::King => 1,
            _ => 2,
        }
    }

    /// Returns true for the types summed into the major material aggregate.
    pub const fn is_major(self) -> bool {
        matches!(self, PieceType::Rook | PieceType::Knight | PieceType::Cannon)
    }
}

/// A colored piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub piece_type: PieceType,
}

impl Piece {
    pub const fn new(color: Color, piece_type: PieceType) -> Self {
        Piece { color, piece_type }
    }

    /// Parses a FEN piece letter. Upper case is White.
    ///
    /// Both the `n`/`b` and the `h`/`e` spellings of knight and bishop are
    /// accepted.
    pub fn from_char(c: char) -> Option<Piece> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let piece_type = match c.to_ascii_lowercase() {
            'r' => PieceType::Rook,
            'a' => PieceType::Advisor,
            'c' => PieceType::Cannon,
            'p' => PieceType::Pawn,
            'n' | 'h' => PieceType::Knight,
            'b' | 'e' => PieceType::Bishop,
            'k' => PieceType::King,
            _ => return None,
        };
        Some(Piece::new(color, piece_type))
    }

    pub fn to_char(self) -> char {
        let c = match self.piece_type {
            PieceType::Rook => 'r',
            PieceType::Advisor => 'a',
            PieceType::Cannon => 'c',
            PieceType::Pawn => 'p',
            PieceType::Knight => 'n',
            PieceType::Bishop => 'b',
            PieceType::King => 'k',
        };
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }
}
