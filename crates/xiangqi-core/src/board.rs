//! Xiangqi piece placement with the counters the evaluator reads.
//!
//! Squares are indexed `rank * 9 + file`. Rank 0 is White's back rank and
//! file 0 is the a-file, so the board is indexed as follows:
//!
//! ```text
//!    a  b  c  d  e  f  g  h  i
//! 9 81 82 83 84 85 86 87 88 89
//! ...
//! 1  9 10 11 12 13 14 15 16 17
//! 0  0  1  2  3  4  5  6  7  8
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::FenError;
use crate::types::{Color, Piece, PieceType, Value};

pub const FILE_NB: usize = 9;
pub const RANK_NB: usize = 10;
pub const SQUARE_NB: usize = FILE_NB * RANK_NB;

/// Plies without capture after which the game is drawn by the 60-move rule.
pub const RULE60_LIMIT: i32 = 120;

/// Standard starting position.
pub const START_FEN: &str = "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w - - 0 1";

#[inline(always)]
pub const fn make_square(rank: usize, file: usize) -> usize {
    rank * FILE_NB + file
}

#[inline(always)]
pub const fn rank_of(sq: usize) -> usize {
    sq / FILE_NB
}

#[inline(always)]
pub const fn file_of(sq: usize) -> usize {
    sq % FILE_NB
}

/// Mirrors a square vertically, swapping the two sides' halves.
#[inline(always)]
pub const fn flip_rank(sq: usize) -> usize {
    make_square(RANK_NB - 1 - rank_of(sq), file_of(sq))
}

/// A position as seen by the evaluator.
///
/// Piece counts and the major material aggregate are maintained on every
/// placement so that material lookups are constant time.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    squares: [Option<Piece>; SQUARE_NB],
    side_to_move: Color,
    rule60: i32,
    game_ply: i32,
    piece_count: [[i32; PieceType::COUNT]; 2],
    major_material: [Value; 2],
}

impl Default for Board {
    fn default() -> Self {
        Board::from_fen(START_FEN).expect("start position FEN is valid")
    }
}

impl Board {
    /// Creates the standard starting position.
    pub fn new() -> Board {
        Default::default()
    }

    /// Creates an empty board with the given side to move.
    pub fn empty(side_to_move: Color) -> Board {
        Board {
            squares: [None; SQUARE_NB],
            side_to_move,
            rule60: 0,
            game_ply: 0,
            piece_count: [[0; PieceType::COUNT]; 2],
            major_material: [0; 2],
        }
    }

    /// Parses a FEN string.
    ///
    /// The placement and side to move fields are required. The rule-60
    /// counter is read from the fifth field and the move number from the
    /// sixth; both default when absent.
    ///
    /// # Errors
    ///
    /// Returns a [`FenError`] when the placement is malformed or either side
    /// does not have exactly one king.
    pub fn from_fen(fen: &str) -> Result<Board, FenError> {
        let mut fields = fen.split_whitespace();
        let placement = fields.next().ok_or(FenError::Empty)?;
        let side = fields.next().ok_or(FenError::MissingSideToMove)?;

        let side_to_move = match side {
            "w" | "r" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(FenError::InvalidSideToMove {
                    found: other.to_string(),
                });
            }
        };

        let mut board = Board::empty(side_to_move);
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != RANK_NB {
            return Err(FenError::WrongRankCount { found: ranks.len() });
        }

        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = RANK_NB - 1 - i;
            let mut file = 0;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else {
                    let piece = Piece::from_char(c).ok_or(FenError::InvalidPiece { char: c })?;
                    if file >= FILE_NB {
                        return Err(FenError::RankWidth { rank, files: file + 1 });
                    }
                    board.put(make_square(rank, file), piece);
                    file += 1;
                }
            }
            if file != FILE_NB {
                return Err(FenError::RankWidth { rank, files: file });
            }
        }

        for color in Color::ALL {
            let kings = board.count(color, PieceType::King);
            if kings != 1 {
                return Err(FenError::KingCount { color, found: kings });
            }
            for piece_type in PieceType::ALL {
                let found = board.count(color, piece_type);
                if found > piece_type.max_count() {
                    return Err(FenError::TooManyPieces {
                        color,
                        piece_type,
                        found,
                    });
                }
            }
        }

        // Castling and en passant fields do not exist in xiangqi but are
        // kept for compatibility with the chess layout.
        let _ = fields.next();
        let _ = fields.next();

        if let Some(rule60) = fields.next() {
            board.rule60 = rule60
                .parse()
                .ok()
                .filter(|count| (0..=RULE60_LIMIT).contains(count))
                .ok_or_else(|| FenError::InvalidCounter {
                    found: rule60.to_string(),
                })?;
        }
        if let Some(fullmove) = fields.next() {
            let fullmove: i32 = fullmove.parse().map_err(|_| FenError::InvalidCounter {
                found: fullmove.to_string(),
            })?;
            board.game_ply =
                (2 * (fullmove - 1)).max(0) + i32::from(side_to_move == Color::Black);
        }

        Ok(board)
    }

    /// Renders the position back to FEN.
    pub fn fen(&self) -> String {
        let mut out = String::with_capacity(96);
        for rank in (0..RANK_NB).rev() {
            let mut empty = 0;
            for file in 0..FILE_NB {
                match self.squares[make_square(rank, file)] {
                    Some(piece) => {
                        if empty > 0 {
                            out.push_str(&empty.to_string());
                            empty = 0;
                        }
                        out.push(piece.to_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push_str(&empty.to_string());
            }
            if rank > 0 {
                out.push('/');
            }
        }

        let side = match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        };
        let fullmove = 1 + (self.game_ply - i32::from(self.side_to_move == Color::Black)) / 2;
        out.push_str(&format!(" {side} - - {} {fullmove}", self.rule60));
        out
    }

    /// Places a piece, replacing whatever stood on the square.
    pub fn put(&mut self, sq: usize, piece: Piece) {
        self.remove(sq);
        self.squares[sq] = Some(piece);
        self.piece_count[piece.color.index()][piece.piece_type.index()] += 1;
        if piece.piece_type.is_major() {
            self.major_material[piece.color.index()] += piece.piece_type.value();
        }
    }

    /// Clears a square and returns the piece that stood on it.
    pub fn remove(&mut self, sq: usize) -> Option<Piece> {
        let piece = self.squares[sq].take()?;
        self.piece_count[piece.color.index()][piece.piece_type.index()] -= 1;
        if piece.piece_type.is_major() {
            self.major_material[piece.color.index()] -= piece.piece_type.value();
        }
        Some(piece)
    }

    /// Sets the rule-60 counter, saturating into `0..=RULE60_LIMIT`.
    pub fn set_rule60_count(&mut self, count: i32) {
        self.rule60 = count.clamp(0, RULE60_LIMIT);
    }

    #[inline]
    pub fn piece_on(&self, sq: usize) -> Option<Piece> {
        self.squares[sq]
    }

    /// Iterates over occupied squares.
    pub fn pieces(&self) -> impl Iterator<Item = (usize, Piece)> + '_ {
        self.squares
            .iter()
            .enumerate()
            .filter_map(|(sq, p)| p.map(|p| (sq, p)))
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Plies since the last capture or other irreversible event.
    #[inline]
    pub fn rule60_count(&self) -> i32 {
        self.rule60
    }

    #[inline]
    pub fn game_ply(&self) -> i32 {
        self.game_ply
    }

    #[inline]
    pub fn count(&self, color: Color, piece_type: PieceType) -> i32 {
        self.piece_count[color.index()][piece_type.index()]
    }

    /// Weighted rooks, knights and cannons of one side.
    #[inline]
    pub fn major_material(&self, color: Color) -> Value {
        self.major_material[color.index()]
    }

    /// Weighted rooks, knights and cannons of both sides.
    #[inline]
    pub fn major_material_total(&self) -> Value {
        self.major_material[0] + self.major_material[1]
    }

    pub fn king_square(&self, color: Color) -> Option<usize> {
        self.pieces()
            .find(|(_, p)| p.color == color && p.piece_type == PieceType::King)
            .map(|(sq, _)| sq)
    }

    /// Returns true if the side to move's king is attacked.
    pub fn in_check(&self) -> bool {
        self.is_attacked_king(self.side_to_move)
    }

    /// Returns true if `color`'s king is attacked by the opponent.
    ///
    /// Covers rook and king lines (flying general), cannon screens, knight
    /// legs and pawn steps.
    pub fn is_attacked_king(&self, color: Color) -> bool {
        let Some(ksq) = self.king_square(color) else {
            return false;
        };
        let them = !color;
        let kr = rank_of(ksq) as i32;
        let kf = file_of(ksq) as i32;

        for (dr, df) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let mut screens = 0;
            let (mut r, mut f) = (kr + dr, kf + df);
            while let Some(sq) = square_at(r, f) {
                if let Some(p) = self.squares[sq] {
                    let hit = p.color == them
                        && match screens {
                            0 => {
                                p.piece_type == PieceType::Rook
                                    || (p.piece_type == PieceType::King && df == 0)
                            }
                            _ => p.piece_type == PieceType::Cannon,
                        };
                    if hit {
                        return true;
                    }
                    screens += 1;
                    if screens > 1 {
                        break;
                    }
                }
                r += dr;
                f += df;
            }
        }

        for (dr, df) in [
            (2, 1),
            (2, -1),
            (-2, 1),
            (-2, -1),
            (1, 2),
            (1, -2),
            (-1, 2),
            (-1, -2),
        ] {
            let (nr, nf) = (kr + dr, kf + df);
            let Some(nsq) = square_at(nr, nf) else {
                continue;
            };
            if self.squares[nsq] != Some(Piece::new(them, PieceType::Knight)) {
                continue;
            }
            // The leg is next to the knight along its two-square direction.
            let leg = if dr.abs() == 2 {
                square_at(nr - dr.signum(), nf)
            } else {
                square_at(nr, nf - df.signum())
            };
            if leg.is_some_and(|leg| self.squares[leg].is_none()) {
                return true;
            }
        }

        let enemy_pawn = Some(Piece::new(them, PieceType::Pawn));
        let forward = match them {
            Color::White => 1,
            Color::Black => -1,
        };
        if square_at(kr - forward, kf).is_some_and(|sq| self.squares[sq] == enemy_pawn) {
            return true;
        }
        for df in [1, -1] {
            if let Some(sq) = square_at(kr, kf + df) {
                let crossed = match them {
                    Color::White => rank_of(sq) >= 5,
                    Color::Black => rank_of(sq) <= 4,
                };
                if crossed && self.squares[sq] == enemy_pawn {
                    return true;
                }
            }
        }

        false
    }
}

fn square_at(rank: i32, file: i32) -> Option<usize> {
    if (0..RANK_NB as i32).contains(&rank) && (0..FILE_NB as i32).contains(&file) {
        Some(make_square(rank as usize, file as usize))
    } else {
        None
    }
}

impl FromStr for Board {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Board::from_fen(s)
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({})", self.fen())
    }
}
