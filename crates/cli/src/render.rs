//! Board rendering for the `d` command.

use colored::{ColoredString, Colorize};
use xiangqi_core::Board;
use xiangqi_core::board::{FILE_NB, RANK_NB, make_square};
use xiangqi_core::types::{Color, Piece};

const SEPARATOR: &str = " +---+---+---+---+---+---+---+---+---+";

fn piece_symbol(piece: Option<Piece>) -> ColoredString {
    match piece {
        None => " ".normal(),
        Some(p) => {
            let c = p.to_char().to_string();
            match p.color {
                Color::White => c.red().bold(),
                Color::Black => c.bold(),
            }
        }
    }
}

/// Draws `board` with White at the bottom, followed by its FEN.
pub fn board_to_string(board: &Board) -> String {
    let mut out = String::new();
    out.push_str(SEPARATOR);
    out.push('\n');
    for rank in (0..RANK_NB).rev() {
        for file in 0..FILE_NB {
            let symbol = piece_symbol(board.piece_on(make_square(rank, file)));
            out.push_str(&format!(" | {symbol}"));
        }
        out.push_str(&format!(" | {rank}\n"));
        out.push_str(SEPARATOR);
        out.push('\n');
    }
    out.push_str("   a   b   c   d   e   f   g   h   i\n\n");
    out.push_str(&format!("Fen: {}\n", board.fen()));
    out.push_str(&format!(
        "Side to move: {}{}",
        board.side_to_move(),
        if board.in_check() { " (in check)" } else { "" }
    ));
    out
}
