//! Material-only evaluation.

use crate::board::Board;
use crate::types::{ADVISOR_VALUE, BISHOP_VALUE, Color, PAWN_VALUE, PieceType, Value};

/// Returns a static, purely materialistic evaluation of the position from
/// the point of view of `color`.
///
/// Pawns, advisors and bishops are weighted individually; rooks, knights and
/// cannons enter through the major material aggregate. Dividing the result
/// by [`PAWN_VALUE`] approximates the material advantage in pawns.
pub fn simple_eval(board: &Board, color: Color) -> Value {
    let diff = |pt: PieceType| board.count(color, pt) - board.count(!color, pt);

    PAWN_VALUE * diff(PieceType::Pawn)
        + ADVISOR_VALUE * diff(PieceType::Advisor)
        + BISHOP_VALUE * diff(PieceType::Bishop)
        + (board.major_material(color) - board.major_material(!color))
}
