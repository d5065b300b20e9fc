//! Final position evaluation: blends the network score with material,
//! optimism and the rule-60 counter.

use crate::board::Board;
use crate::material::simple_eval;
use crate::nnue::NeuralEvaluator;
use crate::types::{
    Color, VALUE_MATE_IN_MAX_PLY, VALUE_MATED_IN_MAX_PLY, VALUE_NONE, VALUE_ZERO, Value, to_cp,
};

/// Material distance from the search window beyond which only the cheap PSQT
/// part of the network is computed.
pub const FAST_PATH_MARGIN: Value = 2500;

const OPTIMISM_COMPLEXITY_DIVISOR: i64 = 781;
const NNUE_COMPLEXITY_DIVISOR: i64 = 30087;
const MAJOR_MATERIAL_DIVISOR: i64 = 41;
const NNUE_BLEND_BASE: i64 = 568;
const OPTIMISM_BLEND_BASE: i64 = 138;
const BLEND_DIVISOR: i64 = 1434;
const SHUFFLE_CEILING: i64 = 293;
const SHUFFLE_DIVISOR: i64 = 194;

/// Everything the blend needs besides the network itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendInput {
    pub nnue: Value,
    pub complexity: i32,
    pub simple_eval: Value,
    pub optimism: i32,
    /// Major material of both sides.
    pub major_material: Value,
    pub shuffling: i32,
}

/// Combines the raw network output with optimism and damps it by the
/// rule-60 counter. The result never enters the mate ranges.
///
/// Division truncates toward zero. Products are formed in 64 bits so
/// arbitrary inputs cannot overflow.
pub fn blend(input: BlendInput) -> Value {
    let nnue = i64::from(input.nnue);
    let optimism = i64::from(input.optimism);
    let shuffling = i64::from(input.shuffling);

    // Blend optimism and eval with nnue complexity and material imbalance
    let signal = i64::from(input.complexity) + (i64::from(input.simple_eval) - nnue).abs();
    let optimism = optimism + optimism * signal / OPTIMISM_COMPLEXITY_DIVISOR;
    let nnue = nnue - nnue * signal / NNUE_COMPLEXITY_DIVISOR;

    let mm = i64::from(input.major_material) / MAJOR_MATERIAL_DIVISOR;
    let mut v =
        (nnue * (NNUE_BLEND_BASE + mm) + optimism * (OPTIMISM_BLEND_BASE + mm)) / BLEND_DIVISOR;

    // Damp down the evaluation linearly when shuffling
    v = v * (SHUFFLE_CEILING - shuffling) / SHUFFLE_DIVISOR;

    v.clamp(
        i64::from(VALUE_MATED_IN_MAX_PLY + 1),
        i64::from(VALUE_MATE_IN_MAX_PLY - 1),
    ) as Value
}

/// Returns true when the network only needs its PSQT part.
///
/// Any window is accepted, including `i32::MIN..=i32::MAX`.
#[inline]
pub fn wants_fast_path(simple_eval: Value, alpha: Value, beta: Value) -> bool {
    let simple = i64::from(simple_eval);
    let margin = i64::from(FAST_PATH_MARGIN);
    i64::from(alpha) - margin > simple || simple > i64::from(beta) + margin
}

/// Static evaluation of `board` from the side to move's point of view.
///
/// The side to move must not be in check; callers guard this.
pub fn evaluate<N>(nn: &N, board: &Board, optimism: i32, alpha: Value, beta: Value) -> Value
where
    N: NeuralEvaluator + ?Sized,
{
    debug_assert!(!board.in_check(), "evaluate called in check: {board:?}");

    let stm = board.side_to_move();
    let simple = simple_eval(board, stm);
    let fast_path = wants_fast_path(simple, alpha, beta);

    let out = nn.evaluate(board, fast_path);

    blend(BlendInput {
        nnue: out.value,
        complexity: out.complexity,
        simple_eval: simple,
        optimism,
        major_material: board.major_material_total(),
        shuffling: board.rule60_count(),
    })
}

/// Like [`evaluate`] but returns a report of the network terms and the final
/// score. Scores in the report are from White's point of view.
pub fn trace<N>(nn: &N, board: &Board) -> String
where
    N: NeuralEvaluator + ?Sized,
{
    if board.in_check() {
        return "Final evaluation: none (in check)".to_string();
    }

    let white_side = |v: Value| {
        let v = if board.side_to_move() == Color::White { v } else { -v };
        0.01 * f64::from(to_cp(v))
    };

    let mut out = String::new();
    out.push('\n');
    out.push_str(&nn.trace(board));
    out.push('\n');

    let v = nn.evaluate(board, false).value;
    out.push_str(&format!("NNUE evaluation        {:+.2} (white side)\n", white_side(v)));

    let v = evaluate(nn, board, VALUE_ZERO, -VALUE_NONE, VALUE_NONE);
    out.push_str(&format!("Final evaluation       {:+.2} (white side)", white_side(v)));
    out.push_str(" [with scaled NNUE, ...]\n");
    out
}
