//! Neural network evaluation.
//!
//! A single network of shape (1260 -> 32) x 2 perspectives -> 1 with a PSQT
//! side channel. The PSQT sum alone is the cheap path used when material is
//! far outside the search window.

mod feature_transformer;
mod network;
mod output_layer;

pub use feature_transformer::{FEATURE_DIMS, L1, feature_index};
pub use network::{
    FEATURE_TRANSFORMER_HASH, MAX_DESCRIPTION_LEN, NETWORK_HASH, NNUE_VERSION, Network,
    OUTPUT_LAYER_HASH, OUTPUT_SCALE, Parameters,
};
pub use output_layer::INPUT_DIMS;

use crate::board::Board;
use crate::types::Value;

/// Size of a CPU cache line in bytes.
pub(crate) const CACHE_LINE_SIZE: usize = 64;

/// Result of one network evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NnueOutput {
    /// Score from the side to move's point of view.
    pub value: Value,
    /// Non-negative disagreement between the PSQT and positional parts.
    pub complexity: i32,
}

/// The neural evaluator as seen by the blender.
///
/// Implementations must be safe to call from several search threads at once.
pub trait NeuralEvaluator {
    /// Evaluates `board`. With `psqt_only` set only the cheap PSQT part is
    /// computed.
    fn evaluate(&self, board: &Board, psqt_only: bool) -> NnueOutput;

    /// Human readable breakdown of the evaluation.
    fn trace(&self, board: &Board) -> String;
}
