//! Static evaluation for a Xiangqi engine.
//!
//! The final score blends a neural network with a material count
//! ([`evaluate::evaluate`]). The network file is located and parsed by
//! [`eval_file::load_networks`] and must pass [`eval_file::verify`] before
//! the engine evaluates anything.

pub mod board;
pub mod error;
pub mod eval_file;
pub mod evaluate;
pub mod material;
pub mod nnue;
pub mod options;
pub mod types;

pub use board::Board;
pub use eval_file::{EvalFile, load_networks, verify};
pub use evaluate::{evaluate, trace};
pub use material::simple_eval;
