#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use xiangqi_core::nnue::{Network, Parameters};

/// Deterministic network with small random weights.
pub fn random_network(seed: u64) -> Network {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut params = Parameters::zeroed();

    for b in params.ft_biases.iter_mut() {
        *b = rng.random_range(-32i16..=32);
    }
    for w in params.ft_weights.iter_mut() {
        *w = rng.random_range(-24i16..=24);
    }
    for w in params.psqt_weights.iter_mut() {
        *w = rng.random_range(-4000i32..=4000);
    }
    params.output_bias = rng.random_range(-2000i32..=2000);
    for w in params.output_weights.iter_mut() {
        *w = rng.random_range(-16i16..=16);
    }

    Network::new(format!("random network #{seed}"), &params)
}

pub const POSITIONS: &[&str] = &[
    "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w - - 0 1",
    "r1bakabr1/9/1cn4cn/p1p1p1p1p/9/9/P1P1P1P1P/1C2B1NC1/9/RN1AKAB1R b - - 3 4",
    "2bak4/4a4/4b4/p3p3p/2p6/6P2/P3P3P/4B4/4A4/2BAK4 w - - 40 60",
    "3k5/9/9/9/9/9/4P4/9/9/4K4 w - - 0 1",
    "4ka3/4a4/9/9/2r6/9/9/9/4A4/3AK1R2 b - - 12 70",
];
