//! Feature transformer: sparse piece-square input to the hidden accumulator.

use std::io::{self, Read, Write};

use aligned_vec::{AVec, ConstAlign, avec};
use arrayvec::ArrayVec;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::board::{Board, SQUARE_NB, flip_rank};
use crate::nnue::CACHE_LINE_SIZE;
use crate::types::{Color, PieceType};

/// Input features per perspective: relative color × piece type × square.
pub const FEATURE_DIMS: usize = 2 * PieceType::COUNT * SQUARE_NB;

/// Hidden units per perspective.
pub const L1: usize = 32;

/// Upper bound on pieces on the board.
const MAX_ACTIVE_FEATURES: usize = 32;

pub type ActiveFeatures = ArrayVec<usize, MAX_ACTIVE_FEATURES>;

/// Feature index of a piece as seen from `perspective`.
///
/// Black's perspective mirrors the ranks so that both sides see their own
/// pieces at the bottom of the board.
#[inline]
pub fn feature_index(perspective: Color, piece_color: Color, piece_type: PieceType, sq: usize) -> usize {
    let oriented = match perspective {
        Color::White => sq,
        Color::Black => flip_rank(sq),
    };
    let relative = usize::from(piece_color != perspective);
    (relative * PieceType::COUNT + piece_type.index()) * SQUARE_NB + oriented
}

/// Collects the active features of `board` from `perspective`.
pub fn active_features(board: &Board, perspective: Color) -> ActiveFeatures {
    let mut features = ActiveFeatures::new();
    for (sq, piece) in board.pieces() {
        let pushed = features.try_push(feature_index(perspective, piece.color, piece.piece_type, sq));
        debug_assert!(
            pushed.is_ok(),
            "more than {MAX_ACTIVE_FEATURES} pieces on the board: {board:?}"
        );
    }
    features
}

/// Hidden accumulator of one perspective.
pub type Accumulator = [i32; L1];

pub struct FeatureTransformer {
    biases: AVec<i16, ConstAlign<CACHE_LINE_SIZE>>,
    weights: AVec<i16, ConstAlign<CACHE_LINE_SIZE>>,
    psqt_weights: AVec<i32, ConstAlign<CACHE_LINE_SIZE>>,
}

impl FeatureTransformer {
    pub fn from_slices(biases: &[i16], weights: &[i16], psqt_weights: &[i32]) -> Self {
        assert_eq!(biases.len(), L1, "feature transformer bias count");
        assert_eq!(weights.len(), FEATURE_DIMS * L1, "feature transformer weight count");
        assert_eq!(psqt_weights.len(), FEATURE_DIMS, "psqt weight count");

        FeatureTransformer {
            biases: AVec::from_slice(CACHE_LINE_SIZE, biases),
            weights: AVec::from_slice(CACHE_LINE_SIZE, weights),
            psqt_weights: AVec::from_slice(CACHE_LINE_SIZE, psqt_weights),
        }
    }

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut biases = avec![[CACHE_LINE_SIZE]|0i16; L1];
        let mut weights = avec![[CACHE_LINE_SIZE]|0i16; FEATURE_DIMS * L1];
        let mut psqt_weights = avec![[CACHE_LINE_SIZE]|0i32; FEATURE_DIMS];

        reader.read_i16_into::<LittleEndian>(&mut biases)?;
        reader.read_i16_into::<LittleEndian>(&mut weights)?;
        reader.read_i32_into::<LittleEndian>(&mut psqt_weights)?;

        Ok(FeatureTransformer {
            biases,
            weights,
            psqt_weights,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for &b in self.biases.iter() {
            writer.write_i16::<LittleEndian>(b)?;
        }
        for &w in self.weights.iter() {
            writer.write_i16::<LittleEndian>(w)?;
        }
        for &w in self.psqt_weights.iter() {
            writer.write_i32::<LittleEndian>(w)?;
        }
        Ok(())
    }

    /// Sum of PSQT weights over the active features.
    #[inline]
    pub fn psqt(&self, features: &[usize]) -> i32 {
        features.iter().map(|&f| self.psqt_weights[f]).sum()
    }

    /// Builds the hidden accumulator for the active features.
    pub fn accumulate(&self, features: &[usize]) -> Accumulator {
        let mut acc = [0i32; L1];
        for (a, &b) in acc.iter_mut().zip(self.biases.iter()) {
            *a = i32::from(b);
        }
        for &f in features {
            let row = &self.weights[f * L1..(f + 1) * L1];
            for (a, &w) in acc.iter_mut().zip(row) {
                *a += i32::from(w);
            }
        }
        acc
    }
}
