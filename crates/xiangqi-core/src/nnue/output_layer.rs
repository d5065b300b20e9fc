//! Clipped ReLU followed by a single affine output neuron.

use std::io::{self, Read, Write};

use aligned_vec::{AVec, ConstAlign, avec};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::nnue::CACHE_LINE_SIZE;
use crate::nnue::feature_transformer::{Accumulator, L1};

/// Inputs of the output neuron: both perspectives concatenated.
pub const INPUT_DIMS: usize = 2 * L1;

/// Activation ceiling of the clipped ReLU.
const CRELU_MAX: i32 = 127;

pub struct OutputLayer {
    bias: i32,
    weights: AVec<i16, ConstAlign<CACHE_LINE_SIZE>>,
}

impl OutputLayer {
    pub fn from_slice(bias: i32, weights: &[i16]) -> Self {
        assert_eq!(weights.len(), INPUT_DIMS, "output weight count");
        OutputLayer {
            bias,
            weights: AVec::from_slice(CACHE_LINE_SIZE, weights),
        }
    }

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bias = reader.read_i32::<LittleEndian>()?;
        let mut weights = avec![[CACHE_LINE_SIZE]|0i16; INPUT_DIMS];
        reader.read_i16_into::<LittleEndian>(&mut weights)?;
        Ok(OutputLayer { bias, weights })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i32::<LittleEndian>(self.bias)?;
        for &w in self.weights.iter() {
            writer.write_i16::<LittleEndian>(w)?;
        }
        Ok(())
    }

    /// Forward pass. The side to move's accumulator comes first.
    pub fn propagate(&self, us: &Accumulator, them: &Accumulator) -> i32 {
        let (w_us, w_them) = self.weights.split_at(L1);
        let dot = |acc: &Accumulator, w: &[i16]| -> i32 {
            acc.iter()
                .zip(w)
                .map(|(&a, &w)| a.clamp(0, CRELU_MAX) * i32::from(w))
                .sum()
        };
        self.bias + dot(us, w_us) + dot(them, w_them)
    }
}
