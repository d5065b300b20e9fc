//! Network container: header, layers and inference.

use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::trace;

use crate::board::Board;
use crate::error::NetworkError;
use crate::nnue::feature_transformer::{self, FEATURE_DIMS, FeatureTransformer, L1};
use crate::nnue::output_layer::{INPUT_DIMS, OutputLayer};
use crate::nnue::{NeuralEvaluator, NnueOutput};
use crate::types::{Color, Value, to_cp};

/// File format version marker.
pub const NNUE_VERSION: u32 = 0x7AF3_2F20;

/// Longest description accepted in a network header.
pub const MAX_DESCRIPTION_LEN: usize = 1024;

/// Divides raw network output into internal score units.
pub const OUTPUT_SCALE: i32 = 16;

pub const FEATURE_TRANSFORMER_HASH: u32 = 0x5F13_4CB8 ^ (2 * L1 as u32);
pub const OUTPUT_LAYER_HASH: u32 = 0xCC03_DAE4u32.wrapping_add(1) ^ (INPUT_DIMS as u32);

/// Architecture hash stored in the file header.
pub const NETWORK_HASH: u32 = FEATURE_TRANSFORMER_HASH ^ OUTPUT_LAYER_HASH;

/// Raw parameters of a network, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    pub ft_biases: Vec<i16>,
    pub ft_weights: Vec<i16>,
    pub psqt_weights: Vec<i32>,
    pub output_bias: i32,
    pub output_weights: Vec<i16>,
}

impl Parameters {
    /// All-zero parameters with the right shapes.
    pub fn zeroed() -> Self {
        Parameters {
            ft_biases: vec![0; L1],
            ft_weights: vec![0; FEATURE_DIMS * L1],
            psqt_weights: vec![0; FEATURE_DIMS],
            output_bias: 0,
            output_weights: vec![0; INPUT_DIMS],
        }
    }
}

/// A loaded evaluation network. Immutable after construction.
pub struct Network {
    description: String,
    feature_transformer: FeatureTransformer,
    output_layer: OutputLayer,
}

/// Intermediate values of one forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Forward {
    psqt: i32,
    positional: i32,
}

impl Network {
    /// Builds a network from raw parameters.
    ///
    /// # Panics
    ///
    /// Panics if any parameter vector has the wrong length.
    pub fn new(description: impl Into<String>, params: &Parameters) -> Self {
        Network {
            description: description.into(),
            feature_transformer: FeatureTransformer::from_slices(
                &params.ft_biases,
                &params.ft_weights,
                &params.psqt_weights,
            ),
            output_layer: OutputLayer::from_slice(params.output_bias, &params.output_weights),
        }
    }

    /// Parses an uncompressed network blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NetworkError> {
        Self::read(&mut Cursor::new(bytes))
    }

    /// Parses a network, checking every format marker and that the stream
    /// ends right after the last layer.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, NetworkError> {
        let version = reader.read_u32::<LittleEndian>()?;
        if version != NNUE_VERSION {
            return Err(NetworkError::BadVersion {
                found: version,
                expected: NNUE_VERSION,
            });
        }

        let hash = reader.read_u32::<LittleEndian>()?;
        if hash != NETWORK_HASH {
            return Err(NetworkError::HashMismatch {
                found: hash,
                expected: NETWORK_HASH,
            });
        }

        let len = reader.read_u32::<LittleEndian>()? as usize;
        if len > MAX_DESCRIPTION_LEN {
            return Err(NetworkError::DescriptionTooLong {
                len,
                max: MAX_DESCRIPTION_LEN,
            });
        }
        let mut description = vec![0u8; len];
        reader.read_exact(&mut description)?;
        let description = String::from_utf8_lossy(&description).into_owned();

        read_layer_hash(reader, "feature transformer", FEATURE_TRANSFORMER_HASH)?;
        let feature_transformer = FeatureTransformer::read(reader)?;

        read_layer_hash(reader, "output layer", OUTPUT_LAYER_HASH)?;
        let output_layer = OutputLayer::read(reader)?;

        let mut probe = [0u8; 1];
        if reader.read(&mut probe)? != 0 {
            return Err(NetworkError::TrailingData);
        }

        Ok(Network {
            description,
            feature_transformer,
            output_layer,
        })
    }

    /// Serializes the network in the uncompressed framing.
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(NNUE_VERSION)?;
        writer.write_u32::<LittleEndian>(NETWORK_HASH)?;
        writer.write_u32::<LittleEndian>(self.description.len() as u32)?;
        writer.write_all(self.description.as_bytes())?;
        writer.write_u32::<LittleEndian>(FEATURE_TRANSFORMER_HASH)?;
        self.feature_transformer.write(writer)?;
        writer.write_u32::<LittleEndian>(OUTPUT_LAYER_HASH)?;
        self.output_layer.write(writer)?;
        Ok(())
    }

    /// Serialized bytes in the uncompressed framing.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write(&mut bytes);
        bytes
    }

    /// Architecture and training description from the file header.
    pub fn description(&self) -> &str {
        &self.description
    }

    fn forward(&self, board: &Board, psqt_only: bool) -> Forward {
        let us = board.side_to_move();
        let ft = &self.feature_transformer;
        let us_features = feature_transformer::active_features(board, us);
        let them_features = feature_transformer::active_features(board, !us);

        let psqt = (ft.psqt(&us_features) - ft.psqt(&them_features)) / 2;
        let positional = if psqt_only {
            0
        } else {
            let us_acc = ft.accumulate(&us_features);
            let them_acc = ft.accumulate(&them_features);
            self.output_layer.propagate(&us_acc, &them_acc)
        };

        trace!(psqt, positional, psqt_only, "network forward pass");
        Forward { psqt, positional }
    }
}

fn read_layer_hash<R: Read>(
    reader: &mut R,
    layer: &'static str,
    expected: u32,
) -> Result<(), NetworkError> {
    let found = reader.read_u32::<LittleEndian>()?;
    if found != expected {
        return Err(NetworkError::LayerHashMismatch {
            layer,
            found,
            expected,
        });
    }
    Ok(())
}

impl NeuralEvaluator for Network {
    fn evaluate(&self, board: &Board, psqt_only: bool) -> NnueOutput {
        let Forward { psqt, positional } = self.forward(board, psqt_only);
        NnueOutput {
            value: (psqt + positional) / OUTPUT_SCALE,
            complexity: (psqt - positional).abs() / OUTPUT_SCALE,
        }
    }

    fn trace(&self, board: &Board) -> String {
        let Forward { psqt, positional } = self.forward(board, false);
        let stm = board.side_to_move();
        let complexity = (psqt - positional).abs() / OUTPUT_SCALE;
        let material = psqt / OUTPUT_SCALE;
        let positional = positional / OUTPUT_SCALE;

        let separator = "+------------+------------+------------+------------+\n";
        let mut out = String::new();
        out.push_str(&format!(
            "NNUE network contributions ({} to move)\n",
            if stm == Color::White { "White" } else { "Black" }
        ));
        out.push_str(separator);
        out.push_str("|  Material  | Positional |   Total    | Complexity |\n");
        out.push_str("|   (PSQT)   |  (Layers)  |            |            |\n");
        out.push_str(separator);
        out.push_str(&format!(
            "|  {:>8}  |  {:>8}  |  {:>8}  |  {:>8}  |\n",
            format_pawns(material),
            format_pawns(positional),
            format_pawns(material + positional),
            format!("{:.2}", 0.01 * f64::from(to_cp(complexity))),
        ));
        out.push_str(separator);
        out
    }
}

fn format_pawns(v: Value) -> String {
    format!("{:+.2}", 0.01 * f64::from(to_cp(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nnue::feature_transformer::feature_index;
    use crate::types::PieceType;

    fn pawn_psqt_network(weight: i32) -> Network {
        let mut params = Parameters::zeroed();
        for sq in 0..crate::board::SQUARE_NB {
            params.psqt_weights[feature_index(Color::White, Color::White, PieceType::Pawn, sq)] =
                weight;
        }
        Network::new("pawn psqt", &params)
    }

    #[test]
    fn own_pawns_drive_psqt() {
        let net = pawn_psqt_network(512);
        // Two white pawns; black has none.
        let board = Board::from_fen("3k5/9/9/9/9/9/P3P4/9/9/4K4 w").unwrap();
        let out = net.evaluate(&board, false);
        assert_eq!(out.value, 2 * 512 / 2 / OUTPUT_SCALE);
        assert_eq!(out.complexity, out.value);

        // Same placement with Black to move: the pawns are now the opponent's.
        let board = Board::from_fen("3k5/9/9/9/9/9/P3P4/9/9/4K4 b").unwrap();
        assert_eq!(net.evaluate(&board, false).value, -(2 * 512 / 2 / OUTPUT_SCALE));
    }

    #[test]
    fn psqt_only_skips_positional_layers() {
        let mut params = Parameters::zeroed();
        params.output_bias = 160;
        let net = Network::new("bias only", &params);
        let board = Board::new();

        let full = net.evaluate(&board, false);
        assert_eq!(full.value, 10);
        assert_eq!(full.complexity, 10);

        let fast = net.evaluate(&board, true);
        assert_eq!(fast.value, 0);
        assert_eq!(fast.complexity, 0);
    }

    #[test]
    fn header_markers_are_checked() {
        let net = pawn_psqt_network(32);
        let bytes = net.to_bytes();
        let reread = Network::from_bytes(&bytes).unwrap();
        assert_eq!(reread.description(), "pawn psqt");

        let mut bad_version = bytes.clone();
        bad_version[0] ^= 1;
        assert!(matches!(
            Network::from_bytes(&bad_version),
            Err(NetworkError::BadVersion { .. })
        ));

        let mut bad_hash = bytes.clone();
        bad_hash[4] ^= 1;
        assert!(matches!(
            Network::from_bytes(&bad_hash),
            Err(NetworkError::HashMismatch { .. })
        ));

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(matches!(
            Network::from_bytes(&trailing),
            Err(NetworkError::TrailingData)
        ));

        assert!(matches!(
            Network::from_bytes(&bytes[..bytes.len() - 1]),
            Err(NetworkError::Io(_))
        ));
    }

    #[test]
    fn layer_hash_is_checked() {
        let net = pawn_psqt_network(32);
        let mut bytes = net.to_bytes();
        let ft_hash_offset = 12 + net.description().len();
        bytes[ft_hash_offset] ^= 0xFF;
        assert!(matches!(
            Network::from_bytes(&bytes),
            Err(NetworkError::LayerHashMismatch {
                layer: "feature transformer",
                ..
            })
        ));
    }

    #[test]
    fn trace_mentions_side_to_move() {
        let net = pawn_psqt_network(32);
        let trace = net.trace(&Board::new());
        assert!(trace.starts_with("NNUE network contributions (White to move)"));
        assert!(trace.contains("Complexity"));
    }
}
