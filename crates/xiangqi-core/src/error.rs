//! Error types for position parsing and network handling.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Color, PieceType};

/// FEN parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("FEN string is empty")]
    Empty,
    #[error("FEN string has no side to move")]
    MissingSideToMove,
    #[error("invalid side to move '{found}', expected 'w' or 'b'")]
    InvalidSideToMove { found: String },
    #[error("FEN must have 10 ranks, found {found}")]
    WrongRankCount { found: usize },
    #[error("invalid piece character '{char}' in FEN")]
    InvalidPiece { char: char },
    #[error("rank {rank} spans {files} files, expected 9")]
    RankWidth { rank: usize, files: usize },
    #[error("{color} must have exactly one king, found {found}")]
    KingCount { color: Color, found: i32 },
    #[error("{color} has {found} pieces of type {piece_type:?}, more than allowed")]
    TooManyPieces {
        color: Color,
        piece_type: PieceType,
        found: i32,
    },
    #[error("invalid move counter '{found}'")]
    InvalidCounter { found: String },
}

/// Reasons a network blob is rejected.
///
/// The loader treats all of these as "this candidate did not parse" and moves
/// on to the next framing or directory.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("I/O error while reading network: {0}")]
    Io(#[from] io::Error),
    #[error("not a zstd frame: {0}")]
    Decompress(io::Error),
    #[error("unsupported network version {found:#010x}, expected {expected:#010x}")]
    BadVersion { found: u32, expected: u32 },
    #[error("network hash {found:#010x} does not match architecture {expected:#010x}")]
    HashMismatch { found: u32, expected: u32 },
    #[error("network description of {len} bytes exceeds the {max} byte limit")]
    DescriptionTooLong { len: usize, max: usize },
    #[error("{layer} hash {found:#010x} does not match {expected:#010x}")]
    LayerHashMismatch {
        layer: &'static str,
        found: u32,
        expected: u32,
    },
    #[error("unexpected data after the last layer")]
    TrailingData,
}

/// The requested network is not the one that was loaded.
///
/// This is fatal for the engine: there is no material-only fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("network file {file} was not loaded successfully")]
    NotLoaded { file: String, default_name: String },
}

impl VerifyError {
    /// The diagnostic block printed before the engine terminates.
    pub fn lines(&self) -> [String; 5] {
        match self {
            VerifyError::NotLoaded { file, default_name } => [
                "Network evaluation parameters compatible with the engine must be available."
                    .to_string(),
                format!("The network file {file} was not loaded successfully."),
                "The UCI option EvalFile might need to specify the full path, \
                 including the directory name, to the network file."
                    .to_string(),
                format!(
                    "The default net {default_name} is distributed together with the engine release."
                ),
                "The engine will be terminated now.".to_string(),
            ]
            .map(|msg| format!("info string ERROR: {msg}")),
        }
    }
}

/// Failures of `export_net`.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no network is loaded")]
    NotLoaded,
    #[error("Failed to export a net. A non-embedded net can only be saved if the filename is specified")]
    FilenameRequired,
    #[error("Failed to export a net to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Rejected `setoption` requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("No such option: {name}")]
    Unknown { name: String },
    #[error("invalid value '{value}' for option {name}")]
    InvalidValue { name: String, value: String },
    #[error("value {value} for option {name} is outside {min}..={max}")]
    OutOfRange {
        name: String,
        value: i64,
        min: i64,
        max: i64,
    },
}
