//! Locating, loading and verifying the evaluation network file.
//!
//! The network named by the `EvalFile` option is searched for in two places,
//! the working directory first and the engine directory second, and each
//! file is tried as a zstd frame before being read as a raw blob. The result
//! is recorded in an [`EvalFile`] value which [`verify`] later checks against
//! the option before the engine is allowed to evaluate anything.

use std::fs::{self, File};
use std::io::{self, BufWriter, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::{ExportError, NetworkError, VerifyError};
use crate::nnue::Network;
use crate::options::OptionSource;

/// Option that selects the network file.
pub const EVAL_FILE_OPTION: &str = "EvalFile";

/// Network loaded when the option is empty.
pub const EVAL_FILE_DEFAULT_NAME: &str = "xiangqi-nn.nnue";

/// Which network was requested and which one is actually loaded.
///
/// `current` is either empty or the name of a file that parsed
/// successfully; the parsed network is kept alongside it.
#[derive(Clone)]
pub struct EvalFile {
    option_name: String,
    default_name: String,
    current: String,
    net_description: String,
    network: Option<Arc<Network>>,
}

impl Default for EvalFile {
    fn default() -> Self {
        EvalFile::new(EVAL_FILE_OPTION, EVAL_FILE_DEFAULT_NAME)
    }
}

impl EvalFile {
    /// A descriptor with nothing loaded.
    pub fn new(option_name: &str, default_name: &str) -> Self {
        EvalFile {
            option_name: option_name.to_string(),
            default_name: default_name.to_string(),
            current: String::new(),
            net_description: String::new(),
            network: None,
        }
    }

    pub fn option_name(&self) -> &str {
        &self.option_name
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Name of the loaded network, empty when none is loaded.
    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn net_description(&self) -> &str {
        &self.net_description
    }

    pub fn network(&self) -> Option<&Arc<Network>> {
        self.network.as_ref()
    }

    /// The file name the options ask for.
    pub fn requested_name(&self, options: &impl OptionSource) -> String {
        let user_eval_file = options.option_value(&self.option_name);
        if user_eval_file.is_empty() {
            self.default_name.clone()
        } else {
            user_eval_file.to_string()
        }
    }
}

impl std::fmt::Debug for EvalFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalFile")
            .field("option_name", &self.option_name)
            .field("default_name", &self.default_name)
            .field("current", &self.current)
            .field("net_description", &self.net_description)
            .finish()
    }
}

/// Source of candidate network files.
pub trait CandidateReader {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads candidates from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl CandidateReader for FsReader {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

/// Serialization framings a network file may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// A zstd frame around the raw blob.
    Zstd,
    /// The raw blob.
    Raw,
}

/// Framings in the order they are tried.
pub const FRAMINGS: [Framing; 2] = [Framing::Zstd, Framing::Raw];

impl Framing {
    /// Parses `bytes` in this framing.
    pub fn parse(self, bytes: &[u8]) -> Result<Network, NetworkError> {
        match self {
            Framing::Zstd => {
                let raw = zstd::stream::decode_all(Cursor::new(bytes))
                    .map_err(NetworkError::Decompress)?;
                Network::from_bytes(&raw)
            }
            Framing::Raw => Network::from_bytes(bytes),
        }
    }
}

/// Tries every framing on one candidate file. Returns the first network
/// that parses.
fn load_candidate(reader: &impl CandidateReader, path: &Path) -> Option<Network> {
    let bytes = match reader.read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(path = %path.display(), %err, "network candidate not readable");
            return None;
        }
    };

    FRAMINGS.iter().find_map(|&framing| match framing.parse(&bytes) {
        Ok(network) => Some(network),
        Err(err) => {
            debug!(path = %path.display(), ?framing, %err, "network candidate rejected");
            None
        }
    })
}

/// Loads the network requested by the options, searching the working
/// directory first and `root_directory` second.
///
/// Nothing is read when the requested network is already loaded. If no
/// candidate parses the descriptor is returned unchanged; [`verify`] turns
/// that into a fatal error.
pub fn load_networks(
    root_directory: &Path,
    options: &impl OptionSource,
    mut eval_file: EvalFile,
    reader: &impl CandidateReader,
) -> EvalFile {
    let user_eval_file = eval_file.requested_name(options);
    let dirs = [PathBuf::new(), root_directory.to_path_buf()];

    for directory in &dirs {
        if eval_file.current != user_eval_file {
            let path = directory.join(&user_eval_file);
            if let Some(network) = load_candidate(reader, &path) {
                info!(
                    path = %path.display(),
                    description = network.description(),
                    "loaded evaluation network"
                );
                eval_file.current = user_eval_file.clone();
                eval_file.net_description = network.description().to_string();
                eval_file.network = Some(Arc::new(network));
            }
        }
    }

    eval_file
}

/// A network that passed [`verify`].
#[derive(Clone)]
pub struct VerifiedNetwork {
    name: String,
    network: Arc<Network>,
}

impl std::fmt::Debug for VerifiedNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifiedNetwork")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl VerifiedNetwork {
    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Confirmation line for the protocol output.
    pub fn info_line(&self) -> String {
        format!("info string NNUE evaluation using {} enabled", self.name)
    }
}

/// Checks that the network the options ask for is the one that was loaded.
///
/// # Errors
///
/// Returns [`VerifyError::NotLoaded`] when it is not. The caller must print
/// [`VerifyError::lines`] and terminate; there is no fallback evaluation.
pub fn verify(
    options: &impl OptionSource,
    eval_file: &EvalFile,
) -> Result<VerifiedNetwork, VerifyError> {
    let user_eval_file = eval_file.requested_name(options);

    match &eval_file.network {
        Some(network) if eval_file.current == user_eval_file => Ok(VerifiedNetwork {
            name: user_eval_file,
            network: Arc::clone(network),
        }),
        _ => {
            error!(requested = %user_eval_file, current = %eval_file.current, "network verification failed");
            Err(VerifyError::NotLoaded {
                file: user_eval_file,
                default_name: eval_file.default_name.clone(),
            })
        }
    }
}

/// Writes the loaded network in raw framing.
///
/// Without a file name the network is written under the default name, which
/// is only allowed when the default network is the one loaded.
pub fn save_eval(eval_file: &EvalFile, filename: Option<&Path>) -> Result<String, ExportError> {
    let network = eval_file.network.as_ref().ok_or(ExportError::NotLoaded)?;

    let path = match filename {
        Some(path) => path.to_path_buf(),
        None if eval_file.current == eval_file.default_name => {
            PathBuf::from(&eval_file.default_name)
        }
        None => return Err(ExportError::FilenameRequired),
    };

    let write = |path: &Path| -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        network.write(&mut writer)?;
        io::Write::flush(&mut writer)
    };
    write(&path).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), "exported evaluation network");
    Ok(format!("Network saved successfully to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    use crate::nnue::Parameters;

    /// In-memory candidate files that records every read.
    #[derive(Default)]
    struct MemReader {
        files: HashMap<PathBuf, Vec<u8>>,
        reads: RefCell<Vec<PathBuf>>,
    }

    impl MemReader {
        fn with(mut self, path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
            self.files.insert(path.into(), bytes);
            self
        }
    }

    impl CandidateReader for MemReader {
        fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.reads.borrow_mut().push(path.to_path_buf());
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn net_bytes(description: &str) -> Vec<u8> {
        Network::new(description, &Parameters::zeroed()).to_bytes()
    }

    fn options(eval_file: &str) -> HashMap<String, String> {
        HashMap::from([(EVAL_FILE_OPTION.to_string(), eval_file.to_string())])
    }

    #[test]
    fn empty_option_falls_back_to_default_name() {
        let eval_file = EvalFile::default();
        assert_eq!(eval_file.requested_name(&options("")), EVAL_FILE_DEFAULT_NAME);
        assert_eq!(eval_file.requested_name(&HashMap::new()), EVAL_FILE_DEFAULT_NAME);
        assert_eq!(eval_file.requested_name(&options("a.nnue")), "a.nnue");
    }

    #[test]
    fn working_directory_wins() {
        let reader = MemReader::default()
            .with("net.nnue", net_bytes("cwd"))
            .with("/engine/net.nnue", net_bytes("engine dir"));

        let loaded = load_networks(
            Path::new("/engine"),
            &options("net.nnue"),
            EvalFile::default(),
            &reader,
        );

        assert_eq!(loaded.current(), "net.nnue");
        assert_eq!(loaded.net_description(), "cwd");
        assert_eq!(*reader.reads.borrow(), vec![PathBuf::from("net.nnue")]);
    }

    #[test]
    fn engine_directory_is_second_candidate() {
        let reader = MemReader::default().with("/engine/net.nnue", net_bytes("engine dir"));

        let loaded = load_networks(
            Path::new("/engine"),
            &options("net.nnue"),
            EvalFile::default(),
            &reader,
        );

        assert_eq!(loaded.current(), "net.nnue");
        assert_eq!(loaded.net_description(), "engine dir");
        assert_eq!(reader.reads.borrow().len(), 2);
    }

    #[test]
    fn already_loaded_network_is_not_read_again() {
        let reader = MemReader::default().with("net.nnue", net_bytes("first"));
        let opts = options("net.nnue");
        let loaded = load_networks(Path::new("/engine"), &opts, EvalFile::default(), &reader);
        reader.reads.borrow_mut().clear();

        let again = load_networks(Path::new("/engine"), &opts, loaded.clone(), &reader);

        assert!(reader.reads.borrow().is_empty());
        assert_eq!(again.current(), loaded.current());
        assert_eq!(again.net_description(), loaded.net_description());
        assert!(Arc::ptr_eq(
            again.network().unwrap(),
            loaded.network().unwrap()
        ));
    }

    #[test]
    fn zstd_and_raw_framings_both_load() {
        let raw = net_bytes("raw");
        let compressed = zstd::stream::encode_all(Cursor::new(net_bytes("zstd")), 3).unwrap();
        let reader = MemReader::default()
            .with("raw.nnue", raw)
            .with("zstd.nnue", compressed);

        let loaded = load_networks(Path::new(""), &options("raw.nnue"), EvalFile::default(), &reader);
        assert_eq!(loaded.net_description(), "raw");

        let loaded = load_networks(Path::new(""), &options("zstd.nnue"), loaded, &reader);
        assert_eq!(loaded.current(), "zstd.nnue");
        assert_eq!(loaded.net_description(), "zstd");
    }

    #[test]
    fn unparseable_candidates_leave_descriptor_unchanged() {
        let reader = MemReader::default()
            .with("bad.nnue", b"definitely not a network".to_vec())
            .with("/engine/bad.nnue", vec![0; 64]);

        let loaded = load_networks(
            Path::new("/engine"),
            &options("bad.nnue"),
            EvalFile::default(),
            &reader,
        );

        assert_eq!(loaded.current(), "");
        assert!(loaded.network().is_none());
        assert_eq!(reader.reads.borrow().len(), 2);
    }

    #[test]
    fn failed_reload_keeps_previous_network() {
        let reader = MemReader::default().with("good.nnue", net_bytes("good"));
        let loaded = load_networks(Path::new(""), &options("good.nnue"), EvalFile::default(), &reader);

        let reloaded = load_networks(Path::new(""), &options("missing.nnue"), loaded, &reader);

        assert_eq!(reloaded.current(), "good.nnue");
        assert_eq!(reloaded.net_description(), "good");
        assert!(verify(&options("missing.nnue"), &reloaded).is_err());
    }

    #[test]
    fn verify_accepts_loaded_network() {
        let reader = MemReader::default().with(EVAL_FILE_DEFAULT_NAME, net_bytes("default"));
        let loaded = load_networks(Path::new(""), &options(""), EvalFile::default(), &reader);

        let verified = verify(&options(""), &loaded).unwrap();
        assert_eq!(verified.name(), EVAL_FILE_DEFAULT_NAME);
        assert_eq!(
            verified.info_line(),
            format!("info string NNUE evaluation using {EVAL_FILE_DEFAULT_NAME} enabled")
        );
    }

    #[test]
    fn verify_rejects_missing_network_with_five_lines() {
        let err = verify(&options("missing.nnue"), &EvalFile::default()).unwrap_err();
        assert_eq!(
            err,
            VerifyError::NotLoaded {
                file: "missing.nnue".to_string(),
                default_name: EVAL_FILE_DEFAULT_NAME.to_string(),
            }
        );

        let lines = err.lines();
        assert!(lines.iter().all(|l| l.starts_with("info string ERROR: ")));
        assert_eq!(
            lines[1],
            "info string ERROR: The network file missing.nnue was not loaded successfully."
        );
        assert!(lines[2].contains("full path"));
        assert!(lines[3].contains(EVAL_FILE_DEFAULT_NAME));
        assert_eq!(lines[4], "info string ERROR: The engine will be terminated now.");
    }
}
