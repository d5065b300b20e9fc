//! Line protocol front end.
//!
//! Reads one command per line and answers on the output stream. The engine
//! only evaluates; `go` reports the static score and no move.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use xiangqi_core::eval_file::{EVAL_FILE_OPTION, FsReader, VerifiedNetwork, save_eval};
use xiangqi_core::nnue::Network;
use xiangqi_core::options::OptionsMap;
use xiangqi_core::types::{VALUE_INFINITE, VALUE_ZERO, to_cp};
use xiangqi_core::{Board, EvalFile, evaluate, load_networks, trace, verify};

use crate::render;

const ENGINE_NAME: &str = "Xiangqi Eval";
const ENGINE_AUTHOR: &str = "the Xiangqi Eval developers";

/// What the caller should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
    /// The network check failed. The process must exit with an error.
    Terminate,
}

pub struct Engine {
    options: OptionsMap,
    eval_file: EvalFile,
    board: Board,
    root_dir: PathBuf,
}

impl Engine {
    /// Creates the engine and loads the network named by `eval_file`, or the
    /// default network when it is `None`.
    pub fn new(root_dir: PathBuf, eval_file: Option<&str>) -> Result<Self> {
        let mut options = OptionsMap::engine_defaults();
        if let Some(name) = eval_file {
            options
                .set(EVAL_FILE_OPTION, Some(name))
                .context("invalid --eval-file")?;
        }

        let mut engine = Engine {
            options,
            eval_file: EvalFile::default(),
            board: Board::new(),
            root_dir,
        };
        engine.load_network();
        Ok(engine)
    }

    fn load_network(&mut self) {
        let eval_file = std::mem::take(&mut self.eval_file);
        self.eval_file = load_networks(&self.root_dir, &self.options, eval_file, &FsReader);
    }

    /// Processes commands until `quit`, end of input or a fatal error.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<Flow> {
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let flow = self.handle_command(line, out)?;
            out.flush()?;
            if flow != Flow::Continue {
                return Ok(flow);
            }
        }
        Ok(Flow::Quit)
    }

    fn handle_command(&mut self, line: &str, out: &mut impl Write) -> io::Result<Flow> {
        let mut tokens = line.split_whitespace();
        let Some(cmd) = tokens.next() else {
            return Ok(Flow::Continue);
        };
        let args: Vec<&str> = tokens.collect();
        debug!(cmd, ?args, "command");

        match cmd {
            "uci" => {
                writeln!(out, "id name {ENGINE_NAME} {}", env!("CARGO_PKG_VERSION"))?;
                writeln!(out, "id author {ENGINE_AUTHOR}")?;
                writeln!(out)?;
                write!(out, "{}", self.options)?;
                writeln!(out, "uciok")?;
            }
            "isready" => writeln!(out, "readyok")?,
            "setoption" => self.set_option(&args, out)?,
            "position" => self.set_position(&args, out)?,
            "eval" => return self.eval(out),
            "go" => return self.go(out),
            "export_net" => self.export_net(args.first().map(Path::new), out)?,
            "d" => writeln!(out, "{}", render::board_to_string(&self.board))?,
            "quit" | "stop" => return Ok(Flow::Quit),
            _ => writeln!(out, "Unknown command: '{line}'")?,
        }
        Ok(Flow::Continue)
    }

    /// `setoption name <name> [value <value>]`; both parts may contain spaces.
    fn set_option(&mut self, args: &[&str], out: &mut impl Write) -> io::Result<()> {
        let mut name = Vec::new();
        let mut value = Vec::new();
        let mut in_value = false;
        let args = args.strip_prefix(&["name"]).unwrap_or(args);
        for &token in args {
            if token == "value" && !in_value {
                in_value = true;
            } else if in_value {
                value.push(token);
            } else {
                name.push(token);
            }
        }
        let name = name.join(" ");
        let value = in_value.then(|| value.join(" "));

        match self.options.set(&name, value.as_deref()) {
            Ok(option) => {
                if option.name().eq_ignore_ascii_case(EVAL_FILE_OPTION) {
                    self.load_network();
                }
            }
            Err(err) => {
                warn!(%err, "setoption rejected");
                writeln!(out, "info string {err}")?;
            }
        }
        Ok(())
    }

    /// `position startpos` or `position fen <fen>`.
    fn set_position(&mut self, args: &[&str], out: &mut impl Write) -> io::Result<()> {
        let (setup, rest) = match args.split_first() {
            Some((setup, rest)) => (*setup, rest),
            None => {
                writeln!(out, "info string position requires startpos or fen")?;
                return Ok(());
            }
        };

        let end = rest.iter().position(|&t| t == "moves").unwrap_or(rest.len());
        if rest.len() > end + 1 {
            writeln!(out, "info string moves are not supported")?;
        }

        let board = match setup {
            "startpos" => Ok(Board::new()),
            "fen" => Board::from_fen(&rest[..end].join(" ")),
            other => {
                writeln!(out, "info string unknown position setup '{other}'")?;
                return Ok(());
            }
        };

        match board {
            Ok(board) => self.board = board,
            Err(err) => writeln!(out, "info string invalid FEN: {err}")?,
        }
        Ok(())
    }

    /// Runs the network check. On failure the diagnostic is written and
    /// `None` is returned.
    fn verified_network(&self, out: &mut impl Write) -> io::Result<Option<VerifiedNetwork>> {
        match verify(&self.options, &self.eval_file) {
            Ok(verified) => {
                writeln!(out, "{}", verified.info_line())?;
                Ok(Some(verified))
            }
            Err(err) => {
                for line in err.lines() {
                    writeln!(out, "{line}")?;
                }
                Ok(None)
            }
        }
    }

    fn eval(&self, out: &mut impl Write) -> io::Result<Flow> {
        let Some(verified) = self.verified_network(out)? else {
            return Ok(Flow::Terminate);
        };
        let network: &Network = verified.network();
        writeln!(out, "{}", trace(network, &self.board))?;
        Ok(Flow::Continue)
    }

    fn go(&self, out: &mut impl Write) -> io::Result<Flow> {
        let Some(verified) = self.verified_network(out)? else {
            return Ok(Flow::Terminate);
        };

        if self.board.in_check() {
            writeln!(out, "info string side to move is in check, no static evaluation")?;
        } else {
            let network: &Network = verified.network();
            let v = evaluate(network, &self.board, VALUE_ZERO, -VALUE_INFINITE, VALUE_INFINITE);
            writeln!(out, "info score cp {}", to_cp(v))?;
        }
        writeln!(out, "bestmove (none)")?;
        Ok(Flow::Continue)
    }

    fn export_net(&self, filename: Option<&Path>, out: &mut impl Write) -> io::Result<()> {
        match save_eval(&self.eval_file, filename) {
            Ok(msg) => writeln!(out, "{msg}"),
            Err(err) => writeln!(out, "{err}"),
        }
    }
}
