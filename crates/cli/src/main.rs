mod engine;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::engine::{Engine, Flow};

#[derive(Parser, Debug)]
#[command(version, about = "Xiangqi static evaluation over a line protocol")]
struct Cli {
    /// Initial value of the EvalFile option.
    #[arg(long = "eval-file", value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    eval_file: Option<String>,

    /// Directory searched for the network after the working directory.
    /// Defaults to the directory of the executable.
    #[arg(long = "root-dir", value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    root_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long = "log-level", default_value = "warn")]
    log_level: String,
}

fn init_tracing(level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

fn engine_directory() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the executable")?;
    Ok(exe.parent().map(PathBuf::from).unwrap_or_default())
}

fn run(cli: Cli) -> Result<Flow> {
    let root_dir = match cli.root_dir {
        Some(dir) => dir,
        None => engine_directory()?,
    };

    let mut engine = Engine::new(root_dir, cli.eval_file.as_deref())?;
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    engine
        .run(stdin.lock(), &mut stdout)
        .context("protocol I/O failed")
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli) {
        Ok(Flow::Terminate) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
