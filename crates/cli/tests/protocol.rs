use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use xiangqi_core::nnue::{Network, Parameters};

/// Runs the engine from `cwd` with `root_dir` as its engine directory.
fn run_engine(cwd: &Path, root_dir: &Path, args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_xiangqi-eval"))
        .current_dir(cwd)
        .arg("--root-dir")
        .arg(root_dir)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start engine");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn write_default_network(dir: &Path) {
    let mut params = Parameters::zeroed();
    params.ft_biases.iter_mut().for_each(|b| *b = 16);
    params.output_weights.iter_mut().for_each(|w| *w = 2);
    let bytes = zstd::encode_all(&Network::new("integration", &params).to_bytes()[..], 3).unwrap();
    std::fs::write(dir.join(xiangqi_core::eval_file::EVAL_FILE_DEFAULT_NAME), bytes).unwrap();
}

#[test]
fn missing_network_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_engine(dir.path(), dir.path(), &[], "uci\ngo\nisready\n");

    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let errors: Vec<&str> = stdout
        .lines()
        .filter(|l| l.starts_with("info string ERROR: "))
        .collect();
    assert_eq!(errors.len(), 5);
    assert!(errors[4].ends_with("The engine will be terminated now."));
    assert!(!stdout.contains("readyok"));
}

#[test]
fn default_network_from_engine_directory() {
    let engine_dir = tempfile::tempdir().unwrap();
    let cwd = tempfile::tempdir().unwrap();
    write_default_network(engine_dir.path());
    let output = run_engine(
        cwd.path(),
        engine_dir.path(),
        &[],
        "position fen 3k5/9/9/9/9/9/4P4/9/9/4K4 w - - 0 1\ngo\nquit\n",
    );

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(std::fs::read_dir(cwd.path()).unwrap().next().is_none());
    assert!(stdout.contains("info string NNUE evaluation using xiangqi-nn.nnue enabled"));
    assert!(stdout.contains("info score cp "));
    assert!(stdout.contains("bestmove (none)"));
}

#[test]
fn bad_eval_file_flag_is_fatal_on_go() {
    let dir = tempfile::tempdir().unwrap();
    write_default_network(dir.path());
    let output = run_engine(dir.path(), dir.path(), &["--eval-file", "missing.nnue"], "go\n");

    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("info string ERROR: The network file missing.nnue was not loaded successfully."));
}
