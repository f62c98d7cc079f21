//! `svdb`: interactive source-level debugger for StackVM program images.

use anyhow::Context;
use clap::Parser;
use stackvm_debugger::config::SessionConfig;
use stackvm_debugger::debugger::{ConsoleInput, DebugSession, ScriptedInput};
use stackvm_debugger::vm::ImageLoader;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "svdb")]
#[command(about = "Source-level debugger for StackVM programs", long_about = None)]
#[command(version)]
struct Cli {
    /// Program image to debug
    #[arg(long = "exe", value_name = "PROGRAM")]
    program: PathBuf,

    /// Directory holding the program's source files
    #[arg(long = "src", value_name = "DIR", default_value = ".")]
    source_dir: String,

    /// Replay commands from a file before reading the console
    #[arg(short = 'x', long = "commands", value_name = "FILE")]
    commands: Option<PathBuf>,

    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Arguments passed to the debugged program
    #[arg(last = true)]
    args: Vec<String>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            process::exit(code);
        }
    };

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SessionConfig::new(cli.program, &cli.source_dir).with_arguments(cli.args);

    let script: Vec<String> = match &cli.commands {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(err) => {
                warn!(%err, file = %path.display(), "command file not readable, ignoring");
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    info!(commands = script.len(), "starting session");
    let input = ScriptedInput::new(script).then(ConsoleInput::new());

    let mut session = DebugSession::new(config, Box::new(ImageLoader), input, io::stdout());
    session.debug().context("debug session ended abnormally")?;
    Ok(())
}
