//! Purpose: `adslot` CLI entry point for checking slot files and simulating ad flows.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Command results are JSON on stdout; logs go to stderr via `tracing`.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod scenario;

use adslot::api::{Error, ErrorKind, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

#[derive(Parser)]
#[command(
    name = "adslot",
    version,
    about = "Check ad slot definitions and simulate ad flows without a device",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Validate a slot definition file",
        long_about = r#"Parse a JSON object mapping slot ids to slot configs and validate each slot.

Exits with the usage error code when any slot is invalid."#,
        after_help = r#"EXAMPLES
  $ adslot validate slots.json

NOTES
  - Slot types: banner, interstitial, rewarded
  - Banner fields: position (top|bottom), size, margin"#
    )]
    Validate {
        #[arg(help = "Path to the slot definition JSON", value_hint = ValueHint::FilePath)]
        path: PathBuf,
    },
    #[command(
        about = "Run a scenario against the simulated ad plugin",
        long_about = r#"Run the ordered steps of a scenario file against a recording, simulated ad plugin.

Prints the plugin calls that were issued, rewards granted, and the final ad state."#,
        after_help = r#"EXAMPLES
  $ adslot simulate scenario.json
  $ RUST_LOG=debug adslot simulate scenario.json"#
    )]
    Simulate {
        #[arg(help = "Path to the scenario JSON", value_hint = ValueHint::FilePath)]
        path: PathBuf,
    },
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        after_help = r#"EXAMPLES
  $ adslot completion bash > ~/.local/share/bash-completion/completions/adslot
  $ adslot completion zsh > ~/.zfunc/_adslot"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Run `adslot --help` for usage."));
            }
        },
    };

    init_tracing();
    command_dispatch::dispatch_command(cli.command)
}

fn clap_error_summary(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .next()
        .unwrap_or("invalid arguments")
        .trim_start_matches("error: ")
        .to_string()
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|err| {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::Io,
        };
        Error::new(kind)
            .with_message(format!("failed to read {}", path.display()))
            .with_source(err)
    })
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn error_fields(err: &Error) -> Value {
    let mut inner = serde_json::Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(err.message().unwrap_or("error")));
    if let Some(slot_id) = err.slot_id() {
        inner.insert("slot".to_string(), json!(slot_id));
    }
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    Value::Object(inner)
}

fn error_json(err: &Error) -> Value {
    json!({ "error": error_fields(err) })
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {err}");
        if let Some(hint) = err.hint() {
            eprintln!("hint: {hint}");
        }
        return;
    }
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}
