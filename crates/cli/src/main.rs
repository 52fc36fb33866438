// mbook - match transactions between two CSV exports

mod exit_codes;
mod logging;
mod recon;
mod request;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;
use recon::{OutputMode, RunArgs};

#[derive(Parser)]
#[command(name = "mbook")]
#[command(about = "Reconcile two transaction exports with weighted matching rules")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match source A against source B
    #[command(after_help = "\
Examples:
  mbook run --a bank.csv --b ledger.csv --config rules.toml
  mbook run --a bank.csv --b ledger.csv --config rules.toml --json
  mbook run --a bank.csv --b ledger.csv --config rules.json --mode indices --output pairs.json
  mbook run --a bank.csv --b ledger.csv --config rules.toml --fail-on-unmatched")]
    Run {
        /// Source A CSV (header row required)
        #[arg(long)]
        a: PathBuf,

        /// Source B CSV (header row required)
        #[arg(long)]
        b: PathBuf,

        /// Matching config (.toml, or .json for the wire form)
        #[arg(long, short = 'c')]
        config: PathBuf,

        /// Result shape
        #[arg(long, value_enum, default_value_t = OutputMode::Full)]
        mode: OutputMode,

        /// Print the JSON result to stdout instead of a one-line summary
        #[arg(long)]
        json: bool,

        /// Write the JSON result to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Exit with code 6 when any transaction is left unmatched
        #[arg(long)]
        fail_on_unmatched: bool,
    },

    /// Check a matching config without running it
    #[command(after_help = "\
Examples:
  mbook validate rules.toml
  mbook validate rules.json")]
    Validate {
        /// Matching config (.toml or .json)
        config: PathBuf,
    },

    /// Execute a JSON wire request and print the JSON response
    #[command(after_help = "\
Examples:
  mbook request job.json
  cat job.json | mbook request
  mbook request job.json --output response.json

Staged sources (storageUrlA/storageUrlB) must be file:// URLs or local paths;
relative paths resolve against the request file's directory.")]
    Request {
        /// Request file; reads stdin when omitted or '-'
        file: Option<PathBuf>,

        /// Write the response to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("MBOOK_GIT_HASH"), ")",
        "\nengine:  matchbook-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("MBOOK_TARGET"),
        "\nprofile: ", env!("MBOOK_PROFILE"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { a, b, config, mode, json, output, fail_on_unmatched } => {
            recon::cmd_run(RunArgs { a, b, config, mode, json, output, fail_on_unmatched })
        }
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Request { file, output } => request::cmd_request(file, output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
