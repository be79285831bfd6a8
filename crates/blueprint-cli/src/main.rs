//! # blueprint CLI
//!
//! Entry point for the `blueprint` binary. Parses arguments, initializes
//! tracing and dispatches to the subcommand handlers in the library.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use blueprint_cli::context::GlobalOptions;
use blueprint_cli::log_level;
use blueprint_cli::demo::{run_demo, DemoArgs};
use blueprint_cli::ledger::{
    run_export, run_history, run_replay, run_show, run_verify, ExportArgs, HistoryArgs, ReplayArgs, ShowArgs,
    VerifyArgs,
};
use blueprint_cli::validate::{run_validate, ValidateArgs};

/// Blueprint: validate, repair and audit AI-generated financial-asset records.
#[derive(Parser, Debug)]
#[command(name = "blueprint", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides it.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Engine configuration file (YAML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger file (JSON Lines). Defaults to .blueprint/ledger.jsonl.
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Directory of rule-set documents.
    #[arg(long = "rules-dir", global = true)]
    rules_dir: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long = "log-json", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate and patch a record, then append the attempt to the ledger.
    Validate(ValidateArgs),
    /// List ledger entries.
    History(HistoryArgs),
    /// Print one recorded attempt.
    Show(ShowArgs),
    /// Re-validate a recorded input under another rule-set version.
    Replay(ReplayArgs),
    /// Export ledger entries as an audit JSON array.
    Export(ExportArgs),
    /// Recompute and check every stored trace id.
    Verify(VerifyArgs),
    /// Patch a sample AI-generated bond record in memory.
    Demo(DemoArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG, when set, overrides -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(cli.verbose)));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let opts = GlobalOptions {
        config: cli.config,
        ledger: cli.ledger,
        rules_dir: cli.rules_dir,
    };

    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args, &opts),
        Commands::History(args) => run_history(&args, &opts),
        Commands::Show(args) => run_show(&args, &opts),
        Commands::Replay(args) => run_replay(&args, &opts),
        Commands::Export(args) => run_export(&args, &opts),
        Commands::Verify(args) => run_verify(&args, &opts),
        Commands::Demo(args) => run_demo(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
