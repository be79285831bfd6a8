//! Ledger subcommands: `history`, `show`, `replay`, `export`, `verify`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use blueprint_core::{AttemptStatus, RuleSetVersion, Timestamp, TraceId};
use blueprint_ledger::{ExportRange, HistoryFilter, LedgerEntry};
use clap::{Args, ValueEnum};

use crate::context::{build_engine, GlobalOptions};
use crate::{attempt_exit_code, print_attempt};

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

/// Attempt status accepted by `--status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// No failing violation remained.
    Valid,
    /// A structural violation remained after patching.
    SchemaFail,
    /// Structurally valid, but a business rule failed.
    SemanticFail,
}

impl From<StatusArg> for AttemptStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Valid => AttemptStatus::Valid,
            StatusArg::SchemaFail => AttemptStatus::SchemaFail,
            StatusArg::SemanticFail => AttemptStatus::SemanticFail,
        }
    }
}

/// Arguments for the `history` subcommand.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Only attempts with this status.
    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,

    /// Only attempts under this rule-set version.
    #[arg(long = "rule-set")]
    pub rule_set: Option<String>,

    /// Only entries on the current timeline.
    #[arg(long)]
    pub timeline: bool,

    /// Show at most this many of the newest matching entries.
    #[arg(long)]
    pub limit: Option<usize>,
}

impl HistoryArgs {
    fn to_filter(&self) -> Result<HistoryFilter> {
        let mut filter = HistoryFilter::all();
        if let Some(status) = self.status {
            filter = filter.with_status(status.into());
        }
        if let Some(version) = &self.rule_set {
            filter = filter.with_rule_set_version(RuleSetVersion::new(version.as_str())?);
        }
        if self.timeline {
            filter = filter.timeline();
        }
        if let Some(limit) = self.limit {
            filter = filter.with_limit(limit);
        }
        Ok(filter)
    }
}

/// Print one line per matching ledger entry.
pub fn run_history(args: &HistoryArgs, opts: &GlobalOptions) -> Result<u8> {
    let engine = build_engine(opts)?;
    let history = engine.history(args.to_filter()?);

    if history.is_empty() {
        println!("no ledger entries");
        return Ok(0);
    }
    println!("{:>5}  {:<20}  {:<14}  {:<13}  {:>4}  TRACE", "SEQ", "TIMESTAMP", "RULE SET", "STATUS", "ITER");
    for entry in &history {
        print_entry_row(entry);
    }
    println!("{} entr{}", history.count(), if history.count() == 1 { "y" } else { "ies" });
    Ok(0)
}

/// One table row for a ledger entry.
pub fn print_entry_row(entry: &LedgerEntry) {
    let attempt = &entry.attempt;
    let trace = attempt.trace_id.to_hex();
    println!(
        "{:>5}  {:<20}  {:<14}  {:<13}  {:>4}  {}",
        entry.sequence,
        attempt.timestamp.to_iso8601(),
        attempt.rule_set_version.as_str(),
        attempt.status.as_str(),
        attempt.iteration_count,
        &trace[..16],
    );
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

/// Arguments for the `show` subcommand.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Trace id (64 hex characters).
    pub trace_id: String,

    /// Print the full attempt, records included, as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Print a recorded attempt. Exit code 1 when the trace id is not recorded.
pub fn run_show(args: &ShowArgs, opts: &GlobalOptions) -> Result<u8> {
    let trace_id = parse_trace_id(&args.trace_id)?;
    let engine = build_engine(opts)?;
    let Some(entry) = engine.get(&trace_id) else {
        eprintln!("no ledger entry with trace id {trace_id}");
        return Ok(1);
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&entry.attempt)?);
    } else {
        println!("sequence:  {}", entry.sequence);
        println!("timestamp: {}", entry.attempt.timestamp);
        print_attempt(&entry.attempt);
    }
    Ok(0)
}

// ---------------------------------------------------------------------------
// replay
// ---------------------------------------------------------------------------

/// Arguments for the `replay` subcommand.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Trace id of the attempt whose input is replayed.
    pub trace_id: String,

    /// Rule-set version to replay under.
    #[arg(long = "rule-set", short = 'r')]
    pub rule_set: String,
}

/// Re-validate a recorded input under another rule set and record it.
pub fn run_replay(args: &ReplayArgs, opts: &GlobalOptions) -> Result<u8> {
    let trace_id = parse_trace_id(&args.trace_id)?;
    let version = RuleSetVersion::new(args.rule_set.as_str())?;
    let engine = build_engine(opts)?;
    let Some(attempt) = engine
        .replay(&trace_id, &version)
        .with_context(|| format!("replay of {trace_id} under {version} failed"))?
    else {
        eprintln!("no ledger entry with trace id {trace_id}");
        return Ok(1);
    };
    print_attempt(&attempt);
    Ok(attempt_exit_code(&attempt))
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

/// Arguments for the `export` subcommand.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// First sequence to export, inclusive.
    #[arg(long = "from-seq", requires = "to_seq")]
    pub from_seq: Option<u64>,

    /// Last sequence to export, inclusive.
    #[arg(long = "to-seq", requires = "from_seq")]
    pub to_seq: Option<u64>,

    /// Earliest timestamp, inclusive (RFC 3339).
    #[arg(long, requires = "until", conflicts_with_all = ["from_seq", "timeline"])]
    pub since: Option<String>,

    /// Latest timestamp, inclusive (RFC 3339).
    #[arg(long, requires = "since")]
    pub until: Option<String>,

    /// Export only the current timeline.
    #[arg(long, conflicts_with = "from_seq")]
    pub timeline: bool,

    /// Output file. Defaults to stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

impl ExportArgs {
    fn to_range(&self) -> Result<ExportRange> {
        if let (Some(start), Some(end)) = (self.from_seq, self.to_seq) {
            if start > end {
                bail!("--from-seq {start} is after --to-seq {end}");
            }
            return Ok(ExportRange::Sequences { start, end });
        }
        if let (Some(since), Some(until)) = (&self.since, &self.until) {
            let from = Timestamp::parse_lenient(since).with_context(|| format!("invalid --since {since}"))?;
            let to = Timestamp::parse_lenient(until).with_context(|| format!("invalid --until {until}"))?;
            return Ok(ExportRange::Window { from, to });
        }
        if self.timeline {
            return Ok(ExportRange::Timeline);
        }
        Ok(ExportRange::All)
    }
}

/// Write the audit JSON array to a file or stdout.
pub fn run_export(args: &ExportArgs, opts: &GlobalOptions) -> Result<u8> {
    let range = args.to_range()?;
    let engine = build_engine(opts)?;
    match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            engine.export_ledger_to(range, &mut writer)?;
            writer.flush()?;
            tracing::info!(path = %path.display(), "ledger exported");
        }
        None => {
            let stdout = io::stdout();
            engine.export_ledger_to(range, stdout.lock())?;
        }
    }
    Ok(0)
}

// ---------------------------------------------------------------------------
// verify
// ---------------------------------------------------------------------------

/// Arguments for the `verify` subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {}

/// Recompute every stored trace id. Exit code 1 on the first mismatch.
pub fn run_verify(_args: &VerifyArgs, opts: &GlobalOptions) -> Result<u8> {
    let engine = match build_engine(opts) {
        Ok(engine) => engine,
        // A tampered ledger file is rejected while loading.
        Err(e) if is_corruption(&e) => {
            println!("FAIL: {e:#}");
            return Ok(1);
        }
        Err(e) => return Err(e),
    };
    match engine.verify_ledger() {
        Ok(count) => {
            println!("OK: {count} entr{} verified", if count == 1 { "y" } else { "ies" });
            Ok(0)
        }
        Err(e) => {
            println!("FAIL: {e}");
            Ok(1)
        }
    }
}

fn is_corruption(err: &anyhow::Error) -> bool {
    use blueprint_engine::EngineError;
    use blueprint_ledger::LedgerError;

    let tampered = |e: &LedgerError| matches!(e, LedgerError::Corrupt { .. } | LedgerError::Integrity { .. });
    err.chain().any(|cause| match cause.downcast_ref::<EngineError>() {
        Some(EngineError::Ledger(e)) => tampered(e),
        _ => cause.downcast_ref::<LedgerError>().is_some_and(tampered),
    })
}

fn parse_trace_id(s: &str) -> Result<TraceId> {
    TraceId::from_hex(s.trim()).with_context(|| format!("invalid trace id {s:?}"))
}
