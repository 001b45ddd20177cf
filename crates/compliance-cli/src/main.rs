#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "test-only assertions use panic-based macros on deterministic fixtures"
    )
)]
// compliance-cli/src/main.rs
// ============================================================================
// Module: Compliance CLI Entry Point
// Description: The `assessor` binary: reads MOF-style resource blocks, drives
// them through `compliance-core::Engine`, and renders the result.
// Purpose: Implement spec.md §6.1's CLI surface end to end.
// Dependencies: clap, compliance-core, compliance-builtins, compliance-config,
// compliance-logic, tracing, tracing-subscriber.
// ============================================================================

//! ## Overview
//! `assessor` wires the whole pipeline together: read input (file or stdin,
//! bounded in size), parse it into [`compliance_core::Resource`] values with
//! [`compliance_core::ResourceReader`], filter by `--section`, drive each
//! resource through the four-verb [`compliance_core::Engine`], and render the
//! per-rule results with whichever [`compliance_core::ResultFormatter`]
//! `--format` selected. Exit code `0` means the run's aggregate status is
//! `Compliant`; any other status, or any error encountered along the way, is
//! exit code `1`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use compliance_builtins::BUILTINS;
use compliance_config::EngineConfig;
use compliance_core::CompactListFormatter;
use compliance_core::DebugFormatter;
use compliance_core::Engine;
use compliance_core::FormatEntry;
use compliance_core::JsonFormatter;
use compliance_core::MmiSetOutcome;
use compliance_core::NestedListFormatter;
use compliance_core::ParameterDictionary;
use compliance_core::ResourceReader;
use compliance_core::ResultFormatter;
use compliance_core::SystemContext;
use compliance_logic::fold_all_of;
use thiserror::Error;

/// Maximum accepted size, in bytes, of a MOF input document (file or stdin).
const MAX_INPUT_BYTES: usize = 8 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition: `assessor [flags] audit|remediate [<input>]`.
#[derive(Parser, Debug)]
#[command(name = "assessor", disable_help_subcommand = true, arg_required_else_help = true)]
struct Cli {
    /// Emit info-level progress to stderr (or `--log-file`).
    #[arg(long, global = true)]
    verbose: bool,
    /// Emit debug-level progress, including per-builtin evidence.
    #[arg(long, global = true)]
    debug: bool,
    /// Append tracing output to this file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,
    /// Result rendering.
    #[arg(long, value_enum, default_value = "nested-list", global = true)]
    format: OutputFormat,
    /// Only evaluate rules whose benchmark section starts with this prefix.
    #[arg(long, value_name = "PREFIX", global = true)]
    section: Option<String>,
    /// Selected subcommand.
    #[command(subcommand)]
    command: Commands,
}

/// The two dispatch actions the CLI can drive an engine through.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Audit every matching rule; no remediation is attempted.
    Audit(InputArgs),
    /// Overlay parameters and evaluate the remediate branch of every matching rule.
    Remediate(InputArgs),
}

/// Shared arguments for `audit`/`remediate`.
#[derive(clap::Args, Debug)]
struct InputArgs {
    /// Path to a MOF input file. Absent means read from stdin.
    input: Option<PathBuf>,
}

/// `--format` values, per spec.md §6.4.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    /// Two-space-indented tree, one line per node.
    NestedList,
    /// One `"<rule> <STATUS>"` line per rule plus an aggregate line.
    CompactList,
    /// A single JSON object keyed by rule.
    Json,
    /// Nested list annotated with resolved parameters and an action header.
    Debug,
}

impl OutputFormat {
    /// Builds the formatter this variant selects.
    fn build(self) -> Box<dyn ResultFormatter> {
        match self {
            Self::NestedList => Box::new(NestedListFormatter::new()),
            Self::CompactList => Box::new(CompactListFormatter::new()),
            Self::Json => Box::new(JsonFormatter::new()),
            Self::Debug => Box::new(DebugFormatter::new()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// CLI result alias.
type CliResult<T> = Result<T, CliError>;

/// Errors from the bounded input reader.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// The underlying file or stream I/O failed.
    #[error("failed to read input: {0}")]
    Io(std::io::Error),
    /// The input exceeded [`MAX_INPUT_BYTES`].
    #[error("input exceeds the {limit}-byte limit ({size} bytes read)")]
    TooLarge {
        /// Bytes actually read before the limit tripped.
        size: usize,
        /// The configured limit.
        limit: usize,
    },
}

impl From<ReadLimitError> for CliError {
    fn from(value: ReadLimitError) -> Self {
        Self::new(value.to_string())
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments, wires the pipeline, and runs the selected action.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let (action, input_args) = match &cli.command {
        Commands::Audit(args) => ("audit", args),
        Commands::Remediate(args) => ("remediate", args),
    };

    let text = read_input(input_args.input.as_deref())?;
    let config = EngineConfig::load(None).map_err(|err| CliError::new(err.to_string()))?;

    if action == "remediate" && !config.remediation_enabled {
        return Err(CliError::new("Remediation is disabled by configuration"));
    }

    let context = SystemContext::with_config(
        config.package_cache.fresh_secs,
        config.package_cache.stale_secs,
        config.uid_min_fallback,
    );
    let mut engine = Engine::new(&BUILTINS, config.remediation_enabled);
    let mut formatter = cli.format.build();
    formatter.begin(action).map_err(|err| CliError::new(err.to_string()))?;

    let mut statuses = Vec::new();
    let empty_params = ParameterDictionary::default();

    for resource in ResourceReader::new(&text) {
        let resource = resource.map_err(|err| CliError::new(err.to_string()))?;
        if let Some(prefix) = &cli.section {
            if !resource.benchmark_section.starts_with(prefix.as_str()) {
                continue;
            }
        }

        let rule = resource.rule_name.clone();
        let procedure_bytes =
            serde_json::to_vec(&resource.procedure).map_err(|err| CliError::new(err.to_string()))?;
        engine
            .mmi_set(&format!("procedure{rule}"), &procedure_bytes, &context)
            .map_err(|err| CliError::new(err.to_string()))?;

        if resource.has_init_audit {
            let payload = resource.payload.as_deref().unwrap_or_default();
            engine
                .mmi_set(&format!("init{rule}"), payload.as_bytes(), &context)
                .map_err(|err| CliError::new(err.to_string()))?;
        }

        let (status, indicator) = match action {
            "audit" => engine.mmi_get(&format!("audit{rule}"), &context).map_err(|err| CliError::new(err.to_string()))?,
            _ => {
                let payload = resource.payload.as_deref().unwrap_or_default();
                let outcome = engine
                    .mmi_set(&format!("remediate{rule}"), payload.as_bytes(), &context)
                    .map_err(|err| CliError::new(err.to_string()))?;
                match outcome {
                    MmiSetOutcome::Remediated(status, indicator) => (status, indicator),
                    MmiSetOutcome::ProcedureStored | MmiSetOutcome::ParamsOverlaid => {
                        return Err(CliError::new("remediate dispatch did not produce a verdict"));
                    }
                }
            }
        };

        let params = engine.parameters(&rule).unwrap_or(&empty_params);
        let entry = FormatEntry { rule: rule.as_str(), status: &status, indicator: &indicator, params };
        formatter.add_entry(&entry).map_err(|err| CliError::new(err.to_string()))?;
        statuses.push(status);
    }

    let aggregate = fold_all_of(statuses);
    let rendered = formatter.finish(&aggregate).map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&rendered)?;

    if aggregate.is_compliant() { Ok(ExitCode::SUCCESS) } else { Ok(ExitCode::FAILURE) }
}

// ============================================================================
// SECTION: Tracing Setup
// ============================================================================

/// Builds the `tracing_subscriber` layer per `--verbose`/`--debug`/`--log-file`.
fn init_tracing(cli: &Cli) -> CliResult<()> {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .map_err(|err| CliError::new(format!("invalid log level '{level}': {err}")))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| CliError::new(format!("failed to open log file '{}': {err}", path.display())))?;
            builder.with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

// ============================================================================
// SECTION: Bounded Input Reading
// ============================================================================

/// Reads MOF text from `path`, or from stdin when `path` is `None`, enforcing
/// [`MAX_INPUT_BYTES`].
fn read_input(path: Option<&Path>) -> CliResult<String> {
    let bytes = match path {
        Some(path) => read_file_with_limit(path, MAX_INPUT_BYTES)?,
        None => read_stdin_with_limit(MAX_INPUT_BYTES)?,
    };
    String::from_utf8(bytes).map_err(|err| CliError::new(format!("input is not valid UTF-8: {err}")))
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_file_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        let size = usize::try_from(size).unwrap_or(usize::MAX);
        return Err(ReadLimitError::TooLarge { size, limit: max_bytes });
    }
    read_bounded(file, max_bytes)
}

/// Reads standard input while enforcing a hard size limit.
fn read_stdin_with_limit(max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    read_bounded(std::io::stdin(), max_bytes)
}

/// Reads at most `max_bytes` plus one extra probe byte from `source`, failing
/// if the extra byte is actually present.
fn read_bounded<R: Read>(source: R, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let read_limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut limited = source.take(read_limit);
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge { size: bytes.len(), limit: max_bytes });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::read_bounded;
    use super::ReadLimitError;

    #[test]
    fn read_bounded_accepts_input_at_the_limit() {
        let data = b"12345";
        let bytes = read_bounded(&data[..], 5).expect("exactly at limit");
        assert_eq!(bytes, data);
    }

    #[test]
    fn read_bounded_rejects_input_over_the_limit() {
        let data = b"123456";
        let err = read_bounded(&data[..], 5).expect_err("over limit");
        assert!(matches!(err, ReadLimitError::TooLarge { size: 6, limit: 5 }));
    }
}
