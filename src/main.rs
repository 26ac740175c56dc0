//! Purpose: `clidocgen` CLI entry point.
//! Role: Binary crate root; parses args, runs one transcript build, reports errors.
//! Invariants: Usage and setup problems are reported before any command runs.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `to_exit_code`.
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueHint, error::ErrorKind as ClapErrorKind};
use clidocgen::core::error::{Error, ErrorKind, to_exit_code};
use clidocgen::core::exec::ProcessExecutor;
use clidocgen::generate::{GenerateConfig, generate};
use clidocgen::report::{ColorMode, emit_error, init_tracing};

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
    name = "clidocgen",
    version,
    about = "Run a CLI through a scripted session and write a markdown transcript",
    long_about = None,
    after_help = r#"EXAMPLES
  $ clidocgen target/bunkr-cli.jar docs/CLI_USAGE.md
  $ clidocgen ./mytool docs/USAGE.md --script docs/usage-script.json --alias mytool

SCRIPTS
  A script is JSON: {"script_version": 0, "steps": [...]}
  Steps are {"doc": "markdown"} or {"run": "shell line" | ["argv", ...],
  "allow_fail": false, "no_output": false}.
  Commands may use {target} (how the program is invoked) and {workdir}
  (a scratch directory removed after the run)."#
)]
struct Cli {
    #[arg(help = "Program to document (.jar files run through `java -jar`)", value_hint = ValueHint::FilePath)]
    target: Option<PathBuf>,

    #[arg(help = "Markdown file to write", value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    #[arg(long, help = "Step script (default: built-in CLI walkthrough)", value_hint = ValueHint::FilePath)]
    script: Option<PathBuf>,

    #[arg(long, help = "Name that replaces the full invocation in the transcript")]
    alias: Option<String>,

    #[arg(
        long,
        default_value = ProcessExecutor::default_shell(),
        help = "Shell used for string commands",
        value_hint = ValueHint::CommandName
    )]
    shell: PathBuf,

    #[arg(long, value_name = "SECS", help = "Kill and fail any step running longer than this")]
    step_timeout: Option<u64>,

    #[arg(long, help = "Keep the scratch directory and log its path")]
    keep_workdir: bool,

    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,
}

fn main() {
    init_tracing();
    let exit_code = match run(std::env::args_os()) {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run<I>(args: I) -> Result<RunOutcome, (Error, ColorMode)>
where
    I: IntoIterator<Item = OsString>,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                return Ok(RunOutcome::with_code(0));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `clidocgen --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };
    let color_mode = cli.color;
    let config = config_from_cli(cli).map_err(|err| (err, color_mode))?;

    let report = generate(&config).map_err(|err| (err, color_mode))?;
    tracing::info!(
        identity = %report.identity,
        steps = report.steps,
        bytes = report.bytes,
        "transcript complete"
    );
    Ok(RunOutcome::ok())
}

fn config_from_cli(cli: Cli) -> Result<GenerateConfig, Error> {
    let target = cli.target.ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message("target must be specified as the first argument")
            .with_hint("Usage: clidocgen <TARGET> <OUTPUT>")
    })?;
    let output = cli.output.ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message("output file must be specified as the second argument")
            .with_hint("Usage: clidocgen <TARGET> <OUTPUT>")
    })?;

    let mut config = GenerateConfig::new(target, output);
    config.script = cli.script;
    config.alias = cli.alias;
    config.shell = cli.shell;
    config.step_timeout = cli.step_timeout.map(Duration::from_secs);
    config.keep_workdir = cli.keep_workdir;
    Ok(config)
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
