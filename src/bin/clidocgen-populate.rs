//! Purpose: Populate an example archive by running a step script against the target.
//! Role: Convenience binary sharing the transcript build's execution and failure policy.
//! Invariants: Command output is discarded; only failures are reported.
//! Invariants: Exit codes match `clidocgen` for the same error kinds.
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueHint, error::ErrorKind as ClapErrorKind};
use clidocgen::core::error::{Error, ErrorKind, to_exit_code};
use clidocgen::core::exec::ProcessExecutor;
use clidocgen::populate::Populator;
use clidocgen::report::{ColorMode, emit_error, init_tracing};
use clidocgen::script::{Placeholders, Script};
use clidocgen::target::Target;

#[derive(Parser)]
#[command(
    name = "clidocgen-populate",
    version,
    about = "Fill an example archive by running a step script against a CLI"
)]
struct Cli {
    #[arg(help = "Program that writes the archive", value_hint = ValueHint::FilePath)]
    target: PathBuf,

    #[arg(help = "Archive to create (replaced if it exists)", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    #[arg(long, help = "Step script; commands may use {target}, {workdir}, {output}", value_hint = ValueHint::FilePath)]
    script: PathBuf,

    #[arg(long, default_value = ProcessExecutor::default_shell(), value_hint = ValueHint::CommandName)]
    shell: PathBuf,

    #[arg(long, value_name = "SECS")]
    step_timeout: Option<u64>,

    #[arg(long, help = "Keep the scratch directory and log its path")]
    keep_workdir: bool,

    #[arg(long, default_value = "auto", value_enum)]
    color: ColorMode,
}

fn main() {
    init_tracing();
    let exit_code = match run(std::env::args_os()) {
        Ok(()) => 0,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run<I>(args: I) -> Result<(), (Error, ColorMode)>
where
    I: IntoIterator<Item = OsString>,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                return err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                });
            }
            _ => {
                let summary = err
                    .to_string()
                    .lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .map(|line| line.trim_start_matches("error:").trim().to_string())
                    .unwrap_or_else(|| "invalid arguments".to_string());
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(summary)
                        .with_hint("Try `clidocgen-populate --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };
    let color_mode = cli.color;
    populate(cli).map_err(|err| (err, color_mode))
}

fn populate(cli: Cli) -> Result<(), Error> {
    let target = Target::resolve(&cli.target)?;
    let script = Script::load(&cli.script)?;
    target.preflight(&cli.shell)?;
    let output = std::path::absolute(&cli.output).map_err(|err| {
        Error::new(ErrorKind::Setup)
            .with_message("failed to resolve output path")
            .with_path(&cli.output)
            .with_source(err)
    })?;

    let workdir = tempfile::Builder::new()
        .prefix("clidocgen-populate-")
        .tempdir()
        .map_err(|err| {
            Error::new(ErrorKind::Setup)
                .with_message("failed to create working directory")
                .with_source(err)
        })?;

    let executor = ProcessExecutor::new()
        .with_shell(&cli.shell)
        .with_timeout(cli.step_timeout.map(Duration::from_secs));
    let placeholders =
        Placeholders::new(target.invocation_argv(), workdir.path()).with_output(&output);
    let result = Populator::new(&executor, &output).run(&script, &placeholders);

    if cli.keep_workdir {
        let kept = workdir.keep();
        tracing::warn!(workdir = %kept.display(), "working directory kept; remove it when done");
    }
    let report = result?;
    tracing::info!(
        output = %output.display(),
        executed = report.executed,
        tolerated_failures = report.tolerated_failures,
        "example archive populated"
    );
    Ok(())
}
