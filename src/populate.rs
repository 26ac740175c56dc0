//! Purpose: Fill a sample archive by running a script's commands with output discarded.
//! Exports: `Populator`, `PopulateReport`.
//! Role: Lighter sibling of the transcript build; shares `run_checked` for failure policy.
//! Invariants: A pre-existing output archive is removed before the first command runs.
//! Invariants: Documentation steps are skipped; nothing is rendered.
use std::path::PathBuf;

use crate::core::error::{Error, ErrorKind};
use crate::core::exec::Execute;
use crate::core::session::run_checked;
use crate::script::{Placeholders, Script};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PopulateReport {
    pub executed: usize,
    pub tolerated_failures: usize,
}

pub struct Populator<E> {
    executor: E,
    output: PathBuf,
}

impl<E: Execute> Populator<E> {
    pub fn new(executor: E, output: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            output: output.into(),
        }
    }

    pub fn run(&self, script: &Script, placeholders: &Placeholders) -> Result<PopulateReport, Error> {
        let commands = script.commands(placeholders)?;
        self.remove_stale_output()?;

        let mut report = PopulateReport::default();
        for (command, options) in commands {
            let result = run_checked(&self.executor, &command, options.allow_fail)?;
            report.executed += 1;
            if !result.success() {
                report.tolerated_failures += 1;
            }
        }
        Ok(report)
    }

    fn remove_stale_output(&self) -> Result<(), Error> {
        if !self.output.exists() {
            return Ok(());
        }
        tracing::info!(path = %self.output.display(), "removing old example archive");
        std::fs::remove_file(&self.output).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to remove old example archive")
                .with_path(&self.output)
                .with_source(err)
        })
    }
}
