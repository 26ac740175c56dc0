//! Purpose: Run one complete transcript build from resolved settings.
//! Exports: `GenerateConfig`, `GenerateReport`, `generate`.
//! Role: Wires target resolution, session playback, rendering, sanitizing, and the final write.
//! Invariants: Setup checks run before any step; nothing is written on any error path.
//! Invariants: One working directory per build, removed afterwards unless kept.
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{Error, ErrorKind};
use crate::core::exec::ProcessExecutor;
use crate::core::persist::{check_destination, write_document};
use crate::core::sanitize::SubstitutionTable;
use crate::core::session::Session;
use crate::core::transcript::{append_provenance, fetch_identity, render};
use crate::script::{Placeholders, Script};
use crate::target::Target;

#[derive(Clone, Debug)]
pub struct GenerateConfig {
    pub target: PathBuf,
    pub output: PathBuf,
    pub script: Option<PathBuf>,
    pub alias: Option<String>,
    pub shell: PathBuf,
    pub step_timeout: Option<Duration>,
    pub keep_workdir: bool,
}

impl GenerateConfig {
    pub fn new(target: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            output: output.into(),
            script: None,
            alias: None,
            shell: PathBuf::from(ProcessExecutor::default_shell()),
            step_timeout: None,
            keep_workdir: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateReport {
    pub identity: String,
    pub steps: usize,
    pub bytes: usize,
    pub kept_workdir: Option<PathBuf>,
}

pub fn generate(config: &GenerateConfig) -> Result<GenerateReport, Error> {
    let mut target = Target::resolve(&config.target)?;
    if let Some(alias) = &config.alias {
        target = target.with_alias(alias.clone());
    }
    check_destination(&config.output)?;
    let script = match &config.script {
        Some(path) => Script::load(path)?,
        None => Script::builtin_demo()?,
    };
    target.preflight(&config.shell)?;

    let workdir = tempfile::Builder::new()
        .prefix("clidocgen-")
        .tempdir()
        .map_err(|err| {
            Error::new(ErrorKind::Setup)
                .with_message("failed to create working directory")
                .with_source(err)
        })?;
    tracing::debug!(workdir = %workdir.path().display(), "created working directory");

    let result = build(config, &target, &script, workdir.path());

    if config.keep_workdir {
        let kept = workdir.keep();
        tracing::warn!(workdir = %kept.display(), "working directory kept; remove it when done");
        return result.map(|report| GenerateReport {
            kept_workdir: Some(kept),
            ..report
        });
    }
    result
}

fn build(
    config: &GenerateConfig,
    target: &Target,
    script: &Script,
    workdir: &Path,
) -> Result<GenerateReport, Error> {
    let executor = ProcessExecutor::new()
        .with_shell(&config.shell)
        .with_timeout(config.step_timeout);
    let placeholders = Placeholders::new(target.invocation_argv(), workdir);

    let mut session = Session::new(&executor);
    script.play(&mut session, &placeholders)?;
    let sealed = session.seal()?;

    let identity = fetch_identity(&executor, &target.version_command())?;
    let doc = append_provenance(render(sealed.get_all()), &identity);
    let table =
        SubstitutionTable::for_target(&target.invocation(), target.alias(), target.path(), workdir);
    let doc = table.apply(&doc);

    write_document(&config.output, &doc)?;
    Ok(GenerateReport {
        identity,
        steps: sealed.get_all().len(),
        bytes: doc.len(),
        kept_workdir: None,
    })
}
