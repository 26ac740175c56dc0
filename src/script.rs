//! Purpose: Load step scripts (JSON manifests) and play them into a session.
//! Exports: `Script`, `ScriptStep`, `RunSpec`, `Placeholders`, `SCRIPT_VERSION`.
//! Role: Keeps the narrative of a transcript out of Rust code.
//! Invariants: Steps play strictly in file order; the first fatal step stops playback.
//! Invariants: Placeholders expand in commands only; documentation text is verbatim.
use std::path::Path;

use serde::Deserialize;

use crate::core::error::{Error, ErrorKind};
use crate::core::exec::{CommandLine, Execute};
use crate::core::session::{CommandOptions, Session};

pub const SCRIPT_VERSION: u64 = 0;

const BUILTIN_DEMO: &str = include_str!("../scripts/cli_demo.json");

const TARGET_TOKEN: &str = "{target}";
const WORKDIR_TOKEN: &str = "{workdir}";
const OUTPUT_TOKEN: &str = "{output}";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Script {
    pub script_version: u64,
    pub steps: Vec<ScriptStep>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ScriptStep {
    Doc(DocStep),
    Run(RunStep),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DocStep {
    pub doc: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RunStep {
    pub run: RunSpec,
    #[serde(default)]
    pub allow_fail: bool,
    #[serde(default)]
    pub no_output: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RunSpec {
    Line(String),
    Argv(Vec<String>),
}

impl Script {
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let script: Script = serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid step script: {err}"))
                .with_hint("Each step is {\"doc\": ...} or {\"run\": ..., \"allow_fail\"?, \"no_output\"?}.")
        })?;
        if script.script_version != SCRIPT_VERSION {
            return Err(Error::new(ErrorKind::Usage).with_message(format!(
                "unsupported script_version: {}",
                script.script_version
            )));
        }
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::Setup)
                .with_message("failed to read step script")
                .with_path(path)
                .with_source(err)
        })?;
        Self::from_json(&text).map_err(|err| err.with_path(path))
    }

    /// The walkthrough used when no script is given on the command line.
    pub fn builtin_demo() -> Result<Self, Error> {
        Self::from_json(BUILTIN_DEMO)
    }

    /// Expanded commands in order, with their policy flags.
    pub fn commands(
        &self,
        placeholders: &Placeholders,
    ) -> Result<Vec<(CommandLine, CommandOptions)>, Error> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                ScriptStep::Run(run) => Some(run),
                ScriptStep::Doc(_) => None,
            })
            .map(|run| -> Result<(CommandLine, CommandOptions), Error> {
                let command = placeholders.expand(&run.run)?;
                let options = CommandOptions::new()
                    .allow_fail(run.allow_fail)
                    .suppress_output(run.no_output);
                Ok((command, options))
            })
            .collect()
    }

    pub fn play<E: Execute>(
        &self,
        session: &mut Session<E>,
        placeholders: &Placeholders,
    ) -> Result<(), Error> {
        for step in &self.steps {
            match step {
                ScriptStep::Doc(doc) => session.add_documentation(doc.doc.clone())?,
                ScriptStep::Run(run) => {
                    let command = placeholders.expand(&run.run)?;
                    let options = CommandOptions::new()
                        .allow_fail(run.allow_fail)
                        .suppress_output(run.no_output);
                    session.add_command(command, options)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Placeholders {
    target: Vec<String>,
    workdir: String,
    output: Option<String>,
}

impl Placeholders {
    pub fn new(target: Vec<String>, workdir: &Path) -> Self {
        Self {
            target,
            workdir: workdir.to_string_lossy().to_string(),
            output: None,
        }
    }

    pub fn with_output(mut self, output: &Path) -> Self {
        self.output = Some(output.to_string_lossy().to_string());
        self
    }

    pub fn expand(&self, spec: &RunSpec) -> Result<CommandLine, Error> {
        match spec {
            RunSpec::Line(line) => Ok(CommandLine::Shell(self.expand_text(line)?)),
            RunSpec::Argv(args) => {
                let mut expanded = Vec::with_capacity(args.len());
                for arg in args {
                    if arg == TARGET_TOKEN {
                        expanded.extend(self.target.iter().cloned());
                    } else {
                        expanded.push(self.expand_text(arg)?);
                    }
                }
                Ok(CommandLine::Argv(expanded))
            }
        }
    }

    fn expand_text(&self, text: &str) -> Result<String, Error> {
        let mut out = text
            .replace(TARGET_TOKEN, &self.target.join(" "))
            .replace(WORKDIR_TOKEN, &self.workdir);
        if out.contains(OUTPUT_TOKEN) {
            let Some(output) = &self.output else {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("{output} is only available when populating an archive")
                    .with_command(text));
            };
            out = out.replace(OUTPUT_TOKEN, output);
        }
        Ok(out)
    }
}
