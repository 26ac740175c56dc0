//! Purpose: Sequence documentation and command steps for one transcript build.
//! Exports: `Step`, `CommandStep`, `CommandOptions`, `Session`, `SealedSession`, `run_checked`.
//! Role: Session driver; owns the failure policy shared with the population driver.
//! Invariants: Commands run at registration time; a recorded step is never pending.
//! Invariants: The first non-tolerated failure aborts the session for good.
//! Invariants: Sealing consumes the session, so rendered steps cannot be mutated.
use crate::core::error::{Error, ErrorKind};
use crate::core::exec::{CommandLine, ExecOutput, Execute};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOptions {
    pub allow_fail: bool,
    pub suppress_output: bool,
}

impl CommandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_fail(mut self, allow_fail: bool) -> Self {
        self.allow_fail = allow_fail;
        self
    }

    pub fn suppress_output(mut self, suppress_output: bool) -> Self {
        self.suppress_output = suppress_output;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandStep {
    pub command: CommandLine,
    pub allow_fail: bool,
    pub suppress_output: bool,
    pub exit_code: u8,
    pub captured_output: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Documentation { text: String },
    Command(CommandStep),
}

impl From<&str> for CommandLine {
    fn from(line: &str) -> Self {
        CommandLine::Shell(line.to_string())
    }
}

impl From<String> for CommandLine {
    fn from(line: String) -> Self {
        CommandLine::Shell(line)
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(args: Vec<String>) -> Self {
        CommandLine::Argv(args)
    }
}

/// Runs one command and applies the fail-fast policy.
///
/// A non-zero exit is returned as `ErrorKind::StepFailed` unless `allow_fail`
/// is set, in which case the output is handed back like any other result.
pub fn run_checked<E: Execute>(
    executor: &E,
    command: &CommandLine,
    allow_fail: bool,
) -> Result<ExecOutput, Error> {
    tracing::info!(command = %command, "executing");
    let result = executor.execute(command)?;
    if result.success() {
        return Ok(result);
    }
    if !allow_fail {
        return Err(Error::new(ErrorKind::StepFailed)
            .with_message(format!("command failed with code {}", result.exit_code))
            .with_command(command.to_string())
            .with_exit_code(result.exit_code)
            .with_output(result.output));
    }
    match result.signal {
        Some(signal) => tracing::warn!(
            command = %command,
            exit_code = result.exit_code,
            signal,
            "tolerated command was terminated by a signal"
        ),
        None => tracing::warn!(
            command = %command,
            exit_code = result.exit_code,
            "tolerated non-zero exit"
        ),
    }
    Ok(result)
}

#[derive(Debug)]
pub struct Session<E> {
    executor: E,
    steps: Vec<Step>,
    aborted: bool,
}

impl<E: Execute> Session<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            steps: Vec::new(),
            aborted: false,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn add_documentation(&mut self, text: impl Into<String>) -> Result<(), Error> {
        self.ensure_live()?;
        self.steps.push(Step::Documentation { text: text.into() });
        Ok(())
    }

    pub fn add_command(
        &mut self,
        command: impl Into<CommandLine>,
        options: CommandOptions,
    ) -> Result<&CommandStep, Error> {
        self.ensure_live()?;
        let command = command.into();
        let result = match run_checked(&self.executor, &command, options.allow_fail) {
            Ok(result) => result,
            Err(err) => {
                self.aborted = true;
                return Err(err);
            }
        };

        self.steps.push(Step::Command(CommandStep {
            command,
            allow_fail: options.allow_fail,
            suppress_output: options.suppress_output,
            exit_code: result.exit_code,
            captured_output: result.output,
        }));
        match self.steps.last() {
            Some(Step::Command(step)) => Ok(step),
            _ => Err(Error::new(ErrorKind::Internal).with_message("command step was not recorded")),
        }
    }

    pub fn seal(self) -> Result<SealedSession, Error> {
        self.ensure_live()?;
        Ok(SealedSession { steps: self.steps })
    }

    fn ensure_live(&self) -> Result<(), Error> {
        if self.aborted {
            return Err(Error::new(ErrorKind::Aborted)
                .with_message("session was aborted by a failed command"));
        }
        Ok(())
    }
}

/// A finished session. Steps can be read any number of times but never changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedSession {
    steps: Vec<Step>,
}

impl SealedSession {
    pub fn get_all(&self) -> &[Step] {
        &self.steps
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use crate::core::error::Error;
    use crate::core::exec::{CommandLine, ExecOutput, Execute};

    /// Replays queued results and records every command it was asked to run.
    #[derive(Default)]
    pub(crate) struct ScriptedExecutor {
        results: RefCell<VecDeque<ExecOutput>>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedExecutor {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn push(self, exit_code: u8, output: &str) -> Self {
            self.results.borrow_mut().push_back(ExecOutput {
                exit_code,
                output: output.to_string(),
                signal: None,
            });
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl Execute for ScriptedExecutor {
        fn execute(&self, command: &CommandLine) -> Result<ExecOutput, Error> {
            self.calls.borrow_mut().push(command.to_string());
            Ok(self.results.borrow_mut().pop_front().unwrap_or(ExecOutput {
                exit_code: 0,
                output: String::new(),
                signal: None,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedExecutor;
    use super::{CommandOptions, Session, Step};
    use crate::core::error::ErrorKind;

    #[test]
    fn commands_run_at_registration() {
        let exec = ScriptedExecutor::new().push(0, "hi");
        let mut session = Session::new(&exec);
        session.add_documentation("# Title").expect("doc");
        let step = session
            .add_command("echo hi", CommandOptions::new())
            .expect("command");
        assert_eq!(step.captured_output, "hi");
        assert_eq!(step.exit_code, 0);
        assert_eq!(exec.calls(), vec!["echo hi".to_string()]);
    }

    #[test]
    fn non_tolerated_failure_stops_before_next_step() {
        let exec = ScriptedExecutor::new()
            .push(0, "")
            .push(2, "boom")
            .push(0, "never");
        let mut session = Session::new(&exec);
        session.add_command("first", CommandOptions::new()).expect("first");

        let err = session
            .add_command("second", CommandOptions::new())
            .expect_err("second fails");
        assert_eq!(err.kind(), ErrorKind::StepFailed);
        assert_eq!(err.command(), Some("second"));
        assert_eq!(err.exit_code(), Some(2));
        assert_eq!(err.output(), Some("boom"));
        assert!(session.is_aborted());

        let err = session
            .add_command("third", CommandOptions::new())
            .expect_err("aborted");
        assert_eq!(err.kind(), ErrorKind::Aborted);
        assert_eq!(exec.calls(), vec!["first".to_string(), "second".to_string()]);

        let err = session.add_documentation("late").expect_err("aborted");
        assert_eq!(err.kind(), ErrorKind::Aborted);
        assert_eq!(session.seal().expect_err("sealed").kind(), ErrorKind::Aborted);
    }

    #[test]
    fn tolerated_failure_is_recorded_and_build_continues() {
        let exec = ScriptedExecutor::new().push(1, "usage: tool").push(0, "ok");
        let mut session = Session::new(&exec);
        let step = session
            .add_command("tool --help", CommandOptions::new().allow_fail(true))
            .expect("tolerated");
        assert_eq!(step.exit_code, 1);
        assert_eq!(step.captured_output, "usage: tool");

        session.add_command("next", CommandOptions::new()).expect("next");
        let sealed = session.seal().expect("seal");
        assert_eq!(sealed.get_all().len(), 2);
        assert_eq!(exec.calls().len(), 2);
    }

    #[test]
    fn sealed_steps_keep_registration_order() {
        let exec = ScriptedExecutor::new();
        let mut session = Session::new(&exec);
        session.add_documentation("a").expect("a");
        session
            .add_command("b", CommandOptions::new().suppress_output(true))
            .expect("b");
        session.add_documentation("c").expect("c");
        let sealed = session.seal().expect("seal");

        let kinds = sealed
            .get_all()
            .iter()
            .map(|step| match step {
                Step::Documentation { text } => format!("doc:{text}"),
                Step::Command(cmd) => format!("cmd:{}:{}", cmd.command, cmd.suppress_output),
            })
            .collect::<Vec<_>>();
        assert_eq!(kinds, vec!["doc:a", "cmd:b:true", "doc:c"]);
    }
}
