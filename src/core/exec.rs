//! Purpose: Run one command line as a child process and capture its combined output.
//! Exports: `CommandLine`, `ExecOutput`, `Execute`, `ProcessExecutor`, `normalize_exit_code`.
//! Role: The single platform-specific seam; sessions only see `Execute`.
//! Invariants: stdout and stderr share one capture file, so interleaving follows write order.
//! Invariants: stdin is never connected; a child reading stdin sees EOF.
//! Invariants: Exit codes are reported as 8-bit values.
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::error::{Error, ErrorKind};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[cfg(unix)]
const DEFAULT_SHELL: &str = "/bin/sh";
#[cfg(unix)]
const SHELL_FLAG: &str = "-c";
#[cfg(windows)]
const DEFAULT_SHELL: &str = "cmd";
#[cfg(windows)]
const SHELL_FLAG: &str = "/C";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandLine {
    /// A literal line handed to the shell.
    Shell(String),
    /// A program plus arguments, executed without a shell.
    Argv(Vec<String>),
}

impl CommandLine {
    pub fn shell(line: impl Into<String>) -> Self {
        CommandLine::Shell(line.into())
    }

    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandLine::Argv(args.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Shell(line) => f.write_str(line),
            CommandLine::Argv(args) => {
                let rendered = args
                    .iter()
                    .map(|arg| {
                        if arg.contains(' ') {
                            format!("\"{arg}\"")
                        } else {
                            arg.clone()
                        }
                    })
                    .collect::<Vec<_>>();
                f.write_str(&rendered.join(" "))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: u8,
    /// Combined stdout+stderr with trailing whitespace trimmed.
    pub output: String,
    /// Terminating signal, when the child did not exit on its own.
    pub signal: Option<i32>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

pub trait Execute {
    fn execute(&self, command: &CommandLine) -> Result<ExecOutput, Error>;
}

impl<E: Execute + ?Sized> Execute for &E {
    fn execute(&self, command: &CommandLine) -> Result<ExecOutput, Error> {
        (**self).execute(command)
    }
}

/// Masks a raw status value down to the 8 bits a shell reports.
pub fn normalize_exit_code(raw: i32) -> u8 {
    (raw & 0xFF) as u8
}

#[derive(Clone, Debug)]
pub struct ProcessExecutor {
    shell: PathBuf,
    current_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            current_dir: None,
            timeout: None,
        }
    }

    pub fn default_shell() -> &'static str {
        DEFAULT_SHELL
    }

    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn build(&self, command: &CommandLine) -> Result<Command, Error> {
        let mut cmd = match command {
            CommandLine::Shell(line) => {
                let mut cmd = Command::new(&self.shell);
                cmd.arg(SHELL_FLAG).arg(line);
                cmd
            }
            CommandLine::Argv(args) => {
                let (program, rest) = args.split_first().ok_or_else(|| {
                    Error::new(ErrorKind::Usage).with_message("command argv is empty")
                })?;
                let mut cmd = Command::new(program);
                cmd.args(rest);
                cmd
            }
        };
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group, so a timeout can take down the shell's children too.
            cmd.process_group(0);
        }
        Ok(cmd)
    }
}

impl Execute for ProcessExecutor {
    fn execute(&self, command: &CommandLine) -> Result<ExecOutput, Error> {
        let line = command.to_string();
        let io_error = |err: io::Error, message: &str| {
            Error::new(ErrorKind::Io)
                .with_message(message.to_string())
                .with_command(line.clone())
                .with_source(err)
        };

        let mut capture =
            tempfile::tempfile().map_err(|err| io_error(err, "failed to create capture file"))?;
        let stdout = capture
            .try_clone()
            .map_err(|err| io_error(err, "failed to clone capture file"))?;
        let stderr = capture
            .try_clone()
            .map_err(|err| io_error(err, "failed to clone capture file"))?;

        let mut cmd = self.build(command)?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        let mut child = cmd
            .spawn()
            .map_err(|err| io_error(err, "failed to spawn command"))?;
        let status = wait_for(&mut child, self.timeout)
            .map_err(|err| io_error(err, "failed to wait for command"))?;
        drop(cmd);

        let output =
            read_capture(&mut capture).map_err(|err| io_error(err, "failed to read output"))?;
        tracing::debug!(command = %line, bytes = output.len(), "captured output");

        let Some(status) = status else {
            let timeout = self.timeout.unwrap_or_default();
            return Err(Error::new(ErrorKind::Timeout)
                .with_message(format!(
                    "command did not finish within {}s",
                    timeout.as_secs_f64()
                ))
                .with_hint("Raise --step-timeout or check that the command does not wait for input.")
                .with_command(line)
                .with_output(output));
        };

        let (exit_code, signal) = decode_status(status);
        Ok(ExecOutput {
            exit_code,
            output,
            signal,
        })
    }
}

fn wait_for(child: &mut Child, timeout: Option<Duration>) -> io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            kill_tree(child);
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

fn read_capture(capture: &mut File) -> io::Result<String> {
    capture.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    capture.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).trim_end().to_string())
}

#[cfg(unix)]
fn decode_status(status: ExitStatus) -> (u8, Option<i32>) {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => (normalize_exit_code(code), None),
        (None, Some(signal)) => (normalize_exit_code(128 + signal), Some(signal)),
        (None, None) => (1, None),
    }
}

#[cfg(not(unix))]
fn decode_status(status: ExitStatus) -> (u8, Option<i32>) {
    (status.code().map(normalize_exit_code).unwrap_or(1), None)
}
