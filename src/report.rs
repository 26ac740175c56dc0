//! Purpose: Shared stderr diagnostics and tracing setup for the binaries.
//! Exports: `ColorMode`, `emit_error`, `error_json`, `error_text`, `init_tracing`.
//! Role: The only place user-facing error text is formatted.
//! Invariants: TTY stderr gets human text; anything else gets one JSON object per error.
//! Invariants: Step errors always carry their command line and captured output.
use std::error::Error as StdError;
use std::io::{self, IsTerminal};

use clap::ValueEnum;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use crate::core::error::{Error, ErrorKind};

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .try_init();
}

pub fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Setup => "setup failed".to_string(),
        ErrorKind::StepFailed => "command failed".to_string(),
        ErrorKind::Timeout => "command timed out".to_string(),
        ErrorKind::Aborted => "session aborted".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

pub fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(command) = err.command() {
        inner.insert("command".to_string(), json!(command));
    }
    if let Some(exit_code) = err.exit_code() {
        inner.insert("exit_code".to_string(), json!(exit_code));
    }
    if let Some(output) = err.output() {
        inner.insert("output".to_string(), json!(output));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

pub fn error_text(err: &Error, use_color: bool) -> String {
    let label = |text: &str, color: AnsiColor| colorize_label(text, use_color, color);
    let mut lines = vec![format!(
        "{} {}",
        label("error:", AnsiColor::Red),
        error_message(err)
    )];

    if let Some(hint) = err.hint() {
        lines.push(format!("{} {hint}", label("hint:", AnsiColor::Yellow)));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            label("path:", AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(command) = err.command() {
        lines.push(format!("{} {command}", label("command:", AnsiColor::Yellow)));
    }
    if let Some(exit_code) = err.exit_code() {
        lines.push(format!("{} {exit_code}", label("exit code:", AnsiColor::Yellow)));
    }
    if let Some(output) = err.output() {
        lines.push(label("output:", AnsiColor::Yellow));
        if output.is_empty() {
            lines.push("  (no output)".to_string());
        }
        lines.extend(output.lines().map(|line| format!("  {line}")));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!("{} {cause}", label("caused by:", AnsiColor::Yellow)));
    }

    lines.join("\n")
}
