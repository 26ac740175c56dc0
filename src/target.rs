//! Purpose: Resolve the program being documented and how to invoke it.
//! Exports: `Target`, `TargetKind`.
//! Role: Setup-phase checks; everything here fails before any step runs.
//! Invariants: Target paths are absolute but symlinks are not resolved.
//! Invariants: `.jar` targets run through `java -jar`; everything else runs directly.
use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind};
use crate::core::exec::CommandLine;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TargetKind {
    Jar,
    Executable,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Target {
    path: PathBuf,
    kind: TargetKind,
    alias: String,
}

impl Target {
    pub fn resolve(path: &Path) -> Result<Self, Error> {
        if path.as_os_str().is_empty() {
            return Err(Error::new(ErrorKind::Setup)
                .with_message("target must be specified as the first argument"));
        }
        let absolute = std::path::absolute(path).map_err(|err| {
            Error::new(ErrorKind::Setup)
                .with_message("failed to resolve target path")
                .with_path(path)
                .with_source(err)
        })?;
        if !absolute.is_file() {
            return Err(Error::new(ErrorKind::Setup)
                .with_message("target does not exist")
                .with_path(absolute));
        }

        let kind = match absolute.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jar") => TargetKind::Jar,
            _ => TargetKind::Executable,
        };
        let alias = default_alias(&absolute);
        Ok(Self {
            path: absolute,
            kind,
            alias,
        })
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Argument vector that starts every invocation of the target.
    pub fn invocation_argv(&self) -> Vec<String> {
        let path = self.path.to_string_lossy().to_string();
        match self.kind {
            TargetKind::Jar => vec!["java".to_string(), "-jar".to_string(), path],
            TargetKind::Executable => vec![path],
        }
    }

    /// The prefix as it appears in shell lines and in the transcript.
    pub fn invocation(&self) -> String {
        self.invocation_argv().join(" ")
    }

    pub fn version_command(&self) -> CommandLine {
        CommandLine::shell(format!("{} --version", self.invocation()))
    }

    /// Confirms the helper programs the build relies on are available.
    pub fn preflight(&self, shell: &Path) -> Result<(), Error> {
        if self.kind == TargetKind::Jar {
            which::which("java").map_err(|err| {
                Error::new(ErrorKind::Setup)
                    .with_message("java is required to run jar targets")
                    .with_hint("Install a JRE or put `java` on PATH.")
                    .with_source(err)
            })?;
        }
        which::which(shell).map_err(|err| {
            Error::new(ErrorKind::Setup)
                .with_message("shell is not available")
                .with_path(shell)
                .with_source(err)
        })?;
        Ok(())
    }
}

fn default_alias(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    match stem.split('-').next() {
        Some(head) if !head.is_empty() => head.to_string(),
        _ => stem,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{Target, TargetKind};
    use crate::core::error::ErrorKind;

    #[test]
    fn jar_target_runs_through_java() {
        let temp = tempfile::tempdir().expect("tempdir");
        let jar = temp.path().join("bunkr-cli-0.9.1.jar");
        std::fs::write(&jar, b"PK").expect("write");

        let target = Target::resolve(&jar).expect("resolve");
        assert_eq!(target.kind(), TargetKind::Jar);
        assert_eq!(target.alias(), "bunkr");
        assert_eq!(
            target.invocation(),
            format!("java -jar {}", jar.display())
        );
        assert_eq!(
            target.version_command().to_string(),
            format!("java -jar {} --version", jar.display())
        );
    }

    #[test]
    fn executable_target_runs_directly() {
        let temp = tempfile::tempdir().expect("tempdir");
        let exe = temp.path().join("tool");
        std::fs::write(&exe, b"#!/bin/sh\n").expect("write");

        let target = Target::resolve(&exe).expect("resolve").with_alias("t");
        assert_eq!(target.kind(), TargetKind::Executable);
        assert_eq!(target.alias(), "t");
        assert_eq!(target.invocation_argv(), vec![exe.display().to_string()]);
    }

    #[test]
    fn missing_target_is_setup_error() {
        let err = Target::resolve(Path::new("/no/such/target.jar")).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::Setup);

        let err = Target::resolve(Path::new("")).expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::Setup);
    }

    #[test]
    fn resolved_path_is_absolute() {
        let temp = tempfile::tempdir().expect("tempdir");
        let exe = temp.path().join("tool");
        std::fs::write(&exe, b"").expect("write");
        let target = Target::resolve(&exe).expect("resolve");
        assert!(target.path().is_absolute());
    }

    #[test]
    fn unavailable_shell_fails_preflight() {
        let temp = tempfile::tempdir().expect("tempdir");
        let exe = temp.path().join("tool");
        std::fs::write(&exe, b"").expect("write");
        let target = Target::resolve(&exe).expect("resolve");
        let err = target
            .preflight(Path::new("/no/such/shell"))
            .expect_err("missing shell");
        assert_eq!(err.kind(), ErrorKind::Setup);
    }
}
