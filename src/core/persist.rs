//! Purpose: Validate the destination up front and write the finished document atomically.
//! Exports: `check_destination`, `write_document`.
//! Invariants: The destination either keeps its old contents or receives the full document.
//! Invariants: The temporary file lives next to the destination so the final rename stays on one filesystem.
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind};

fn parent_dir(dest: &Path) -> PathBuf {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub fn check_destination(dest: &Path) -> Result<(), Error> {
    if dest.as_os_str().is_empty() {
        return Err(Error::new(ErrorKind::Setup).with_message("output path is empty"));
    }
    if dest.is_dir() {
        return Err(Error::new(ErrorKind::Setup)
            .with_message("output path is a directory")
            .with_path(dest));
    }
    let parent = parent_dir(dest);
    if !parent.is_dir() {
        return Err(Error::new(ErrorKind::Setup)
            .with_message("output directory does not exist")
            .with_hint("Create the directory first or pick another output path.")
            .with_path(parent));
    }
    tempfile::NamedTempFile::new_in(&parent).map_err(|err| {
        Error::new(ErrorKind::Setup)
            .with_message("output directory is not writable")
            .with_path(&parent)
            .with_source(err)
    })?;
    Ok(())
}

pub fn write_document(dest: &Path, contents: &str) -> Result<(), Error> {
    let parent = parent_dir(dest);
    let mut file = tempfile::NamedTempFile::new_in(&parent).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to create temporary output file")
            .with_path(&parent)
            .with_source(err)
    })?;
    file.write_all(contents.as_bytes()).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write document")
            .with_path(dest)
            .with_source(err)
    })?;
    // NamedTempFile is created 0600; the transcript is a shared document.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to set document permissions")
                    .with_path(dest)
                    .with_source(err)
            })?;
    }
    file.persist(dest).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to move document into place")
            .with_path(dest)
            .with_source(err.error)
    })?;
    tracing::info!(path = %dest.display(), bytes = contents.len(), "wrote document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check_destination, write_document};
    use crate::core::error::ErrorKind;

    #[test]
    fn writes_and_replaces_document() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dest = temp.path().join("CLI.md");
        write_document(&dest, "first").expect("write");
        write_document(&dest, "second").expect("rewrite");
        assert_eq!(std::fs::read_to_string(&dest).expect("read"), "second");

        let leftovers = std::fs::read_dir(temp.path()).expect("read_dir").count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn missing_parent_is_setup_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dest = temp.path().join("nope").join("CLI.md");
        let err = check_destination(&dest).expect_err("missing parent");
        assert_eq!(err.kind(), ErrorKind::Setup);
        assert!(!dest.exists());
    }

    #[test]
    fn directory_destination_is_setup_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = check_destination(temp.path()).expect_err("directory");
        assert_eq!(err.kind(), ErrorKind::Setup);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unwritable_directory_is_setup_error() {
        // procfs refuses new files even for root.
        let err = check_destination(std::path::Path::new("/proc/CLI.md")).expect_err("unwritable");
        assert_eq!(err.kind(), ErrorKind::Setup);
        assert_eq!(err.message(), Some("output directory is not writable"));
    }

    #[test]
    fn writability_check_leaves_no_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        check_destination(&temp.path().join("CLI.md")).expect("writable");
        assert_eq!(std::fs::read_dir(temp.path()).expect("read_dir").count(), 0);
    }

    #[test]
    fn bare_file_name_uses_current_dir() {
        check_destination(std::path::Path::new("CLI.md")).expect("relative");
    }
}
