// src/exec/redirect.rs

//! Redirection files opened for one process invocation.
//!
//! Each handle is owned by exactly one [`Redirects`] value and is closed when
//! that value is dropped or [`Redirects::close`]d, so every exit path releases
//! it exactly once. The child receives duplicates of the descriptors.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::error;

use crate::errors::{ExecError, ExecResult};

use super::options::RedirectPaths;

#[derive(Debug)]
struct OpenFile {
    path: PathBuf,
    file: File,
}

impl OpenFile {
    fn stdio(&self) -> ExecResult<Stdio> {
        self.file
            .try_clone()
            .map(Stdio::from)
            .map_err(|source| redirect_error(&self.path, source))
    }
}

#[derive(Debug, Default)]
pub struct Redirects {
    stdin: Option<OpenFile>,
    stdout: Option<OpenFile>,
    stderr: Option<OpenFile>,
}

impl Redirects {
    /// Open every requested file.
    ///
    /// stdin is opened read-only and must exist; stdout and stderr are
    /// created or truncated. On failure, files opened so far are closed
    /// before the error is returned.
    pub fn open(paths: &RedirectPaths) -> ExecResult<Self> {
        let mut r = Redirects::default();
        if let Some(path) = &paths.stdin {
            r.stdin = Some(open_read(path)?);
        }
        if let Some(path) = &paths.stdout {
            r.stdout = Some(open_write(path)?);
        }
        if let Some(path) = &paths.stderr {
            r.stderr = Some(open_write(path)?);
        }
        Ok(r)
    }

    /// Open only the output redirections of `paths`.
    pub fn open_outputs(paths: &RedirectPaths) -> ExecResult<Self> {
        Self::open(&RedirectPaths {
            stdin: None,
            stdout: paths.stdout.clone(),
            stderr: paths.stderr.clone(),
        })
    }

    pub fn stdin(&self) -> ExecResult<Option<Stdio>> {
        self.stdin.as_ref().map(OpenFile::stdio).transpose()
    }

    pub fn stdout(&self) -> ExecResult<Option<Stdio>> {
        self.stdout.as_ref().map(OpenFile::stdio).transpose()
    }

    pub fn stderr(&self) -> ExecResult<Option<Stdio>> {
        self.stderr.as_ref().map(OpenFile::stdio).transpose()
    }

    pub fn has_stdout(&self) -> bool {
        self.stdout.is_some()
    }

    /// Number of handles still open.
    pub fn open_count(&self) -> usize {
        [&self.stdin, &self.stdout, &self.stderr]
            .iter()
            .filter(|f| f.is_some())
            .count()
    }

    /// Close every handle now. Idempotent.
    pub fn close(&mut self) {
        self.stdin = None;
        self.stdout = None;
        self.stderr = None;
    }
}

/// Open a file read-only, for use as a child's stdin.
pub(crate) fn open_stdin_file(path: &Path) -> ExecResult<File> {
    open_read(path).map(|f| f.file)
}

fn open_read(path: &Path) -> ExecResult<OpenFile> {
    File::open(path)
        .map(|file| OpenFile {
            path: path.to_path_buf(),
            file,
        })
        .map_err(|source| redirect_error(path, source))
}

fn open_write(path: &Path) -> ExecResult<OpenFile> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map(|file| OpenFile {
            path: path.to_path_buf(),
            file,
        })
        .map_err(|source| redirect_error(path, source))
}

fn redirect_error(path: &Path, source: std::io::Error) -> ExecError {
    error!(path = %path.display(), error = %source, "could not open redirect file");
    ExecError::Redirect {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_stdin_fails_and_closes_nothing_else() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RedirectPaths {
            stdin: Some(dir.path().join("nope.txt")),
            stdout: Some(dir.path().join("out.txt")),
            stderr: None,
        };

        match Redirects::open(&paths) {
            Err(ExecError::Redirect { path, .. }) => assert!(path.ends_with("nope.txt")),
            other => panic!("expected redirect error, got {other:?}"),
        }
        // stdin is opened first, so stdout was never created.
        assert!(!dir.path().join("out.txt").exists());
    }

    #[test]
    fn stdout_is_created_and_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        std::fs::write(&out, "old contents").unwrap();

        let paths = RedirectPaths {
            stdout: Some(out.clone()),
            stderr: Some(dir.path().join("err.txt")),
            ..Default::default()
        };
        let mut r = Redirects::open(&paths).unwrap();
        assert_eq!(r.open_count(), 2);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "");
        assert!(dir.path().join("err.txt").exists());

        r.close();
        assert_eq!(r.open_count(), 0);
        r.close();
        assert_eq!(r.open_count(), 0);
    }

    #[test]
    fn open_outputs_ignores_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RedirectPaths {
            stdin: Some(dir.path().join("does-not-exist")),
            stdout: Some(dir.path().join("out.txt")),
            stderr: None,
        };
        let r = Redirects::open_outputs(&paths).unwrap();
        assert_eq!(r.open_count(), 1);
        assert!(r.has_stdout());
    }
}
