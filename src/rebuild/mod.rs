// src/rebuild/mod.rs

//! Self-rebuilding driver.
//!
//! A build program calls [`SelfRebuild::run`] once at startup. If any of its
//! sources is newer than the running binary, the binary is moved to a
//! `.old` sibling, rebuilt in place by the external [`BuildTool`], and the
//! new binary is re-executed with the original arguments. The current
//! process then exits with the child's exit code.
//!
//! Once the old binary has been moved aside there is no safe way to hand
//! control back to the caller, so every failure past that point terminates
//! the process. The individual steps ([`SelfRebuild::rebuild`],
//! [`SelfRebuild::swap_and_build`], [`reexec`]) are public and return
//! errors instead, so they can be driven and tested on their own.

pub mod stale;
pub mod tool;

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, error, info, warn};

use crate::errors::RebuildError;
use crate::exec::{Executor, RunOptions};
use crate::fs::{FileSystem, RealFileSystem};

pub use stale::{expand_sources, needs_rebuild, needs_rebuild1};
pub use tool::BuildTool;

/// Path of the backup a binary is moved to while it is rebuilt.
pub fn backup_path(binary: &Path) -> PathBuf {
    let mut name = binary.as_os_str().to_os_string();
    name.push(".old");
    PathBuf::from(name)
}

#[derive(Debug)]
pub struct SelfRebuild<'a> {
    exec: &'a Executor,
    fs: Box<dyn FileSystem>,
    tool: BuildTool,
    sources: Vec<PathBuf>,
}

impl<'a> SelfRebuild<'a> {
    /// `sources` are files or flat directories of the build program's
    /// sources.
    pub fn new(exec: &'a Executor, tool: BuildTool, sources: Vec<PathBuf>) -> Self {
        Self::with_fs(exec, tool, sources, RealFileSystem)
    }

    pub fn with_fs(
        exec: &'a Executor,
        tool: BuildTool,
        sources: Vec<PathBuf>,
        fs: impl FileSystem + 'static,
    ) -> Self {
        Self {
            exec,
            fs: Box::new(fs),
            tool,
            sources,
        }
    }

    /// Rebuild and re-execute the running binary if it is stale.
    ///
    /// Returns normally when the binary is up to date, or when the running
    /// executable cannot be located. Otherwise it does not return: the
    /// process exits with the rebuilt binary's exit code, or with status 1
    /// on any failure.
    pub fn run(&self) {
        let binary = match std::env::current_exe() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "cannot locate running executable; skipping self-rebuild");
                return;
            }
        };

        match self.rebuild(&binary) {
            Ok(false) => return,
            Ok(true) => {}
            Err(e) => {
                error!(binary = %binary.display(), error = %e, "self-rebuild failed");
                std::process::exit(1);
            }
        }

        let args: Vec<OsString> = std::env::args_os().skip(1).collect();
        match reexec(&binary, &args) {
            Ok(code) => std::process::exit(code),
            Err(e) => {
                error!(binary = %binary.display(), error = %e, "could not run rebuilt binary");
                std::process::exit(1);
            }
        }
    }

    /// Rebuild `binary` if any source is newer. Returns whether it was
    /// rebuilt.
    pub fn rebuild(&self, binary: &Path) -> Result<bool, RebuildError> {
        let sources = expand_sources(self.fs.as_ref(), &self.sources, &self.tool.source_ext);
        debug!(binary = %binary.display(), sources = sources.len(), "checking whether binary is stale");

        if !needs_rebuild(self.fs.as_ref(), binary, &sources)? {
            debug!(binary = %binary.display(), "binary is up to date");
            return Ok(false);
        }

        info!(binary = %binary.display(), "sources changed; rebuilding");
        self.swap_and_build(binary)?;
        Ok(true)
    }

    /// Move `binary` to its `.old` backup and build a new one in its place.
    ///
    /// On build failure the backup is renamed back (best effort). On success
    /// the backup is deleted (best effort).
    pub fn swap_and_build(&self, binary: &Path) -> Result<(), RebuildError> {
        let old = backup_path(binary);
        let had_binary = self.fs.exists(binary);

        if had_binary {
            self.fs
                .rename(binary, &old)
                .map_err(|source| RebuildError::Rename {
                    from: binary.to_path_buf(),
                    to: old.clone(),
                    source,
                })?;
        }

        let mut build = self.tool.command(binary);
        if let Err(e) = self.exec.run(&mut build, RunOptions::default()) {
            if had_binary {
                if let Err(re) = self.fs.rename(&old, binary) {
                    error!(
                        backup = %old.display(),
                        binary = %binary.display(),
                        error = %re,
                        "could not restore previous binary"
                    );
                } else {
                    info!(binary = %binary.display(), "restored previous binary");
                }
            }
            return Err(RebuildError::Build(e));
        }

        if had_binary {
            if let Err(e) = self.fs.remove_file(&old) {
                warn!(backup = %old.display(), error = %e, "could not delete old binary");
            }
        }
        Ok(())
    }
}

/// Run `binary` with `args`, wait for it, and return its exit code.
///
/// A child terminated by a signal is reported as exit code 1.
pub fn reexec<S: AsRef<OsStr>>(binary: &Path, args: &[S]) -> Result<i32, RebuildError> {
    info!(binary = %binary.display(), "re-executing");
    let reexec_error = |source| RebuildError::Reexec {
        path: binary.to_path_buf(),
        source,
    };

    let mut child = Command::new(binary).args(args).spawn().map_err(reexec_error)?;
    let status = child.wait().map_err(reexec_error)?;
    Ok(status.code().unwrap_or(1))
}
