// src/exec/options.rs

//! Engine configuration and per-run options.

use std::path::{Path, PathBuf};

use super::pool::ProcPool;

/// Process-wide engine settings, passed explicitly to the [`Executor`].
///
/// [`Executor`]: super::Executor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecConfig {
    /// Log every command (rendered) before it runs.
    pub echo: bool,
    /// Bound on concurrently tracked async processes. `None` means
    /// "logical processors + 1".
    pub max_procs: Option<usize>,
}

/// Optional file paths for the three standard streams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectPaths {
    pub stdin: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
}

impl RedirectPaths {
    pub fn is_empty(&self) -> bool {
        self.stdin.is_none() && self.stdout.is_none() && self.stderr.is_none()
    }
}

/// Options for a single [`Executor::run`] or pipe-chain `begin`/`end`.
///
/// Supplying a pool selects async mode.
///
/// [`Executor::run`]: super::Executor::run
#[derive(Debug, Default)]
pub struct RunOptions<'a> {
    pub pool: Option<&'a mut ProcPool>,
    /// Overrides both [`ExecConfig::max_procs`] and the processor default.
    pub max_procs: Option<usize>,
    /// Do not reset the command after running it.
    pub keep: bool,
    pub redirect: RedirectPaths,
}

impl<'a> RunOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(mut self, pool: &'a mut ProcPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn max_procs(mut self, n: usize) -> Self {
        self.max_procs = Some(n);
        self
    }

    pub fn keep(mut self) -> Self {
        self.keep = true;
        self
    }

    pub fn stdin(mut self, path: impl AsRef<Path>) -> Self {
        self.redirect.stdin = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn stdout(mut self, path: impl AsRef<Path>) -> Self {
        self.redirect.stdout = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn stderr(mut self, path: impl AsRef<Path>) -> Self {
        self.redirect.stderr = Some(path.as_ref().to_path_buf());
        self
    }
}

/// Options for [`PipeChain::add_stage`].
///
/// [`PipeChain::add_stage`]: super::PipeChain::add_stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageOptions {
    /// Send this stage's stderr to the same place as its stdout.
    pub merge_stderr: bool,
    /// Do not reset the caller's command after copying it.
    pub keep: bool,
}

impl StageOptions {
    pub fn merged() -> Self {
        Self {
            merge_stderr: true,
            keep: false,
        }
    }
}
