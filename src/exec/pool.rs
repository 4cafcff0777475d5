// src/exec/pool.rs

//! Bounded collection of in-flight processes.
//!
//! The pool itself never blocks on insertion. Backpressure is applied by the
//! caller ([`Executor::run`] and [`PipeChain::end`]): when the pool already
//! holds as many entries as the concurrency bound allows, it is flushed
//! before the next process is spawned.
//!
//! [`Executor::run`]: super::Executor::run
//! [`PipeChain::end`]: super::PipeChain::end

use std::process::{Child, ExitStatus};

use tracing::{debug, error, warn};

use crate::errors::{ExecError, ExecResult};

use super::redirect::Redirects;

/// A spawned process plus the redirect handles opened for it.
#[derive(Debug)]
pub struct TrackedProcess {
    child: Child,
    redirects: Redirects,
    cmd: String,
    status: Option<ExitStatus>,
}

impl TrackedProcess {
    pub(crate) fn new(child: Child, redirects: Redirects, cmd: String) -> Self {
        Self {
            child,
            redirects,
            cmd,
            status: None,
        }
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Rendered command line, for diagnostics.
    pub fn command(&self) -> &str {
        &self.cmd
    }

    pub fn open_redirects(&self) -> usize {
        self.redirects.open_count()
    }

    /// Exit status, once waited.
    pub fn status(&self) -> Option<ExitStatus> {
        self.status
    }

    /// Wait for the process and close its redirect handles, whatever the
    /// outcome of the wait. Returns `true` on a successful exit.
    pub(crate) fn wait_and_close(&mut self) -> bool {
        let pid = self.pid();
        let waited = self.child.wait();
        self.redirects.close();

        match waited {
            Ok(status) => {
                self.status = Some(status);
                if status.success() {
                    debug!(pid, cmd = %self.cmd, "process finished");
                    true
                } else {
                    error!(
                        pid,
                        cmd = %self.cmd,
                        exit_code = ?status.code(),
                        "process exited unsuccessfully"
                    );
                    false
                }
            }
            Err(e) => {
                error!(pid, cmd = %self.cmd, error = %e, "could not wait for process");
                false
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ProcPool {
    procs: Vec<TrackedProcess>,
    flushes: usize,
}

impl ProcPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            procs: Vec::with_capacity(capacity),
            flushes: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.procs.capacity()
    }

    /// How many times [`flush`](Self::flush) has run on this pool.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedProcess> {
        self.procs.iter()
    }

    pub(crate) fn push(&mut self, proc: TrackedProcess) {
        debug!(pid = proc.pid(), cmd = %proc.cmd, tracked = self.procs.len() + 1, "tracking async process");
        self.procs.push(proc);
    }

    /// Wait on every entry in insertion order. Does not clear the pool.
    ///
    /// Fails with [`ExecError::Batch`] if any entry could not be waited on or
    /// exited unsuccessfully; every entry is still waited.
    pub fn wait(&mut self) -> ExecResult<()> {
        let total = self.procs.len();
        let failed = self
            .procs
            .iter_mut()
            .map(TrackedProcess::wait_and_close)
            .filter(|ok| !ok)
            .count();

        if failed > 0 {
            return Err(ExecError::Batch { failed, total });
        }
        Ok(())
    }

    /// [`wait`](Self::wait), then clear the pool (capacity is kept).
    pub fn flush(&mut self) -> ExecResult<()> {
        let result = self.wait();
        debug!(drained = self.procs.len(), ok = result.is_ok(), "flushed process pool");
        self.procs.clear();
        self.flushes += 1;
        result
    }
}

/// Entries that were never waited are reaped here so no child outlives the
/// pool as a zombie; their outcome is only logged.
impl Drop for ProcPool {
    fn drop(&mut self) {
        let unwaited = self.procs.iter().filter(|p| p.status.is_none()).count();
        if unwaited == 0 {
            return;
        }
        warn!(unwaited, "process pool dropped without flush; waiting for its processes");
        for proc in self.procs.iter_mut().filter(|p| p.status.is_none()) {
            proc.wait_and_close();
        }
    }
}
