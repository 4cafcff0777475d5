// src/exec/pipe.rs

//! Multi-stage pipelines wired with OS pipes.
//!
//! A chain holds at most one *pending* stage. Adding a stage starts the
//! previously pending one with its stdout connected to a fresh pipe, whose
//! read end becomes the next stage's stdin. The last stage is only started
//! by [`PipeChain::end`] (or [`PipeChain::end_capture`]), which is what lets
//! its output go to a file, the parent's streams, or memory.
//!
//! The previous read end is a single-owner value: it is moved into the next
//! child's stdin binding and the parent's copy is closed as soon as that child
//! is spawned.

use std::fs::File;
use std::process::{Child, Stdio};

use os_pipe::PipeReader;
use tracing::{debug, error, warn};

use crate::cmd::Cmd;
use crate::errors::{ExecError, ExecResult};
use crate::types::Capture;

use super::options::{RunOptions, StageOptions};
use super::pool::TrackedProcess;
use super::redirect::{Redirects, open_stdin_file};
use super::runner::{Executor, StdioSet, drain, spawn, wait_child};

/// Read side handed to the next stage.
#[derive(Debug)]
enum StageInput {
    File(File),
    Pipe(PipeReader),
}

impl From<StageInput> for Stdio {
    fn from(input: StageInput) -> Self {
        match input {
            StageInput::File(f) => Stdio::from(f),
            StageInput::Pipe(r) => Stdio::from(r),
        }
    }
}

#[derive(Debug)]
struct Pending {
    cmd: Cmd,
    merge_stderr: bool,
}

/// An intermediate stage that has been started and must be waited at `end`.
#[derive(Debug)]
struct Running {
    child: Child,
    cmd: String,
}

#[derive(Debug)]
pub struct PipeChain<'e> {
    exec: &'e Executor,
    prev: Option<StageInput>,
    pending: Option<Pending>,
    running: Vec<Running>,
}

impl<'e> PipeChain<'e> {
    pub fn new(exec: &'e Executor) -> Self {
        Self {
            exec,
            prev: None,
            pending: None,
            running: Vec::new(),
        }
    }

    /// Number of stages started but not yet waited.
    pub fn started(&self) -> usize {
        self.running.len()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Reset the chain and, if `opts` redirects stdin, open that file as the
    /// first stage's input. Only the stdin redirection of `opts` is used.
    pub fn begin(&mut self, opts: RunOptions<'_>) -> ExecResult<()> {
        self.reset();
        if let Some(path) = &opts.redirect.stdin {
            self.prev = Some(StageInput::File(open_stdin_file(path)?));
        }
        Ok(())
    }

    /// Queue `cmd` as the new pending stage, starting the previous pending
    /// stage (if any) with its stdout feeding a new pipe.
    ///
    /// `cmd` is copied into the chain and reset unless `opts.keep` is set.
    pub fn add_stage(&mut self, cmd: &mut Cmd, opts: StageOptions) -> ExecResult<()> {
        let result = self.add_stage_inner(cmd, opts.merge_stderr);
        if !opts.keep {
            cmd.reset();
        }
        result
    }

    fn add_stage_inner(&mut self, cmd: &Cmd, merge_stderr: bool) -> ExecResult<()> {
        if cmd.is_empty() {
            error!("refusing to add an empty command to a pipe chain");
            return Err(ExecError::EmptyCommand);
        }
        if let Some(pending) = self.pending.take() {
            self.start_intermediate(pending)?;
        }
        self.pending = Some(Pending {
            cmd: cmd.clone(),
            merge_stderr,
        });
        Ok(())
    }

    fn start_intermediate(&mut self, pending: Pending) -> ExecResult<()> {
        let rendered = self.exec.prepare(&pending.cmd)?;
        let (reader, writer) = os_pipe::pipe().map_err(|e| {
            error!(cmd = %rendered, error = %e, "could not create pipe");
            ExecError::Pipe(e)
        })?;

        let stderr = if pending.merge_stderr {
            Some(Stdio::from(writer.try_clone().map_err(ExecError::Pipe)?))
        } else {
            None
        };
        let stdio = StdioSet {
            stdin: self.prev.take().map(Stdio::from),
            stdout: Some(Stdio::from(writer)),
            stderr,
        };

        // On failure `reader` is dropped here, closing the read end.
        let child = spawn(&pending.cmd, &rendered, stdio)?;
        debug!(pid = child.id(), cmd = %rendered, stage = self.running.len(), "started pipe stage");

        self.running.push(Running {
            child,
            cmd: rendered,
        });
        self.prev = Some(StageInput::Pipe(reader));
        Ok(())
    }

    /// Start the final stage and finish the chain.
    ///
    /// The final stage reads the previous stage's output; its stdout and
    /// stderr go to the redirect files in `opts`, follow each other when
    /// merging was requested for that stage, or are inherited otherwise.
    ///
    /// With a pool in `opts`, the final stage is tracked there instead of
    /// being waited; intermediate stages are always waited before returning.
    /// Without a pool every stage is waited and any failure fails the chain.
    ///
    /// A chain with nothing pending only waits for stages that were already
    /// started (left behind by a failed [`add_stage`](Self::add_stage)); a
    /// chain that never started anything is a no-op.
    pub fn end(&mut self, opts: RunOptions<'_>) -> ExecResult<()> {
        let Some(pending) = self.pending.take() else {
            self.prev = None;
            let (failed, total) = self.wait_running();
            if total > 0 {
                // The stage that failed to start counts as failed too.
                warn!(failed, total, "pipe chain ended after a stage failed to start");
                return Err(ExecError::Batch {
                    failed: failed + 1,
                    total: total + 1,
                });
            }
            return Ok(());
        };

        let rendered = self.exec.prepare(&pending.cmd)?;
        let redirects = match Redirects::open_outputs(&opts.redirect) {
            Ok(r) => r,
            Err(e) => {
                self.prev = None;
                self.wait_running();
                return Err(e);
            }
        };
        let stdio = match self.final_stdio(&redirects, pending.merge_stderr) {
            Ok(s) => s,
            Err(e) => {
                self.wait_running();
                return Err(e);
            }
        };

        match opts.pool {
            Some(pool) => {
                let bound = self.exec.max_procs(opts.max_procs);
                if pool.len() >= bound {
                    debug!(tracked = pool.len(), bound, "process pool full; flushing");
                    if let Err(e) = pool.flush() {
                        drop(stdio);
                        self.wait_running();
                        return Err(e);
                    }
                }
                let spawned = spawn(&pending.cmd, &rendered, stdio);
                let (failed, total) = self.wait_running();
                let child = spawned?;
                pool.push(TrackedProcess::new(child, redirects, rendered));
                batch_result(failed, total)
            }
            None => {
                let spawned = spawn(&pending.cmd, &rendered, stdio);
                let (mut failed, mut total) = self.wait_running();
                let child = spawned?;
                total += 1;
                if !wait_stage(child, &rendered) {
                    failed += 1;
                }
                drop(redirects);
                batch_result(failed, total)
            }
        }
    }

    /// Like [`end`](Self::end) without a pool, but the final stage's stdout
    /// is captured in memory. stderr of the final stage goes into the capture
    /// when merging was requested for it, and is inherited otherwise.
    ///
    /// Intermediate failures are logged; the returned [`Capture`] reflects
    /// the final stage's exit status.
    pub fn end_capture(&mut self) -> ExecResult<Capture> {
        let Some(pending) = self.pending.take() else {
            self.prev = None;
            let (failed, total) = self.wait_running();
            error!(failed, total, "pipe chain ended for capture without a final stage");
            return Err(ExecError::EmptyPipeline);
        };

        let rendered = self.exec.prepare(&pending.cmd)?;
        let (reader, writer) = match os_pipe::pipe() {
            Ok(p) => p,
            Err(e) => {
                self.prev = None;
                self.wait_running();
                return Err(ExecError::Pipe(e));
            }
        };
        let stderr = if pending.merge_stderr {
            match writer.try_clone() {
                Ok(w) => Some(Stdio::from(w)),
                Err(e) => {
                    self.prev = None;
                    self.wait_running();
                    return Err(ExecError::Pipe(e));
                }
            }
        } else {
            None
        };
        let stdio = StdioSet {
            stdin: self.prev.take().map(Stdio::from),
            stdout: Some(Stdio::from(writer)),
            stderr,
        };

        let spawned = spawn(&pending.cmd, &rendered, stdio);
        let child = match spawned {
            Ok(c) => c,
            Err(e) => {
                self.wait_running();
                return Err(e);
            }
        };

        // All writer copies now live in the child; EOF arrives when it exits.
        let stdout = drain(reader, &rendered);
        let (failed, total) = self.wait_running();
        if failed > 0 {
            warn!(failed, total, "intermediate pipe stages failed");
        }

        let pid = child.id();
        let status = wait_child(child, &rendered)?;
        if !status.success() {
            error!(pid, cmd = %rendered, exit_code = ?status.code(), "final pipe stage exited unsuccessfully");
        }
        Ok(Capture { stdout, status })
    }

    fn final_stdio(&mut self, redirects: &Redirects, merge_stderr: bool) -> ExecResult<StdioSet> {
        let stdin = self.prev.take().map(Stdio::from);
        let stdout = redirects.stdout()?;
        let stderr = match redirects.stderr()? {
            Some(s) => Some(s),
            None if merge_stderr => merged_stderr(redirects)?,
            None => None,
        };
        Ok(StdioSet {
            stdin,
            stdout,
            stderr,
        })
    }

    /// Wait on every started intermediate stage, in order.
    /// Returns `(failed, total)`.
    fn wait_running(&mut self) -> (usize, usize) {
        let total = self.running.len();
        let mut failed = 0;
        for stage in self.running.drain(..) {
            if !wait_stage(stage.child, &stage.cmd) {
                failed += 1;
            }
        }
        (failed, total)
    }

    /// Drop the pending stage without starting it, close the chain's read
    /// end and wait for every stage already started.
    ///
    /// Returns the number of started stages that failed.
    pub fn abort(&mut self) -> usize {
        self.pending = None;
        self.prev = None;
        let (failed, total) = self.wait_running();
        if total > 0 {
            debug!(failed, total, "pipe chain aborted");
        }
        failed
    }

    fn reset(&mut self) {
        if !self.running.is_empty() {
            warn!(stages = self.running.len(), "pipe chain reset with unwaited stages; waiting");
        }
        self.abort();
    }
}

/// Stages started but never waited are reaped here; their outcome is only
/// logged.
impl Drop for PipeChain<'_> {
    fn drop(&mut self) {
        if self.running.is_empty() {
            return;
        }
        warn!(stages = self.running.len(), "pipe chain dropped before end; waiting for its stages");
        self.pending = None;
        self.prev = None;
        self.wait_running();
    }
}

/// stderr bound to wherever stdout of the final stage goes.
fn merged_stderr(redirects: &Redirects) -> ExecResult<Option<Stdio>> {
    if redirects.has_stdout() {
        return redirects.stdout();
    }
    inherited_stdout()
}

#[cfg(unix)]
fn inherited_stdout() -> ExecResult<Option<Stdio>> {
    use std::os::fd::AsFd;

    let fd = std::io::stdout()
        .as_fd()
        .try_clone_to_owned()
        .map_err(ExecError::Pipe)?;
    Ok(Some(Stdio::from(fd)))
}

#[cfg(not(unix))]
fn inherited_stdout() -> ExecResult<Option<Stdio>> {
    Ok(None)
}

fn wait_stage(mut child: Child, rendered: &str) -> bool {
    let pid = child.id();
    match child.wait() {
        Ok(status) if status.success() => {
            debug!(pid, cmd = %rendered, "pipe stage finished");
            true
        }
        Ok(status) => {
            error!(pid, cmd = %rendered, exit_code = ?status.code(), "pipe stage exited unsuccessfully");
            false
        }
        Err(e) => {
            error!(pid, cmd = %rendered, error = %e, "could not wait for pipe stage");
            false
        }
    }
}

fn batch_result(failed: usize, total: usize) -> ExecResult<()> {
    if failed > 0 {
        return Err(ExecError::Batch { failed, total });
    }
    Ok(())
}
