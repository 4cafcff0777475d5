// src/exec/runner.rs

//! Synchronous and asynchronous command execution.

use std::io::Read;
use std::process::{Child, ExitStatus, Stdio};

use tracing::{debug, error, info};

use crate::cmd::Cmd;
use crate::errors::{ExecError, ExecResult};
use crate::types::Capture;
use crate::util::{ProcessorCount, SystemProcessors, default_max_procs};

use super::options::{ExecConfig, RunOptions};
use super::pipe::PipeChain;
use super::pool::{ProcPool, TrackedProcess};
use super::redirect::Redirects;

/// Stream bindings for one spawn. `None` inherits the parent's stream.
#[derive(Debug, Default)]
pub(crate) struct StdioSet {
    pub stdin: Option<Stdio>,
    pub stdout: Option<Stdio>,
    pub stderr: Option<Stdio>,
}

impl StdioSet {
    pub(crate) fn from_redirects(r: &Redirects) -> ExecResult<Self> {
        Ok(Self {
            stdin: r.stdin()?,
            stdout: r.stdout()?,
            stderr: r.stderr()?,
        })
    }
}

/// Entry point for running commands.
///
/// Holds the engine configuration and the processor-count capability used to
/// compute the default concurrency bound.
#[derive(Debug)]
pub struct Executor {
    config: ExecConfig,
    processors: Box<dyn ProcessorCount>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ExecConfig::default())
    }
}

impl Executor {
    pub fn new(config: ExecConfig) -> Self {
        Self::with_processors(config, SystemProcessors)
    }

    pub fn with_processors(config: ExecConfig, processors: impl ProcessorCount + 'static) -> Self {
        Self {
            config,
            processors: Box::new(processors),
        }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Concurrency bound for a run: the per-run override, then the engine
    /// config, then logical processors + 1.
    pub fn max_procs(&self, override_: Option<usize>) -> usize {
        override_
            .or(self.config.max_procs)
            .unwrap_or_else(|| default_max_procs(self.processors.as_ref()))
            .max(1)
    }

    /// Start a new, empty pipe chain bound to this executor.
    pub fn pipe(&self) -> PipeChain<'_> {
        PipeChain::new(self)
    }

    /// Run `cmd`.
    ///
    /// Without a pool in `opts` this blocks until the process exits. With a
    /// pool, the process is spawned and tracked there; completion is reported
    /// by whoever flushes the pool. If the pool is already at its bound it
    /// is flushed first, and a failed flush fails this run.
    ///
    /// `cmd` is reset afterwards on every path unless `opts.keep` is set.
    pub fn run(&self, cmd: &mut Cmd, opts: RunOptions<'_>) -> ExecResult<()> {
        let keep = opts.keep;
        let result = self.run_inner(cmd, opts);
        if !keep {
            cmd.reset();
        }
        result
    }

    fn run_inner(&self, cmd: &Cmd, opts: RunOptions<'_>) -> ExecResult<()> {
        let rendered = self.prepare(cmd)?;
        let redirects = Redirects::open(&opts.redirect)?;

        match opts.pool {
            None => {
                let stdio = StdioSet::from_redirects(&redirects)?;
                let child = spawn(cmd, &rendered, stdio)?;
                let waited = wait_child(child, &rendered);
                drop(redirects);
                check_status(&rendered, waited?)
            }
            Some(pool) => {
                let bound = self.max_procs(opts.max_procs);
                if pool.len() >= bound {
                    debug!(tracked = pool.len(), bound, "process pool full; flushing");
                    pool.flush()?;
                }
                let stdio = StdioSet::from_redirects(&redirects)?;
                let child = spawn(cmd, &rendered, stdio)?;
                pool.push(TrackedProcess::new(child, redirects, rendered));
                Ok(())
            }
        }
    }

    /// Run `cmd` synchronously with stdout captured in memory.
    ///
    /// The captured bytes are returned even when the process exits
    /// unsuccessfully; check [`Capture::success`]. stderr is captured too
    /// but only its length is logged. `cmd` is always reset.
    pub fn run_capture(&self, cmd: &mut Cmd) -> ExecResult<Capture> {
        let result = self.capture_inner(cmd);
        cmd.reset();
        result
    }

    fn capture_inner(&self, cmd: &Cmd) -> ExecResult<Capture> {
        let rendered = self.prepare(cmd)?;
        let stdio = StdioSet {
            stdin: None,
            stdout: Some(Stdio::piped()),
            stderr: Some(Stdio::piped()),
        };
        let child = spawn(cmd, &rendered, stdio)?;
        let pid = child.id();

        let output = child.wait_with_output().map_err(|source| {
            error!(pid, cmd = %rendered, error = %source, "could not wait for process");
            ExecError::Wait {
                cmd: rendered.clone(),
                source,
            }
        })?;

        if !output.status.success() {
            error!(
                pid,
                cmd = %rendered,
                exit_code = ?output.status.code(),
                stderr_len = output.stderr.len(),
                "command exited unsuccessfully"
            );
        }

        Ok(Capture {
            stdout: output.stdout,
            status: output.status,
        })
    }

    /// Validate and render a command, echoing it when configured.
    pub(crate) fn prepare(&self, cmd: &Cmd) -> ExecResult<String> {
        if cmd.is_empty() {
            error!("refusing to run an empty command");
            return Err(ExecError::EmptyCommand);
        }
        let rendered = cmd.render();
        if self.config.echo {
            info!(cmd = %rendered, "running");
        }
        Ok(rendered)
    }
}

/// Spawn `cmd` with the given stream bindings.
///
/// The `std::process::Command` (and with it the parent's copies of any
/// descriptors moved into `stdio`) is dropped before this returns.
pub(crate) fn spawn(cmd: &Cmd, rendered: &str, stdio: StdioSet) -> ExecResult<Child> {
    let Some(mut command) = cmd.to_process() else {
        return Err(ExecError::EmptyCommand);
    };
    if let Some(s) = stdio.stdin {
        command.stdin(s);
    }
    if let Some(s) = stdio.stdout {
        command.stdout(s);
    }
    if let Some(s) = stdio.stderr {
        command.stderr(s);
    }

    command.spawn().map_err(|source| {
        error!(cmd = %rendered, error = %source, "could not spawn process");
        ExecError::Spawn {
            cmd: rendered.to_string(),
            source,
        }
    })
}

pub(crate) fn wait_child(mut child: Child, rendered: &str) -> ExecResult<ExitStatus> {
    let pid = child.id();
    child.wait().map_err(|source| {
        error!(pid, cmd = %rendered, error = %source, "could not wait for process");
        ExecError::Wait {
            cmd: rendered.to_string(),
            source,
        }
    })
}

pub(crate) fn check_status(rendered: &str, status: ExitStatus) -> ExecResult<()> {
    if status.success() {
        return Ok(());
    }
    error!(cmd = %rendered, exit_code = ?status.code(), "command exited unsuccessfully");
    Err(ExecError::ExitStatus {
        cmd: rendered.to_string(),
        code: status.code(),
    })
}

/// Read a pipe to the end, logging rather than failing on a read error.
pub(crate) fn drain(mut reader: impl Read, rendered: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf) {
        error!(cmd = %rendered, error = %e, "error reading captured output");
    }
    buf
}
