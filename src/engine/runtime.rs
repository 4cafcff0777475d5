// src/engine/runtime.rs

use std::fmt;

use tracing::{debug, info, warn};

use crate::cmd::Cmd;
use crate::config::{ConfigFile, Stage, Step, StepKind};
use crate::errors::{ExecResult, ProcbuildError, Result};
use crate::exec::{Executor, ProcPool, RedirectPaths, RunOptions, StageOptions};
use crate::util::Stopwatch;

use super::RunnerOptions;

/// Runs the steps of a build file, in order, on an [`Executor`].
///
/// Execution stops at the first failing step.
pub struct StepRunner<'a> {
    exec: &'a Executor,
    options: RunnerOptions,
}

impl fmt::Debug for StepRunner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRunner")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> StepRunner<'a> {
    pub fn new(exec: &'a Executor, options: RunnerOptions) -> Self {
        Self { exec, options }
    }

    /// Run every step of `cfg`, or only the one named in the options.
    pub fn run(&self, cfg: &ConfigFile) -> Result<()> {
        let steps: Vec<&Step> = match &self.options.only {
            Some(name) => {
                let step = cfg
                    .step(name)
                    .ok_or_else(|| ProcbuildError::StepNotFound(name.clone()))?;
                vec![step]
            }
            None => cfg.steps.iter().collect(),
        };

        info!(count = steps.len(), "running steps");
        let total = Stopwatch::start("all steps");
        for step in steps {
            self.run_step(step)?;
        }
        total.finish();
        Ok(())
    }

    pub fn run_step(&self, step: &Step) -> Result<()> {
        let timer = Stopwatch::start(format!("step {}", step.name));
        debug!(step = %step.name, "starting step");

        let result = match &step.kind {
            StepKind::Run(argv) => self.run_single(step, argv),
            StepKind::Parallel(cmds) => self.run_parallel(step, cmds),
            StepKind::Pipe(stages) => self.run_pipe(step, stages),
        };

        result.map_err(|source| ProcbuildError::StepFailed {
            step: step.name.clone(),
            source,
        })?;
        timer.finish();
        Ok(())
    }

    fn run_single(&self, step: &Step, argv: &[String]) -> ExecResult<()> {
        let mut cmd: Cmd = argv.iter().collect();
        let opts = RunOptions {
            redirect: redirects_of(step),
            ..RunOptions::default()
        };
        self.exec.run(&mut cmd, opts)
    }

    fn run_parallel(&self, step: &Step, cmds: &[Vec<String>]) -> ExecResult<()> {
        let mut pool = ProcPool::with_capacity(self.exec.max_procs(self.options.max_procs));
        let mut cmd = Cmd::new();

        for argv in cmds {
            cmd.append(argv);
            let opts = RunOptions {
                pool: Some(&mut pool),
                max_procs: self.options.max_procs,
                ..RunOptions::default()
            };
            if let Err(e) = self.exec.run(&mut cmd, opts) {
                // Whatever is still in flight must be waited before bailing.
                if let Err(drain) = pool.flush() {
                    warn!(step = %step.name, error = %drain, "processes already started also failed");
                }
                return Err(e);
            }
        }

        let result = pool.flush();
        debug!(step = %step.name, flushes = pool.flush_count(), "parallel step drained");
        result
    }

    fn run_pipe(&self, step: &Step, stages: &[Stage]) -> ExecResult<()> {
        let mut chain = self.exec.pipe();
        chain.begin(RunOptions {
            redirect: RedirectPaths {
                stdin: step.stdin.clone(),
                ..RedirectPaths::default()
            },
            ..RunOptions::default()
        })?;

        let mut cmd = Cmd::new();
        for stage in stages {
            cmd.append(&stage.argv);
            let opts = StageOptions {
                merge_stderr: stage.merge_stderr,
                keep: false,
            };
            if let Err(e) = chain.add_stage(&mut cmd, opts) {
                chain.abort();
                return Err(e);
            }
        }

        chain.end(RunOptions {
            redirect: redirects_of(step),
            ..RunOptions::default()
        })
    }
}

fn redirects_of(step: &Step) -> RedirectPaths {
    RedirectPaths {
        stdin: step.stdin.clone(),
        stdout: step.stdout.clone(),
        stderr: step.stderr.clone(),
    }
}
