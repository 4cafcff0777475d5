// src/engine/mod.rs

//! Step engine for build files.
//!
//! Turns the validated steps of a [`ConfigFile`](crate::config::ConfigFile)
//! into calls on the process engine: `run` steps become synchronous runs,
//! `parallel` steps fill a [`ProcPool`](crate::exec::ProcPool), and `pipe`
//! steps become a [`PipeChain`](crate::exec::PipeChain).

pub mod runtime;

pub use runtime::StepRunner;

/// Options for a [`StepRunner`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Run only the step with this name.
    pub only: Option<String>,
    /// Override of the concurrency bound for `parallel` steps.
    pub max_procs: Option<usize>,
}
