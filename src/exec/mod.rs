// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`runner`] holds the [`Executor`]: synchronous runs, async runs into a
//!   pool, and stdout capture.
//! - [`pool`] provides [`ProcPool`], the bounded set of in-flight processes
//!   that async runs are tracked in.
//! - [`pipe`] wires several commands together with OS pipes.
//! - [`redirect`] owns the files opened for stdin/stdout/stderr redirection.
//! - [`options`] contains the engine config and per-run options.

pub mod options;
pub mod pipe;
pub mod pool;
pub mod redirect;
pub mod runner;

pub use options::{ExecConfig, RedirectPaths, RunOptions, StageOptions};
pub use pipe::PipeChain;
pub use pool::{ProcPool, TrackedProcess};
pub use redirect::Redirects;
pub use runner::Executor;
