// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ExecError`] covers everything the process engine can report: usage
//!   errors, redirection failures, spawn/wait failures and unsuccessful exits.
//! - [`RebuildError`] covers the self-rebuild driver.
//! - [`ProcbuildError`] is what the config layer and the step runner return.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("empty command")]
    EmptyCommand,

    #[error("empty pipeline: no stage was added before end")]
    EmptyPipeline,

    #[error("could not open redirect file {path:?}: {source}")]
    Redirect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not create pipe: {0}")]
    Pipe(#[source] std::io::Error),

    #[error("could not spawn `{cmd}`: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not wait for `{cmd}`: {source}")]
    Wait {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{cmd}` exited unsuccessfully (exit code {})", display_code(.code))]
    ExitStatus { cmd: String, code: Option<i32> },

    #[error("{failed} of {total} processes failed")]
    Batch { failed: usize, total: usize },
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "none, terminated by signal".to_string(),
    }
}

#[derive(Error, Debug)]
pub enum RebuildError {
    #[error("could not stat {path:?}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("could not rename {from:?} to {to:?}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("build failed: {0}")]
    Build(#[source] ExecError),

    #[error("could not re-execute {path:?}: {source}")]
    Reexec {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ProcbuildError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: ExecError,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ProcbuildError>;
pub type ExecResult<T> = std::result::Result<T, ExecError>;
