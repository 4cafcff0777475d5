// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `procbuild`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procbuild",
    version,
    about = "Run the build steps of a Procbuild.toml file.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the build file (TOML).
    ///
    /// Default: `Procbuild.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Run only the step with this name.
    #[arg(long, value_name = "NAME")]
    pub step: Option<String>,

    /// Maximum number of processes a `parallel` step runs at once.
    ///
    /// Overrides `[config].max_procs`.
    #[arg(long, short = 'j', value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub jobs: Option<u64>,

    /// Log every command before running it.
    #[arg(long)]
    pub echo: bool,

    /// Skip the self-rebuild check even if `[rebuild]` is configured.
    #[arg(long)]
    pub no_rebuild: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROCBUILD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the steps, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_procbuild_toml() {
        let args = CliArgs::try_parse_from(["procbuild"]).unwrap();
        assert_eq!(args.config, default_config_path());
        assert!(args.log_level.is_none());
    }

    #[test]
    fn jobs_must_be_positive() {
        assert!(CliArgs::try_parse_from(["procbuild", "-j", "0"]).is_err());
        let args = CliArgs::try_parse_from(["procbuild", "-j", "3", "--step", "link"]).unwrap();
        assert_eq!(args.jobs, Some(3));
        assert_eq!(args.step.as_deref(), Some("link"));
    }
}
