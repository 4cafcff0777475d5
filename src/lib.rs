// src/lib.rs

//! Process orchestration for build programs.
//!
//! - [`cmd::Cmd`]: owned argv with POSIX-quoted rendering for logs.
//! - [`exec::Executor`]: synchronous runs, async runs into a bounded
//!   [`exec::ProcPool`], stdout capture, and [`exec::PipeChain`] pipelines.
//! - [`rebuild::SelfRebuild`]: rebuild and re-execute the running binary when
//!   its sources change.
//!
//! The `procbuild` binary drives these from a TOML build file.

pub mod cli;
pub mod cmd;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod rebuild;
pub mod types;
pub mod util;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

pub use crate::cmd::Cmd;
pub use crate::exec::{ExecConfig, Executor, PipeChain, ProcPool, RunOptions, StageOptions};
pub use crate::types::Capture;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::{ConfigFile, RebuildSection, StepKind};
use crate::engine::{RunnerOptions, StepRunner};
use crate::rebuild::{BuildTool, SelfRebuild};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - build file loading
/// - the self-rebuild check
/// - the step runner
pub fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading build file {:?}", config_path))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let max_procs = args.jobs.map(|n| n as usize);
    let exec = Executor::new(ExecConfig {
        echo: args.echo || cfg.config.echo,
        max_procs: max_procs.or(cfg.config.max_procs),
    });

    if let Some(section) = &cfg.rebuild {
        if args.no_rebuild {
            debug!("self-rebuild disabled on the command line");
        } else {
            SelfRebuild::new(&exec, build_tool(section), section.sources.clone()).run();
        }
    }

    let runner = StepRunner::new(
        &exec,
        RunnerOptions {
            only: args.step.clone(),
            max_procs,
        },
    );
    runner.run(&cfg)?;

    info!("all steps succeeded");
    Ok(())
}

fn build_tool(section: &RebuildSection) -> BuildTool {
    let mut tool = BuildTool::new(&section.tool, &section.source_ext)
        .verb(&section.verb)
        .package(&section.package);
    tool.flags = section.flags.clone();
    tool
}

/// Simple dry-run output: print steps and their rendered commands.
fn print_dry_run(cfg: &ConfigFile) {
    println!("procbuild dry-run");
    println!("  config.echo = {}", cfg.config.echo);
    match cfg.config.max_procs {
        Some(n) => println!("  config.max_procs = {n}"),
        None => println!("  config.max_procs = (logical processors + 1)"),
    }
    if let Some(rebuild) = &cfg.rebuild {
        let tool = build_tool(rebuild);
        println!("  rebuild: {}", tool.command(&PathBuf::from("<self>")));
        println!("  rebuild.sources: {:?}", rebuild.sources);
    }
    println!();

    println!("steps ({}):", cfg.steps.len());
    for step in cfg.steps.iter() {
        println!("  - {}", step.name);
        match &step.kind {
            StepKind::Run(argv) => {
                println!("      run: {}", render(argv));
            }
            StepKind::Parallel(cmds) => {
                for argv in cmds {
                    println!("      parallel: {}", render(argv));
                }
            }
            StepKind::Pipe(stages) => {
                let line: Vec<String> = stages
                    .iter()
                    .map(|s| {
                        let mut r = render(&s.argv);
                        if s.merge_stderr {
                            r.push_str(" 2>&1");
                        }
                        r
                    })
                    .collect();
                println!("      pipe: {}", line.join(" | "));
            }
        }
        if let Some(ref p) = step.stdin {
            println!("      stdin: {}", p.display());
        }
        if let Some(ref p) = step.stdout {
            println!("      stdout: {}", p.display());
        }
        if let Some(ref p) = step.stderr {
            println!("      stderr: {}", p.display());
        }
    }

    debug!("dry-run complete (no execution)");
}

fn render(argv: &[String]) -> String {
    argv.iter().collect::<Cmd>().render()
}
