// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile, RawStep, Stage, Step, StepKind};
use crate::errors::{ProcbuildError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ProcbuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        let steps = raw
            .step
            .into_iter()
            .map(step_from_raw)
            .collect::<Result<Vec<_>>>()?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.rebuild, steps))
    }
}

/// Check global invariants that do not depend on a single step's shape.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_rebuild(cfg)?;
    validate_step_names(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_procs == Some(0) {
        return Err(ProcbuildError::ConfigError(
            "[config].max_procs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_rebuild(cfg: &RawConfigFile) -> Result<()> {
    let Some(rebuild) = &cfg.rebuild else {
        return Ok(());
    };
    if rebuild.tool.trim().is_empty() {
        return Err(ProcbuildError::ConfigError(
            "[rebuild].tool must not be empty".to_string(),
        ));
    }
    if rebuild.sources.is_empty() {
        return Err(ProcbuildError::ConfigError(
            "[rebuild].sources must list at least one file or directory".to_string(),
        ));
    }
    if rebuild.source_ext.starts_with('.') {
        return Err(ProcbuildError::ConfigError(format!(
            "[rebuild].source_ext must be given without the leading dot (got '{}')",
            rebuild.source_ext
        )));
    }
    Ok(())
}

fn validate_step_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for step in cfg.step.iter() {
        if step.name.trim().is_empty() {
            return Err(ProcbuildError::ConfigError(
                "every [[step]] needs a non-empty name".to_string(),
            ));
        }
        if !seen.insert(step.name.as_str()) {
            return Err(ProcbuildError::ConfigError(format!(
                "duplicate step name '{}'",
                step.name
            )));
        }
    }
    Ok(())
}

fn step_from_raw(raw: RawStep) -> Result<Step> {
    let name = raw.name;
    let kind = match (raw.run, raw.parallel, raw.pipe) {
        (Some(argv), None, None) => {
            ensure_argv(&name, &argv)?;
            StepKind::Run(argv)
        }
        (None, Some(cmds), None) => {
            if cmds.is_empty() {
                return Err(step_error(&name, "`parallel` must list at least one command"));
            }
            for argv in cmds.iter() {
                ensure_argv(&name, argv)?;
            }
            if raw.stdin.is_some() || raw.stdout.is_some() || raw.stderr.is_some() {
                return Err(step_error(&name, "redirections cannot be used with `parallel`"));
            }
            StepKind::Parallel(cmds)
        }
        (None, None, Some(stages)) => {
            if stages.is_empty() {
                return Err(step_error(&name, "`pipe` must list at least one stage"));
            }
            let stages = stages
                .into_iter()
                .map(|s| {
                    ensure_argv(&name, &s.cmd)?;
                    Ok(Stage {
                        argv: s.cmd,
                        merge_stderr: s.merge_stderr,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            StepKind::Pipe(stages)
        }
        (None, None, None) => {
            return Err(step_error(&name, "needs one of `run`, `parallel` or `pipe`"));
        }
        _ => {
            return Err(step_error(
                &name,
                "`run`, `parallel` and `pipe` are mutually exclusive",
            ));
        }
    };

    Ok(Step {
        name,
        kind,
        stdin: raw.stdin,
        stdout: raw.stdout,
        stderr: raw.stderr,
    })
}

fn ensure_argv(step: &str, argv: &[String]) -> Result<()> {
    match argv.first() {
        None => Err(step_error(step, "command must not be empty")),
        Some(program) if program.trim().is_empty() => {
            Err(step_error(step, "program name must not be blank"))
        }
        Some(_) => Ok(()),
    }
}

fn step_error(step: &str, msg: &str) -> ProcbuildError {
    ProcbuildError::ConfigError(format!("step '{}': {}", step, msg))
}
