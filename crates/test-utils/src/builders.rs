#![allow(dead_code)]

use std::path::PathBuf;

use procbuild::config::{ConfigFile, ConfigSection, RawConfigFile, RawStage, RawStep};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                rebuild: None,
                step: Vec::new(),
            },
        }
    }

    pub fn with_step(mut self, step: RawStep) -> Self {
        self.config.step.push(step);
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.config.config.echo = echo;
        self
    }

    pub fn with_max_procs(mut self, n: usize) -> Self {
        self.config.config.max_procs = Some(n);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RawStep`.
pub struct StepBuilder {
    step: RawStep,
}

impl StepBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            step: RawStep {
                name: name.to_string(),
                ..RawStep::default()
            },
        }
    }

    pub fn run(mut self, argv: &[&str]) -> Self {
        self.step.run = Some(owned(argv));
        self
    }

    pub fn parallel(mut self, argv: &[&str]) -> Self {
        self.step.parallel.get_or_insert_with(Vec::new).push(owned(argv));
        self
    }

    pub fn stage(mut self, argv: &[&str]) -> Self {
        self.push_stage(argv, false);
        self
    }

    pub fn merged_stage(mut self, argv: &[&str]) -> Self {
        self.push_stage(argv, true);
        self
    }

    fn push_stage(&mut self, argv: &[&str], merge_stderr: bool) {
        self.step.pipe.get_or_insert_with(Vec::new).push(RawStage {
            cmd: owned(argv),
            merge_stderr,
        });
    }

    pub fn stdin(mut self, path: impl Into<PathBuf>) -> Self {
        self.step.stdin = Some(path.into());
        self
    }

    pub fn stdout(mut self, path: impl Into<PathBuf>) -> Self {
        self.step.stdout = Some(path.into());
        self
    }

    pub fn stderr(mut self, path: impl Into<PathBuf>) -> Self {
        self.step.stderr = Some(path.into());
        self
    }

    pub fn build(self) -> RawStep {
        self.step
    }
}

fn owned(argv: &[&str]) -> Vec<String> {
    argv.iter().map(|s| s.to_string()).collect()
}
