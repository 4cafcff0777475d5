// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Build file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// echo = true
/// max_procs = 4
///
/// [rebuild]
/// tool = "odin"
/// package = "build"
/// source_ext = "odin"
/// sources = ["build"]
///
/// [[step]]
/// name = "objects"
/// parallel = [["cc", "-c", "a.c"], ["cc", "-c", "b.c"]]
///
/// [[step]]
/// name = "link"
/// run = ["cc", "-o", "app", "a.o", "b.o"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Engine settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Self-rebuild settings from `[rebuild]`.
    #[serde(default)]
    pub rebuild: Option<RebuildSection>,

    /// Steps from `[[step]]`, run in file order.
    #[serde(default)]
    pub step: Vec<RawStep>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct ConfigSection {
    /// Log every command before running it.
    #[serde(default)]
    pub echo: bool,

    /// Bound on concurrently running processes in `parallel` steps.
    ///
    /// If unset, the number of logical processors + 1.
    #[serde(default)]
    pub max_procs: Option<usize>,
}

/// `[rebuild]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RebuildSection {
    /// Build tool executable.
    pub tool: String,

    #[serde(default = "default_verb")]
    pub verb: String,

    /// Package directory passed to the tool.
    pub package: PathBuf,

    /// Extension of source files (without the dot).
    pub source_ext: String,

    /// Files or flat directories to compare against the binary.
    #[serde(default)]
    pub sources: Vec<PathBuf>,

    /// Extra arguments appended to the build command.
    #[serde(default)]
    pub flags: Vec<String>,
}

fn default_verb() -> String {
    "build".to_string()
}

/// One `[[step]]` entry. Exactly one of `run`, `parallel` and `pipe` must
/// be set; this is checked during validation.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct RawStep {
    pub name: String,

    #[serde(default)]
    pub run: Option<Vec<String>>,

    #[serde(default)]
    pub parallel: Option<Vec<Vec<String>>>,

    #[serde(default)]
    pub pipe: Option<Vec<RawStage>>,

    #[serde(default)]
    pub stdin: Option<PathBuf>,

    #[serde(default)]
    pub stdout: Option<PathBuf>,

    #[serde(default)]
    pub stderr: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct RawStage {
    pub cmd: Vec<String>,

    /// Send this stage's stderr wherever its stdout goes.
    #[serde(default)]
    pub merge_stderr: bool,
}

/// Validated build file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub rebuild: Option<RebuildSection>,
    pub steps: Vec<Step>,
}

impl ConfigFile {
    /// Construct without validation; use `TryFrom<RawConfigFile>` instead.
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        rebuild: Option<RebuildSection>,
        steps: Vec<Step>,
    ) -> Self {
        Self {
            config,
            rebuild,
            steps,
        }
    }

    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub kind: StepKind,
    pub stdin: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// One synchronous command.
    Run(Vec<String>),
    /// Commands run concurrently in a process pool, flushed at the end.
    Parallel(Vec<Vec<String>>),
    /// Commands connected stdout-to-stdin.
    Pipe(Vec<Stage>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub argv: Vec<String>,
    pub merge_stderr: bool,
}
