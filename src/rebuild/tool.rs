// src/rebuild/tool.rs

//! Invocation of the external build tool.

use std::path::{Path, PathBuf};

use crate::cmd::Cmd;

/// An external compiler invoked as
/// `<program> <verb> <package> -out:<path> <flags…>`.
///
/// `flags` are passed through verbatim; translating higher-level options
/// into flags is the caller's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTool {
    pub program: String,
    pub verb: String,
    /// Package (directory) to build.
    pub package: PathBuf,
    /// Extension, without the dot, of the tool's source files.
    pub source_ext: String,
    pub flags: Vec<String>,
}

impl BuildTool {
    pub fn new(program: impl Into<String>, source_ext: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            verb: "build".to_string(),
            package: PathBuf::from("."),
            source_ext: source_ext.into(),
            flags: Vec::new(),
        }
    }

    pub fn verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = verb.into();
        self
    }

    pub fn package(mut self, package: impl Into<PathBuf>) -> Self {
        self.package = package.into();
        self
    }

    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// The argv that builds the package into `out`.
    pub fn command(&self, out: &Path) -> Cmd {
        let mut c = Cmd::with_capacity(4 + self.flags.len());
        c.arg(&self.program)
            .arg(&self.verb)
            .arg(self.package.to_string_lossy())
            .arg(format!("-out:{}", out.display()))
            .append(&self.flags);
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_follows_calling_convention() {
        let tool = BuildTool::new("cc-driver", "src")
            .package("build")
            .flag("-debug")
            .flag("-o:speed");

        let c = tool.command(Path::new("/tmp/out/build-bin"));
        assert_eq!(
            c.args(),
            ["cc-driver", "build", "build", "-out:/tmp/out/build-bin", "-debug", "-o:speed"]
        );
    }

    #[test]
    fn verb_can_be_overridden() {
        let tool = BuildTool::new("tool", "x").verb("compile");
        assert_eq!(tool.command(Path::new("o")).args()[1], "compile");
    }
}
