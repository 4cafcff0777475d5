#![allow(dead_code)]

use std::fs;
use std::path::Path;

use procbuild::{ExecConfig, Executor};
use procbuild::util::FixedProcessors;

pub use procbuild_test_utils::init_tracing;

/// Executor with echo on and a fixed processor count, so bounds do not
/// depend on the machine running the tests.
pub fn executor(max_procs: Option<usize>) -> Executor {
    init_tracing();
    Executor::with_processors(
        ExecConfig {
            echo: true,
            max_procs,
        },
        FixedProcessors(Some(3)),
    )
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("reading {:?}: {e}", path))
}
