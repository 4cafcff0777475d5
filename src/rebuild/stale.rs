// src/rebuild/stale.rs

//! Source expansion and mtime-based staleness checks.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::RebuildError;
use crate::fs::FileSystem;

/// Expand `paths` into the list of source files to compare against.
///
/// - A directory becomes its immediate entries whose extension is `ext`
///   (not recursive), sorted.
/// - Anything else, including a directory that cannot be listed, is kept
///   as-is so the staleness check reports its stat error.
pub fn expand_sources<P: AsRef<Path>>(fs: &dyn FileSystem, paths: &[P], ext: &str) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if !fs.is_dir(path) {
            out.push(path.to_path_buf());
            continue;
        }
        match fs.read_dir(path) {
            Ok(entries) => {
                let mut matching: Vec<PathBuf> = entries
                    .into_iter()
                    .filter(|p| p.extension().is_some_and(|e| e == ext))
                    .collect();
                matching.sort();
                debug!(dir = %path.display(), count = matching.len(), "expanded source directory");
                out.extend(matching);
            }
            Err(e) => {
                warn!(dir = %path.display(), error = %e, "could not list source directory");
                out.push(path.to_path_buf());
            }
        }
    }
    out
}

/// `true` if `output` is missing or any input is strictly newer than it.
///
/// An input that cannot be stat'ed is an error, never silently skipped.
pub fn needs_rebuild<P: AsRef<Path>>(
    fs: &dyn FileSystem,
    output: &Path,
    inputs: &[P],
) -> Result<bool, RebuildError> {
    if !fs.exists(output) {
        debug!(output = %output.display(), "output missing; rebuild needed");
        return Ok(true);
    }
    let output_time = fs.modified(output).map_err(|source| RebuildError::Stat {
        path: output.to_path_buf(),
        source,
    })?;

    for input in inputs {
        let input = input.as_ref();
        let input_time = fs.modified(input).map_err(|source| RebuildError::Stat {
            path: input.to_path_buf(),
            source,
        })?;
        if input_time > output_time {
            debug!(input = %input.display(), output = %output.display(), "input newer than output");
            return Ok(true);
        }
    }
    Ok(false)
}

/// Single-input form of [`needs_rebuild`].
pub fn needs_rebuild1(fs: &dyn FileSystem, output: &Path, input: &Path) -> Result<bool, RebuildError> {
    needs_rebuild(fs, output, &[input])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn fixture() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("bin/build", 100);
        fs.add_file("build/main.src", 50);
        fs.add_file("build/util.src", 60);
        fs.add_file("build/notes.txt", 500);
        fs.add_dir("build/nested");
        fs.add_file("build/nested/deep.src", 900);
        fs
    }

    #[test]
    fn missing_output_needs_rebuild() {
        let fs = fixture();
        let got = needs_rebuild(&fs, Path::new("bin/absent"), &["build/main.src"]).unwrap();
        assert!(got);
    }

    #[test]
    fn older_inputs_are_up_to_date() {
        let fs = fixture();
        let inputs = ["build/main.src", "build/util.src"];
        assert!(!needs_rebuild(&fs, Path::new("bin/build"), &inputs).unwrap());
    }

    #[test]
    fn equal_mtime_is_not_newer() {
        let fs = fixture();
        fs.add_file("build/same.src", 100);
        assert!(!needs_rebuild1(&fs, Path::new("bin/build"), Path::new("build/same.src")).unwrap());
    }

    #[test]
    fn newer_input_needs_rebuild() {
        let fs = fixture();
        fs.add_file("build/util.src", 101);
        let inputs = ["build/main.src", "build/util.src"];
        assert!(needs_rebuild(&fs, Path::new("bin/build"), &inputs).unwrap());
    }

    #[test]
    fn unstatable_input_is_an_error() {
        let fs = fixture();
        let inputs = ["build/main.src", "build/gone.src"];
        match needs_rebuild(&fs, Path::new("bin/build"), &inputs) {
            Err(RebuildError::Stat { path, .. }) => assert_eq!(path, Path::new("build/gone.src")),
            other => panic!("expected stat error, got {other:?}"),
        }
    }

    #[test]
    fn directories_expand_to_matching_immediate_files() {
        let fs = fixture();
        let got = expand_sources(&fs, &["build"], "src");
        assert_eq!(
            got,
            vec![PathBuf::from("build/main.src"), PathBuf::from("build/util.src")]
        );
    }

    #[test]
    fn files_and_missing_paths_are_kept_literally() {
        let fs = fixture();
        fs.add_unreadable("build/broken.src");
        let got = expand_sources(&fs, &["build/notes.txt", "nowhere/x.src", "build/broken.src"], "src");
        assert_eq!(
            got,
            vec![
                PathBuf::from("build/notes.txt"),
                PathBuf::from("nowhere/x.src"),
                PathBuf::from("build/broken.src"),
            ]
        );
        assert!(needs_rebuild(&fs, Path::new("bin/build"), &got[1..]).is_err());
        assert!(needs_rebuild(&fs, Path::new("bin/build"), &got[2..]).is_err());
    }
}
