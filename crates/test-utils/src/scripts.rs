//! Helpers for writing small shell scripts used as fake tools in tests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Write `body` to `dir/name` as a `/bin/sh` script and make it executable.
///
/// The file is fully written and closed before this returns.
pub fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))
        .with_context(|| format!("writing script {:?}", path))?;
    make_executable(&path)?;
    Ok(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).with_context(|| format!("chmod {:?}", path))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// A build tool that honours `<verb> <package> -out:<path>` when run as
/// `sh <tool> ...`: it writes a script to `<path>` that exits with
/// `exit_code`.
pub fn fake_build_tool(dir: &Path, exit_code: i32) -> Result<PathBuf> {
    let body = format!(
        r#"out="${{2#-out:}}"
printf '#!/bin/sh\nexit {exit_code}\n' > "$out"
chmod +x "$out""#
    );
    write_script(dir, "fake-build", &body)
}

/// A build tool that always fails without touching its output.
pub fn failing_build_tool(dir: &Path) -> Result<PathBuf> {
    write_script(dir, "broken-build", "echo 'syntax error' >&2\nexit 1")
}
