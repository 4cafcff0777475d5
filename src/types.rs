// src/types.rs

use std::borrow::Cow;
use std::process::ExitStatus;

/// Result of running a command with its stdout captured in memory.
///
/// The captured bytes are returned whatever the exit status, so callers can
/// inspect output of a failed command.
#[derive(Debug, Clone)]
pub struct Capture {
    pub stdout: Vec<u8>,
    pub status: ExitStatus,
}

impl Capture {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or `None` if the process was terminated by a signal.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }
}
