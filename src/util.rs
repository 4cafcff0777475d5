// src/util.rs

//! Small shared helpers: processor-count detection and step timing.

use std::fmt::Debug;
use std::time::{Duration, Instant};

use tracing::info;

/// Concurrency bound used when the processor count cannot be determined.
pub const FALLBACK_MAX_PROCS: usize = 4;

/// Capability for querying the number of logical processors.
///
/// Production code uses [`SystemProcessors`]; tests can pin the value with
/// [`FixedProcessors`].
pub trait ProcessorCount: Send + Sync + Debug {
    /// `None` when the platform cannot answer.
    fn logical_processors(&self) -> Option<usize>;
}

/// Asks the OS on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessors;

impl ProcessorCount for SystemProcessors {
    fn logical_processors(&self) -> Option<usize> {
        std::thread::available_parallelism().ok().map(|n| n.get())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedProcessors(pub Option<usize>);

impl ProcessorCount for FixedProcessors {
    fn logical_processors(&self) -> Option<usize> {
        self.0
    }
}

/// Default bound on concurrently running async processes:
/// logical processors + 1, or [`FALLBACK_MAX_PROCS`].
pub fn default_max_procs(processors: &dyn ProcessorCount) -> usize {
    match processors.logical_processors() {
        Some(n) => n + 1,
        None => FALLBACK_MAX_PROCS,
    }
}

/// Wall-clock timer that logs its label and elapsed time.
#[derive(Debug)]
pub struct Stopwatch {
    label: String,
    started: Instant,
}

impl Stopwatch {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Log the elapsed time and return it.
    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        info!(
            label = %self.label,
            elapsed_ms = elapsed.as_millis() as u64,
            "finished"
        );
        elapsed
    }
}
