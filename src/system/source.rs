//! The OS-interface seam.
//!
//! The sampler never reads the host directly. It asks a [`MetricsSource`] for
//! raw readings (cumulative counters, byte totals, CPU time) and does all the
//! delta bookkeeping itself, so the stateful part can be driven by synthetic
//! readings in tests.

use std::path::Path;

use thiserror::Error;

/// Failure of a single source call. Every variant is recoverable; the
/// sampler substitutes a default for the affected field or process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("{metric} unavailable: {reason}")]
    Unavailable {
        metric: &'static str,
        reason: String,
    },
    #[error("process {0} not found")]
    NotFound(u32),
    #[error("permission denied reading process {0}")]
    PermissionDenied(u32),
}

impl SourceError {
    pub fn unavailable(metric: &'static str, reason: impl Into<String>) -> Self {
        SourceError::Unavailable {
            metric,
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryReading {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiskReading {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

/// Cumulative byte counters summed over all interfaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// Raw per-process reading. `cpu_time_ms` is cumulative CPU time consumed
/// since the process started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessReading {
    pub pid: u32,
    pub name: String,
    pub cpu_time_ms: u64,
    pub memory_bytes: u64,
    /// Process start time in seconds since boot or epoch, whichever the
    /// platform reports. Only compared for equality.
    pub start_time: Option<u64>,
}

pub trait MetricsSource {
    /// Host-wide CPU utilization since the previous call. Must not block.
    fn cpu_percent(&mut self) -> Result<f32, SourceError>;

    fn memory(&mut self) -> Result<MemoryReading, SourceError>;

    /// Usage of the filesystem mounted at `mount_point`.
    fn disk(&mut self, mount_point: &Path) -> Result<DiskReading, SourceError>;

    fn network(&mut self) -> Result<NetCounters, SourceError>;

    /// Enumerate live PIDs, in the order they should be ranked on ties.
    fn process_ids(&mut self) -> Result<Vec<u32>, SourceError>;

    /// Detail read for one PID from the most recent enumeration.
    /// Returns [`SourceError::NotFound`] when the process exited since.
    fn process(&mut self, pid: u32) -> Result<ProcessReading, SourceError>;
}

impl<T: MetricsSource + ?Sized> MetricsSource for Box<T> {
    fn cpu_percent(&mut self) -> Result<f32, SourceError> {
        (**self).cpu_percent()
    }

    fn memory(&mut self) -> Result<MemoryReading, SourceError> {
        (**self).memory()
    }

    fn disk(&mut self, mount_point: &Path) -> Result<DiskReading, SourceError> {
        (**self).disk(mount_point)
    }

    fn network(&mut self) -> Result<NetCounters, SourceError> {
        (**self).network()
    }

    fn process_ids(&mut self) -> Result<Vec<u32>, SourceError> {
        (**self).process_ids()
    }

    fn process(&mut self, pid: u32) -> Result<ProcessReading, SourceError> {
        (**self).process(pid)
    }
}
