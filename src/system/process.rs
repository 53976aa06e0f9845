use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::source::ProcessReading;

pub const DEFAULT_TOP_PROCESSES: usize = 50;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CpuBaseline {
    cpu_time_ms: u64,
    read_at: Instant,
}

/// Per-process cursor: remembers how much CPU time the process had consumed
/// at the last read so the next read can turn it into a percentage.
///
/// A fresh handle is unprimed and its first reading is always 0.
#[derive(Clone, Debug)]
pub struct ProcessHandle {
    pid: u32,
    start_time: Option<u64>,
    baseline: Option<CpuBaseline>,
}

impl ProcessHandle {
    pub fn new(pid: u32, start_time: Option<u64>) -> Self {
        ProcessHandle {
            pid,
            start_time,
            baseline: None,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn start_time(&self) -> Option<u64> {
        self.start_time
    }

    pub fn is_primed(&self) -> bool {
        self.baseline.is_some()
    }

    /// CPU share since the previous read, in percent of one core. Records
    /// `cpu_time_ms` as the next baseline. CPU time that went backwards
    /// re-primes the handle and reads 0.
    pub fn read_cpu(&mut self, cpu_time_ms: u64, now: Instant, min_elapsed: Duration) -> f32 {
        let percent = match self.baseline {
            Some(prev) if cpu_time_ms >= prev.cpu_time_ms => {
                let elapsed = now
                    .saturating_duration_since(prev.read_at)
                    .max(min_elapsed)
                    .as_secs_f64();
                let cpu_secs = (cpu_time_ms - prev.cpu_time_ms) as f64 / 1000.0;
                cpu_secs / elapsed * 100.0
            }
            _ => 0.0,
        };
        self.baseline = Some(CpuBaseline {
            cpu_time_ms,
            read_at: now,
        });
        if percent.is_finite() { percent as f32 } else { 0.0 }
    }
}

/// Handles keyed by PID, bounded to the processes seen in the latest poll.
#[derive(Debug)]
pub struct ProcessCache {
    handles: HashMap<u32, ProcessHandle>,
    min_elapsed: Duration,
}

impl ProcessCache {
    pub fn new(min_elapsed: Duration) -> Self {
        ProcessCache {
            handles: HashMap::new(),
            min_elapsed: min_elapsed.max(Duration::from_millis(1)),
        }
    }

    /// Read CPU percent for `reading` through its handle, creating the handle
    /// on first sight. A changed start time means the PID was reused, so the
    /// old handle is replaced.
    pub fn observe(&mut self, reading: &ProcessReading, now: Instant) -> f32 {
        let min_elapsed = self.min_elapsed;
        let handle = match self.handles.entry(reading.pid) {
            Entry::Occupied(entry) => {
                let handle = entry.into_mut();
                if reading.start_time.is_some() && handle.start_time != reading.start_time {
                    tracing::trace!(pid = reading.pid, "pid reused, replacing handle");
                    *handle = ProcessHandle::new(reading.pid, reading.start_time);
                }
                handle
            }
            Entry::Vacant(entry) => {
                tracing::trace!(pid = reading.pid, "tracking new pid");
                entry.insert(ProcessHandle::new(reading.pid, reading.start_time))
            }
        };
        handle.read_cpu(reading.cpu_time_ms, now, min_elapsed)
    }

    /// Drop handles whose PID is not in `live`. Returns how many were evicted.
    pub fn retain_live(&mut self, live: &HashSet<u32>) -> usize {
        let before = self.handles.len();
        self.handles.retain(|pid, _| live.contains(pid));
        let evicted = before - self.handles.len();
        if evicted > 0 {
            tracing::trace!(evicted, remaining = self.handles.len(), "evicted exited pids");
        }
        evicted
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessHandle> {
        self.handles.get(&pid)
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.handles.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn pids(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self.handles.keys().copied().collect();
        pids.sort_unstable();
        pids
    }
}

/// Keep the `limit` busiest processes, highest CPU first. The sort is stable
/// so equal readings keep their enumeration order.
pub fn rank_top(mut processes: Vec<ProcessInfo>, limit: usize) -> Vec<ProcessInfo> {
    processes.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
    processes.truncate(limit);
    processes
}
