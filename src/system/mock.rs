//! Scripted `MetricsSource` for tests and benches.
//!
//! A [`ScriptedSource`] serves whatever [`HostFrame`] it currently holds.
//! Clones share the frame, so a test keeps one clone to rewrite the host
//! state between polls while the sampler owns the other. A field set to
//! `None` makes the matching source call fail.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use super::source::{
    DiskReading, MemoryReading, MetricsSource, NetCounters, ProcessReading, SourceError,
};

const GIB: u64 = 1024 * 1024 * 1024;

#[derive(Clone, Debug, Default)]
pub struct HostFrame {
    pub cpu_percent: Option<f32>,
    pub memory: Option<MemoryReading>,
    pub disk: Option<DiskReading>,
    pub network: Option<NetCounters>,
    pub processes: Option<Vec<ProcessReading>>,
    /// Listed by `process_ids` but gone by the detail read.
    pub vanishing: Vec<u32>,
    /// Listed by `process_ids` but unreadable.
    pub denied: Vec<u32>,
}

impl HostFrame {
    /// A quiet host: 16 GiB RAM with 8 free, 100 GiB disk with 40 free,
    /// zeroed counters and no processes.
    pub fn idle() -> Self {
        HostFrame {
            cpu_percent: Some(0.0),
            memory: Some(MemoryReading {
                total_bytes: 16 * GIB,
                available_bytes: 8 * GIB,
            }),
            disk: Some(DiskReading {
                total_bytes: 100 * GIB,
                available_bytes: 40 * GIB,
            }),
            network: Some(NetCounters::default()),
            processes: Some(Vec::new()),
            vanishing: Vec::new(),
            denied: Vec::new(),
        }
    }

    pub fn with_cpu(mut self, percent: f32) -> Self {
        self.cpu_percent = Some(percent);
        self
    }

    pub fn with_network(mut self, bytes_sent: u64, bytes_recv: u64) -> Self {
        self.network = Some(NetCounters {
            bytes_sent,
            bytes_recv,
        });
        self
    }

    pub fn with_processes(mut self, processes: Vec<ProcessReading>) -> Self {
        self.processes = Some(processes);
        self
    }
}

pub fn process(pid: u32, name: &str, cpu_time_ms: u64, memory_bytes: u64) -> ProcessReading {
    ProcessReading {
        pid,
        name: name.to_string(),
        cpu_time_ms,
        memory_bytes,
        start_time: None,
    }
}

#[derive(Debug, Default)]
struct Script {
    frame: HostFrame,
    cpu_reads: usize,
}

#[derive(Clone, Debug, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSource {
    pub fn new(frame: HostFrame) -> Self {
        ScriptedSource {
            script: Arc::new(Mutex::new(Script { frame, cpu_reads: 0 })),
        }
    }

    pub fn set(&self, frame: HostFrame) {
        self.lock().frame = frame;
    }

    pub fn update(&self, edit: impl FnOnce(&mut HostFrame)) {
        edit(&mut self.lock().frame);
    }

    /// How many times `cpu_percent` has been called.
    pub fn cpu_reads(&self) -> usize {
        self.lock().cpu_reads
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MetricsSource for ScriptedSource {
    fn cpu_percent(&mut self) -> Result<f32, SourceError> {
        let mut script = self.lock();
        script.cpu_reads += 1;
        script
            .frame
            .cpu_percent
            .ok_or_else(|| SourceError::unavailable("cpu", "scripted failure"))
    }

    fn memory(&mut self) -> Result<MemoryReading, SourceError> {
        self.lock()
            .frame
            .memory
            .ok_or_else(|| SourceError::unavailable("memory", "scripted failure"))
    }

    fn disk(&mut self, mount_point: &Path) -> Result<DiskReading, SourceError> {
        self.lock().frame.disk.ok_or_else(|| {
            SourceError::unavailable(
                "disk",
                format!("no filesystem mounted at {}", mount_point.display()),
            )
        })
    }

    fn network(&mut self) -> Result<NetCounters, SourceError> {
        self.lock()
            .frame
            .network
            .ok_or_else(|| SourceError::unavailable("network", "scripted failure"))
    }

    fn process_ids(&mut self) -> Result<Vec<u32>, SourceError> {
        let script = self.lock();
        let processes = script
            .frame
            .processes
            .as_ref()
            .ok_or_else(|| SourceError::unavailable("process list", "scripted failure"))?;
        Ok(processes.iter().map(|p| p.pid).collect())
    }

    fn process(&mut self, pid: u32) -> Result<ProcessReading, SourceError> {
        let script = self.lock();
        let frame = &script.frame;
        if frame.vanishing.contains(&pid) {
            return Err(SourceError::NotFound(pid));
        }
        if frame.denied.contains(&pid) {
            return Err(SourceError::PermissionDenied(pid));
        }
        frame
            .processes
            .iter()
            .flatten()
            .find(|p| p.pid == pid)
            .cloned()
            .ok_or(SourceError::NotFound(pid))
    }
}
