use std::path::Path;

use sysinfo::{
    CpuRefreshKind, Disks, MemoryRefreshKind, Networks, Pid, ProcessRefreshKind,
    ProcessesToUpdate, RefreshKind, System,
};

use super::source::{
    DiskReading, MemoryReading, MetricsSource, NetCounters, ProcessReading, SourceError,
};

/// `MetricsSource` backed by a long-lived `sysinfo` handle.
///
/// `sysinfo` keeps its own CPU baselines, so the instance must be reused
/// across polls rather than rebuilt.
pub struct SysinfoCollector {
    sys: System,
    disks: Disks,
    networks: Networks,
}

impl Default for SysinfoCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoCollector {
    pub fn new() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
                .with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        SysinfoCollector {
            sys,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl MetricsSource for SysinfoCollector {
    fn cpu_percent(&mut self) -> Result<f32, SourceError> {
        self.sys.refresh_cpu_usage();
        if self.sys.cpus().is_empty() {
            return Err(SourceError::unavailable("cpu", "no cpus reported"));
        }
        Ok(self.sys.global_cpu_usage())
    }

    fn memory(&mut self) -> Result<MemoryReading, SourceError> {
        self.sys.refresh_memory();
        let total_bytes = self.sys.total_memory();
        if total_bytes == 0 {
            return Err(SourceError::unavailable("memory", "total memory reported as zero"));
        }
        Ok(MemoryReading {
            total_bytes,
            available_bytes: self.sys.available_memory(),
        })
    }

    fn disk(&mut self, mount_point: &Path) -> Result<DiskReading, SourceError> {
        self.disks.refresh(true);
        if let Some(reading) = find_disk(&self.disks, mount_point) {
            return Ok(reading);
        }
        // mounted after startup; rebuild the list once
        self.disks = Disks::new_with_refreshed_list();
        find_disk(&self.disks, mount_point).ok_or_else(|| {
            SourceError::unavailable(
                "disk",
                format!("no filesystem mounted at {}", mount_point.display()),
            )
        })
    }

    fn network(&mut self) -> Result<NetCounters, SourceError> {
        self.networks.refresh(true);
        let counters = self
            .networks
            .list()
            .values()
            .fold(NetCounters::default(), |acc, data| NetCounters {
                bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
                bytes_recv: acc.bytes_recv.saturating_add(data.total_received()),
            });
        Ok(counters)
    }

    fn process_ids(&mut self) -> Result<Vec<u32>, SourceError> {
        let _refresh_span = tracing::debug_span!("collector.refresh_processes").entered();

        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        // Linux lists every thread as its own entry; keep only real processes
        let mut pids: Vec<u32> = self
            .sys
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, _)| pid.as_u32())
            .collect();
        if pids.is_empty() {
            return Err(SourceError::unavailable("process list", "no processes visible"));
        }
        // sysinfo hands out a hash map; sort so tie order is reproducible
        pids.sort_unstable();
        Ok(pids)
    }

    fn process(&mut self, pid: u32) -> Result<ProcessReading, SourceError> {
        let process = self
            .sys
            .process(Pid::from_u32(pid))
            .filter(|process| process.thread_kind().is_none())
            .ok_or(SourceError::NotFound(pid))?;
        Ok(ProcessReading {
            pid,
            name: process.name().to_string_lossy().to_string(),
            cpu_time_ms: process.accumulated_cpu_time(),
            memory_bytes: process.memory(),
            start_time: Some(process.start_time()),
        })
    }
}

fn find_disk(disks: &Disks, mount_point: &Path) -> Option<DiskReading> {
    disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == mount_point)
        .map(|disk| DiskReading {
            total_bytes: disk.total_space(),
            available_bytes: disk.available_space(),
        })
}
