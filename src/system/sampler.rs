use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::config::SamplerConfig;

use super::clock::{Clock, SystemClock};
use super::collector::SysinfoCollector;
use super::network::{NetworkMeter, NetworkRate};
use super::process::{ProcessCache, ProcessInfo, rank_top};
use super::snapshot::{DiskStats, MemoryStats, Snapshot};
use super::source::{MetricsSource, SourceError};
use super::units::{percent_of, round_to};

/// Owns everything that has to survive between polls: the network counter
/// baseline and one CPU-time cursor per live process.
///
/// `poll` never fails. Each metric falls back to zero on its own, so a broken
/// disk read still yields CPU, memory, network and process data.
pub struct Sampler<S, C = SystemClock> {
    source: S,
    clock: C,
    config: SamplerConfig,
    network: NetworkMeter,
    cache: ProcessCache,
}

pub type HostSampler = Sampler<SysinfoCollector, SystemClock>;

impl HostSampler {
    pub fn host(config: SamplerConfig) -> Self {
        Sampler::new(SysinfoCollector::new(), SystemClock, config)
    }
}

impl<S: MetricsSource, C: Clock> Sampler<S, C> {
    /// Builds the sampler and takes the primer reads: one throwaway CPU read
    /// so the first `poll` measures a real interval, and a network baseline
    /// so the first `poll` reports a rate instead of zero.
    pub fn new(mut source: S, clock: C, config: SamplerConfig) -> Self {
        let min_elapsed = config.min_elapsed();

        if let Err(err) = source.cpu_percent() {
            debug!(error = %err, "cpu primer read failed");
        }

        let mut network = NetworkMeter::new(min_elapsed);
        match source.network() {
            Ok(counters) => network.prime(counters, clock.now()),
            Err(err) => debug!(error = %err, "network primer read failed"),
        }

        Sampler {
            source,
            clock,
            config,
            network,
            cache: ProcessCache::new(min_elapsed),
        }
    }

    pub fn poll(&mut self) -> Snapshot {
        let _poll_span = tracing::debug_span!("sampler.poll").entered();

        let timestamp = self.clock.wall();
        let cpu_percent = self.read_cpu();
        let memory_reading = fallback("memory", self.source.memory());
        let memory = memory_reading.map(MemoryStats::from).unwrap_or_default();
        let disk = self.read_disk();
        let network = self.read_network();
        let total_memory = memory_reading.map(|m| m.total_bytes).unwrap_or(0);
        let processes = self.read_processes(total_memory);

        Snapshot {
            timestamp,
            cpu_percent,
            memory,
            disk,
            network,
            processes,
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cached_pids(&self) -> Vec<u32> {
        self.cache.pids()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn read_cpu(&mut self) -> f32 {
        fallback("cpu", self.source.cpu_percent())
            .map(|pct| round_to(f64::from(pct), 1).clamp(0.0, 100.0) as f32)
            .unwrap_or(0.0)
    }

    fn read_disk(&mut self) -> DiskStats {
        fallback("disk", self.source.disk(&self.config.disk_mount_point))
            .map(DiskStats::from)
            .unwrap_or_default()
    }

    fn read_network(&mut self) -> NetworkRate {
        // On failure the old baseline stays, so the next good read averages
        // over the longer interval.
        match fallback("network", self.source.network()) {
            Some(counters) => self.network.update(counters, self.clock.now()),
            None => NetworkRate::default(),
        }
    }

    fn read_processes(&mut self, total_memory: u64) -> Vec<ProcessInfo> {
        let Some(pids) = fallback("process list", self.source.process_ids()) else {
            return Vec::new();
        };

        let now = self.clock.now();
        let mut live = HashSet::with_capacity(pids.len());
        let mut processes = Vec::with_capacity(pids.len());

        for pid in pids {
            let reading = match self.source.process(pid) {
                Ok(reading) => reading,
                Err(err) => {
                    tracing::trace!(pid, error = %err, "skipping process");
                    continue;
                }
            };
            let cpu_percent = self.cache.observe(&reading, now);
            live.insert(reading.pid);
            processes.push(ProcessInfo {
                pid: reading.pid,
                name: reading.name,
                cpu_percent: round_to(f64::from(cpu_percent), 1) as f32,
                memory_percent: percent_of(reading.memory_bytes, total_memory),
            });
        }

        self.cache.retain_live(&live);
        rank_top(processes, self.config.max_processes)
    }
}

fn fallback<T>(metric: &'static str, result: Result<T, SourceError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(metric, error = %err, "metric unavailable, reporting zero");
            None
        }
    }
}

/// A sampler that can be polled from several threads. Polls are serialized.
pub struct SharedSampler<S, C = SystemClock> {
    inner: Arc<Mutex<Sampler<S, C>>>,
}

impl<S, C> Clone for SharedSampler<S, C> {
    fn clone(&self) -> Self {
        SharedSampler {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: MetricsSource, C: Clock> SharedSampler<S, C> {
    pub fn new(sampler: Sampler<S, C>) -> Self {
        SharedSampler {
            inner: Arc::new(Mutex::new(sampler)),
        }
    }

    pub fn poll(&self) -> Snapshot {
        // A panic mid-poll cannot leave the cache half-updated in a way a
        // later poll would misread, so a poisoned lock is still usable.
        let mut sampler = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        sampler.poll()
    }

    pub fn cache_len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cache_len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::system::clock::ManualClock;
    use crate::system::mock::{HostFrame, ScriptedSource, process};

    type TestSampler = Sampler<ScriptedSource, ManualClock>;

    fn sampler_for(frame: HostFrame) -> (TestSampler, ScriptedSource, ManualClock) {
        let source = ScriptedSource::new(frame);
        let clock = ManualClock::new();
        let sampler = Sampler::new(source.clone(), clock.clone(), SamplerConfig::default());
        (sampler, source, clock)
    }

    #[test]
    fn constructor_takes_one_cpu_primer_read() {
        let (mut sampler, _source, clock) = sampler_for(HostFrame::idle().with_cpu(37.25));
        assert_eq!(sampler.source().cpu_reads(), 1);

        clock.advance(Duration::from_secs(1));
        let snapshot = sampler.poll();
        assert_eq!(sampler.source().cpu_reads(), 2);
        assert_eq!(snapshot.cpu_percent, 37.3);
    }

    #[test]
    fn out_of_range_cpu_is_clamped() {
        let (mut sampler, _source, _clock) = sampler_for(HostFrame::idle().with_cpu(f32::NAN));
        assert_eq!(sampler.poll().cpu_percent, 0.0);

        let (mut sampler, _source, _clock) = sampler_for(HostFrame::idle().with_cpu(140.0));
        assert_eq!(sampler.poll().cpu_percent, 100.0);
    }

    #[test]
    fn memory_share_uses_total_memory() {
        let frame =
            HostFrame::idle().with_processes(vec![process(1, "db", 0, 4 * 1024 * 1024 * 1024)]);
        let (mut sampler, _source, _clock) = sampler_for(frame);
        let snapshot = sampler.poll();
        // idle frame has 16 GiB total
        assert_eq!(snapshot.processes[0].memory_percent, 25.0);
    }

    #[test]
    fn missing_memory_zeroes_process_memory_share() {
        let frame = HostFrame {
            memory: None,
            ..HostFrame::idle().with_processes(vec![process(1, "db", 0, 1024)])
        };
        let (mut sampler, _source, _clock) = sampler_for(frame);
        let snapshot = sampler.poll();
        assert_eq!(snapshot.memory, MemoryStats::default());
        assert_eq!(snapshot.processes.len(), 1);
        assert_eq!(snapshot.processes[0].memory_percent, 0.0);
    }

    #[test]
    fn network_failure_keeps_baseline() {
        let (mut sampler, source, clock) = sampler_for(HostFrame::idle().with_network(0, 0));

        source.update(|frame| frame.network = None);
        clock.advance(Duration::from_secs(1));
        assert_eq!(sampler.poll().network, NetworkRate::default());

        source.update(|frame| frame.network = Some(counters(2048, 0)));
        clock.advance(Duration::from_secs(1));
        // 2 KiB over the two seconds since the primer
        assert_eq!(sampler.poll().network.sent_kbps, 1.0);
    }

    #[test]
    fn shared_sampler_clones_poll_the_same_state() {
        let (sampler, source, _clock) = sampler_for(HostFrame::idle());
        let shared = SharedSampler::new(sampler);
        let other = shared.clone();

        source.update(|frame| {
            frame.processes = Some(vec![process(1, "a", 0, 0), process(2, "b", 0, 0)])
        });
        shared.poll();
        assert_eq!(other.cache_len(), 2);

        source.update(|frame| frame.processes = Some(vec![process(2, "b", 0, 0)]));
        other.poll();
        assert_eq!(shared.cache_len(), 1);
    }

    fn counters(sent: u64, recv: u64) -> crate::system::source::NetCounters {
        crate::system::source::NetCounters {
            bytes_sent: sent,
            bytes_recv: recv,
        }
    }
}
