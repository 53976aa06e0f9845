use std::time::{Duration, Instant};

use serde::Serialize;

use super::source::NetCounters;
use super::units::{KIB, round_to};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct NetworkRate {
    pub sent_kbps: f64,
    pub recv_kbps: f64,
}

/// Turns cumulative byte counters into KB/s between consecutive reads.
#[derive(Debug, Clone)]
pub struct NetworkMeter {
    baseline: Option<(NetCounters, Instant)>,
    min_elapsed: Duration,
}

impl NetworkMeter {
    pub fn new(min_elapsed: Duration) -> Self {
        NetworkMeter {
            baseline: None,
            min_elapsed: min_elapsed.max(Duration::from_millis(1)),
        }
    }

    pub fn prime(&mut self, counters: NetCounters, at: Instant) {
        self.baseline = Some((counters, at));
    }

    pub fn is_primed(&self) -> bool {
        self.baseline.is_some()
    }

    /// Rate since the previous reading; the new reading becomes the baseline.
    /// Without a baseline the rate is zero. A counter that went backwards
    /// (interface removed, driver reset, wrap) reads zero for this interval
    /// and counting restarts from the new value.
    pub fn update(&mut self, counters: NetCounters, at: Instant) -> NetworkRate {
        let rate = match self.baseline {
            Some((previous, previous_at)) => {
                let elapsed = at
                    .saturating_duration_since(previous_at)
                    .max(self.min_elapsed)
                    .as_secs_f64();
                NetworkRate {
                    sent_kbps: kbps(previous.bytes_sent, counters.bytes_sent, elapsed),
                    recv_kbps: kbps(previous.bytes_recv, counters.bytes_recv, elapsed),
                }
            }
            None => NetworkRate::default(),
        };
        self.baseline = Some((counters, at));
        rate
    }
}

fn kbps(previous: u64, current: u64, elapsed_secs: f64) -> f64 {
    let delta = current.saturating_sub(previous);
    round_to(delta as f64 / elapsed_secs / KIB, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(sent: u64, recv: u64) -> NetCounters {
        NetCounters {
            bytes_sent: sent,
            bytes_recv: recv,
        }
    }

    #[test]
    fn unprimed_meter_reports_zero_then_baselines() {
        let mut meter = NetworkMeter::new(Duration::from_millis(1));
        let t0 = Instant::now();
        assert_eq!(meter.update(counters(5000, 5000), t0), NetworkRate::default());
        assert!(meter.is_primed());

        let rate = meter.update(counters(7048, 6024), t0 + Duration::from_secs(1));
        assert_eq!(rate.sent_kbps, 2.0);
        assert_eq!(rate.recv_kbps, 1.0);
    }

    #[test]
    fn one_second_of_1000_bytes() {
        let mut meter = NetworkMeter::new(Duration::from_millis(1));
        let t0 = Instant::now();
        meter.prime(counters(1000, 0), t0);
        let rate = meter.update(counters(2000, 0), t0 + Duration::from_secs(1));
        assert_eq!(rate.sent_kbps, 0.98);
        assert_eq!(rate.recv_kbps, 0.0);
    }

    #[test]
    fn counter_decrease_clamps_and_rebaselines() {
        let mut meter = NetworkMeter::new(Duration::from_millis(1));
        let t0 = Instant::now();
        meter.prime(counters(5000, 9000), t0);

        let reset = meter.update(counters(3000, 100), t0 + Duration::from_secs(1));
        assert_eq!(reset, NetworkRate::default());

        let after = meter.update(counters(4024, 100), t0 + Duration::from_secs(2));
        assert_eq!(after.sent_kbps, 1.0);
        assert_eq!(after.recv_kbps, 0.0);
    }

    #[test]
    fn stalled_clock_uses_elapsed_floor() {
        let mut meter = NetworkMeter::new(Duration::from_millis(1));
        let t0 = Instant::now();
        meter.prime(counters(0, 0), t0);
        let rate = meter.update(counters(1024, 0), t0);
        // 1 KiB over the 1 ms floor
        assert_eq!(rate.sent_kbps, 1000.0);
        assert!(rate.sent_kbps.is_finite());
    }
}
