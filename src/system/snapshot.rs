use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

use super::network::NetworkRate;
use super::process::ProcessInfo;
use super::source::{DiskReading, MemoryReading};
use super::units::{bytes_to_gib, percent_of};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MemoryStats {
    pub total_gb: f64,
    pub available_gb: f64,
    pub percent: f32,
}

impl From<MemoryReading> for MemoryStats {
    fn from(reading: MemoryReading) -> Self {
        let available = reading.available_bytes.min(reading.total_bytes);
        MemoryStats {
            total_gb: bytes_to_gib(reading.total_bytes),
            available_gb: bytes_to_gib(available),
            percent: percent_of(reading.total_bytes - available, reading.total_bytes),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DiskStats {
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub percent: f32,
}

impl From<DiskReading> for DiskStats {
    fn from(reading: DiskReading) -> Self {
        let free = reading.available_bytes.min(reading.total_bytes);
        let used = reading.total_bytes - free;
        DiskStats {
            total_gb: bytes_to_gib(reading.total_bytes),
            used_gb: bytes_to_gib(used),
            free_gb: bytes_to_gib(free),
            percent: percent_of(used, reading.total_bytes),
        }
    }
}

/// One complete poll result. Fields that could not be read are zeroed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    #[serde(serialize_with = "serialize_unix_secs")]
    pub timestamp: SystemTime,
    pub cpu_percent: f32,
    pub memory: MemoryStats,
    pub disk: DiskStats,
    pub network: NetworkRate,
    pub processes: Vec<ProcessInfo>,
}

impl Snapshot {
    /// `HH:MM:SS` of the sample time, in UTC.
    pub fn clock_label(&self) -> String {
        let secs = self
            .timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let of_day = secs % 86_400;
        format!(
            "{:02}:{:02}:{:02}",
            of_day / 3600,
            (of_day % 3600) / 60,
            of_day % 60
        )
    }
}

fn serialize_unix_secs<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    serializer.serialize_f64(secs)
}
