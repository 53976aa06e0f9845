pub mod clock;
pub mod collector;
pub mod mock;
pub mod network;
pub mod process;
pub mod sampler;
pub mod snapshot;
pub mod source;
pub mod units;

pub use clock::{Clock, ManualClock, SystemClock};
pub use sampler::{HostSampler, Sampler, SharedSampler};
pub use snapshot::Snapshot;
pub use source::{MetricsSource, SourceError};
