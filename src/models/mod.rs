// Domain models

mod aggregation;
mod report;
mod snapshot;
mod summary;

pub use aggregation::{LoadLeader, TimeBucket};
pub use report::{FleetAlert, FleetReport, ThermalDistribution};
pub use snapshot::{
    FieldValue, GpuBusyScale, MINUTE_KEY_LEN, NormalizedSnapshot, RawSnapshot, ThermalPressure,
};
pub use summary::{DiskEntry, LoadEntry, MachineSummary};
