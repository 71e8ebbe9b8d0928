pub mod backend;
pub mod config;
pub mod device;
pub mod error;
pub mod monitor;
pub mod store;

pub use backend::{PlainBackend, StorageBackend};
pub use config::{DeviceConfig, NodeConfig};
pub use device::{Device, DeviceStatus, FaultClass};
pub use error::{LfsError, Result};
pub use monitor::{FaultEvent, FaultLatch, HealthMonitor, HealthProbe, MonitorTaskHandle};
pub use store::StorageCore;
