pub mod backend;
pub mod client;
pub mod config;

pub use backend::{ZfsBackend, ZfsProbe};
pub use client::{VolumeClient, VolumeOptions, VolumeStatus, ZfsCliClient};
pub use config::ZfsConfig;
