//! cloudseed metadata-source providers.
//!
//! A provider represents one possible source of boot-time instance
//! configuration. The aggregator probes each provider and consumes user-data
//! from the first viable one. This crate currently ships the config-drive
//! provider; network-based providers live with the agent.

pub mod configdrive;
pub mod logging;
pub mod provider;

pub use configdrive::{
    find_config_drives, list_config_drives, Candidate, ConfigDrive, MountPolicy,
};
pub use provider::{Provider, ProviderError};
