//! Mount boundary: trait definition, real Linux backend, and a recording
//! fake for CI-safe tests.

pub mod fake_hal;
pub mod guards;
pub mod linux_hal;
pub mod mount_ops;

pub use fake_hal::{FakeHal, Operation};
pub use guards::MountGuard;
pub use linux_hal::LinuxHal;
pub use mount_ops::{MountOps, MountOptions};
