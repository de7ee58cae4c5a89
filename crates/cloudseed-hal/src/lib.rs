//! cloudseed host abstraction layer.
//!
//! Everything that touches the host directly lives here: sysfs block-device
//! enumeration, read-only filesystem probing, and the mount boundary with a
//! real Linux backend plus a recording fake for CI-safe tests.

pub mod error;
pub mod fsprobe;
pub mod hal;
pub mod procfs;
pub mod sysfs;

pub use error::{HalError, HalResult};
pub use fsprobe::{FsInfo, FsKind};
pub use hal::{FakeHal, LinuxHal, MountGuard, MountOps, MountOptions, Operation};
