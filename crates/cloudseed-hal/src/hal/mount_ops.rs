//! Mount operations trait.

use crate::HalResult;
use std::path::Path;

/// Trait for mounting and unmounting filesystems.
pub trait MountOps {
    /// Mount a device onto a target path.
    ///
    /// # Arguments
    /// * `device` - Device node path (e.g., `/dev/sr0`)
    /// * `target` - Mount point path
    /// * `fstype` - Optional filesystem type (e.g., `"iso9660"`, `"vfat"`)
    /// * `options` - Mount options
    fn mount_device(
        &self,
        device: &Path,
        target: &Path,
        fstype: Option<&str>,
        options: MountOptions,
    ) -> HalResult<()>;

    /// Unmount a filesystem.
    fn unmount(&self, target: &Path) -> HalResult<()>;

    /// Check if a path is currently a mount point.
    fn is_mounted(&self, path: &Path) -> HalResult<bool>;
}

/// Mount options and flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct MountOptions {
    pub read_only: bool,
}

impl MountOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_only() -> Self {
        Self { read_only: true }
    }
}
