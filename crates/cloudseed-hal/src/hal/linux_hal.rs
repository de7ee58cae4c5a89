//! Linux backend using real mount syscalls.

use super::{MountOps, MountOptions};
use crate::{HalError, HalResult};
use nix::mount::{mount, umount2, MntFlags, MsFlags};
use std::fs;
use std::path::Path;

/// Real mount backend for Linux systems.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxHal;

impl LinuxHal {
    pub fn new() -> Self {
        Self
    }
}

fn map_nix_err(err: nix::errno::Errno) -> HalError {
    use nix::errno::Errno;
    match err {
        Errno::EBUSY => HalError::DeviceBusy,
        Errno::EACCES | Errno::EPERM => HalError::PermissionDenied,
        other => HalError::Nix(other),
    }
}

impl MountOps for LinuxHal {
    fn mount_device(
        &self,
        device: &Path,
        target: &Path,
        fstype: Option<&str>,
        options: MountOptions,
    ) -> HalResult<()> {
        let mut flags = MsFlags::empty();
        if options.read_only {
            flags |= MsFlags::MS_RDONLY;
        }

        mount(Some(device), target, fstype, flags, None::<&str>).map_err(map_nix_err)?;
        Ok(())
    }

    fn unmount(&self, target: &Path) -> HalResult<()> {
        umount2(target, MntFlags::empty()).map_err(map_nix_err)?;
        Ok(())
    }

    fn is_mounted(&self, path: &Path) -> HalResult<bool> {
        let content = fs::read_to_string("/proc/self/mountinfo")?;
        let entries = crate::procfs::mountinfo::parse_mountinfo(&content);
        Ok(crate::procfs::mountinfo::is_mounted_from_info(
            path, &entries,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_without_privileges_maps_permission_error() {
        // Unprivileged mount of a nonexistent device must fail cleanly with a
        // mapped error rather than panic. Root CI runners get ENOENT instead,
        // which still exercises the error path.
        let hal = LinuxHal::new();
        let err = hal
            .mount_device(
                Path::new("/dev/does-not-exist"),
                Path::new("/tmp"),
                Some("iso9660"),
                MountOptions::read_only(),
            )
            .unwrap_err();
        match err {
            HalError::PermissionDenied | HalError::DeviceBusy | HalError::Nix(_) => {}
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn is_mounted_reports_root() {
        let hal = LinuxHal::new();
        assert!(hal.is_mounted(Path::new("/")).unwrap());
    }
}
