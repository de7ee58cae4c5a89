//! Config-drive metadata source.
//!
//! Removable or virtual media labeled `config-2` carry cloud-init style
//! configuration under a fixed `openstack/latest/` layout. Discovery scans
//! sysfs block devices and probes filesystem labels without mutating
//! anything; construction mounts a candidate read-only, captures the
//! well-known files, and unmounts again before returning. Providers are
//! immutable once constructed.

use crate::provider::{Provider, ProviderError};
use anyhow::Result;
use cloudseed_hal::fsprobe::{self, FsKind};
use cloudseed_hal::sysfs::block;
use cloudseed_hal::{MountGuard, MountOps, MountOptions};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Volume label identifying a config drive. Compared case-sensitively after
/// trimming surrounding whitespace, per the cloud-init config-drive spec.
pub const CONFIG_DRIVE_LABEL: &str = "config-2";

/// Directory under the mount root holding the data files.
pub const DATA_DIR: &str = "openstack/latest";

pub const USERDATA_FILE: &str = "user_data";
pub const METADATA_FILE: &str = "meta_data.json";
/// Part of the config-drive layout; reserved, not currently read.
pub const NETWORKDATA_FILE: &str = "network_data.json";

/// A discovered device carrying a config drive. The probed filesystem type
/// travels with the device so the later mount does not have to guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub device: PathBuf,
    pub fstype: FsKind,
}

/// Bounded retry around the mount attempt. Freshly attached media can take a
/// moment to become mountable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for MountPolicy {
    /// Single attempt, preserving the historical no-retry behavior.
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Scans the default host locations for config drives.
pub fn find_config_drives() -> Result<Vec<Candidate>> {
    find_config_drives_in(
        Path::new(block::SYS_CLASS_BLOCK),
        Path::new(block::DEV_ROOT),
    )
}

/// Scans `sys_block_root` for block devices whose filesystem label matches
/// [`CONFIG_DRIVE_LABEL`], resolving device nodes under `dev_root`.
///
/// Per-device failures (device busy, no medium, unknown format) are logged
/// and skip the device; only the enumeration itself can fail. Order follows
/// the sorted enumeration; duplicates are not collapsed.
pub fn find_config_drives_in(sys_block_root: &Path, dev_root: &Path) -> Result<Vec<Candidate>> {
    let names = block::candidate_device_names(sys_block_root)?;
    let mut found = Vec::new();
    for name in names {
        let device = block::device_node(dev_root, &name);
        log::debug!("checking device: {}", device.display());
        let info = match fsprobe::probe_device(&device) {
            Ok(info) => info,
            Err(err) => {
                log::debug!("skipping {}: {err:#}", device.display());
                continue;
            }
        };
        let label = info.label.trim();
        log::debug!(
            "device {} has {} label '{label}'",
            device.display(),
            info.kind
        );
        if label == CONFIG_DRIVE_LABEL {
            found.push(Candidate {
                device,
                fstype: info.kind,
            });
        }
    }
    Ok(found)
}

/// Discovers config drives and wraps each in a constructed provider.
pub fn list_config_drives<H: MountOps>(hal: &H) -> Result<Vec<Box<dyn Provider>>> {
    let candidates = find_config_drives()?;
    log::debug!("config-2 devices to be checked: {candidates:?}");
    Ok(candidates
        .into_iter()
        .map(|c| Box::new(ConfigDrive::new(hal, c.device, c.fstype)) as Box<dyn Provider>)
        .collect())
}

/// One candidate metadata source bound to a device.
///
/// All I/O happens inside the constructor: the device is mounted read-only on
/// a private temporary directory, the data files are captured, and the mount
/// point is unmounted and removed before the constructor returns. Failures
/// are stored, not propagated; the aggregator inspects them through
/// [`Provider::probe`] and [`Provider::extract`].
#[derive(Debug)]
pub struct ConfigDrive {
    device: PathBuf,
    fstype: FsKind,
    userdata: Vec<u8>,
    metadata: Vec<u8>,
    err: Option<ProviderError>,
}

impl ConfigDrive {
    pub fn new<H: MountOps>(hal: &H, device: impl Into<PathBuf>, fstype: FsKind) -> Self {
        Self::with_policy(hal, device, fstype, MountPolicy::default())
    }

    pub fn with_policy<H: MountOps>(
        hal: &H,
        device: impl Into<PathBuf>,
        fstype: FsKind,
        policy: MountPolicy,
    ) -> Self {
        Self::construct(hal, device.into(), fstype, policy, None)
    }

    fn construct<H: MountOps>(
        hal: &H,
        device: PathBuf,
        fstype: FsKind,
        policy: MountPolicy,
        tmp_root: Option<&Path>,
    ) -> Self {
        let mut drive = Self {
            device,
            fstype,
            userdata: Vec::new(),
            metadata: Vec::new(),
            err: None,
        };

        let mut builder = tempfile::Builder::new();
        builder.prefix("configdrive-");
        let mount_dir = match tmp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        let mount_dir = match mount_dir {
            Ok(dir) => dir,
            Err(err) => {
                drive.err = Some(ProviderError::MountPoint(err.to_string()));
                return drive;
            }
        };

        if let Err(err) = mount_with_retry(hal, &drive.device, mount_dir.path(), fstype, policy) {
            drive.err = Some(err);
            return drive;
        }

        {
            // The guard unmounts on every exit path; it drops before
            // `mount_dir`, so the unmount is sequenced ahead of the
            // directory removal.
            let guard = MountGuard::new(hal, mount_dir.path());
            drive.read_data(guard.target());
        }
        drive
    }

    fn read_data(&mut self, mount_root: &Path) {
        let data_dir = mount_root.join(DATA_DIR);

        match fs::read(data_dir.join(USERDATA_FILE)) {
            Ok(bytes) if bytes.is_empty() => self.err = Some(ProviderError::MissingUserData),
            Ok(bytes) => self.userdata = bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.err = Some(ProviderError::MissingUserData)
            }
            Err(err) => self.err = Some(ProviderError::UserData(err.to_string())),
        }

        // Metadata is optional; absence is not an error.
        if let Ok(bytes) = fs::read(data_dir.join(METADATA_FILE)) {
            self.metadata = bytes;
        }
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    pub fn fstype(&self) -> FsKind {
        self.fstype
    }

    /// Captured `meta_data.json` bytes; empty if the file was absent.
    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }
}

fn mount_with_retry<H: MountOps>(
    hal: &H,
    device: &Path,
    target: &Path,
    fstype: FsKind,
    policy: MountPolicy,
) -> std::result::Result<(), ProviderError> {
    let attempts = policy.attempts.max(1);
    let mut last = None;
    for attempt in 1..=attempts {
        match hal.mount_device(
            device,
            target,
            Some(fstype.as_str()),
            MountOptions::read_only(),
        ) {
            Ok(()) => return Ok(()),
            Err(err) => {
                log::debug!(
                    "mount attempt {attempt}/{attempts} for {} failed: {err}",
                    device.display()
                );
                last = Some(err);
                if attempt < attempts {
                    thread::sleep(policy.backoff);
                }
            }
        }
    }
    Err(ProviderError::Mount {
        device: device.display().to_string(),
        fstype: fstype.as_str().to_string(),
        reason: last.map(|e| e.to_string()).unwrap_or_default(),
    })
}

impl Provider for ConfigDrive {
    fn describe(&self) -> String {
        format!("ConfigDrive {}", self.device.display())
    }

    fn probe(&self) -> bool {
        !self.userdata.is_empty()
    }

    fn extract(&self) -> std::result::Result<&[u8], ProviderError> {
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(&self.userdata),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudseed_hal::{FakeHal, HalError, Operation};
    use tempfile::tempdir;

    const USERDATA_PATH: &str = "openstack/latest/user_data";
    const METADATA_PATH: &str = "openstack/latest/meta_data.json";

    fn mount_target(hal: &FakeHal) -> PathBuf {
        hal.operations()
            .iter()
            .find_map(|op| match op {
                Operation::Mount { target, .. } => Some(target.clone()),
                _ => None,
            })
            .expect("no mount recorded")
    }

    #[test]
    fn construction_captures_userdata_and_unmounts() {
        let hal = FakeHal::new();
        let device = Path::new("/dev/sr0");
        hal.set_device_tree(
            device,
            &[
                (USERDATA_PATH, b"#cloud-config\n"),
                (METADATA_PATH, b"{\"uuid\":\"abc\"}"),
            ],
        );

        let drive = ConfigDrive::new(&hal, device, FsKind::Iso9660);

        assert!(drive.probe());
        assert_eq!(drive.extract().unwrap(), b"#cloud-config\n");
        assert_eq!(drive.metadata(), b"{\"uuid\":\"abc\"}");
        assert_eq!(drive.describe(), "ConfigDrive /dev/sr0");

        let target = mount_target(&hal);
        assert!(!hal.is_mounted(&target).unwrap());
        assert!(hal.has_operation(|op| matches!(
            op,
            Operation::Mount {
                read_only: true,
                fstype: Some(fstype),
                ..
            } if fstype == "iso9660"
        )));
        assert!(hal.has_operation(|op| matches!(op, Operation::Unmount { .. })));
        // The private mount directory is gone too.
        assert!(!target.exists());
    }

    #[test]
    fn binary_userdata_is_byte_identical() {
        let hal = FakeHal::new();
        let device = Path::new("/dev/vdb");
        let payload: Vec<u8> = (0..=255u8).cycle().take(8192).collect();
        hal.set_device_tree(device, &[(USERDATA_PATH, &payload)]);

        let drive = ConfigDrive::new(&hal, device, FsKind::Vfat);
        assert_eq!(drive.extract().unwrap(), payload.as_slice());
    }

    #[test]
    fn metadata_only_medium_is_not_viable() {
        let hal = FakeHal::new();
        let device = Path::new("/dev/sr0");
        hal.set_device_tree(device, &[(METADATA_PATH, b"{}")]);

        let drive = ConfigDrive::new(&hal, device, FsKind::Iso9660);

        assert!(!drive.probe());
        assert_eq!(drive.extract().unwrap_err(), ProviderError::MissingUserData);
        // Metadata is still captured, and the device was unmounted anyway.
        assert_eq!(drive.metadata(), b"{}");
        assert!(!hal.is_mounted(&mount_target(&hal)).unwrap());
    }

    #[test]
    fn empty_userdata_is_treated_as_missing() {
        let hal = FakeHal::new();
        let device = Path::new("/dev/sr0");
        hal.set_device_tree(device, &[(USERDATA_PATH, b"")]);

        let drive = ConfigDrive::new(&hal, device, FsKind::Iso9660);
        assert!(!drive.probe());
        assert_eq!(drive.extract().unwrap_err(), ProviderError::MissingUserData);
    }

    #[test]
    fn mount_failure_is_captured_not_propagated() {
        let hal = FakeHal::new();
        let device = Path::new("/dev/sdb1");
        hal.set_mount_error(device, HalError::PermissionDenied);

        let drive = ConfigDrive::new(&hal, device, FsKind::Vfat);

        assert!(!drive.probe());
        match drive.extract().unwrap_err() {
            ProviderError::Mount { reason, fstype, .. } => {
                assert_eq!(fstype, "vfat");
                assert!(reason.contains("Permission denied"), "reason: {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Nothing was mounted, so nothing must be unmounted.
        assert!(!hal.has_operation(|op| matches!(op, Operation::Unmount { .. })));
    }

    #[test]
    fn mount_point_failure_skips_the_mount_entirely() {
        let hal = FakeHal::new();
        let tmp = tempdir().unwrap();
        let bogus = tmp.path().join("does-not-exist");

        let drive = ConfigDrive::construct(
            &hal,
            PathBuf::from("/dev/sr0"),
            FsKind::Iso9660,
            MountPolicy::default(),
            Some(&bogus),
        );

        assert!(!drive.probe());
        assert!(matches!(
            drive.extract().unwrap_err(),
            ProviderError::MountPoint(_)
        ));
        assert_eq!(hal.operation_count(), 0);
    }

    #[test]
    fn mount_retry_recovers_from_transient_failure() {
        let hal = FakeHal::new();
        let device = Path::new("/dev/sr0");
        hal.set_device_tree(device, &[(USERDATA_PATH, b"#!/bin/sh\n")]);
        // One-shot failure; the second attempt succeeds.
        hal.set_mount_error(device, HalError::DeviceBusy);

        let policy = MountPolicy {
            attempts: 2,
            backoff: Duration::ZERO,
        };
        let drive = ConfigDrive::with_policy(&hal, device, FsKind::Iso9660, policy);
        assert!(drive.probe());
        assert_eq!(drive.extract().unwrap(), b"#!/bin/sh\n");
    }

    #[test]
    fn default_policy_is_a_single_attempt() {
        assert_eq!(MountPolicy::default().attempts, 1);
    }
}
