//! Read-only filesystem identification for candidate media.
//!
//! Probing never mutates the device: the node is opened read-only and only
//! header sectors are inspected. ISO9660 is recognized first (the common case
//! for optical media), then FAT via the `fatfs` crate.

pub mod iso9660;

use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Filesystem families this layer can identify and mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsKind {
    Iso9660,
    Vfat,
}

impl FsKind {
    /// Token passed to the mount syscall as the filesystem type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FsKind::Iso9660 => "iso9660",
            FsKind::Vfat => "vfat",
        }
    }
}

impl fmt::Display for FsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a successful probe learned about a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsInfo {
    pub kind: FsKind,
    /// Volume label as stored on disk, padding included. Callers trim.
    pub label: String,
}

/// Opens a device node read-only and identifies its filesystem.
pub fn probe_device(device: &Path) -> Result<FsInfo> {
    let file = fs::File::open(device)
        .with_context(|| format!("failed to open {} read-only", device.display()))?;
    probe_disk(file)
}

/// Identifies the filesystem on an already-open disk.
///
/// The `Write` bound comes from `fatfs`; nothing is ever written during a
/// probe.
pub fn probe_disk<D: Read + Write + Seek>(mut disk: D) -> Result<FsInfo> {
    if let Some(label) = iso9660::read_volume_label(&mut disk)? {
        return Ok(FsInfo {
            kind: FsKind::Iso9660,
            label,
        });
    }

    disk.seek(SeekFrom::Start(0))?;
    let fs = fatfs::FileSystem::new(disk, fatfs::FsOptions::new())
        .map_err(|err| anyhow!("no recognizable filesystem: {err}"))?;
    Ok(FsInfo {
        kind: FsKind::Vfat,
        label: fs.volume_label(),
    })
}
