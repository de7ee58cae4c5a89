//! Block-device enumeration via sysfs.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Default sysfs location exposing one entry per block device (partitions
/// included, unlike `/sys/block`).
pub const SYS_CLASS_BLOCK: &str = "/sys/class/block";

/// Default location of the corresponding device nodes.
pub const DEV_ROOT: &str = "/dev";

/// True for device names that never carry removable media (loopback and
/// RAM-backed devices). Denylist only; any other name is a candidate.
pub fn is_synthetic(name: &str) -> bool {
    name.starts_with("loop") || name.starts_with("ram")
}

/// Device-node path for a sysfs block entry name, `/dev/<name>` by convention.
pub fn device_node(dev_root: &Path, name: &str) -> PathBuf {
    dev_root.join(name)
}

/// Enumerates block-device names under `sys_block_root`, skipping synthetic
/// devices, sorted lexicographically for a stable pass order.
///
/// Only the enumeration itself can fail; anything wrong with an individual
/// device is the caller's problem to probe and skip.
pub fn candidate_device_names(sys_block_root: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(sys_block_root)
        .with_context(|| format!("failed to enumerate {}", sys_block_root.display()))?;

    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| {
            if is_synthetic(name) {
                log::debug!("ignoring loop or ram device: {name}");
                false
            } else {
                true
            }
        })
        .collect();
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn synthetic_names_are_denylisted() {
        assert!(is_synthetic("loop0"));
        assert!(is_synthetic("ram15"));
        assert!(!is_synthetic("sda"));
        assert!(!is_synthetic("sr0"));
        assert!(!is_synthetic("vdb1"));
        // Denylist is prefix-exact; zram does not start with "ram".
        assert!(!is_synthetic("zram0"));
    }

    #[test]
    fn candidate_device_names_skips_synthetic_and_sorts() {
        let tmp = tempdir().unwrap();
        for name in ["sr0", "loop0", "sda", "ram0", "sda1"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }

        let names = candidate_device_names(tmp.path()).unwrap();
        assert_eq!(names, vec!["sda", "sda1", "sr0"]);
    }

    #[test]
    fn candidate_device_names_fails_on_missing_root() {
        let tmp = tempdir().unwrap();
        let missing = tmp.path().join("no-such-dir");
        assert!(candidate_device_names(&missing).is_err());
    }

    #[test]
    fn device_node_joins_dev_root() {
        assert_eq!(
            device_node(Path::new("/dev"), "sr0"),
            PathBuf::from("/dev/sr0")
        );
    }
}
