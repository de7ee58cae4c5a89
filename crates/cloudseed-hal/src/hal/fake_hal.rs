//! Fake mount backend for testing.
//!
//! Records operations instead of executing them, so provider logic can run in
//! CI without root privileges or real media. A device can be given a file
//! tree which is materialized into the mount target on mount, and a one-shot
//! error to fail the next mount attempt with.

use super::{MountOps, MountOptions};
use crate::{HalError, HalResult};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Operation records for test assertions.
#[derive(Debug, Clone)]
pub enum Operation {
    Mount {
        device: PathBuf,
        target: PathBuf,
        fstype: Option<String>,
        read_only: bool,
    },
    Unmount {
        target: PathBuf,
    },
}

#[derive(Debug, Default)]
struct FakeHalState {
    /// All operations in call order.
    operations: Vec<Operation>,
    /// Active mounts, target -> device.
    mounted: HashMap<PathBuf, PathBuf>,
    /// Medium contents per device, materialized on mount.
    device_trees: HashMap<PathBuf, Vec<(PathBuf, Vec<u8>)>>,
    /// One-shot mount failures per device.
    mount_errors: HashMap<PathBuf, HalError>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeHal {
    state: Arc<Mutex<FakeHalState>>,
}

impl FakeHal {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.state.lock().unwrap().operations.clone()
    }

    pub fn operation_count(&self) -> usize {
        self.state.lock().unwrap().operations.len()
    }

    /// Check whether a matching operation was recorded.
    pub fn has_operation(&self, check: impl Fn(&Operation) -> bool) -> bool {
        self.state.lock().unwrap().operations.iter().any(check)
    }

    /// Define the file tree a device exposes once mounted. Paths are relative
    /// to the mount root.
    pub fn set_device_tree(&self, device: &Path, files: &[(&str, &[u8])]) {
        let files = files
            .iter()
            .map(|(rel, bytes)| (PathBuf::from(rel), bytes.to_vec()))
            .collect();
        self.state
            .lock()
            .unwrap()
            .device_trees
            .insert(device.to_path_buf(), files);
    }

    /// Fail the next mount of `device` with `err`. Consumed on use.
    pub fn set_mount_error(&self, device: &Path, err: HalError) {
        self.state
            .lock()
            .unwrap()
            .mount_errors
            .insert(device.to_path_buf(), err);
    }
}

impl MountOps for FakeHal {
    fn mount_device(
        &self,
        device: &Path,
        target: &Path,
        fstype: Option<&str>,
        options: MountOptions,
    ) -> HalResult<()> {
        let files = {
            let mut state = self.state.lock().unwrap();
            if let Some(err) = state.mount_errors.remove(device) {
                return Err(err);
            }
            state.operations.push(Operation::Mount {
                device: device.to_path_buf(),
                target: target.to_path_buf(),
                fstype: fstype.map(String::from),
                read_only: options.read_only,
            });
            state
                .mounted
                .insert(target.to_path_buf(), device.to_path_buf());
            state.device_trees.get(device).cloned()
        };

        log::debug!(
            "fake hal: mount {} -> {} (type: {fstype:?})",
            device.display(),
            target.display()
        );

        if let Some(files) = files {
            for (rel, bytes) in files {
                let dest = target.join(rel);
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(dest, bytes)?;
            }
        }
        Ok(())
    }

    fn unmount(&self, target: &Path) -> HalResult<()> {
        let device = {
            let mut state = self.state.lock().unwrap();
            state.operations.push(Operation::Unmount {
                target: target.to_path_buf(),
            });
            state.mounted.remove(target)
        };

        log::debug!("fake hal: unmount {}", target.display());

        let Some(device) = device else {
            return Err(HalError::Other(format!(
                "{} is not mounted",
                target.display()
            )));
        };

        // Take the medium contents back out of the mount point.
        let files = self.state.lock().unwrap().device_trees.get(&device).cloned();
        if let Some(files) = files {
            for (rel, _) in files {
                if let Some(top) = rel.components().next() {
                    let path = target.join(top);
                    if path.is_dir() {
                        let _ = fs::remove_dir_all(&path);
                    } else {
                        let _ = fs::remove_file(&path);
                    }
                }
            }
        }
        Ok(())
    }

    fn is_mounted(&self, path: &Path) -> HalResult<bool> {
        Ok(self.state.lock().unwrap().mounted.contains_key(path))
    }
}
