//! `/proc/self/mountinfo` parsing, enough to answer "is this path mounted".

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub mount_point: PathBuf,
    pub fs_type: String,
}

pub fn parse_mountinfo(content: &str) -> Vec<MountEntry> {
    content.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<MountEntry> {
    // Format: fields... mount_point fields... " - " fstype source options
    let (pre, post) = line.split_once(" - ")?;
    let mount_point = pre.split_whitespace().nth(4)?;
    let fs_type = post.split_whitespace().next()?.to_string();
    Some(MountEntry {
        mount_point: PathBuf::from(unescape(mount_point)),
        fs_type,
    })
}

pub fn is_mounted_from_info(path: &Path, entries: &[MountEntry]) -> bool {
    entries.iter().any(|entry| entry.mount_point == path)
}

/// Mount points with whitespace are octal-escaped by the kernel (`\040` for
/// space and so on).
fn unescape(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let octal = &raw[i + 1..i + 4];
            if let Ok(value) = u8::from_str_radix(octal, 8) {
                out.push(value);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).to_string()
}
