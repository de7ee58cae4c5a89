//! Just enough ISO9660 to read a volume label.
//!
//! Volume descriptors start at sector 16 (2048-byte sectors). Each carries a
//! type byte, the `CD001` standard identifier, and a version byte. The primary
//! volume descriptor (type 1) holds the volume identifier as a 32-byte
//! space-padded field at offset 40.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

const SECTOR_SIZE: u64 = 2048;
const DESCRIPTOR_AREA_START: u64 = 16;
/// Sanity bound on the descriptor walk; real media terminate long before this.
const MAX_DESCRIPTORS: u64 = 64;

const STANDARD_ID: &[u8; 5] = b"CD001";
const TYPE_PRIMARY: u8 = 1;
const TYPE_TERMINATOR: u8 = 255;

const VOLUME_ID_OFFSET: usize = 40;
const VOLUME_ID_LEN: usize = 32;

/// Reads the volume identifier from the primary volume descriptor.
///
/// Returns `Ok(None)` if the medium is not ISO9660 (missing magic, truncated,
/// or no primary descriptor before the set terminator).
pub fn read_volume_label<R: Read + Seek>(disk: &mut R) -> std::io::Result<Option<String>> {
    let mut sector = [0u8; SECTOR_SIZE as usize];
    for index in 0..MAX_DESCRIPTORS {
        disk.seek(SeekFrom::Start((DESCRIPTOR_AREA_START + index) * SECTOR_SIZE))?;
        match disk.read_exact(&mut sector) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => return Err(err),
        }

        if &sector[1..6] != STANDARD_ID {
            return Ok(None);
        }
        match sector[0] {
            TYPE_PRIMARY => {
                let raw = &sector[VOLUME_ID_OFFSET..VOLUME_ID_OFFSET + VOLUME_ID_LEN];
                return Ok(Some(String::from_utf8_lossy(raw).to_string()));
            }
            TYPE_TERMINATOR => return Ok(None),
            _ => continue,
        }
    }
    Ok(None)
}
