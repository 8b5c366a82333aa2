//! Decoding of `VS_VERSIONINFO` resource blocks.
//!
//! Layout of the root block:
//! - wLength (2 bytes), wValueLength (2 bytes), wType (2 bytes)
//! - szKey: NUL-terminated UTF-16 `"VS_VERSION_INFO"`
//! - padding to a 32-bit boundary
//! - Value: `VS_FIXEDFILEINFO`, wValueLength bytes

use crate::internal::pe_header::{read_u16, read_u32};

pub(crate) const FIXED_FILE_INFO_SIGNATURE: u32 = 0xFEEF_04BD;

const KEY_OFFSET: usize = 6;

/// Locate the `VS_FIXEDFILEINFO` value of a version block, the equivalent of
/// querying the root (`\`) of the block.
pub(crate) fn fixed_file_info(block: &[u8]) -> Option<&[u8]> {
    let value_length = read_u16(block, 2)? as usize;
    if value_length == 0 {
        return None;
    }

    let mut offset = KEY_OFFSET;
    loop {
        match read_u16(block, offset)? {
            0 => break,
            _ => offset += 2,
        }
    }

    let value_start = (offset + 2 + 3) & !3;
    block.get(value_start..value_start + value_length)
}

/// Return `(dwFileVersionMS, dwFileVersionLS)` of a fixed-file-info block,
/// or `None` when the signature does not match.
pub(crate) fn file_version_fields(info: &[u8]) -> Option<(u32, u32)> {
    if read_u32(info, 0)? != FIXED_FILE_INFO_SIGNATURE {
        return None;
    }

    // dwSignature, dwStrucVersion, then the file version pair
    Some((read_u32(info, 8)?, read_u32(info, 12)?))
}

#[cfg(test)]
pub(crate) fn fake_fixed_file_info(signature: u32, ms: u32, ls: u32) -> Vec<u8> {
    let mut info = vec![0u8; 52];
    info[0..4].copy_from_slice(&signature.to_le_bytes());
    info[4..8].copy_from_slice(&0x0001_0000u32.to_le_bytes());
    info[8..12].copy_from_slice(&ms.to_le_bytes());
    info[12..16].copy_from_slice(&ls.to_le_bytes());
    info
}

#[cfg(test)]
pub(crate) fn fake_version_block(info: &[u8]) -> Vec<u8> {
    let mut block = vec![0u8; KEY_OFFSET];
    for unit in "VS_VERSION_INFO\0".encode_utf16() {
        block.extend_from_slice(&unit.to_le_bytes());
    }
    while block.len() % 4 != 0 {
        block.push(0);
    }
    block.extend_from_slice(info);

    let length = block.len() as u16;
    block[0..2].copy_from_slice(&length.to_le_bytes());
    block[2..4].copy_from_slice(&(info.len() as u16).to_le_bytes());
    block
}
