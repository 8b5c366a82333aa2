//! Minimal PE header decoding.
//!
//! Only enough of the DOS and NT headers is read to reach the optional header
//! magic. This happens before any full parse, so an unknown magic can be
//! reported as such instead of as a generic parse failure.

use goblin::error::Error as GoblinError;

const DOS_MAGIC: u16 = 0x5A4D; // "MZ"
const PE_SIGNATURE: u32 = 0x0000_4550; // "PE\0\0"
const E_LFANEW_OFFSET: usize = 0x3c;
const COFF_HEADER_SIZE: usize = 20;

pub(crate) fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Return the optional header magic of a PE image.
pub(crate) fn optional_header_magic(data: &[u8]) -> Result<u16, GoblinError> {
    let malformed = |what: &str| GoblinError::Malformed(format!("Not a PE image: {}", what));

    if read_u16(data, 0) != Some(DOS_MAGIC) {
        return Err(malformed("missing MZ signature"));
    }

    let pe_offset = read_u32(data, E_LFANEW_OFFSET)
        .ok_or_else(|| malformed("truncated DOS header"))? as usize;

    if read_u32(data, pe_offset) != Some(PE_SIGNATURE) {
        return Err(malformed("missing PE signature"));
    }

    // Signature (4 bytes) and COFF file header precede the optional header
    pe_offset
        .checked_add(4 + COFF_HEADER_SIZE)
        .and_then(|magic_offset| read_u16(data, magic_offset))
        .ok_or_else(|| malformed("truncated optional header"))
}

#[cfg(test)]
pub(crate) fn fake_image(magic: u16) -> Vec<u8> {
    let mut data = vec![0u8; 0x80 + 4 + COFF_HEADER_SIZE + 2];
    data[0..2].copy_from_slice(&DOS_MAGIC.to_le_bytes());
    data[E_LFANEW_OFFSET..E_LFANEW_OFFSET + 4].copy_from_slice(&0x80u32.to_le_bytes());
    data[0x80..0x84].copy_from_slice(&PE_SIGNATURE.to_le_bytes());
    let magic_offset = 0x80 + 4 + COFF_HEADER_SIZE;
    data[magic_offset..magic_offset + 2].copy_from_slice(&magic.to_le_bytes());
    data
}

#[cfg(test)]
fn put(data: &mut [u8], offset: usize, bytes: &[u8]) {
    data[offset..offset + bytes.len()].copy_from_slice(bytes);
}

/// A loadable-looking DLL with a single `.idata` section importing one
/// `Init` function from each of `imports`, in order.
#[cfg(test)]
pub(crate) fn fake_dll(is_64bit: bool, imports: &[&str]) -> Vec<u8> {
    const PE_OFFSET: usize = 0x40;
    const FILE_ALIGNMENT: u32 = 0x200;
    const SECTION_ALIGNMENT: u32 = 0x1000;
    const IDATA_RVA: u32 = 0x1000;
    const IDATA_OFFSET: usize = 0x200;
    const IDATA_SIZE: usize = 0x200;

    let thunk = if is_64bit { 8 } else { 4 };
    let optional_header_size = if is_64bit { 112 } else { 96 } + 16 * 8;
    let rva = |offset: usize| IDATA_RVA + offset as u32;

    // Import descriptors, a shared hint/name entry, per-DLL lookup and
    // address tables, then the DLL names
    let descriptors_size = 20 * (imports.len() + 1);
    let hint_offset = descriptors_size;
    let hint_name = b"\0\0Init\0\0";
    let thunks_offset = hint_offset + hint_name.len();
    let mut name_offset = thunks_offset + imports.len() * 4 * thunk;

    let mut idata = vec![0u8; IDATA_SIZE];
    put(&mut idata, hint_offset, hint_name);
    for (index, dll) in imports.iter().enumerate() {
        let lookup = thunks_offset + index * 4 * thunk;
        let address = lookup + 2 * thunk;

        let descriptor = 20 * index;
        put(&mut idata, descriptor, &rva(lookup).to_le_bytes());
        put(&mut idata, descriptor + 12, &rva(name_offset).to_le_bytes());
        put(&mut idata, descriptor + 16, &rva(address).to_le_bytes());

        let entry = u64::from(rva(hint_offset)).to_le_bytes();
        put(&mut idata, lookup, &entry[..thunk]);
        put(&mut idata, address, &entry[..thunk]);

        put(&mut idata, name_offset, dll.as_bytes());
        name_offset += dll.len() + 1;
    }

    let mut image = vec![0u8; IDATA_OFFSET];
    put(&mut image, 0, &DOS_MAGIC.to_le_bytes());
    put(&mut image, E_LFANEW_OFFSET, &(PE_OFFSET as u32).to_le_bytes());
    put(&mut image, PE_OFFSET, &PE_SIGNATURE.to_le_bytes());

    let coff = PE_OFFSET + 4;
    let (machine, characteristics): (u16, u16) = if is_64bit {
        (0x8664, 0x2022)
    } else {
        (0x014c, 0x2102)
    };
    put(&mut image, coff, &machine.to_le_bytes());
    put(&mut image, coff + 2, &1u16.to_le_bytes());
    put(&mut image, coff + 16, &(optional_header_size as u16).to_le_bytes());
    put(&mut image, coff + 18, &characteristics.to_le_bytes());

    let optional = coff + COFF_HEADER_SIZE;
    let magic: u16 = if is_64bit { 0x20b } else { 0x10b };
    put(&mut image, optional, &magic.to_le_bytes());
    put(&mut image, optional + 8, &(IDATA_SIZE as u32).to_le_bytes());
    put(&mut image, optional + 20, &IDATA_RVA.to_le_bytes());

    // SectionAlignment sits at offset 32 in both layouts
    let windows = if is_64bit {
        put(&mut image, optional + 24, &0x1_8000_0000u64.to_le_bytes());
        optional + 32
    } else {
        put(&mut image, optional + 24, &IDATA_RVA.to_le_bytes());
        put(&mut image, optional + 28, &0x1000_0000u32.to_le_bytes());
        optional + 32
    };
    put(&mut image, windows, &SECTION_ALIGNMENT.to_le_bytes());
    put(&mut image, windows + 4, &FILE_ALIGNMENT.to_le_bytes());
    put(&mut image, windows + 8, &6u16.to_le_bytes());
    put(&mut image, windows + 16, &6u16.to_le_bytes());
    put(&mut image, windows + 24, &0x2000u32.to_le_bytes());
    put(&mut image, windows + 28, &(IDATA_OFFSET as u32).to_le_bytes());
    put(&mut image, windows + 36, &2u16.to_le_bytes());

    let stack_and_heap = windows + 40;
    let loader_flags = if is_64bit {
        for (index, value) in [0x10_0000u64, 0x1000, 0x10_0000, 0x1000].iter().enumerate() {
            put(&mut image, stack_and_heap + index * 8, &value.to_le_bytes());
        }
        stack_and_heap + 32
    } else {
        for (index, value) in [0x10_0000u32, 0x1000, 0x10_0000, 0x1000].iter().enumerate() {
            put(&mut image, stack_and_heap + index * 4, &value.to_le_bytes());
        }
        stack_and_heap + 16
    };
    put(&mut image, loader_flags + 4, &16u32.to_le_bytes());

    let data_directories = loader_flags + 8;
    put(&mut image, data_directories + 8, &IDATA_RVA.to_le_bytes());
    put(&mut image, data_directories + 12, &(descriptors_size as u32).to_le_bytes());

    let section = optional + optional_header_size;
    put(&mut image, section, b".idata\0\0");
    put(&mut image, section + 8, &(IDATA_SIZE as u32).to_le_bytes());
    put(&mut image, section + 12, &IDATA_RVA.to_le_bytes());
    put(&mut image, section + 16, &(IDATA_SIZE as u32).to_le_bytes());
    put(&mut image, section + 20, &(IDATA_OFFSET as u32).to_le_bytes());
    put(&mut image, section + 36, &0xC000_0040u32.to_le_bytes());

    image.extend_from_slice(&idata);
    image
}
