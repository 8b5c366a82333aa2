use crate::Error;
use goblin::elf::Elf;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Read the `DT_SONAME` declared by an ELF shared object.
///
/// Files that are not ELF, or ELF files without a soname, yield `None`.
pub fn read_soname(path: &Path) -> Result<Option<String>, Error> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };

    let elf = match Elf::parse(&mmap) {
        Ok(elf) => elf,
        Err(e) => {
            debug!("No soname for {}: {}", path.display(), e);
            return Ok(None);
        }
    };

    Ok(extract_soname(&elf))
}

fn extract_soname(elf: &Elf) -> Option<String> {
    // goblin already resolves DT_SONAME through the dynamic string table
    match elf.soname {
        Some(soname) if !soname.is_empty() => Some(soname.to_string()),
        _ => None,
    }
}
