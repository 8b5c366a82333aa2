use crate::host::BinaryFormat;
use crate::Error;
use goblin::Object;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Classify a file by content as ELF, PE or Mach-O (thin or fat).
///
/// Anything else, including binaries too damaged to parse, yields `None`.
pub fn inspect_format(path: &Path) -> Result<Option<BinaryFormat>, Error> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };

    let format = match Object::parse(&mmap) {
        Ok(Object::Elf(_)) => Some(BinaryFormat::Elf),
        Ok(Object::PE(_)) => Some(BinaryFormat::Pe),
        Ok(Object::Mach(_)) => Some(BinaryFormat::MachO),
        Ok(_) => None,
        Err(e) => {
            debug!("Cannot classify {}: {}", path.display(), e);
            None
        }
    };

    Ok(format)
}
