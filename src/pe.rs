//! Windows PE metadata: file version, imported DLLs and target bitness.

use crate::host::HostContext;
use crate::internal::pe_header::optional_header_magic;
use crate::internal::version_info::{file_version_fields, fixed_file_info};
use crate::resources::{ResourceEditor, ResourceKind};
use crate::Error;
use camino::Utf8Path;
use goblin::pe::optional_header::{MAGIC_32, MAGIC_64};
use goblin::pe::PE;
use memmap2::Mmap;
use std::fmt;
use std::fs::File;
use tracing::{debug, warn};

/// Four-part file version, `(0, 0, 0, 0)` when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionQuad {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
}

impl VersionQuad {
    pub fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Split `dwFileVersionMS` / `dwFileVersionLS` into their 16-bit halves.
    pub fn from_version_fields(ms: u32, ls: u32) -> Self {
        Self::new(
            ((ms >> 16) & 0xFFFF) as u16,
            (ms & 0xFFFF) as u16,
            ((ls >> 16) & 0xFFFF) as u16,
            (ls & 0xFFFF) as u16,
        )
    }

    pub fn as_tuple(&self) -> (u16, u16, u16, u16) {
        (self.major, self.minor, self.build, self.revision)
    }
}

impl fmt::Display for VersionQuad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// Decode the file version of a raw `VS_VERSIONINFO` block.
///
/// Blocks without a fixed-file-info value, or with a wrong signature, decode
/// to the default quad.
pub fn decode_version_block(block: &[u8]) -> VersionQuad {
    fixed_file_info(block)
        .and_then(file_version_fields)
        .map(|(ms, ls)| VersionQuad::from_version_fields(ms, ls))
        .unwrap_or_default()
}

/// Read the file version recorded in a binary's version resource.
///
/// Binaries without version information, including files that are not PE
/// images at all, yield `(0, 0, 0, 0)`.
pub fn read_version(
    resources: &dyn ResourceEditor,
    path: &Utf8Path,
) -> Result<VersionQuad, Error> {
    let blocks = match resources.read_resources(path, ResourceKind::Version) {
        Ok(blocks) => blocks,
        Err(Error::InvalidImage { message, .. }) => {
            debug!("No version information in '{}': {}", path, message);
            return Ok(VersionQuad::default());
        }
        Err(e) => return Err(e),
    };

    Ok(blocks
        .first()
        .map(|resource| decode_version_block(&resource.data))
        .unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeInfo {
    /// Imported DLL names in import directory order, duplicates kept.
    pub imports: Vec<String>,
    pub is_64bit: bool,
}

/// Classify an optional header magic as 64-bit (`true`) or 32-bit (`false`).
///
/// Any other magic is an [`Error::Assumption`]: there is no safe guess.
pub fn classify_magic(magic: u16, path: &Utf8Path) -> Result<bool, Error> {
    match magic {
        MAGIC_32 => Ok(false),
        MAGIC_64 => Ok(true),
        other => Err(Error::Assumption {
            path: path.to_owned(),
            message: format!(
                "Unknown PE file architecture, optional header magic 0x{:x} (known: 0x{:x}, 0x{:x})",
                other, MAGIC_32, MAGIC_64
            ),
        }),
    }
}

/// Read the imported DLL names and bitness of a PE binary.
///
/// A bitness differing from the host is legal and only logged as a warning.
pub fn read_imports_and_arch(ctx: &HostContext, path: &Utf8Path) -> Result<PeInfo, Error> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };

    let is_64bit = classify_magic(optional_header_magic(&mmap)?, path)?;

    let pe = PE::parse(&mmap)?;
    let imports = match &pe.import_data {
        Some(import_data) => import_data
            .import_data
            .iter()
            .map(|entry| entry.name.to_string())
            .collect(),
        None => Vec::new(),
    };

    if is_64bit != ctx.is_64bit {
        warn!(
            target: "postprocessing",
            "Host is {} bits with {} bits dependencies in '{}'",
            bits(ctx.is_64bit),
            bits(is_64bit),
            path
        );
    }

    Ok(PeInfo { imports, is_64bit })
}

fn bits(is_64bit: bool) -> &'static str {
    if is_64bit {
        "64"
    } else {
        "32"
    }
}
