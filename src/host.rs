//! Host classification.
//!
//! The host is classified once and the resulting [`HostContext`] is passed to
//! every operation that dispatches on it, so tests can pretend to be any host.

use crate::config::SearchPaths;
use bon::Builder;
use std::fmt;
use std::path::Path;

/// Marker file present on Alpine Linux, the musl-based distribution without a
/// usable linker cache listing.
const ALPINE_RELEASE_FILE: &str = "/etc/alpine-release";

/// Closed set of supported host platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Windows family, PE binaries.
    Windows,
    /// Apple hosts, Mach-O binaries.
    MacOs,
    /// Constrained-libc Linux (musl), ELF binaries without `ldconfig -p`.
    Alpine,
    /// Any other POSIX host, ELF binaries.
    Posix,
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") && Path::new(ALPINE_RELEASE_FILE).exists() {
            Platform::Alpine
        } else {
            Platform::Posix
        }
    }

    /// Container format of the shared libraries native to this platform.
    pub fn binary_format(self) -> BinaryFormat {
        match self {
            Platform::Windows => BinaryFormat::Pe,
            Platform::MacOs => BinaryFormat::MachO,
            Platform::Alpine | Platform::Posix => BinaryFormat::Elf,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Alpine => "Alpine Linux",
            Platform::Posix => "POSIX",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryFormat {
    Elf,
    Pe,
    MachO,
}

impl fmt::Display for BinaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinaryFormat::Elf => "ELF",
            BinaryFormat::Pe => "PE",
            BinaryFormat::MachO => "Mach-O",
        };
        f.write_str(name)
    }
}

/// Read-only facts about the host, computed once at startup.
#[derive(Debug, Clone, Builder)]
pub struct HostContext {
    pub platform: Platform,

    /// Host architecture name, as in `std::env::consts::ARCH`.
    #[builder(into, default = std::env::consts::ARCH.to_string())]
    pub arch: String,

    #[builder(default = cfg!(target_pointer_width = "64"))]
    pub is_64bit: bool,

    /// Report every removed RPATH on the `inclusion` log target.
    #[builder(default)]
    pub show_inclusion: bool,

    /// Directories walked when the platform has no linker cache listing.
    #[builder(default)]
    pub library_dirs: SearchPaths,
}

impl HostContext {
    /// Classify the running host.
    pub fn detect() -> Self {
        Self::builder().platform(Platform::detect()).build()
    }

    pub fn with_show_inclusion(mut self, show_inclusion: bool) -> Self {
        self.show_inclusion = show_inclusion;
        self
    }
}
