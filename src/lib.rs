// sharedlibs - shared library introspection and patching
// MIT, 2025

//! Shared library introspection and patching for relocatable bundles.
//!
//! Given a DLL, ELF shared object or Mach-O dylib, this crate can:
//! - Resolve a library name to the file the host loader would use
//! - Read PE file versions, imported DLLs and bitness
//! - Read and remove RPATH/RUNPATH entries (`readelf`, `otool`, `chrpath`,
//!   `install_name_tool`)
//! - Rewrite Mach-O install names and strip code signatures
//! - Remove embedded side-by-side manifests from legacy extension modules
//!
//! Host facts live in a [`HostContext`]; subprocesses, loader lookups and PE
//! resource editing are injected capabilities ([`ToolRunner`],
//! [`LibraryLoader`], [`ResourceEditor`]).
//!
//! # Example: Make a library relocatable
//!
//! ```no_run
//! use camino::Utf8Path;
//! use sharedlibs::{remove_rpath, HostContext, SystemRunner};
//!
//! let ctx = HostContext::detect();
//! remove_rpath(&ctx, &SystemRunner, Utf8Path::new("dist/libfoo.so.1"))?;
//! # Ok::<(), sharedlibs::Error>(())
//! ```
//!
//! # Example: Inspect a DLL
//!
//! ```no_run
//! use camino::Utf8Path;
//! use sharedlibs::Toolkit;
//!
//! let toolkit = Toolkit::builder().build();
//! let path = Utf8Path::new("python3.dll");
//! let info = toolkit.read_imports_and_arch(path)?;
//! let version = toolkit.read_version(path)?;
//! println!("{} imports {:?} (64-bit: {})", version, info.imports, info.is_64bit);
//! # Ok::<(), sharedlibs::Error>(())
//! ```

mod internal;

pub mod binary;
pub mod config;
pub mod elf;
pub mod error;
pub mod host;
pub mod locator;
pub mod manifest;
pub mod patcher;
pub mod pe;
pub mod resources;
pub mod rpath;
pub mod tool;
pub mod toolkit;
pub mod writable;

pub use binary::inspect_format;
pub use config::SearchPaths;
pub use elf::read_soname;
pub use error::Error;
pub use host::{BinaryFormat, HostContext, Platform};
pub use locator::{
    locate, locate_in_filesystem, parse_ldconfig_output, LibraryLoader, SystemLoader,
};
pub use manifest::{is_sxs_module, list_manifests, strip_manifests, SXS_MODULES};
pub use patcher::{remove_rpath, rewrite_install_names, strip_code_signature};
pub use pe::{
    classify_magic, decode_version_block, read_imports_and_arch, read_version, PeInfo, VersionQuad,
};
pub use resources::{PeImageResources, Resource, ResourceEditor, ResourceId, ResourceKind};
pub use rpath::{get_rpath, parse_otool_rpath, parse_readelf_rpath};
pub use tool::{execute_checked, SystemRunner, Tool, ToolCommand, ToolOutput, ToolRunner};
pub use toolkit::Toolkit;
pub use writable::WritableFile;
