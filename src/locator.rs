//! Resolving shared library names to paths.
//!
//! The host loader is asked first through a [`LibraryLoader`]. Its answer is
//! then refined per platform: kept as-is on Windows and macOS, mapped to the
//! soname on POSIX when it is already a path, or looked up in the dynamic
//! linker cache listing (or a directory walk on Alpine) when it is a bare name.

use crate::config::SearchPaths;
use crate::elf::read_soname;
use crate::host::{HostContext, Platform};
use crate::tool::{execute_checked, Tool, ToolCommand, ToolRunner};
use crate::Error;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fs;
use tracing::debug;
use walkdir::WalkDir;

/// The platform's standard "find this library" lookup.
///
/// Returns whatever the loader would report: a full path, or a bare file
/// name the caller still has to resolve. `None` means the loader does not
/// know the name.
pub trait LibraryLoader {
    fn find_library(
        &self,
        ctx: &HostContext,
        runner: &dyn ToolRunner,
        name: &str,
    ) -> Result<Option<String>, Error>;
}

/// Resolve `name` to the path of a shared library.
///
/// A name the loader cannot find at all is `Ok(None)`.
pub fn locate(
    ctx: &HostContext,
    runner: &dyn ToolRunner,
    loader: &dyn LibraryLoader,
    name: &str,
) -> Result<Option<Utf8PathBuf>, Error> {
    let Some(found) = loader.find_library(ctx, runner, name)? else {
        debug!("Loader does not know library '{}'", name);
        return Ok(None);
    };

    match ctx.platform {
        Platform::Windows => return Ok(Some(normalize(Utf8Path::new(&found)))),
        Platform::MacOs => return Ok(Some(Utf8PathBuf::from(found))),
        Platform::Alpine | Platform::Posix => {}
    }

    if found.contains(std::path::MAIN_SEPARATOR) {
        let path = Utf8PathBuf::from(found);
        return match read_soname(path.as_std_path())? {
            Some(soname) => {
                let dir = path.parent().unwrap_or_else(|| Utf8Path::new(""));
                Ok(Some(dir.join(soname)))
            }
            None => Ok(Some(path)),
        };
    }

    if ctx.platform == Platform::Alpine {
        return locate_in_filesystem(&found, &ctx.library_dirs);
    }

    let output = execute_checked(runner, &ToolCommand::new(Tool::Ldconfig).arg("-p"), None)?;
    let listing = parse_ldconfig_output(&output)?;

    Ok(listing.get(&found).cloned())
}

/// Walk `dirs` in order and return the first file named exactly `name`.
///
/// Within a directory, files are considered before subdirectories and both
/// are visited in name order.
pub fn locate_in_filesystem(
    name: &str,
    dirs: &SearchPaths,
) -> Result<Option<Utf8PathBuf>, Error> {
    for dir in dirs.iter() {
        if !dir.exists() {
            continue;
        }

        if let Some(path) = walk_for(dir, |file_name| file_name == name)? {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

fn walk_for(
    dir: &Utf8Path,
    mut matches: impl FnMut(&str) -> bool,
) -> Result<Option<Utf8PathBuf>, Error> {
    let walker = WalkDir::new(dir).sort_by(|a, b| {
        a.file_type()
            .is_dir()
            .cmp(&b.file_type().is_dir())
            .then_with(|| a.file_name().cmp(b.file_name()))
    });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // Unreadable subdirectories are skipped, same as a missing directory
            Err(e) if e.io_error().is_some() && e.depth() > 0 => {
                debug!("Skipping during library walk: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if entry.file_type().is_dir() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };

        if matches(file_name) {
            let path =
                Utf8PathBuf::try_from(entry.into_path()).map_err(|_| Error::InvalidPathUtf8)?;
            return Ok(Some(path));
        }
    }

    Ok(None)
}

/// Parse `ldconfig -p` output into a map from library name to path.
///
/// Rows look like `libz.so.1 (libc6,x86-64) => /lib/x86_64-linux-gnu/libz.so.1`.
/// The first row for a name wins; the leading summary line and any line
/// without a `=>` mapping are ignored.
pub fn parse_ldconfig_output(output: &[u8]) -> Result<HashMap<String, Utf8PathBuf>, Error> {
    let mut libraries = HashMap::new();

    for (name, path) in ldconfig_rows(output)? {
        libraries.entry(name).or_insert(path);
    }

    Ok(libraries)
}

fn ldconfig_rows(output: &[u8]) -> Result<Vec<(String, Utf8PathBuf)>, Error> {
    let text = String::from_utf8(output.to_vec())?;
    let mut rows = Vec::new();

    for line in text.lines().skip(1) {
        let Some((left, right)) = line.trim().split_once(" => ") else {
            continue;
        };
        let Some(flags_start) = left.rfind(" (") else {
            continue;
        };

        rows.push((left[..flags_start].to_string(), Utf8PathBuf::from(right.trim())));
    }

    Ok(rows)
}

/// Lexically clean up a path: drop `.` components and fold `..` into parents.
fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut result = Utf8PathBuf::new();

    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                let at_root_or_empty = matches!(
                    result.components().next_back(),
                    None | Some(
                        Utf8Component::RootDir
                            | Utf8Component::Prefix(_)
                            | Utf8Component::ParentDir
                    )
                );
                if at_root_or_empty && !result.has_root() {
                    result.push("..");
                } else if !at_root_or_empty {
                    result.pop();
                }
            }
            other => result.push(other.as_str()),
        }
    }

    if result.as_str().is_empty() {
        result.push(".");
    }

    result
}

/// Loader lookup modelled on the host's own library search rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLoader;

impl LibraryLoader for SystemLoader {
    fn find_library(
        &self,
        ctx: &HostContext,
        runner: &dyn ToolRunner,
        name: &str,
    ) -> Result<Option<String>, Error> {
        match ctx.platform {
            Platform::Windows => Ok(find_windows_library(name)),
            Platform::MacOs => Ok(find_macos_library(name)),
            Platform::Alpine => find_alpine_library(name, &ctx.library_dirs),
            Platform::Posix => find_posix_library(runner, name),
        }
    }
}

fn find_windows_library(name: &str) -> Option<String> {
    let mut candidates = vec![name.to_string()];
    if !name.to_ascii_lowercase().ends_with(".dll") {
        candidates.push(format!("{}.dll", name));
    }

    for dir in SearchPaths::from_env("PATH").iter() {
        for candidate in &candidates {
            let path = dir.join(candidate);
            if path.is_file() {
                return Some(path.into_string());
            }
        }
    }

    None
}

fn find_macos_library(name: &str) -> Option<String> {
    let candidates = [
        format!("lib{}.dylib", name),
        format!("{}.dylib", name),
        format!("{}.framework/{}", name, name),
    ];

    let mut dirs = SearchPaths::from_env("DYLD_LIBRARY_PATH");
    dirs.extend(["/usr/local/lib", "/usr/lib"]);

    for dir in dirs.iter() {
        for candidate in &candidates {
            let path = dir.join(candidate);
            if path.exists() {
                return Some(path.into_string());
            }
        }
    }

    None
}

fn find_alpine_library(name: &str, dirs: &SearchPaths) -> Result<Option<String>, Error> {
    let prefix = format!("lib{}.so", name);

    for dir in dirs.iter() {
        if !dir.exists() {
            continue;
        }

        if let Some(path) = walk_for(dir, |file_name| file_name.starts_with(&prefix))? {
            return Ok(path.file_name().map(str::to_string));
        }
    }

    Ok(None)
}

fn find_posix_library(runner: &dyn ToolRunner, name: &str) -> Result<Option<String>, Error> {
    let prefix = format!("lib{}.so", name);

    // The loader lookup never requires ldconfig, only the final resolution step does
    match execute_checked(runner, &ToolCommand::new(Tool::Ldconfig).arg("-p"), None) {
        Ok(output) => {
            let found = ldconfig_rows(&output)?
                .into_iter()
                .map(|(library, _)| library)
                .find(|library| library.starts_with(&prefix));
            if found.is_some() {
                return Ok(found);
            }
        }
        Err(Error::ToolMissing { .. }) | Err(Error::ToolFailed { .. }) => {
            debug!("Linker cache listing unavailable while looking for '{}'", name);
        }
        Err(e) => return Err(e),
    }

    for dir in SearchPaths::from_env("LD_LIBRARY_PATH").iter() {
        let Ok(entries) = fs::read_dir(dir) else {
            continue;
        };

        let mut matching: Vec<Utf8PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| Utf8PathBuf::try_from(entry.path()).ok())
            .filter(|path| path.file_name().is_some_and(|f| f.starts_with(&prefix)))
            .collect();
        matching.sort();

        if let Some(path) = matching.into_iter().next() {
            return Ok(Some(path.into_string()));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const LISTING: &[u8] = b"3 libs found in cache `/etc/ld.so.cache'
\tlibz.so.1 (libc6,x86-64) => /lib/x86_64-linux-gnu/libz.so.1
\tlibz.so.1 (libc6) => /lib/i386-linux-gnu/libz.so.1
\tlibc.so.6 (libc6,x86-64, OS ABI: Linux 3.2.0) => /lib/x86_64-linux-gnu/libc.so.6
Cache generated by: ldconfig (GNU libc) stable release version 2.39
";

    #[test]
    fn ldconfig_first_row_wins() {
        let map = parse_ldconfig_output(LISTING).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["libz.so.1"], Utf8PathBuf::from("/lib/x86_64-linux-gnu/libz.so.1"));
        assert_eq!(map["libc.so.6"], Utf8PathBuf::from("/lib/x86_64-linux-gnu/libc.so.6"));
    }

    #[test]
    fn ldconfig_header_only_is_empty() {
        let map = parse_ldconfig_output(b"0 libs found in cache `/etc/ld.so.cache'\n").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(normalize(Utf8Path::new("/a/./b/../c")), Utf8PathBuf::from("/a/c"));
        assert_eq!(normalize(Utf8Path::new("a/../../b")), Utf8PathBuf::from("../b"));
        assert_eq!(normalize(Utf8Path::new("/../x")), Utf8PathBuf::from("/x"));
        assert_eq!(normalize(Utf8Path::new("./")), Utf8PathBuf::from("."));
    }

    #[test]
    fn filesystem_walk_honours_directory_order() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        let first = root.join("first");
        let second = root.join("second");
        fs::create_dir_all(first.join("nested")).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join("nested/libfoo.so.1"), b"x").unwrap();
        fs::write(second.join("libfoo.so.1"), b"x").unwrap();

        let dirs = SearchPaths::new(vec![root.join("missing"), first.clone(), second]);
        let found = locate_in_filesystem("libfoo.so.1", &dirs).unwrap();
        assert_eq!(found, Some(first.join("nested/libfoo.so.1")));
    }

    #[test]
    fn filesystem_walk_prefers_files_before_subdirectories() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("a/libbar.so"), b"x").unwrap();
        fs::write(root.join("libbar.so"), b"x").unwrap();

        let dirs = SearchPaths::new(vec![root.clone()]);
        let found = locate_in_filesystem("libbar.so", &dirs).unwrap();
        assert_eq!(found, Some(root.join("libbar.so")));
    }

    #[test]
    fn filesystem_walk_without_match_is_none() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        let dirs = SearchPaths::new(vec![root]);
        assert_eq!(locate_in_filesystem("libnothing.so", &dirs).unwrap(), None);
    }
}
