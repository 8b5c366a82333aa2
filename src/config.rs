//! Library search directory configuration.

use camino::{Utf8Path, Utf8PathBuf};
use std::ops::Deref;

/// Ordered list of directories searched for shared libraries.
///
/// Order matters: the first directory yielding a match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPaths {
    directories: Vec<Utf8PathBuf>,
}

impl Default for SearchPaths {
    fn default() -> Self {
        Self {
            directories: vec![
                Utf8PathBuf::from("/lib"),
                Utf8PathBuf::from("/usr/lib"),
                Utf8PathBuf::from("/usr/local/lib"),
            ],
        }
    }
}

impl SearchPaths {
    pub fn new(directories: Vec<Utf8PathBuf>) -> Self {
        Self { directories }
    }

    /// Parse a `PATH`-style list such as the value of `LD_LIBRARY_PATH`.
    ///
    /// Empty elements are skipped, duplicates keep their first position.
    pub fn from_path_list(value: &str, separator: char) -> Self {
        let mut directories: Vec<Utf8PathBuf> = Vec::new();

        for element in value.split(separator) {
            let element = element.trim();
            if element.is_empty() {
                continue;
            }

            let dir = Utf8PathBuf::from(element);
            if !directories.contains(&dir) {
                directories.push(dir);
            }
        }

        Self { directories }
    }

    /// Read a `PATH`-style list from an environment variable.
    ///
    /// Unset or non-UTF-8 variables yield an empty list.
    pub fn from_env(variable: &str) -> Self {
        let separator = if cfg!(windows) { ';' } else { ':' };
        match std::env::var(variable) {
            Ok(value) => Self::from_path_list(&value, separator),
            Err(_) => Self::new(Vec::new()),
        }
    }

    /// Append directories after the existing ones, skipping duplicates.
    pub fn extend<I, P>(&mut self, dirs: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Utf8Path>,
    {
        for dir in dirs {
            let dir = dir.as_ref();
            if !self.directories.iter().any(|d| d.as_path() == dir) {
                self.directories.push(dir.to_owned());
            }
        }
    }
}

impl Deref for SearchPaths {
    type Target = [Utf8PathBuf];

    fn deref(&self) -> &Self::Target {
        &self.directories
    }
}
