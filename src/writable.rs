use crate::Error;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, Permissions};
use tracing::warn;

/// Makes a file writable for as long as the guard lives.
///
/// The original permissions are put back on drop, whether or not the work
/// done in between succeeded.
#[derive(Debug)]
pub struct WritableFile {
    path: Utf8PathBuf,
    original: Permissions,
}

impl WritableFile {
    pub fn acquire(path: &Utf8Path) -> Result<Self, Error> {
        let original = fs::metadata(path)?.permissions();
        fs::set_permissions(path, writable(&original))?;

        Ok(Self {
            path: path.to_owned(),
            original,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for WritableFile {
    fn drop(&mut self) {
        if let Err(e) = fs::set_permissions(&self.path, self.original.clone()) {
            warn!("Failed to restore permissions of '{}': {}", self.path, e);
        }
    }
}

#[cfg(unix)]
fn writable(original: &Permissions) -> Permissions {
    use std::os::unix::fs::PermissionsExt;
    Permissions::from_mode(original.mode() | 0o200)
}

#[cfg(not(unix))]
fn writable(original: &Permissions) -> Permissions {
    let mut permissions = original.clone();
    permissions.set_readonly(false);
    permissions
}
