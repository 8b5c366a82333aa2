//! Side-by-side manifest removal for legacy Windows extension modules.

use crate::resources::{Resource, ResourceEditor, ResourceId, ResourceKind};
use crate::Error;
use camino::Utf8Path;
use tracing::debug;

/// Extension modules known to carry SxS manifests that must go before
/// bundling. Compared case-insensitively against the file name.
pub const SXS_MODULES: &[&str] = &["sip.pyd", "win32ui.pyd", "winxpgui.pyd"];

pub fn is_sxs_module(path: &Utf8Path) -> bool {
    path.file_name().is_some_and(|name| {
        SXS_MODULES
            .iter()
            .any(|module| module.eq_ignore_ascii_case(name))
    })
}

/// List the manifest resources embedded in `path`.
///
/// Payloads are kept only when `with_data` is set.
pub fn list_manifests(
    resources: &dyn ResourceEditor,
    path: &Utf8Path,
    with_data: bool,
) -> Result<Vec<Resource>, Error> {
    let mut manifests = resources.read_resources(path, ResourceKind::Manifest)?;

    if !with_data {
        for manifest in &mut manifests {
            manifest.data.clear();
        }
    }

    Ok(manifests)
}

/// Delete the embedded manifests of a known SxS extension module.
///
/// Any other file, and any module without manifests, is left untouched.
pub fn strip_manifests(resources: &dyn ResourceEditor, path: &Utf8Path) -> Result<(), Error> {
    if !is_sxs_module(path) {
        return Ok(());
    }

    let ids: Vec<ResourceId> = list_manifests(resources, path, false)?
        .into_iter()
        .map(|manifest| manifest.id)
        .collect();

    if ids.is_empty() {
        return Ok(());
    }

    debug!("Removing {} manifest resources from '{}'", ids.len(), path);
    resources.delete_resources(path, ResourceKind::Manifest, &ids)
}
