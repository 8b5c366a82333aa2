//! One-stop entry point bundling the host context with its capabilities.

use crate::binary::inspect_format;
use crate::host::{BinaryFormat, HostContext};
use crate::locator::{locate, LibraryLoader, SystemLoader};
use crate::manifest::{list_manifests, strip_manifests};
use crate::patcher::{remove_rpath, rewrite_install_names, strip_code_signature};
use crate::pe::{read_imports_and_arch, read_version, PeInfo, VersionQuad};
use crate::resources::{PeImageResources, Resource, ResourceEditor};
use crate::rpath::get_rpath;
use crate::tool::{SystemRunner, ToolRunner};
use crate::Error;
use bon::Builder;
use camino::{Utf8Path, Utf8PathBuf};

/// Host context plus the tool runner, library loader and resource editor
/// every operation is carried out with.
///
/// ```no_run
/// use sharedlibs::Toolkit;
///
/// let toolkit = Toolkit::builder().build();
/// if let Some(path) = toolkit.locate("z")? {
///     toolkit.remove_rpath(&path)?;
/// }
/// # Ok::<(), sharedlibs::Error>(())
/// ```
#[derive(Builder)]
pub struct Toolkit {
    #[builder(default = HostContext::detect())]
    context: HostContext,

    #[builder(default = Box::new(SystemRunner) as Box<dyn ToolRunner>)]
    runner: Box<dyn ToolRunner>,

    #[builder(default = Box::new(SystemLoader) as Box<dyn LibraryLoader>)]
    loader: Box<dyn LibraryLoader>,

    #[builder(default = Box::new(PeImageResources) as Box<dyn ResourceEditor>)]
    resources: Box<dyn ResourceEditor>,
}

impl Toolkit {
    pub fn context(&self) -> &HostContext {
        &self.context
    }

    pub fn locate(&self, name: &str) -> Result<Option<Utf8PathBuf>, Error> {
        locate(&self.context, self.runner.as_ref(), self.loader.as_ref(), name)
    }

    pub fn inspect_format(&self, path: &Utf8Path) -> Result<Option<BinaryFormat>, Error> {
        inspect_format(path.as_std_path())
    }

    /// Whether `path` is a binary in the format the host itself loads.
    pub fn is_native_binary(&self, path: &Utf8Path) -> Result<bool, Error> {
        let native = self.context.platform.binary_format();
        Ok(self.inspect_format(path)? == Some(native))
    }

    pub fn read_version(&self, path: &Utf8Path) -> Result<VersionQuad, Error> {
        read_version(self.resources.as_ref(), path)
    }

    pub fn read_imports_and_arch(&self, path: &Utf8Path) -> Result<PeInfo, Error> {
        read_imports_and_arch(&self.context, path)
    }

    pub fn get_rpath(&self, path: &Utf8Path) -> Result<Option<String>, Error> {
        get_rpath(&self.context, self.runner.as_ref(), path)
    }

    pub fn remove_rpath(&self, path: &Utf8Path) -> Result<(), Error> {
        remove_rpath(&self.context, self.runner.as_ref(), path)
    }

    pub fn rewrite_install_names(
        &self,
        path: &Utf8Path,
        mapping: &[(String, String)],
        new_rpath: Option<&Utf8Path>,
    ) -> Result<(), Error> {
        rewrite_install_names(&self.context, self.runner.as_ref(), path, mapping, new_rpath)
    }

    pub fn strip_code_signature(&self, path: &Utf8Path) -> Result<(), Error> {
        strip_code_signature(&self.context, self.runner.as_ref(), path)
    }

    pub fn list_manifests(&self, path: &Utf8Path, with_data: bool) -> Result<Vec<Resource>, Error> {
        list_manifests(self.resources.as_ref(), path, with_data)
    }

    pub fn strip_manifests(&self, path: &Utf8Path) -> Result<(), Error> {
        strip_manifests(self.resources.as_ref(), path)
    }
}
