#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use sharedlibs::{
    Error, HostContext, LibraryLoader, Resource, ResourceEditor, ResourceId, ResourceKind,
    ToolCommand, ToolOutput, ToolRunner,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;

type Handler = Box<dyn Fn(&ToolCommand) -> io::Result<ToolOutput>>;

/// Tool runner answering from a closure and recording every invocation.
pub struct FakeRunner {
    handler: Handler,
    calls: RefCell<Vec<ToolCommand>>,
}

impl FakeRunner {
    pub fn new(handler: impl Fn(&ToolCommand) -> io::Result<ToolOutput> + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// A runner for which every tool is missing.
    pub fn without_tools() -> Self {
        Self::new(|_| Err(io::Error::new(io::ErrorKind::NotFound, "not installed")))
    }

    pub fn calls(&self) -> Vec<ToolCommand> {
        self.calls.borrow().clone()
    }

    /// Full argument vectors, program first.
    pub fn command_lines(&self) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .map(|call| {
                let mut line = vec![call.tool.program().to_string()];
                line.extend(call.args.iter().cloned());
                line
            })
            .collect()
    }
}

impl ToolRunner for FakeRunner {
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
        self.calls.borrow_mut().push(command.clone());
        (self.handler)(command)
    }
}

/// Loader answering from a fixed table.
#[derive(Default)]
pub struct FakeLoader {
    known: HashMap<String, String>,
}

impl FakeLoader {
    pub fn with(mut self, name: &str, found: &str) -> Self {
        self.known.insert(name.to_string(), found.to_string());
        self
    }
}

impl LibraryLoader for FakeLoader {
    fn find_library(
        &self,
        _ctx: &HostContext,
        _runner: &dyn ToolRunner,
        name: &str,
    ) -> Result<Option<String>, Error> {
        Ok(self.known.get(name).cloned())
    }
}

/// In-memory resource editor keyed by path.
#[derive(Default)]
pub struct FakeResources {
    manifests: RefCell<HashMap<Utf8PathBuf, Vec<Resource>>>,
    pub reads: RefCell<Vec<Utf8PathBuf>>,
    pub deletes: RefCell<Vec<(Utf8PathBuf, ResourceKind, Vec<ResourceId>)>>,
}

impl FakeResources {
    pub fn with_manifests(self, path: &str, manifests: Vec<Resource>) -> Self {
        self.manifests
            .borrow_mut()
            .insert(Utf8PathBuf::from(path), manifests);
        self
    }

    pub fn remaining(&self, path: &str) -> Vec<ResourceId> {
        self.manifests
            .borrow()
            .get(Utf8Path::new(path))
            .map(|resources| resources.iter().map(|r| r.id.clone()).collect())
            .unwrap_or_default()
    }
}

impl ResourceEditor for FakeResources {
    fn read_resources(&self, path: &Utf8Path, kind: ResourceKind) -> Result<Vec<Resource>, Error> {
        self.reads.borrow_mut().push(path.to_owned());
        if kind != ResourceKind::Manifest {
            return Ok(Vec::new());
        }
        Ok(self.manifests.borrow().get(path).cloned().unwrap_or_default())
    }

    fn delete_resources(
        &self,
        path: &Utf8Path,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> Result<(), Error> {
        self.deletes
            .borrow_mut()
            .push((path.to_owned(), kind, ids.to_vec()));
        if let Some(resources) = self.manifests.borrow_mut().get_mut(path) {
            resources.retain(|r| !ids.contains(&r.id));
        }
        Ok(())
    }
}

pub fn manifest(id: u32, xml: &str) -> Resource {
    Resource {
        id: ResourceId::Id(id),
        data: xml.as_bytes().to_vec(),
    }
}

pub fn utf8_temp_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> Utf8PathBuf {
    let path = Utf8PathBuf::try_from(dir.path().join(name)).expect("temp dir is UTF-8");
    std::fs::write(&path, contents).expect("write temp file");
    path
}

pub const READELF_RPATH: &str = "
Dynamic section at offset 0x2d0e0 contains 4 entries:
  Tag        Type                         Name/Value
 0x0000000000000001 (NEEDED)             Shared library: [libc.so.6]
 0x000000000000000f (RPATH)              Library rpath: [/build/tree/lib]
 0x0000000000000000 (NULL)               0x0
";

pub const READELF_PLAIN: &str = "
Dynamic section at offset 0x2d0e0 contains 2 entries:
  Tag        Type                         Name/Value
 0x0000000000000001 (NEEDED)             Shared library: [libc.so.6]
 0x0000000000000000 (NULL)               0x0
";

pub const OTOOL_RPATH: &str = "libfoo.dylib:
Load command 12
          cmd LC_RPATH
      cmdsize 40
         path @loader_path/../lib (offset 12)
";
