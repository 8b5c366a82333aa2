//! Embedded PE resources.
//!
//! Reading and deleting resource entries is a capability behind
//! [`ResourceEditor`]; [`PeImageResources`] implements it on top of `editpe`
//! and works on any host.

use crate::Error;
use camino::Utf8Path;
use editpe::{Image, ImageReadError, ResourceEntry, ResourceEntryName, ResourceTable};
use std::fmt;
use std::fs;
use tracing::debug;

/// Resource types of interest, with their `RT_*` numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Version,
    Manifest,
}

impl ResourceKind {
    pub fn type_id(self) -> u32 {
        match self {
            ResourceKind::Version => 16,
            ResourceKind::Manifest => 24,
        }
    }
}

/// Identifier of a resource entry below its type directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Id(u32),
    Name(String),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Id(id) => write!(f, "#{}", id),
            ResourceId::Name(name) => f.write_str(name),
        }
    }
}

/// A resource entry and the payload of its first language variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: ResourceId,
    pub data: Vec<u8>,
}

pub trait ResourceEditor {
    /// List the entries of `kind`, in directory order.
    fn read_resources(&self, path: &Utf8Path, kind: ResourceKind) -> Result<Vec<Resource>, Error>;

    /// Delete the given entries of `kind` and rewrite the file.
    fn delete_resources(
        &self,
        path: &Utf8Path,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> Result<(), Error>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PeImageResources;

impl ResourceEditor for PeImageResources {
    fn read_resources(&self, path: &Utf8Path, kind: ResourceKind) -> Result<Vec<Resource>, Error> {
        let data = fs::read(path)?;
        let image = Image::parse(&data[..]).map_err(|e| invalid_image(path, e))?;

        let Some(directory) = image.resource_directory() else {
            return Ok(Vec::new());
        };

        let Some(ResourceEntry::Table(kind_table)) =
            directory.root().get(ResourceEntryName::ID(kind.type_id()))
        else {
            return Ok(Vec::new());
        };

        let mut resources = Vec::new();
        for name in kind_table.entries() {
            let Some(entry) = kind_table.get(name) else {
                continue;
            };
            let data = first_data(entry).map(<[u8]>::to_vec).unwrap_or_default();
            resources.push(Resource {
                id: resource_id(name),
                data,
            });
        }

        Ok(resources)
    }

    fn delete_resources(
        &self,
        path: &Utf8Path,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> Result<(), Error> {
        let data = fs::read(path)?;
        let mut image = Image::parse(&data[..]).map_err(|e| invalid_image(path, e))?;

        let Some(mut directory) = image.resource_directory().cloned() else {
            return Ok(());
        };

        let Some(ResourceEntry::Table(kind_table)) = directory
            .root_mut()
            .get_mut(ResourceEntryName::ID(kind.type_id()))
        else {
            return Ok(());
        };

        for id in ids {
            if kind_table.remove(entry_name(id)).is_some() {
                debug!("Removed resource {} from {}", id, path);
            }
        }

        image
            .set_resource_directory(directory)
            .map_err(|e| Error::Resource(e.to_string()))?;
        fs::write(path, image.data())?;

        Ok(())
    }
}

/// Descend through name and language tables to the first data leaf.
fn first_data(entry: &ResourceEntry) -> Option<&[u8]> {
    match entry {
        ResourceEntry::Data(data) => Some(data.data()),
        ResourceEntry::Table(table) => first_table_data(table),
    }
}

fn first_table_data(table: &ResourceTable) -> Option<&[u8]> {
    table
        .entries()
        .into_iter()
        .find_map(|name| table.get(name).and_then(first_data))
}

fn invalid_image(path: &Utf8Path, error: ImageReadError) -> Error {
    Error::InvalidImage {
        path: path.to_owned(),
        message: error.to_string(),
    }
}

fn resource_id(name: &ResourceEntryName) -> ResourceId {
    match name {
        ResourceEntryName::ID(id) => ResourceId::Id(*id),
        // Length-prefixed UTF-16LE on disk
        ResourceEntryName::Name(_) => ResourceId::Name(name.to_string().unwrap_or_default()),
    }
}

fn entry_name(id: &ResourceId) -> ResourceEntryName {
    match id {
        ResourceId::Id(id) => ResourceEntryName::ID(*id),
        ResourceId::Name(name) => ResourceEntryName::from_string(name),
    }
}
