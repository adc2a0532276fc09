//! On-disk representation of exported nodes.

use crate::error::ExportError;
use crate::types::{Folder, NodeRecord, Resource};
use std::fs;
use std::path::{Path, PathBuf};

/// Descriptor file written inside every folder directory.
pub const FOLDER_INFO: &str = "folder.info.json";
pub const INFO_SUFFIX: &str = ".info.json";
pub const CONTENT_SUFFIX: &str = ".content.json";

/// Files written for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFiles {
    pub info: PathBuf,
    pub content: Option<PathBuf>,
}

/// Writes folder and resource descriptors. Existing files are overwritten.
#[derive(Debug, Default, Clone, Copy)]
pub struct NodeSerializer;

impl NodeSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Create `path` (pre-existing is fine) and write its `folder.info.json`.
    pub fn write_folder(&self, path: &Path, folder: &Folder) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(path).map_err(|e| ExportError::io(path, e))?;
        let descriptor = path.join(FOLDER_INFO);
        write_record(&descriptor, &folder.to_record())?;
        Ok(descriptor)
    }

    /// Write `{uuid}.info.json` and, when present, `{uuid}.content.json` into `dir`.
    pub fn write_resource(
        &self,
        dir: &Path,
        uuid: &str,
        resource: &Resource,
        content: Option<&[u8]>,
    ) -> Result<ResourceFiles, ExportError> {
        let info = dir.join(format!("{}{}", uuid, INFO_SUFFIX));
        write_record(&info, &resource.to_record())?;

        let content = match content {
            Some(bytes) => {
                let path = dir.join(format!("{}{}", uuid, CONTENT_SUFFIX));
                fs::write(&path, bytes).map_err(|e| ExportError::io(&path, e))?;
                Some(path)
            }
            None => None,
        };

        Ok(ResourceFiles { info, content })
    }
}

fn write_record(path: &Path, record: &NodeRecord) -> Result<(), ExportError> {
    let bytes = serde_json::to_vec_pretty(record)?;
    fs::write(path, bytes).map_err(|e| ExportError::io(path, e))
}
