//! Identifier resolution: opaque ids to filesystem-safe names.

use crate::directory::DirectorySession;
use crate::error::ExportError;
use crate::serializer::FOLDER_INFO;
use std::sync::Arc;

use crate::types::NodeKind;

const MAX_SEGMENT_BYTES: usize = 255;
const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// True when `segment` can be used verbatim as one path component.
pub fn is_safe_path_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment.len() <= MAX_SEGMENT_BYTES
        && segment != "."
        && segment != ".."
        && !segment
            .chars()
            .any(|c| c.is_control() || FORBIDDEN_CHARS.contains(&c))
}

/// Whether a resolved name would collide with a descriptor in its parent directory.
fn collides_with_descriptor(uuid: &str, kind: NodeKind) -> bool {
    match kind {
        NodeKind::Folder => uuid == FOLDER_INFO,
        NodeKind::Field | NodeKind::Element | NodeKind::Template | NodeKind::Instance => {
            FOLDER_INFO.strip_suffix(".info.json") == Some(uuid)
        }
    }
}

/// Maps node ids to the names used for local paths.
///
/// Every call goes to the directory session; nothing is cached across runs.
pub struct IdentifierResolver {
    directory: Arc<dyn DirectorySession>,
}

impl IdentifierResolver {
    pub fn new(directory: Arc<dyn DirectorySession>) -> Self {
        Self { directory }
    }

    pub async fn resolve(&self, id: &str, kind: NodeKind) -> Result<String, ExportError> {
        if id.trim().is_empty() {
            return Err(ExportError::lookup(id, format!("empty {} id", kind)));
        }

        let uuid = self.directory.resolve_uuid(id, kind).await?;
        if !is_safe_path_segment(&uuid) {
            return Err(ExportError::lookup(
                id,
                format!("resolved name {:?} is not a safe path segment", uuid),
            ));
        }
        if collides_with_descriptor(&uuid, kind) {
            return Err(ExportError::lookup(
                id,
                format!("resolved name {:?} collides with {}", uuid, FOLDER_INFO),
            ));
        }
        Ok(uuid)
    }
}
