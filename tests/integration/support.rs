use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use canopy::content::ContentSource;
use canopy::directory::{DirectorySession, MemoryDirectory};
use canopy::error::ExportError;
use canopy::summary::ExportSummary;
use canopy::types::ResourceKind;
use canopy::walker::{ExportContext, ExportWalker};
use walkdir::WalkDir;

pub const STUDIES_ID: &str = "https://repo.example.org/folders/studies";
pub const DEMO_ID: &str = "https://repo.example.org/templates/demo";

/// Content keyed by resource id; anything else is a 404.
#[derive(Default)]
pub struct StaticContent {
    bodies: HashMap<String, Vec<u8>>,
}

impl StaticContent {
    pub fn with(mut self, id: &str, body: &str) -> Self {
        self.bodies.insert(id.to_string(), body.as_bytes().to_vec());
        self
    }
}

#[async_trait]
impl ContentSource for StaticContent {
    async fn get(&self, id: &str, _kind: ResourceKind) -> Result<Vec<u8>, ExportError> {
        self.bodies
            .get(id)
            .cloned()
            .ok_or_else(|| ExportError::ContentFetch {
                id: id.to_string(),
                message: "HTTP 404 Not Found".to_string(),
            })
    }
}

/// Root `/` holding folder `studies` (F1) and template `demo` (R1).
pub fn studies_tree() -> Arc<MemoryDirectory> {
    let dir = Arc::new(MemoryDirectory::new("/", "root", "Root"));
    dir.add_folder("root", STUDIES_ID, "studies")
        .add_resource("root", DEMO_ID, "demo", ResourceKind::Template)
        .set_uuid(STUDIES_ID, "F1")
        .set_uuid(DEMO_ID, "R1");
    dir
}

pub async fn export(
    directory: Arc<MemoryDirectory>,
    content: StaticContent,
    export_root: &Path,
    root_path: &str,
) -> ExportSummary {
    let session: Arc<dyn DirectorySession> = directory;
    let ctx = ExportContext::new(session, Arc::new(content), export_root);
    ExportWalker::new(ctx).walk(root_path).await
}

/// Every regular file under `root`, relative and sorted.
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}

pub fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

pub fn paths(items: &[&str]) -> Vec<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}
