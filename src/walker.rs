//! Export Walker
//!
//! Depth-first, pre-order traversal of the repository tree. Every folder's
//! descriptor is written before any of its children, and siblings are handled
//! in listing order (ascending by name). Failures are recorded per node; only
//! bootstrap failures abort a run.
//!
//! The walk uses an explicit work stack. Children are pushed in reverse
//! listing order so popping yields the same sequence as the recursive visit.

use crate::config::ServiceConfig;
use crate::content::{ContentFetcher, ContentSource, HttpContentSource};
use crate::directory::{DirectorySession, ListingRequest};
use crate::error::ExportError;
use crate::resolver::IdentifierResolver;
use crate::serializer::NodeSerializer;
use crate::session::ExportSession;
use crate::summary::{ExportSummary, NodeFailure};
use crate::types::{Folder, Node, NodeKind, Resource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Subdirectory of the export root that mirrors the repository tree.
pub const RESOURCES_DIR: &str = "resources";

/// Collaborators and target shared by every step of one walk.
#[derive(Clone)]
pub struct ExportContext {
    pub directory: Arc<dyn DirectorySession>,
    pub content: ContentFetcher,
    pub export_root: PathBuf,
}

impl ExportContext {
    pub fn new(
        directory: Arc<dyn DirectorySession>,
        content: Arc<dyn ContentSource>,
        export_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            directory,
            content: ContentFetcher::new(content),
            export_root: export_root.into(),
        }
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.export_root.join(RESOURCES_DIR)
    }
}

/// One pending node: where its files go and which folders enclose it.
struct WorkItem {
    node: Node,
    parent_dir: PathBuf,
    ancestors: Arc<Vec<String>>,
}

pub struct ExportWalker {
    ctx: ExportContext,
    resolver: IdentifierResolver,
    serializer: NodeSerializer,
    listing: ListingRequest,
}

impl ExportWalker {
    pub fn new(ctx: ExportContext) -> Self {
        Self {
            resolver: IdentifierResolver::new(ctx.directory.clone()),
            serializer: NodeSerializer::new(),
            listing: ListingRequest::full_listing(),
            ctx,
        }
    }

    /// Export the subtree at `root_path`.
    ///
    /// The root folder maps onto `<export_root>/resources` itself; its children
    /// are placed directly beneath it. The root's uuid is never resolved.
    pub async fn walk(&self, root_path: &str) -> ExportSummary {
        let mut summary = ExportSummary::new(self.ctx.export_root.clone(), root_path);
        info!(
            "Exporting {} into {}",
            root_path,
            self.ctx.export_root.display()
        );

        let root = match self.ctx.directory.find_folder_by_path(root_path).await {
            Ok(root) => root,
            Err(e) => {
                warn!("Root folder {} not found: {}", root_path, e);
                summary.record_failure(NodeFailure::from_error(root_path, None, &e));
                summary.finish();
                return summary;
            }
        };

        let mut stack = Vec::new();
        self.visit_folder(
            root,
            self.ctx.resources_dir(),
            Arc::new(Vec::new()),
            &mut stack,
            &mut summary,
        )
        .await;

        while let Some(item) = stack.pop() {
            match item.node {
                Node::Folder(folder) => {
                    if item.ancestors.iter().any(|id| *id == folder.id) {
                        warn!("Cycle detected at folder {}", folder.id);
                        summary.record_failure(NodeFailure::cycle(&folder.id));
                        continue;
                    }
                    let uuid = match self.resolver.resolve(&folder.id, NodeKind::Folder).await {
                        Ok(uuid) => uuid,
                        Err(e) => {
                            self.fail(&mut summary, &folder.id, Some(NodeKind::Folder), &e);
                            continue;
                        }
                    };
                    let dir = item.parent_dir.join(uuid);
                    self.visit_folder(folder, dir, item.ancestors, &mut stack, &mut summary)
                        .await;
                }
                Node::Resource(resource) => {
                    self.visit_resource(&resource, &item.parent_dir, &mut summary)
                        .await;
                }
            }
        }

        summary.finish();
        info!(
            "Export finished: {} folders, {} resources, {} content files, {} failures",
            summary.folders,
            summary.resources,
            summary.content_files,
            summary.failure_count()
        );
        summary
    }

    /// Write the folder, list its contents, and queue the children.
    async fn visit_folder(
        &self,
        folder: Folder,
        dir: PathBuf,
        ancestors: Arc<Vec<String>>,
        stack: &mut Vec<WorkItem>,
        summary: &mut ExportSummary,
    ) {
        debug!("Folder {} -> {}", folder.id, dir.display());
        match self.serializer.write_folder(&dir, &folder) {
            Ok(descriptor) => {
                summary.folders += 1;
                summary.record_written(&descriptor);
            }
            Err(e) => {
                self.fail(summary, &folder.id, Some(NodeKind::Folder), &e);
                if !dir.is_dir() {
                    return;
                }
            }
        }

        let children = match self
            .ctx
            .directory
            .list_contents(&folder.id, &self.listing)
            .await
        {
            Ok(children) => children,
            Err(e) => {
                self.fail(summary, &folder.id, Some(NodeKind::Folder), &e);
                return;
            }
        };

        let mut path = Vec::with_capacity(ancestors.len() + 1);
        path.extend(ancestors.iter().cloned());
        path.push(folder.id);
        let ancestors = Arc::new(path);

        stack.extend(children.into_iter().rev().map(|node| WorkItem {
            node,
            parent_dir: dir.clone(),
            ancestors: ancestors.clone(),
        }));
    }

    async fn visit_resource(&self, resource: &Resource, dir: &Path, summary: &mut ExportSummary) {
        let kind = resource.kind.node_kind();
        let uuid = match self.resolver.resolve(&resource.id, kind).await {
            Ok(uuid) => uuid,
            Err(e) => {
                self.fail(summary, &resource.id, Some(kind), &e);
                return;
            }
        };
        debug!("Resource {} ({}) -> {}", resource.id, kind, uuid);

        let content = match self.ctx.content.try_fetch(&resource.id, resource.kind).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Exporting {} without content: {}", resource.id, e);
                summary.record_failure(NodeFailure::from_error(&resource.id, Some(kind), &e));
                None
            }
        };

        match self
            .serializer
            .write_resource(dir, &uuid, resource, content.as_deref())
        {
            Ok(files) => {
                summary.resources += 1;
                summary.record_written(&files.info);
                if let Some(content_path) = files.content {
                    summary.content_files += 1;
                    summary.record_written(&content_path);
                }
            }
            Err(e) => self.fail(summary, &resource.id, Some(kind), &e),
        }
    }

    fn fail(
        &self,
        summary: &mut ExportSummary,
        id: &str,
        kind: Option<NodeKind>,
        err: &ExportError,
    ) {
        warn!("Skipping {}: {}", id, err);
        summary.record_failure(NodeFailure::from_error(id, kind, err));
    }
}

/// Run a full export with the HTTP content service.
///
/// Returns the run summary; its `exit_code()` is the process status.
pub async fn run(
    export_dir: &Path,
    root_path: &str,
    session: &ExportSession,
    content_config: &ServiceConfig,
) -> Result<ExportSummary, ExportError> {
    let content = HttpContentSource::new(content_config, session.auth_token.clone())?;
    let ctx = ExportContext::new(session.directory.clone(), Arc::new(content), export_dir);
    Ok(ExportWalker::new(ctx).walk(root_path).await)
}
