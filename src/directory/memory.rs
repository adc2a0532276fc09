//! In-memory directory tree.
//!
//! Serves the same contract as the HTTP session from a mutable tree held in
//! process. Used for fixtures and for exercising the walker without a service.

use crate::directory::contract::{
    AdminCredentials, AdminProfile, ApiKeyEntry, DirectoryConnector, DirectorySession,
    ListingRequest, SortKey,
};
use crate::error::ExportError;
use crate::types::{Folder, Node, NodeKind, Resource, ResourceKind};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Calls observed by a [`MemoryDirectory`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    FindFolder(String),
    ListContents(String),
    ResolveUuid(String, NodeKind),
}

#[derive(Default)]
struct TreeState {
    nodes: HashMap<String, Node>,
    children: HashMap<String, Vec<String>>,
    paths: HashMap<String, String>,
    uuids: HashMap<String, String>,
    failing_uuids: HashSet<String>,
    failing_listings: HashSet<String>,
    calls: Vec<DirectoryCall>,
}

/// Mutable in-memory metadata tree implementing [`DirectorySession`].
pub struct MemoryDirectory {
    root_id: String,
    profile: AdminProfile,
    state: RwLock<TreeState>,
}

impl MemoryDirectory {
    /// Create a tree whose root folder is reachable at `root_path`.
    pub fn new(root_path: &str, root_id: &str, root_name: &str) -> Self {
        let mut state = TreeState::default();
        state.nodes.insert(
            root_id.to_string(),
            Node::Folder(Folder::new(root_id, root_name)),
        );
        state.children.insert(root_id.to_string(), Vec::new());
        state
            .paths
            .insert(root_path.to_string(), root_id.to_string());
        Self {
            root_id: root_id.to_string(),
            profile: AdminProfile {
                id: "admin".to_string(),
                api_keys: Vec::new(),
            },
            state: RwLock::new(state),
        }
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// Replace the administrator profile returned by `current_user`.
    pub fn with_profile(mut self, id: &str, api_keys: &[(&str, bool)]) -> Self {
        self.profile = AdminProfile {
            id: id.to_string(),
            api_keys: api_keys
                .iter()
                .map(|(key, enabled)| ApiKeyEntry {
                    key: key.to_string(),
                    enabled: *enabled,
                })
                .collect(),
        };
        self
    }

    pub fn add_folder(&self, parent_id: &str, id: &str, name: &str) -> &Self {
        self.insert(parent_id, Node::Folder(Folder::new(id, name)));
        self.state
            .write()
            .children
            .entry(id.to_string())
            .or_default();
        self
    }

    pub fn add_resource(&self, parent_id: &str, id: &str, name: &str, kind: ResourceKind) -> &Self {
        self.insert(parent_id, Node::Resource(Resource::new(id, name, kind)));
        self
    }

    /// Insert a fully specified node, e.g. one carrying extra attributes.
    pub fn insert(&self, parent_id: &str, node: Node) -> &Self {
        let mut state = self.state.write();
        let id = node.id().to_string();
        state
            .children
            .entry(parent_id.to_string())
            .or_default()
            .push(id.clone());
        state.nodes.insert(id, node);
        self
    }

    /// List an existing node under an additional parent. Allows cycles.
    pub fn link(&self, parent_id: &str, child_id: &str) -> &Self {
        self.state
            .write()
            .children
            .entry(parent_id.to_string())
            .or_default()
            .push(child_id.to_string());
        self
    }

    /// Remove a node from every listing it appears in.
    pub fn remove(&self, id: &str) -> &Self {
        let mut state = self.state.write();
        state.nodes.remove(id);
        for children in state.children.values_mut() {
            children.retain(|child| child != id);
        }
        self
    }

    /// Override the uuid returned for `id`. Defaults to the last `/` segment of the id.
    pub fn set_uuid(&self, id: &str, uuid: &str) -> &Self {
        self.state
            .write()
            .uuids
            .insert(id.to_string(), uuid.to_string());
        self
    }

    pub fn fail_uuid(&self, id: &str) -> &Self {
        self.state.write().failing_uuids.insert(id.to_string());
        self
    }

    pub fn fail_listing(&self, folder_id: &str) -> &Self {
        self.state
            .write()
            .failing_listings
            .insert(folder_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.state.read().calls.clone()
    }

    fn record(&self, call: DirectoryCall) {
        self.state.write().calls.push(call);
    }
}

fn default_uuid(id: &str) -> String {
    id.rsplit('/').next().unwrap_or(id).to_string()
}

#[async_trait]
impl DirectorySession for MemoryDirectory {
    async fn current_user(&self) -> Result<AdminProfile, ExportError> {
        Ok(self.profile.clone())
    }

    async fn find_folder_by_path(&self, path: &str) -> Result<Folder, ExportError> {
        self.record(DirectoryCall::FindFolder(path.to_string()));
        let state = self.state.read();
        let id = state
            .paths
            .get(path)
            .ok_or_else(|| ExportError::lookup(path, "no folder at path"))?;
        match state.nodes.get(id) {
            Some(Node::Folder(folder)) => Ok(folder.clone()),
            Some(Node::Resource(_)) => Err(ExportError::lookup(path, "path is not a folder")),
            None => Err(ExportError::lookup(path, "folder was removed")),
        }
    }

    async fn list_contents(
        &self,
        folder_id: &str,
        request: &ListingRequest,
    ) -> Result<Vec<Node>, ExportError> {
        self.record(DirectoryCall::ListContents(folder_id.to_string()));
        let state = self.state.read();
        if state.failing_listings.contains(folder_id) {
            return Err(ExportError::lookup(folder_id, "listing unavailable"));
        }
        let child_ids = state
            .children
            .get(folder_id)
            .ok_or_else(|| ExportError::lookup(folder_id, "folder not found"))?;

        let mut nodes: Vec<Node> = child_ids
            .iter()
            .filter_map(|id| state.nodes.get(id))
            .filter(|node| request.kinds.contains(&node.kind()))
            .cloned()
            .collect();
        for key in request.sort.iter().rev() {
            match key {
                SortKey::Name => nodes.sort_by(|a, b| a.name().cmp(b.name())),
            }
        }

        let offset = request.offset as usize;
        let nodes = nodes.into_iter().skip(offset);
        Ok(match request.limit {
            Some(limit) => nodes.take(limit as usize).collect(),
            None => nodes.collect(),
        })
    }

    async fn resolve_uuid(&self, id: &str, kind: NodeKind) -> Result<String, ExportError> {
        self.record(DirectoryCall::ResolveUuid(id.to_string(), kind));
        let state = self.state.read();
        if state.failing_uuids.contains(id) || !state.nodes.contains_key(id) {
            return Err(ExportError::lookup(id, "id not found"));
        }
        Ok(state
            .uuids
            .get(id)
            .cloned()
            .unwrap_or_else(|| default_uuid(id)))
    }
}

/// Connector that authenticates against a fixed credential table.
pub struct MemoryConnector {
    directory: Arc<MemoryDirectory>,
    passwords: HashMap<String, String>,
}

impl MemoryConnector {
    pub fn new(directory: Arc<MemoryDirectory>) -> Self {
        Self {
            directory,
            passwords: HashMap::new(),
        }
    }

    pub fn with_user(mut self, user_id: &str, password: &str) -> Self {
        self.passwords
            .insert(user_id.to_string(), password.to_string());
        self
    }
}

#[async_trait]
impl DirectoryConnector for MemoryConnector {
    async fn authenticate(
        &self,
        credentials: &AdminCredentials,
    ) -> Result<Arc<dyn DirectorySession>, ExportError> {
        match (
            self.passwords.get(&credentials.user_id),
            credentials.password.as_ref(),
        ) {
            (Some(expected), Some(given)) if expected == given => {
                Ok(self.directory.clone() as Arc<dyn DirectorySession>)
            }
            _ => Err(ExportError::Authentication(format!(
                "Invalid credentials for {}",
                credentials.user_id
            ))),
        }
    }
}
