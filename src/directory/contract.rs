//! Directory session contract.
//!
//! The walker only talks to the metadata graph through these traits, so a
//! session can be backed by the HTTP directory service or by an in-memory tree.

use crate::error::ExportError;
use crate::types::{Folder, Node, NodeKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Sort key accepted by folder listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
}

impl SortKey {
    pub fn as_param(self) -> &'static str {
        match self {
            SortKey::Name => "name",
        }
    }
}

/// Parameters for one folder listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    pub kinds: Vec<NodeKind>,
    /// `None` requests the full listing in one call.
    pub limit: Option<u32>,
    pub offset: u32,
    pub sort: Vec<SortKey>,
}

impl ListingRequest {
    /// Every recognized kind, sorted by name, no page limit.
    pub fn full_listing() -> Self {
        Self {
            kinds: NodeKind::ALL.to_vec(),
            limit: None,
            offset: 0,
            sort: vec![SortKey::Name],
        }
    }
}

/// Administrative identity used to open a session.
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub user_id: String,
    pub password: Option<String>,
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("user_id", &self.user_id)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyEntry {
    pub key: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Profile of the authenticated administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: String,
    #[serde(default)]
    pub api_keys: Vec<ApiKeyEntry>,
}

impl AdminProfile {
    /// First enabled API key, in profile order.
    pub fn first_active_api_key(&self) -> Option<&str> {
        self.api_keys
            .iter()
            .find(|entry| entry.enabled && !entry.key.trim().is_empty())
            .map(|entry| entry.key.as_str())
    }
}

/// Authenticated handle to the metadata graph.
#[async_trait]
pub trait DirectorySession: Send + Sync {
    /// Profile of the identity this session is authenticated as.
    async fn current_user(&self) -> Result<AdminProfile, ExportError>;

    async fn find_folder_by_path(&self, path: &str) -> Result<Folder, ExportError>;

    /// Direct contents of a folder, ordered by the request's sort keys.
    async fn list_contents(
        &self,
        folder_id: &str,
        request: &ListingRequest,
    ) -> Result<Vec<Node>, ExportError>;

    /// Filesystem-safe name for an id. Folders and resources may resolve differently.
    async fn resolve_uuid(&self, id: &str, kind: NodeKind) -> Result<String, ExportError>;
}

/// Opens sessions against a directory service.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    async fn authenticate(
        &self,
        credentials: &AdminCredentials,
    ) -> Result<Arc<dyn DirectorySession>, ExportError>;
}
