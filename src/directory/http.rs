//! HTTP-backed directory session.

use crate::config::ServiceConfig;
use crate::directory::contract::{
    AdminCredentials, AdminProfile, DirectoryConnector, DirectorySession, ListingRequest,
};
use crate::error::ExportError;
use crate::types::{Folder, Node, NodeKind, NodeRecord};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    user_id: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    resources: Vec<NodeRecord>,
}

#[derive(Deserialize)]
struct UuidResponse {
    uuid: String,
}

/// Opens sessions against the directory service REST API.
pub struct HttpDirectoryConnector {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDirectoryConnector {
    pub fn new(config: &ServiceConfig) -> Result<Self, ExportError> {
        Ok(Self {
            client: config.build_client()?,
            base_url: config.trimmed_base_url().to_string(),
        })
    }
}

#[async_trait]
impl DirectoryConnector for HttpDirectoryConnector {
    async fn authenticate(
        &self,
        credentials: &AdminCredentials,
    ) -> Result<Arc<dyn DirectorySession>, ExportError> {
        let password = credentials.password.as_deref().ok_or_else(|| {
            ExportError::Authentication(format!(
                "No password configured for administrator {}",
                credentials.user_id
            ))
        })?;

        let url = format!("{}/auth/token", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&TokenRequest {
                user_id: &credentials.user_id,
                password,
            })
            .send()
            .await
            .map_err(|e| {
                ExportError::Authentication(format!("Directory service unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::Authentication(format!(
                "Directory service rejected administrator {}: HTTP {}",
                credentials.user_id, status
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ExportError::Authentication(format!("Malformed token response: {}", e))
        })?;

        Ok(Arc::new(HttpDirectorySession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            bearer: format!("Bearer {}", token.access_token),
        }))
    }
}

/// Session holding a bearer token for the directory service.
pub struct HttpDirectorySession {
    client: reqwest::Client,
    base_url: String,
    bearer: String,
}

impl HttpDirectorySession {
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        subject: &str,
    ) -> Result<T, ExportError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(query)
            .header(AUTHORIZATION, &self.bearer)
            .send()
            .await
            .map_err(|e| ExportError::lookup(subject, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::lookup(subject, format!("HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| ExportError::lookup(subject, format!("malformed response: {}", e)))
    }
}

#[async_trait]
impl DirectorySession for HttpDirectorySession {
    async fn current_user(&self) -> Result<AdminProfile, ExportError> {
        let url = format!("{}/users/me", self.base_url);
        self.get_json(&url, &[], "users/me")
            .await
            .map_err(|e| ExportError::Authentication(e.to_string()))
    }

    async fn find_folder_by_path(&self, path: &str) -> Result<Folder, ExportError> {
        let url = format!("{}/folders", self.base_url);
        let record: NodeRecord = self
            .get_json(&url, &[("path", path.to_string())], path)
            .await?;
        match Node::from(record) {
            Node::Folder(folder) => Ok(folder),
            Node::Resource(resource) => Err(ExportError::lookup(
                path,
                format!("path resolves to a {} not a folder", resource.kind),
            )),
        }
    }

    async fn list_contents(
        &self,
        folder_id: &str,
        request: &ListingRequest,
    ) -> Result<Vec<Node>, ExportError> {
        let url = format!(
            "{}/folders/{}/contents",
            self.base_url,
            urlencoding::encode(folder_id)
        );
        let kinds = request
            .kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let sort = request
            .sort
            .iter()
            .map(|k| k.as_param())
            .collect::<Vec<_>>()
            .join(",");
        let mut query = vec![
            ("resource_types", kinds),
            ("offset", request.offset.to_string()),
            ("sort", sort),
        ];
        if let Some(limit) = request.limit {
            query.push(("limit", limit.to_string()));
        }

        let contents: ContentsResponse = self.get_json(&url, &query, folder_id).await?;
        Ok(contents
            .resources
            .into_iter()
            .filter(|record| request.kinds.contains(&record.node_type))
            .map(Node::from)
            .collect())
    }

    async fn resolve_uuid(&self, id: &str, kind: NodeKind) -> Result<String, ExportError> {
        let url = format!("{}/uuid", self.base_url);
        let query = [("id", id.to_string()), ("type", kind.as_str().to_string())];
        let resolved: UuidResponse = self.get_json(&url, &query, id).await?;
        Ok(resolved.uuid)
    }
}
