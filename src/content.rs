//! Content fetching from the content service.
//!
//! A [`ContentSource`] returns raw payload bytes. [`ContentFetcher`] wraps a
//! source, canonicalizes the JSON payload, and turns every failure into
//! "absent" for the walker.

use crate::config::ServiceConfig;
use crate::error::ExportError;
use crate::session::AuthToken;
use crate::types::ResourceKind;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Raw access to resource payloads.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn get(&self, id: &str, kind: ResourceKind) -> Result<Vec<u8>, ExportError>;
}

/// Content service over HTTP, authenticated with the admin API key.
pub struct HttpContentSource {
    client: reqwest::Client,
    base_url: String,
    auth: AuthToken,
}

impl HttpContentSource {
    pub fn new(config: &ServiceConfig, auth: AuthToken) -> Result<Self, ExportError> {
        Ok(Self {
            client: config.build_client()?,
            base_url: config.trimmed_base_url().to_string(),
            auth,
        })
    }

    /// `{base}/{kindPrefix}/{percentEncodedId}`
    pub fn content_url(&self, id: &str, kind: ResourceKind) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            kind.content_prefix(),
            urlencoding::encode(id)
        )
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn get(&self, id: &str, kind: ResourceKind) -> Result<Vec<u8>, ExportError> {
        let url = self.content_url(id, kind);
        debug!("Fetching {} content: {}", kind, url);

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.auth.header_value())
            .send()
            .await
            .map_err(|e| ExportError::content(id, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::content(id, format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ExportError::content(id, format!("failed to read body: {}", e)))?;
        Ok(body.to_vec())
    }
}

/// Re-serialize a JSON payload pretty-printed with keys sorted at every depth.
pub fn canonicalize_json(raw: &[u8]) -> Result<Vec<u8>, serde_json::Error> {
    let value: Value = serde_json::from_slice(raw)?;
    serde_json::to_vec_pretty(&sort_keys(value))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Fetches and canonicalizes resource content.
///
/// Callers treat an error as absent content.
#[derive(Clone)]
pub struct ContentFetcher {
    source: Arc<dyn ContentSource>,
}

impl ContentFetcher {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    /// Canonical payload, or the reason it is unavailable.
    pub async fn try_fetch(&self, id: &str, kind: ResourceKind) -> Result<Vec<u8>, ExportError> {
        let raw = self.source.get(id, kind).await?;
        canonicalize_json(&raw)
            .map_err(|e| ExportError::content(id, format!("malformed JSON body: {}", e)))
    }
}
