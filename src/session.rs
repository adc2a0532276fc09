//! Session bootstrap: authenticated directory session plus content credentials.

use crate::directory::{AdminCredentials, DirectoryConnector, DirectorySession};
use crate::error::ExportError;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Credential presented to the content service.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    api_key: String,
}

impl AuthToken {
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: key.into(),
        }
    }

    /// Value of the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("ApiKey {}", self.api_key)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(ApiKey <redacted>)")
    }
}

/// Everything an export run needs from the bootstrap step.
#[derive(Clone)]
pub struct ExportSession {
    pub directory: Arc<dyn DirectorySession>,
    pub auth_token: AuthToken,
}

/// Authenticate as the administrator and derive the content service credential.
///
/// Any failure here is an `Authentication` error; there is no partial mode.
pub async fn bootstrap(
    connector: &dyn DirectoryConnector,
    credentials: &AdminCredentials,
) -> Result<ExportSession, ExportError> {
    let directory = connector
        .authenticate(credentials)
        .await
        .map_err(as_authentication)?;

    let profile = directory.current_user().await.map_err(as_authentication)?;
    let api_key = profile.first_active_api_key().ok_or_else(|| {
        ExportError::Authentication(format!(
            "Administrator {} has no active API key",
            profile.id
        ))
    })?;

    info!("Authenticated as {}", profile.id);
    Ok(ExportSession {
        auth_token: AuthToken::api_key(api_key),
        directory,
    })
}

fn as_authentication(err: ExportError) -> ExportError {
    match err {
        ExportError::Authentication(_) => err,
        other => ExportError::Authentication(other.to_string()),
    }
}
