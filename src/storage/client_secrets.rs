//! OAuth client secrets (`credentials.json`).
//!
//! Google Cloud Console hands out a JSON document with the client under an
//! `installed` (desktop app) or `web` key. Both shapes are accepted.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{DqaError, Result};

/// Redirect used when the document lists none (manual copy/paste flow).
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// OAuth client registration used for the authorization code flow.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    #[serde(default)]
    installed: Option<ClientSecrets>,
    #[serde(default)]
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Read and validate the client document at `path`.
    ///
    /// # Errors
    /// [`DqaError::ConfigNotFound`] if the file is missing or unreadable, and
    /// [`DqaError::ConfigParse`] if it is not a recognised client document.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "Cannot read client secrets");
            DqaError::ConfigNotFound {
                path: path.display().to_string(),
            }
        })?;

        Self::from_json(&content).map_err(|message| DqaError::ConfigParse {
            path: path.display().to_string(),
            message,
        })
    }

    /// Parse a client document.
    ///
    /// # Errors
    /// Returns a description of what is wrong with the document.
    pub fn from_json(content: &str) -> std::result::Result<Self, String> {
        let file: ClientSecretsFile = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let secrets = file
            .installed
            .or(file.web)
            .ok_or_else(|| "expected an \"installed\" or \"web\" client entry".to_string())?;

        for (field, value) in [
            ("client_id", &secrets.client_id),
            ("auth_uri", &secrets.auth_uri),
            ("token_uri", &secrets.token_uri),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} is empty"));
            }
        }

        Ok(secrets)
    }

    /// Redirect URI sent with the authorization request and code exchange.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map_or(OOB_REDIRECT_URI, String::as_str)
    }
}
