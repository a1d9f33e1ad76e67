//! Persistent OAuth token record.
//!
//! The record is a small JSON document (`access_token`, `token_type`,
//! `refresh_token`, `expiry`) kept next to the binary's working directory.
//! It grants read access to the account, so it is written owner-only and
//! replaced atomically (temp file + rename) so a torn write never loads back
//! as a valid record.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DqaError, Result};

/// Tokens are treated as expired this many seconds before their real expiry.
pub const EXPIRY_MARGIN_SECS: i64 = 10;

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// A cached OAuth credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// Bearer access token.
    pub access_token: String,
    /// Token type, normally `Bearer`.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Refresh token used to renew the access token without the operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the access token stops being valid. `None` means no known expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Build a record from a token endpoint response received at `now`.
    #[must_use]
    pub fn from_grant(
        access_token: String,
        token_type: Option<String>,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            token_type: token_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(default_token_type),
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            expiry: expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| now + TimeDelta::seconds(secs)),
        }
    }

    /// Whether the access token must not be used at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|expiry| now + TimeDelta::seconds(EXPIRY_MARGIN_SECS) >= expiry)
    }

    /// Whether the access token must not be used right now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether an expired token can be renewed without the operator.
    #[must_use]
    pub const fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Usable now, or renewable without interaction.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.is_expired() || self.can_refresh()
    }

    /// Clear placeholder values older tooling writes for "not set".
    fn normalized(mut self) -> Self {
        if self.refresh_token.as_deref().is_some_and(str::is_empty) {
            self.refresh_token = None;
        }
        // A zero timestamp (year 1) means the token never expires.
        if self.expiry.is_some_and(|e| e.year() <= 1) {
            self.expiry = None;
        }
        if self.token_type.is_empty() {
            self.token_type = default_token_type();
        }
        self
    }
}

/// File-backed store for a single [`StoredToken`].
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Store backed by `path`. Nothing is read until [`TokenStore::load`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted record.
    ///
    /// # Errors
    /// Returns [`DqaError::CredentialNotFound`] when the file is absent,
    /// unreadable, not valid JSON, or holds an empty access token. Callers
    /// treat that as "authorize interactively".
    pub fn load(&self) -> Result<StoredToken> {
        let not_found = |reason: String| DqaError::CredentialNotFound {
            path: self.path.display().to_string(),
            reason,
        };

        let content = fs::read_to_string(&self.path).map_err(|e| not_found(e.to_string()))?;
        let token: StoredToken =
            serde_json::from_str(&content).map_err(|e| not_found(format!("corrupt record: {e}")))?;

        if token.access_token.trim().is_empty() {
            return Err(not_found("record has an empty access token".to_string()));
        }

        tracing::debug!(path = %self.path.display(), "Loaded stored token");
        Ok(token.normalized())
    }

    /// Persist `token`, replacing any previous record.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be created, or the
    /// temp file cannot be written or renamed into place.
    pub fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(token)?;
        write_private_atomic(&self.path, content.as_bytes())?;

        tracing::debug!(path = %self.path.display(), "Saved token record");
        Ok(())
    }
}

/// Write bytes atomically using an owner-only temp file + rename.
fn write_private_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let temp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("token"),
        std::process::id()
    ));

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    {
        let mut file = options.open(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(())
}
