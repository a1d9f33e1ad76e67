//! Drive storage quota poller.
//!
//! One `GET /drive/v3/about?fields=storageQuota` per tick. Every failure is
//! returned to the caller as a transient error; the loop decides what to do.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::core::credentials::AuthorizedClient;
use crate::core::http::{classify_send_error, error_for_status};
use crate::core::models::QuotaSnapshot;
use crate::error::{DqaError, Result};

const SERVICE: &str = "drive";

/// Anything that can report the current quota.
#[async_trait]
pub trait QuotaSource: Send + Sync {
    /// Read usage and limit once.
    async fn poll(&self) -> Result<QuotaSnapshot>;
}

// =============================================================================
// API Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AboutResponse {
    #[serde(default)]
    storage_quota: Option<StorageQuota>,
}

/// Drive reports int64 fields as JSON strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageQuota {
    #[serde(default)]
    limit: Option<Int64>,
    #[serde(default)]
    usage: Option<Int64>,
    #[serde(default)]
    usage_in_drive: Option<Int64>,
    #[serde(default)]
    usage_in_drive_trash: Option<Int64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Int64 {
    Number(u64),
    Text(String),
}

impl Int64 {
    fn value(&self, field: &str) -> Result<u64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s.trim().parse().map_err(|_| {
                DqaError::ParseResponse(format!("storageQuota.{field} is not an integer: {s:?}"))
            }),
        }
    }
}

fn optional(value: Option<&Int64>, field: &str) -> Result<Option<u64>> {
    value.map(|v| v.value(field)).transpose()
}

fn snapshot_from_about(about: AboutResponse) -> Result<QuotaSnapshot> {
    let quota = about.storage_quota.ok_or_else(|| {
        DqaError::ParseResponse("response has no storageQuota field".to_string())
    })?;

    let limit = optional(quota.limit.as_ref(), "limit")?.ok_or_else(|| {
        DqaError::QuotaUnavailable("account reports no storage limit".to_string())
    })?;
    let usage = optional(quota.usage.as_ref(), "usage")?
        .ok_or_else(|| DqaError::ParseResponse("storageQuota.usage is missing".to_string()))?;

    let mut snapshot = QuotaSnapshot::new(usage, limit)?;
    snapshot.usage_in_drive_bytes = optional(quota.usage_in_drive.as_ref(), "usageInDrive")?;
    snapshot.usage_in_trash_bytes =
        optional(quota.usage_in_drive_trash.as_ref(), "usageInDriveTrash")?;
    Ok(snapshot)
}

// =============================================================================
// Poller
// =============================================================================

/// Polls the Drive `about` endpoint with an authorized client.
#[derive(Debug)]
pub struct DriveQuotaPoller {
    client: AuthorizedClient,
    about_url: Url,
    timeout: Duration,
}

impl DriveQuotaPoller {
    /// Poller against `api_base` (e.g. `https://www.googleapis.com`).
    ///
    /// # Errors
    /// [`DqaError::ConfigInvalid`] if `api_base` is not a URL.
    pub fn new(client: AuthorizedClient, api_base: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client,
            about_url: about_url(api_base)?,
            timeout,
        })
    }
}

fn about_url(api_base: &str) -> Result<Url> {
    let invalid = |message: String| DqaError::ConfigInvalid {
        key: "drive.api_base".to_string(),
        value: api_base.to_string(),
        message,
    };

    let base = if api_base.ends_with('/') {
        api_base.to_string()
    } else {
        format!("{api_base}/")
    };
    let mut url = Url::parse(&base)
        .and_then(|b| b.join("drive/v3/about"))
        .map_err(|e| invalid(e.to_string()))?;
    url.query_pairs_mut().append_pair("fields", "storageQuota");
    Ok(url)
}

#[async_trait]
impl QuotaSource for DriveQuotaPoller {
    async fn poll(&self) -> Result<QuotaSnapshot> {
        let request = self.client.get(self.about_url.clone()).await?;
        let response = request
            .send()
            .await
            .map_err(|e| classify_send_error(e, self.timeout))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(DqaError::AuthExpired {
                reason: format!("Drive rejected the access token (HTTP {})", status.as_u16()),
            });
        }

        let response = error_for_status(response, SERVICE).await?;
        let about: AboutResponse = response
            .json()
            .await
            .map_err(|e| DqaError::ParseResponse(e.to_string()))?;

        let snapshot = snapshot_from_about(about)?;
        tracing::debug!(
            usage = snapshot.usage_bytes,
            limit = snapshot.limit_bytes,
            "Fetched storage quota"
        );
        Ok(snapshot)
    }
}
