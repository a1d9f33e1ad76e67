//! Quota data model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{DqaError, Result};

/// Storage usage read from the account at one point in time.
///
/// Lives for a single tick and is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSnapshot {
    /// Bytes used across all services sharing the quota.
    pub usage_bytes: u64,
    /// Total bytes the account may use. Always greater than zero.
    pub limit_bytes: u64,
    /// Bytes used by Drive files, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_in_drive_bytes: Option<u64>,
    /// Bytes held in the Drive trash, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_in_trash_bytes: Option<u64>,
    /// When the figures were read.
    pub taken_at: DateTime<Utc>,
}

impl QuotaSnapshot {
    /// Build a snapshot taken now.
    ///
    /// # Errors
    /// [`DqaError::QuotaUnavailable`] when `limit_bytes` is zero, since no
    /// meaningful percentage exists.
    pub fn new(usage_bytes: u64, limit_bytes: u64) -> Result<Self> {
        if limit_bytes == 0 {
            return Err(DqaError::QuotaUnavailable(
                "account reports a storage limit of 0 bytes".to_string(),
            ));
        }

        Ok(Self {
            usage_bytes,
            limit_bytes,
            usage_in_drive_bytes: None,
            usage_in_trash_bytes: None,
            taken_at: Utc::now(),
        })
    }

    /// Usage as a percentage of the limit (`usage / limit * 100`).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn used_percent(&self) -> f64 {
        (self.usage_bytes as f64 / self.limit_bytes as f64) * 100.0
    }

    /// Bytes still available, zero when over quota.
    #[must_use]
    pub const fn remaining_bytes(&self) -> u64 {
        self.limit_bytes.saturating_sub(self.usage_bytes)
    }
}
