//! Threshold decision for a single snapshot.

use crate::core::models::QuotaSnapshot;
use crate::error::{DqaError, Result};

/// Alert when usage reaches `threshold_percent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertPolicy {
    threshold_percent: f64,
}

impl AlertPolicy {
    /// # Errors
    /// [`DqaError::ConfigInvalid`] unless `0.0 <= threshold_percent <= 100.0`.
    pub fn new(threshold_percent: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&threshold_percent) {
            return Err(DqaError::ConfigInvalid {
                key: "alert.threshold_percent".to_string(),
                value: threshold_percent.to_string(),
                message: "must be between 0 and 100".to_string(),
            });
        }
        Ok(Self { threshold_percent })
    }

    #[must_use]
    pub const fn threshold_percent(&self) -> f64 {
        self.threshold_percent
    }

    /// A zero threshold fires on every successful poll.
    #[must_use]
    pub fn always_alerts(&self) -> bool {
        self.threshold_percent <= 0.0
    }

    #[must_use]
    pub fn should_alert(&self, snapshot: &QuotaSnapshot) -> bool {
        snapshot.used_percent() >= self.threshold_percent
    }
}
