//! Error types for dqa.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into five main categories:
//! - **Authentication**: Missing, expired or rejected OAuth credentials
//! - **Network**: Connection and timeout failures talking to remote APIs
//! - **Configuration**: Config files, client secrets, environment variables
//! - **Provider**: Unexpected responses from the Drive or Telegram APIs
//! - **Internal**: I/O, serialization, or unclassified issues
//!
//! Startup code treats most errors as fatal. The scheduler loop instead asks
//! [`DqaError::is_transient()`] and keeps running.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Authentication issues (missing, expired, rejected credentials).
    Authentication,
    /// Network issues (timeout, connection refused, DNS).
    Network,
    /// Configuration issues (parse errors, invalid values, missing files).
    Configuration,
    /// Remote API issues (error statuses, malformed bodies, no quota).
    Provider,
    /// Internal errors (I/O, serialization, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication error",
            Self::Network => "Network error",
            Self::Configuration => "Configuration error",
            Self::Provider => "Provider error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Authentication => "A",
            Self::Network => "N",
            Self::Configuration => "C",
            Self::Provider => "P",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success, including a graceful shutdown of the watch loop.
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Missing or invalid configuration, client secrets, or environment
    ConfigError = 2,
    /// Interactive authorization failed
    AuthError = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for dqa operations.
#[derive(Error, Debug)]
pub enum DqaError {
    // ==========================================================================
    // Authentication errors (Category: Authentication)
    // ==========================================================================
    /// No usable credential record on disk.
    #[error("no stored credential at {path}: {reason}")]
    CredentialNotFound { path: String, reason: String },

    /// Access token expired and cannot be refreshed, or was rejected.
    #[error("authentication expired: {reason}")]
    AuthExpired { reason: String },

    /// The interactive authorization exchange failed.
    #[error("authorization failed: {reason}")]
    AuthorizationFailed { reason: String },

    // ==========================================================================
    // Network errors (Category: Network)
    // ==========================================================================
    /// Request timed out.
    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    /// Generic network error.
    #[error("network error: {0}")]
    Network(String),

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Required file not found at expected path.
    #[error("config file not found: {path}")]
    ConfigNotFound { path: String },

    /// Error parsing a configuration document.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid {
        key: String,
        value: String,
        message: String,
    },

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Required environment variable not set.
    #[error("environment variable not set: {name}")]
    EnvVarMissing { name: String },

    // ==========================================================================
    // Provider errors (Category: Provider)
    // ==========================================================================
    /// Remote API returned a non-success status.
    #[error("{service} API error (HTTP {status}): {message}")]
    ApiError {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// Failed to parse a remote response.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    /// The account reported no usable storage limit.
    #[error("storage quota unavailable: {0}")]
    QuotaUnavailable(String),

    /// Alert delivery failed.
    #[error("alert dispatch failed: {0}")]
    DispatchFailed(String),

    // ==========================================================================
    // Internal errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DqaError {
    /// Map error to process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::Config(_)
            | Self::EnvVarMissing { .. } => ExitCode::ConfigError,

            Self::CredentialNotFound { .. }
            | Self::AuthExpired { .. }
            | Self::AuthorizationFailed { .. } => ExitCode::AuthError,

            Self::Timeout(_)
            | Self::Network(_)
            | Self::ApiError { .. }
            | Self::ParseResponse(_)
            | Self::QuotaUnavailable(_)
            | Self::DispatchFailed(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::CredentialNotFound { .. }
            | Self::AuthExpired { .. }
            | Self::AuthorizationFailed { .. } => ErrorCategory::Authentication,

            Self::Timeout(_) | Self::Network(_) => ErrorCategory::Network,

            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::Config(_)
            | Self::EnvVarMissing { .. } => ErrorCategory::Configuration,

            Self::ApiError { .. }
            | Self::ParseResponse(_)
            | Self::QuotaUnavailable(_)
            | Self::DispatchFailed(_) => ErrorCategory::Provider,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `DQA-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::CredentialNotFound { .. } => "DQA-A001",
            Self::AuthExpired { .. } => "DQA-A002",
            Self::AuthorizationFailed { .. } => "DQA-A003",

            Self::Timeout(_) => "DQA-N001",
            Self::Network(_) => "DQA-N099",

            Self::ConfigNotFound { .. } => "DQA-C001",
            Self::ConfigParse { .. } => "DQA-C002",
            Self::ConfigInvalid { .. } => "DQA-C003",
            Self::Config(_) => "DQA-C004",
            Self::EnvVarMissing { .. } => "DQA-C005",

            Self::ApiError { .. } => "DQA-P001",
            Self::ParseResponse(_) => "DQA-P002",
            Self::QuotaUnavailable(_) => "DQA-P003",
            Self::DispatchFailed(_) => "DQA-P004",

            Self::Io(_) => "DQA-X001",
            Self::Json(_) => "DQA-X002",
            Self::Other(_) => "DQA-X099",
        }
    }

    /// Whether a failure of one poll may succeed on a later tick.
    ///
    /// The watch loop logs transient errors and waits for the next tick;
    /// anything else during a tick is still logged but reported as unexpected.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_)
                | Self::Network(_)
                | Self::AuthExpired { .. }
                | Self::ApiError { .. }
                | Self::ParseResponse(_)
                | Self::QuotaUnavailable(_)
                | Self::DispatchFailed(_)
        )
    }

    /// A one-line hint printed under fatal startup errors.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::ConfigNotFound { path } => Some(format!(
                "Download the OAuth client JSON from Google Cloud Console and save it as {path}"
            )),
            Self::ConfigParse { path, .. } => Some(format!("Fix or remove {path} and retry")),
            Self::EnvVarMissing { name } => Some(format!(
                "Set {name} in the environment or in the dotenv file (default: .env)"
            )),
            Self::AuthorizationFailed { .. } | Self::AuthExpired { .. } => {
                Some("Run `dqa auth --force` to authorize again".to_string())
            }
            Self::ConfigInvalid { key, .. } => Some(format!("Check the value of '{key}'")),
            _ => None,
        }
    }
}

/// Result type alias for dqa operations.
pub type Result<T> = std::result::Result<T, DqaError>;

// =============================================================================
// Tests
// =============================================================================
