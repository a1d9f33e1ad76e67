//! Test utilities for dqa.
//!
//! Provides shared helpers, test data factories, fakes for the polling loop,
//! and assertion macros for use across all test modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dqa::test_utils::*;
//!
//! let snapshot = make_test_snapshot(3 * GB, 15 * GB);
//! let dir = TestDir::new();
//! dir.create_file("config.toml", "[general]\ninterval_seconds = 60");
//! ```

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use std::collections::VecDeque;
use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

use crate::core::alert::AlertSink;
use crate::core::credentials::CodePrompt;
use crate::core::models::QuotaSnapshot;
use crate::core::quota::QuotaSource;
use crate::error::{DqaError, Result};
use crate::storage::{ClientSecrets, StoredToken};

/// One gibibyte, for readable quota figures.
pub const GB: u64 = 1024 * 1024 * 1024;

// =============================================================================
// Test Data Factories
// =============================================================================

/// Create a `QuotaSnapshot` taken now.
///
/// # Panics
///
/// Panics if `limit` is zero.
#[must_use]
pub fn make_test_snapshot(usage: u64, limit: u64) -> QuotaSnapshot {
    QuotaSnapshot::new(usage, limit).expect("limit must be non-zero")
}

/// Create a token record expiring `expires_in` from now.
#[must_use]
pub fn make_test_token(expires_in: TimeDelta, refresh_token: Option<&str>) -> StoredToken {
    StoredToken {
        access_token: "ya29.test-access".to_string(),
        token_type: "Bearer".to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expiry: Some(Utc::now() + expires_in),
    }
}

/// Client registration pointing its token endpoint at `token_uri`.
#[must_use]
pub fn make_test_client_secrets(token_uri: &str) -> ClientSecrets {
    ClientSecrets {
        client_id: "test-client.apps.googleusercontent.com".to_string(),
        client_secret: "test-secret".to_string(),
        auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
        token_uri: token_uri.to_string(),
        redirect_uris: vec!["urn:ietf:wg:oauth:2.0:oob".to_string()],
    }
}

/// The same registration as [`make_test_client_secrets`], as the JSON
/// document Google hands out.
#[must_use]
pub fn client_secrets_json(token_uri: &str) -> String {
    let secrets = make_test_client_secrets(token_uri);
    serde_json::json!({
        "installed": {
            "client_id": secrets.client_id,
            "client_secret": secrets.client_secret,
            "auth_uri": secrets.auth_uri,
            "token_uri": secrets.token_uri,
            "redirect_uris": secrets.redirect_uris,
        }
    })
    .to_string()
}

// =============================================================================
// Fakes
// =============================================================================

/// Quota source that replays a script of results.
///
/// `None` entries fail with a network error. Once the script runs out the
/// last entry repeats.
#[derive(Debug)]
pub struct FakeQuotaSource {
    script: Mutex<VecDeque<Option<(u64, u64)>>>,
    last: Mutex<Option<(u64, u64)>>,
    polls: AtomicUsize,
}

impl FakeQuotaSource {
    /// Always report `usage` of `limit` bytes.
    #[must_use]
    pub fn always(usage: u64, limit: u64) -> Self {
        Self::scripted(vec![Some((usage, limit))])
    }

    /// Replay `script` in order.
    #[must_use]
    pub fn scripted(script: Vec<Option<(u64, u64)>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            polls: AtomicUsize::new(0),
        }
    }

    /// Number of polls so far.
    #[must_use]
    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Option<(u64, u64)> {
        let mut script = self.script.lock().expect("script lock");
        let mut last = self.last.lock().expect("last lock");
        if let Some(entry) = script.pop_front() {
            *last = entry;
        }
        *last
    }
}

#[async_trait]
impl QuotaSource for FakeQuotaSource {
    async fn poll(&self) -> Result<QuotaSnapshot> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.next() {
            Some((usage, limit)) => QuotaSnapshot::new(usage, limit),
            None => Err(DqaError::Network("connection refused".to_string())),
        }
    }
}

/// Alert sink that records every message instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every dispatch fails (after recording the attempt).
    #[must_use]
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Messages dispatched so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("messages lock").clone()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn dispatch(&self, message: &str) -> Result<()> {
        self.messages
            .lock()
            .expect("messages lock")
            .push(message.to_string());
        if self.fail {
            return Err(DqaError::DispatchFailed("recording sink set to fail".to_string()));
        }
        Ok(())
    }

    fn destination(&self) -> &str {
        "test-chat"
    }
}

/// Code prompt that answers from a queue and remembers what it was shown.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    codes: VecDeque<String>,
    presented: Vec<Url>,
}

impl ScriptedPrompt {
    /// Answer with `codes`, one per prompt.
    #[must_use]
    pub fn with_codes(codes: &[&str]) -> Self {
        Self {
            codes: codes.iter().map(|c| (*c).to_string()).collect(),
            presented: Vec::new(),
        }
    }

    /// Consent URLs presented so far.
    #[must_use]
    pub fn presented(&self) -> &[Url] {
        &self.presented
    }
}

#[async_trait]
impl CodePrompt for ScriptedPrompt {
    fn present(&mut self, url: &Url) {
        self.presented.push(url.clone());
    }

    async fn read_code(&mut self) -> Result<String> {
        self.codes
            .pop_front()
            .ok_or_else(|| DqaError::AuthorizationFailed {
                reason: "no scripted authorization code left".to_string(),
            })
    }
}

// =============================================================================
// Test Directory Helpers
// =============================================================================

/// An isolated temporary directory, removed on drop.
///
/// # Examples
///
/// ```rust,ignore
/// use dqa::test_utils::TestDir;
///
/// let dir = TestDir::new();
/// dir.create_file("credentials.json", "{}");
/// assert!(dir.file_exists("credentials.json"));
/// ```
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// Create a new isolated temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file in the temporary directory with the given content.
    ///
    /// Creates parent directories as needed.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.inner.path().join(name);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
    }

    /// Check if a file exists in the temporary directory.
    #[must_use]
    pub fn file_exists(&self, name: &str) -> bool {
        self.inner.path().join(name).exists()
    }

    /// Get the full path to a file in the temporary directory.
    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
///
/// # Examples
///
/// ```rust,ignore
/// use dqa::assert_contains;
///
/// assert_contains!("Storage usage: 20.00%", "20.00%");
/// ```
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string does NOT contain a substring.
#[macro_export]
macro_rules! assert_not_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            !haystack.contains(needle),
            "Expected string NOT to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}
