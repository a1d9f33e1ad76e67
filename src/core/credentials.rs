//! Credential lifecycle: cached token first, interactive authorization second.
//!
//! Authorization is a two-phase protocol. [`CredentialManager::begin`] either
//! returns a ready transport built from the stored record (no network) or a
//! [`PendingAuthorization`] holding the consent URL. The pending state is
//! completed with the code the operator pastes back.

use std::io::Write;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use url::Url;

use crate::core::oauth::{DEFAULT_STATE, OAuthClient};
use crate::error::{DqaError, Result};
use crate::storage::{StoredToken, TokenStore};

// =============================================================================
// Transport
// =============================================================================

/// HTTP client bound to a credential that refreshes itself when expired.
///
/// Refreshed records are written back to the store, so a restart picks up
/// the newest token instead of a stale one.
#[derive(Debug)]
pub struct AuthorizedClient {
    http: Client,
    oauth: OAuthClient,
    store: TokenStore,
    token: Mutex<StoredToken>,
}

impl AuthorizedClient {
    #[must_use]
    pub fn new(http: Client, oauth: OAuthClient, store: TokenStore, token: StoredToken) -> Self {
        Self {
            http,
            oauth,
            store,
            token: Mutex::new(token),
        }
    }

    /// A currently valid access token, refreshing first if needed.
    ///
    /// # Errors
    /// [`DqaError::AuthExpired`] when the token is expired and cannot be
    /// refreshed; network errors from the refresh call.
    pub async fn bearer(&self) -> Result<String> {
        let mut token = self.token.lock().await;

        if token.is_expired() {
            tracing::info!("Access token expired, refreshing");
            let refreshed = self.oauth.refresh(&token).await?;
            if let Err(e) = self.store.save(&refreshed) {
                tracing::warn!(
                    path = %self.store.path().display(),
                    error = %e,
                    "Failed to persist refreshed token"
                );
            }
            *token = refreshed;
        }

        Ok(token.access_token.clone())
    }

    /// GET request with the bearer header attached.
    ///
    /// # Errors
    /// Same as [`AuthorizedClient::bearer`].
    pub async fn get(&self, url: Url) -> Result<RequestBuilder> {
        let bearer = self.bearer().await?;
        Ok(self.http.get(url).bearer_auth(bearer))
    }

    /// Snapshot of the record currently in use.
    pub async fn current_token(&self) -> StoredToken {
        self.token.lock().await.clone()
    }
}

// =============================================================================
// Two-phase authorization
// =============================================================================

/// Outcome of [`CredentialManager::begin`].
#[derive(Debug)]
pub enum Authorization {
    /// A usable record was on disk.
    Ready(AuthorizedClient),
    /// The operator must visit a URL and paste back a code.
    Pending(PendingAuthorization),
}

/// Waiting for an out-of-band authorization code.
#[derive(Debug)]
pub struct PendingAuthorization {
    url: Url,
    http: Client,
    oauth: OAuthClient,
    store: TokenStore,
}

impl PendingAuthorization {
    /// Consent page the operator has to open.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Exchange `code`, persist the new record, and build the transport.
    ///
    /// # Errors
    /// [`DqaError::AuthorizationFailed`] if the exchange fails; I/O errors if
    /// the record cannot be saved.
    pub async fn complete(self, code: &str) -> Result<AuthorizedClient> {
        let token = self.oauth.exchange_code(code).await?;
        self.store.save(&token)?;
        tracing::info!(path = %self.store.path().display(), "Saved new token record");

        Ok(AuthorizedClient::new(self.http, self.oauth, self.store, token))
    }
}

/// Decides between the cached credential and a new authorization.
#[derive(Debug, Clone)]
pub struct CredentialManager {
    http: Client,
    oauth: OAuthClient,
    store: TokenStore,
}

impl CredentialManager {
    #[must_use]
    pub const fn new(http: Client, oauth: OAuthClient, store: TokenStore) -> Self {
        Self { http, oauth, store }
    }

    /// Use the stored record when it is usable, otherwise start the
    /// interactive flow.
    ///
    /// # Errors
    /// Only if the authorization URL cannot be built.
    pub fn begin(&self) -> Result<Authorization> {
        match self.store.load() {
            Ok(token) if token.is_usable() => {
                tracing::debug!(
                    expired = token.is_expired(),
                    "Using stored token record"
                );
                Ok(Authorization::Ready(AuthorizedClient::new(
                    self.http.clone(),
                    self.oauth.clone(),
                    self.store.clone(),
                    token,
                )))
            }
            Ok(_) => {
                tracing::warn!("Stored token expired and has no refresh token, authorization required");
                self.pending()
            }
            Err(e) => {
                tracing::info!(reason = %e, "No usable stored token, authorization required");
                self.pending()
            }
        }
    }

    /// Start the interactive flow regardless of what is stored.
    ///
    /// # Errors
    /// Only if the authorization URL cannot be built.
    pub fn begin_fresh(&self) -> Result<Authorization> {
        self.pending()
    }

    fn pending(&self) -> Result<Authorization> {
        Ok(Authorization::Pending(PendingAuthorization {
            url: self.oauth.authorization_url(DEFAULT_STATE)?,
            http: self.http.clone(),
            oauth: self.oauth.clone(),
            store: self.store.clone(),
        }))
    }
}

// =============================================================================
// Operator prompt
// =============================================================================

/// Shows the consent URL and collects the pasted authorization code.
#[async_trait]
pub trait CodePrompt: Send {
    /// Present the consent URL.
    fn present(&mut self, url: &Url);

    /// Block until the operator supplies a code.
    async fn read_code(&mut self) -> Result<String>;
}

/// Prompt on stdout, code from one line of stdin.
#[derive(Debug, Default)]
pub struct ConsolePrompt;

#[async_trait]
impl CodePrompt for ConsolePrompt {
    fn present(&mut self, url: &Url) {
        if let Err(e) = write_prompt(&mut std::io::stdout().lock(), url) {
            tracing::debug!(error = %e, "Cannot write authorization prompt");
        }
    }

    async fn read_code(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| DqaError::AuthorizationFailed {
                reason: format!("cannot read authorization code: {e}"),
            })?;

        if read == 0 {
            return Err(DqaError::AuthorizationFailed {
                reason: "stdin closed before an authorization code was entered".to_string(),
            });
        }

        Ok(line.trim().to_string())
    }
}

/// Consent URL and code prompt, flushed so the prompt shows before the read.
fn write_prompt(out: &mut impl Write, url: &Url) -> std::io::Result<()> {
    writeln!(out, "Open this link in a browser to authorize read-only Drive access:")?;
    writeln!(out, "{url}")?;
    writeln!(out)?;
    write!(out, "Paste the authorization code here and press Enter: ")?;
    out.flush()
}

/// Produce an authenticated transport, prompting the operator only when no
/// usable record is stored (or when `force` is set).
///
/// # Errors
/// Any failure of the interactive flow. These are fatal at startup.
pub async fn obtain_authenticated_transport<P: CodePrompt>(
    manager: &CredentialManager,
    prompt: &mut P,
    force: bool,
) -> Result<AuthorizedClient> {
    let authorization = if force {
        manager.begin_fresh()?
    } else {
        manager.begin()?
    };

    match authorization {
        Authorization::Ready(client) => Ok(client),
        Authorization::Pending(pending) => {
            prompt.present(pending.url());
            let code = prompt.read_code().await?;
            pending.complete(&code).await
        }
    }
}
