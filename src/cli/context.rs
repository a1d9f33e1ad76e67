//! Startup wiring shared by the commands.
//!
//! Everything here runs before the first tick, so every error is fatal and
//! ends up as the process exit code.

use reqwest::Client;

use crate::core::alert::TelegramDispatcher;
use crate::core::credentials::{
    AuthorizedClient, CodePrompt, CredentialManager, obtain_authenticated_transport,
};
use crate::core::http::build_client;
use crate::core::oauth::OAuthClient;
use crate::core::policy::AlertPolicy;
use crate::core::quota::DriveQuotaPoller;
use crate::error::Result;
use crate::storage::{ClientSecrets, ConfigOverrides, ResolvedConfig, TelegramSettings, TokenStore};

/// Resolved configuration plus the one HTTP client every component shares.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: ResolvedConfig,
    pub http: Client,
}

impl AppContext {
    /// # Errors
    /// Configuration errors, or a failure to build the HTTP client.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let config = ResolvedConfig::resolve(overrides)?;
        tracing::debug!(
            interval_secs = config.interval.as_secs(),
            interval_source = %config.sources.interval,
            threshold = config.threshold_percent,
            threshold_source = %config.sources.threshold,
            client_secrets = %config.client_secrets_file.display(),
            token_file = %config.token_file.display(),
            "Resolved configuration"
        );

        let http = build_client(config.timeout)?;
        Ok(Self { config, http })
    }

    /// Threshold policy, warning when it fires on every tick.
    ///
    /// # Errors
    /// Threshold out of range.
    pub fn policy(&self) -> Result<AlertPolicy> {
        let policy = AlertPolicy::new(self.config.threshold_percent)?;
        if policy.always_alerts() {
            tracing::warn!(
                "Alert threshold is 0%, an alert will be sent on every check. \
                 Set --threshold, DQA_THRESHOLD or alert.threshold_percent to change this"
            );
        }
        Ok(policy)
    }

    /// Telegram dispatcher from the dotenv file and environment.
    ///
    /// # Errors
    /// [`crate::DqaError::EnvVarMissing`] when the bot token or chat id is unset.
    pub fn dispatcher(&self) -> Result<TelegramDispatcher> {
        let settings = TelegramSettings::load(&self.config.env_file)?;
        tracing::debug!(chat_id = %settings.chat_id, "Loaded Telegram settings");
        TelegramDispatcher::new(
            self.http.clone(),
            &self.config.telegram_api_base,
            settings,
            self.config.timeout,
        )
    }

    /// Credential manager over the configured client secrets and token file.
    ///
    /// # Errors
    /// Missing or malformed client secrets document.
    pub fn credential_manager(&self) -> Result<CredentialManager> {
        let secrets = ClientSecrets::load(&self.config.client_secrets_file)?;
        let oauth =
            OAuthClient::drive_readonly(secrets, self.http.clone(), self.config.timeout);
        Ok(CredentialManager::new(
            self.http.clone(),
            oauth,
            TokenStore::new(&self.config.token_file),
        ))
    }

    /// Stored credential, or the interactive flow through `prompt`.
    ///
    /// # Errors
    /// Configuration errors or [`crate::DqaError::AuthorizationFailed`].
    pub async fn authorize<P: CodePrompt>(
        &self,
        prompt: &mut P,
        force: bool,
    ) -> Result<AuthorizedClient> {
        let manager = self.credential_manager()?;
        obtain_authenticated_transport(&manager, prompt, force).await
    }

    /// Drive poller over an authorized client.
    ///
    /// # Errors
    /// Invalid Drive API base URL.
    pub fn poller(&self, client: AuthorizedClient) -> Result<DriveQuotaPoller> {
        DriveQuotaPoller::new(client, &self.config.drive_api_base, self.config.timeout)
    }
}
