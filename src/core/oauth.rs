//! OAuth2 authorization code flow against the client's token endpoint.
//!
//! Only what the agent needs: build the consent URL, trade the pasted code
//! for a token, and refresh an expired access token.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::core::http::{classify_send_error, error_for_status};
use crate::error::{DqaError, Result};
use crate::storage::{ClientSecrets, StoredToken};

/// Read-only Drive scope; enough to read `about.storageQuota`.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Fixed `state` value. The code is pasted back by hand, so there is no
/// redirect to match it against.
pub const DEFAULT_STATE: &str = "state-token";

const SERVICE: &str = "oauth";

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Error body defined by RFC 6749 section 5.2.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Client for one OAuth registration.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    secrets: ClientSecrets,
    scopes: Vec<String>,
    http: Client,
    timeout: Duration,
}

impl OAuthClient {
    #[must_use]
    pub fn new(secrets: ClientSecrets, scopes: Vec<String>, http: Client, timeout: Duration) -> Self {
        Self {
            secrets,
            scopes,
            http,
            timeout,
        }
    }

    /// Client requesting only [`DRIVE_READONLY_SCOPE`].
    #[must_use]
    pub fn drive_readonly(secrets: ClientSecrets, http: Client, timeout: Duration) -> Self {
        Self::new(secrets, vec![DRIVE_READONLY_SCOPE.to_string()], http, timeout)
    }

    /// Consent page URL asking for offline access (so a refresh token is
    /// issued).
    ///
    /// # Errors
    /// [`DqaError::ConfigInvalid`] if the client's `auth_uri` is not a URL.
    pub fn authorization_url(&self, state: &str) -> Result<Url> {
        let mut url = Url::parse(&self.secrets.auth_uri).map_err(|e| DqaError::ConfigInvalid {
            key: "auth_uri".to_string(),
            value: self.secrets.auth_uri.clone(),
            message: e.to_string(),
        })?;

        url.query_pairs_mut()
            .append_pair("access_type", "offline")
            .append_pair("client_id", &self.secrets.client_id)
            .append_pair("redirect_uri", self.secrets.redirect_uri())
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state);

        Ok(url)
    }

    /// Trade an authorization code for a token.
    ///
    /// # Errors
    /// Any failure is reported as [`DqaError::AuthorizationFailed`].
    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken> {
        let code = code.trim();
        if code.is_empty() {
            return Err(DqaError::AuthorizationFailed {
                reason: "authorization code is empty".to_string(),
            });
        }

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.secrets.redirect_uri()),
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
        ];

        let response = self
            .request_token(&form)
            .await
            .map_err(|e| DqaError::AuthorizationFailed {
                reason: e.to_string(),
            })?;

        tracing::info!(
            has_refresh_token = response.refresh_token.is_some(),
            "Exchanged authorization code for token"
        );

        Ok(StoredToken::from_grant(
            response.access_token,
            response.token_type,
            response.refresh_token,
            response.expires_in,
            Utc::now(),
        ))
    }

    /// Obtain a new access token using `token`'s refresh token.
    ///
    /// The returned record keeps the old refresh token unless the endpoint
    /// rotated it.
    ///
    /// # Errors
    /// [`DqaError::AuthExpired`] when there is no refresh token or the grant
    /// was revoked (`invalid_grant`); network and server failures otherwise.
    pub async fn refresh(&self, token: &StoredToken) -> Result<StoredToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| DqaError::AuthExpired {
                reason: "access token expired and no refresh token is stored".to_string(),
            })?;

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
        ];

        let response = self.request_token(&form).await.map_err(|e| match e {
            DqaError::ApiError {
                status: 400 | 401,
                message,
                ..
            } => DqaError::AuthExpired {
                reason: format!("refresh rejected: {message}"),
            },
            other => other,
        })?;

        let mut refreshed = StoredToken::from_grant(
            response.access_token,
            response.token_type,
            response.refresh_token,
            response.expires_in,
            Utc::now(),
        );
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = Some(refresh_token.to_string());
        }

        tracing::debug!(expiry = ?refreshed.expiry, "Refreshed access token");
        Ok(refreshed)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.secrets.token_uri)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await
            .map_err(|e| classify_send_error(e, self.timeout))?;

        let response = error_for_status(response, SERVICE)
            .await
            .map_err(describe_token_error)?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| DqaError::ParseResponse(e.to_string()))?;

        if body.access_token.trim().is_empty() {
            return Err(DqaError::ParseResponse(
                "token endpoint returned an empty access_token".to_string(),
            ));
        }

        Ok(body)
    }
}

/// Replace a raw JSON error body with `error: description`.
fn describe_token_error(err: DqaError) -> DqaError {
    match err {
        DqaError::ApiError {
            service,
            status,
            message,
        } => {
            let message = serde_json::from_str::<TokenErrorResponse>(&message).map_or(
                message,
                |body| match body.error_description {
                    Some(description) => format!("{}: {description}", body.error),
                    None => body.error,
                },
            );
            DqaError::ApiError {
                service,
                status,
                message,
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http::build_client;

    fn secrets() -> ClientSecrets {
        ClientSecrets {
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
            auth_uri: "https://accounts.example.com/o/oauth2/auth".to_string(),
            token_uri: "https://oauth2.example.com/token".to_string(),
            redirect_uris: vec!["http://localhost".to_string()],
        }
    }

    fn client() -> OAuthClient {
        OAuthClient::drive_readonly(
            secrets(),
            build_client(Duration::from_secs(5)).unwrap(),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn authorization_url_requests_offline_readonly_access() {
        let url = client().authorization_url(DEFAULT_STATE).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(url.host_str(), Some("accounts.example.com"));
        assert!(pairs.contains(&("access_type".to_string(), "offline".to_string())));
        assert!(pairs.contains(&("client_id".to_string(), "client-123".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("scope".to_string(), DRIVE_READONLY_SCOPE.to_string())));
        assert!(pairs.contains(&("redirect_uri".to_string(), "http://localhost".to_string())));
        assert!(pairs.contains(&("state".to_string(), DEFAULT_STATE.to_string())));
    }

    #[test]
    fn authorization_url_rejects_bad_auth_uri() {
        let mut bad = secrets();
        bad.auth_uri = "::nope".to_string();
        let client = OAuthClient::drive_readonly(
            bad,
            build_client(Duration::from_secs(5)).unwrap(),
            Duration::from_secs(5),
        );
        assert!(matches!(
            client.authorization_url(DEFAULT_STATE),
            Err(DqaError::ConfigInvalid { .. })
        ));
    }

    #[tokio::test]
    async fn empty_code_is_rejected_without_network() {
        let err = client().exchange_code("   ").await.unwrap_err();
        assert!(matches!(err, DqaError::AuthorizationFailed { .. }));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_is_auth_expired() {
        let token = StoredToken {
            access_token: "a".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expiry: None,
        };
        let err = client().refresh(&token).await.unwrap_err();
        assert!(matches!(err, DqaError::AuthExpired { .. }));
    }

    #[test]
    fn token_error_body_is_summarised() {
        let err = describe_token_error(DqaError::ApiError {
            service: SERVICE,
            status: 400,
            message: r#"{"error": "invalid_grant", "error_description": "Bad Request"}"#
                .to_string(),
        });
        match err {
            DqaError::ApiError { message, .. } => assert_eq!(message, "invalid_grant: Bad Request"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
