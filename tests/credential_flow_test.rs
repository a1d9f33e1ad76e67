//! Credential lifecycle: stored token reuse, interactive authorization,
//! refresh and persistence.

use std::time::Duration;

use chrono::TimeDelta;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dqa::DqaError;
use dqa::core::credentials::{
    Authorization, AuthorizedClient, CredentialManager, obtain_authenticated_transport,
};
use dqa::core::http::build_client;
use dqa::core::oauth::OAuthClient;
use dqa::storage::{StoredToken, TokenStore};
use dqa::test_utils::{ScriptedPrompt, TestDir, make_test_client_secrets, make_test_token};

mod common;

use common::logger::TestLogger;
use common::mock::{mount_token_endpoint, token_grant, token_uri};

const TIMEOUT: Duration = Duration::from_secs(5);

fn oauth(server: &MockServer) -> OAuthClient {
    OAuthClient::drive_readonly(
        make_test_client_secrets(&token_uri(server)),
        build_client(TIMEOUT).unwrap(),
        TIMEOUT,
    )
}

fn manager(server: &MockServer, store: &TokenStore) -> CredentialManager {
    CredentialManager::new(build_client(TIMEOUT).unwrap(), oauth(server), store.clone())
}

fn client(server: &MockServer, store: &TokenStore, token: StoredToken) -> AuthorizedClient {
    AuthorizedClient::new(build_client(TIMEOUT).unwrap(), oauth(server), store.clone(), token)
}

#[tokio::test]
async fn missing_record_runs_interactive_flow_once_and_persists() {
    let log = TestLogger::new("missing_record_runs_interactive_flow_once_and_persists");
    let server = MockServer::start().await;
    let dir = TestDir::new();
    let store = TokenStore::new(dir.file_path("token.json"));

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=4%2Fpasted-code"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_grant("ya29.fresh", Some("1//fresh"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    log.phase("authorize");
    let mut prompt = ScriptedPrompt::with_codes(&["4/pasted-code"]);
    let client = obtain_authenticated_transport(&manager(&server, &store), &mut prompt, false)
        .await
        .unwrap();

    log.phase("verify");
    assert_eq!(prompt.presented().len(), 1);
    let url = &prompt.presented()[0];
    assert!(url.query_pairs().any(|(k, v)| k == "access_type" && v == "offline"));
    assert!(
        url.query_pairs()
            .any(|(k, v)| k == "scope" && v.ends_with("/auth/drive.readonly"))
    );

    let stored = store.load().unwrap();
    assert_eq!(stored, client.current_token().await);
    assert_eq!(stored.access_token, "ya29.fresh");
    assert_eq!(stored.refresh_token.as_deref(), Some("1//fresh"));
    assert_eq!(client.bearer().await.unwrap(), "ya29.fresh");
    log.finish_ok();
}

#[tokio::test]
async fn unexpired_record_skips_interactive_flow() {
    let server = MockServer::start().await;
    let dir = TestDir::new();
    let store = TokenStore::new(dir.file_path("token.json"));
    let token = make_test_token(TimeDelta::hours(1), Some("1//r"));
    store.save(&token).unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mut prompt = ScriptedPrompt::default();
    let client = obtain_authenticated_transport(&manager(&server, &store), &mut prompt, false)
        .await
        .unwrap();

    assert!(prompt.presented().is_empty());
    assert_eq!(client.bearer().await.unwrap(), token.access_token);
}

#[tokio::test]
async fn corrupt_record_is_treated_as_missing() {
    let server = MockServer::start().await;
    let dir = TestDir::new();
    dir.create_file("token.json", "{ not json");
    let store = TokenStore::new(dir.file_path("token.json"));

    match manager(&server, &store).begin().unwrap() {
        Authorization::Pending(pending) => {
            assert!(pending.url().as_str().starts_with("https://accounts.google.com/"));
        }
        Authorization::Ready(_) => panic!("corrupt record must not be used"),
    }
}

#[tokio::test]
async fn force_reauthorizes_even_with_valid_record() {
    let server = MockServer::start().await;
    let dir = TestDir::new();
    let store = TokenStore::new(dir.file_path("token.json"));
    store.save(&make_test_token(TimeDelta::hours(1), Some("1//old"))).unwrap();
    mount_token_endpoint(&server, "authorization_code", token_grant("ya29.forced", Some("1//new")), 1).await;

    let mut prompt = ScriptedPrompt::with_codes(&["4/again"]);
    obtain_authenticated_transport(&manager(&server, &store), &mut prompt, true)
        .await
        .unwrap();

    assert_eq!(prompt.presented().len(), 1);
    assert_eq!(store.load().unwrap().access_token, "ya29.forced");
}

#[tokio::test]
async fn rejected_code_is_authorization_failed_and_nothing_saved() {
    let server = MockServer::start().await;
    let dir = TestDir::new();
    let store = TokenStore::new(dir.file_path("token.json"));

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Malformed auth code."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut prompt = ScriptedPrompt::with_codes(&["bogus"]);
    let err = obtain_authenticated_transport(&manager(&server, &store), &mut prompt, false)
        .await
        .unwrap_err();

    match &err {
        DqaError::AuthorizationFailed { reason } => assert!(reason.contains("invalid_grant")),
        other => panic!("expected AuthorizationFailed, got {other:?}"),
    }
    assert_eq!(err.exit_code(), dqa::ExitCode::AuthError);
    assert!(!dir.file_exists("token.json"));
}

#[tokio::test]
async fn blank_code_never_reaches_token_endpoint() {
    let server = MockServer::start().await;
    let dir = TestDir::new();
    let store = TokenStore::new(dir.file_path("token.json"));
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut prompt = ScriptedPrompt::with_codes(&["   "]);
    let err = obtain_authenticated_transport(&manager(&server, &store), &mut prompt, false)
        .await
        .unwrap_err();

    assert!(matches!(err, DqaError::AuthorizationFailed { .. }));
}

#[tokio::test]
async fn refresh_keeps_old_refresh_token_and_persists() {
    let log = TestLogger::new("refresh_keeps_old_refresh_token_and_persists");
    let server = MockServer::start().await;
    let dir = TestDir::new();
    let store = TokenStore::new(dir.file_path("token.json"));

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=1%2F%2Fkeep-me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_grant("ya29.next", None)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, &store, make_test_token(-TimeDelta::hours(1), Some("1//keep-me")));

    log.phase("refresh");
    assert_eq!(client.bearer().await.unwrap(), "ya29.next");
    // Second call reuses the refreshed token; the mock expects one hit.
    assert_eq!(client.bearer().await.unwrap(), "ya29.next");

    let stored = store.load().unwrap();
    assert_eq!(stored.access_token, "ya29.next");
    assert_eq!(stored.refresh_token.as_deref(), Some("1//keep-me"));
    log.finish_ok();
}

#[tokio::test]
async fn rotated_refresh_token_replaces_old_one() {
    let server = MockServer::start().await;
    let dir = TestDir::new();
    let store = TokenStore::new(dir.file_path("token.json"));
    mount_token_endpoint(&server, "refresh_token", token_grant("ya29.next", Some("1//rotated")), 1).await;

    let client = client(&server, &store, make_test_token(-TimeDelta::hours(1), Some("1//old")));
    client.bearer().await.unwrap();

    assert_eq!(store.load().unwrap().refresh_token.as_deref(), Some("1//rotated"));
}

#[tokio::test]
async fn revoked_refresh_token_is_auth_expired() {
    let server = MockServer::start().await;
    let dir = TestDir::new();
    let store = TokenStore::new(dir.file_path("token.json"));
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    let client = client(&server, &store, make_test_token(-TimeDelta::hours(1), Some("1//revoked")));
    let err = client.bearer().await.unwrap_err();

    assert!(matches!(err, DqaError::AuthExpired { ref reason } if reason.contains("invalid_grant")));
    assert!(err.is_transient());
    assert!(!dir.file_exists("token.json"));
}

#[cfg(unix)]
#[tokio::test]
async fn persisted_record_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let server = MockServer::start().await;
    let dir = TestDir::new();
    let store = TokenStore::new(dir.file_path("nested/token.json"));
    mount_token_endpoint(&server, "authorization_code", token_grant("ya29.fresh", Some("1//r")), 1).await;

    let mut prompt = ScriptedPrompt::with_codes(&["4/code"]);
    obtain_authenticated_transport(&manager(&server, &store), &mut prompt, false)
        .await
        .unwrap();

    let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
