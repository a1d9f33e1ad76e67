//! Canned HTTP bodies and mounting helpers for `wiremock`.

use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GB: u64 = 1024 * 1024 * 1024;
pub const BOT_TOKEN: &str = "123456:TEST-BOT-TOKEN";
pub const CHAT_ID: &str = "-100200300";

/// Drive `about` response with string-encoded int64 fields, as Google sends them.
pub fn drive_about(usage: u64, limit: u64) -> Value {
    json!({
        "storageQuota": {
            "limit": limit.to_string(),
            "usage": usage.to_string(),
            "usageInDrive": (usage / 2).to_string(),
            "usageInDriveTrash": "0"
        }
    })
}

/// Token endpoint grant.
pub fn token_grant(access_token: &str, refresh_token: Option<&str>) -> Value {
    let mut body = json!({
        "access_token": access_token,
        "expires_in": 3599,
        "token_type": "Bearer",
        "scope": "https://www.googleapis.com/auth/drive.readonly"
    });
    if let Some(refresh) = refresh_token {
        body["refresh_token"] = json!(refresh);
    }
    body
}

/// Successful `sendMessage` reply.
pub fn telegram_ok() -> Value {
    json!({"ok": true, "result": {"message_id": 7, "chat": {"id": -100_200_300}}})
}

/// Rejected `sendMessage` reply.
pub fn telegram_error(code: u16, description: &str) -> Value {
    json!({"ok": false, "error_code": code, "description": description})
}

/// `/token` answering `grant_type` with `grant`, expected `times` times.
pub async fn mount_token_endpoint(server: &MockServer, grant_type: &str, grant: Value, times: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(format!("grant_type={grant_type}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(grant))
        .expect(times)
        .mount(server)
        .await;
}

/// `token_uri` on `server`.
pub fn token_uri(server: &MockServer) -> String {
    format!("{}/token", server.uri())
}
